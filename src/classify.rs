//! Text-substring page classification.
//!
//! The heuristic is an ordered rule table evaluated top to bottom; the first
//! matching rule wins. Ordering is load-bearing: vocabularies overlap (a
//! satisfaction page can mention "merci" too), so the specific rules sit
//! above the completion rule. The substrings are the target site's copy,
//! kept verbatim; fragility to copy changes is a known, accepted limitation.

use std::fmt;

use crate::page::PageSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    Age,
    DateTime,
    OrderMode,
    Place,
    Pickup,
    Delivery,
    Satisfaction,
    Exactness,
    Problem,
    Improve,
    Complete,
    Unknown,
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Age => "age",
            Self::DateTime => "datetime",
            Self::OrderMode => "ordermode",
            Self::Place => "place",
            Self::Pickup => "pickup",
            Self::Delivery => "delivery",
            Self::Satisfaction => "satisfaction",
            Self::Exactness => "exact",
            Self::Problem => "problem",
            Self::Improve => "improve",
            Self::Complete => "complete",
            Self::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// A rule matches when any of its clauses matches; a clause requires all of
/// its substrings to co-occur in the page text.
struct Rule {
    page: PageType,
    clauses: &'static [&'static [&'static str]],
}

const RULES: &[Rule] = &[
    Rule {
        page: PageType::Age,
        clauses: &[&["quel est votre âge"], &["quel est votre age"]],
    },
    Rule {
        page: PageType::DateTime,
        clauses: &[&["jour", "heure", "restaurant"]],
    },
    Rule {
        page: PageType::OrderMode,
        clauses: &[&["borne de commande"], &["comptoir", "drive"]],
    },
    Rule {
        page: PageType::Place,
        clauses: &[&["consommé sur place"], &["pris à emporter"]],
    },
    Rule {
        page: PageType::Pickup,
        clauses: &[&["où avez-vous récupéré"]],
    },
    Rule {
        page: PageType::Delivery,
        clauses: &[&["service de livraison"]],
    },
    Rule {
        page: PageType::Satisfaction,
        clauses: &[&["dans quelle mesure", "satisfait"]],
    },
    Rule {
        page: PageType::Exactness,
        clauses: &[&["commande était exacte"]],
    },
    Rule {
        page: PageType::Problem,
        clauses: &[&["problème durant"]],
    },
    Rule {
        page: PageType::Improve,
        clauses: &[&["domaine", "améliorée"]],
    },
    Rule {
        page: PageType::Complete,
        clauses: &[&["merci", "participation"]],
    },
];

/// Total and stateless: every snapshot maps to exactly one tag, `Unknown`
/// when nothing matches.
pub fn classify(snapshot: &PageSnapshot) -> PageType {
    let text = snapshot.text.to_lowercase();
    for rule in RULES {
        let hit = rule
            .clauses
            .iter()
            .any(|clause| clause.iter().all(|needle| text.contains(needle)));
        if hit {
            return rule.page;
        }
    }
    PageType::Unknown
}
