use std::str::FromStr;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};

/// How aggressively generated ratings lean toward the top of the scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingMode {
    Max,
    High,
    Medium,
    Random,
    Default,
}

impl RatingMode {
    /// Keyword form used by the emitted script and the HTTP payload.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Max => "max",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Random => "random",
            Self::Default => "default",
        }
    }

    /// Lenient parse: anything unrecognized falls back to `Default`, the
    /// same way the in-page script treats an unknown mode keyword.
    pub fn from_keyword(keyword: &str) -> Self {
        match keyword.trim().to_ascii_lowercase().as_str() {
            "max" => Self::Max,
            "high" => Self::High,
            "medium" => Self::Medium,
            "random" => Self::Random,
            _ => Self::Default,
        }
    }
}

/// Answer to the "how did you order" page: an explicit 1-based option, or a
/// uniform draw over whatever the page offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderMode {
    Random,
    Choice(usize),
}

impl FromStr for OrderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("random") {
            return Ok(Self::Random);
        }
        match s.trim().parse::<usize>() {
            Ok(n) if n >= 1 => Ok(Self::Choice(n)),
            _ => Err(format!("mode de commande invalide: {s}")),
        }
    }
}

/// Immutable input to one automaton run. Built once by the harness, read-only
/// afterwards; the loop itself keeps no other state between pages.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Identifier written into the "restaurant"/"numero" field.
    pub restaurant_num: String,
    /// Calendar window the generated visit date falls in (inclusive).
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    /// Clock window the generated visit time falls in.
    pub hour_start: NaiveTime,
    pub hour_end: NaiveTime,
    pub order_mode: OrderMode,
    /// Free-text comment for the satisfaction page; empty means skip.
    pub comment: String,
    /// Fill for generic empty text fields on unclassified pages.
    pub default_text: String,
    pub rating_mode: RatingMode,
    /// Preferred age radio value, matched before positional fallback.
    pub age: Option<String>,
    /// Inter-step delay; the loop suspends twice per iteration and twice as
    /// long right after advancing to the next page.
    pub step_delay: Duration,
    /// When false, the loop performs exactly one fill pass and stops.
    pub auto_next: bool,
}

impl RunConfig {
    /// Server-side defaults: a rolling three-day date window ending today,
    /// 08:00-22:00, random order mode, no comment.
    pub fn rolling_window(today: NaiveDate) -> Self {
        Self {
            restaurant_num: "0610".to_string(),
            date_start: today - chrono::Duration::days(3),
            date_end: today,
            hour_start: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            hour_end: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            order_mode: OrderMode::Random,
            comment: String::new(),
            default_text: String::new(),
            rating_mode: RatingMode::Default,
            age: None,
            step_delay: Duration::from_millis(1000),
            auto_next: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_mode_parses_random_and_indices() {
        assert_eq!("random".parse::<OrderMode>().unwrap(), OrderMode::Random);
        assert_eq!("Random".parse::<OrderMode>().unwrap(), OrderMode::Random);
        assert_eq!("3".parse::<OrderMode>().unwrap(), OrderMode::Choice(3));
        assert!("0".parse::<OrderMode>().is_err());
        assert!("drive".parse::<OrderMode>().is_err());
    }

    #[test]
    fn rating_mode_keyword_falls_back_to_default() {
        assert_eq!(RatingMode::from_keyword("max"), RatingMode::Max);
        assert_eq!(RatingMode::from_keyword("HIGH"), RatingMode::High);
        assert_eq!(RatingMode::from_keyword("whatever"), RatingMode::Default);
    }

    #[test]
    fn rolling_window_spans_three_days() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let cfg = RunConfig::rolling_window(today);
        assert_eq!(cfg.date_start, NaiveDate::from_ymd_opt(2024, 6, 12).unwrap());
        assert_eq!(cfg.date_end, today);
        assert!(cfg.auto_next);
    }
}
