//! Per-page answer strategies.
//!
//! Every strategy returns whether it changed anything and is safe to call on
//! an already-answered page: existing selections are detected and skipped, so
//! a second invocation is a no-op. A missing target control is not an error,
//! just a `false`.

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use rand::{Rng, RngExt};

use crate::classify::PageType;
use crate::config::{OrderMode, RunConfig};
use crate::error::AutomatonError;
use crate::generators::{
    random_age_bracket, random_instant, random_rating, random_time_of_day, rating_to_index,
};
use crate::page::{PageDriver, PageSnapshot, TextKind};
use crate::runner::RunLog;

/// Dispatch to the strategy for `page`; `Unknown` gets the generic sweep.
pub fn apply<R: Rng>(
    page: PageType,
    snap: &PageSnapshot,
    cfg: &RunConfig,
    driver: &mut dyn PageDriver,
    rng: &mut R,
    now: NaiveDateTime,
    log: &mut RunLog,
) -> Result<bool, AutomatonError> {
    match page {
        PageType::Age => fill_age(snap, cfg, driver, rng, log),
        PageType::DateTime => fill_datetime(snap, cfg, driver, rng, now, log),
        PageType::OrderMode => fill_order_mode(snap, cfg, driver, rng, log),
        PageType::Place | PageType::Pickup | PageType::Delivery => {
            fill_random_radio(snap, driver, rng, log)
        }
        PageType::Satisfaction => fill_satisfaction(snap, cfg, driver, log),
        PageType::Exactness => fill_exactness(snap, driver, log),
        PageType::Problem => fill_problem(snap, driver, log),
        PageType::Improve => fill_improve(snap, driver, log),
        PageType::Complete => Ok(false),
        PageType::Unknown => fill_generic(snap, cfg, driver, rng, log),
    }
}

/// Prefer the radio whose value matches the configured bracket; otherwise
/// index by the age distribution.
pub fn fill_age<R: Rng>(
    snap: &PageSnapshot,
    cfg: &RunConfig,
    driver: &mut dyn PageDriver,
    rng: &mut R,
    log: &mut RunLog,
) -> Result<bool, AutomatonError> {
    if snap.radios.iter().any(|r| r.checked) {
        return Ok(false);
    }
    if let Some(wanted) = cfg.age.as_deref() {
        let direct = snap
            .radios
            .iter()
            .find(|r| r.name.contains("age") && r.value == wanted);
        if let Some(radio) = direct
            && driver.activate(&radio.handle)?
        {
            log.push(format!("Age: valeur {wanted}"));
            return Ok(true);
        }
    }
    let bracket = random_age_bracket(rng);
    match snap.radios.get(bracket) {
        Some(radio) => {
            let acted = driver.activate(&radio.handle)?;
            if acted {
                log.push(format!("Age: option {}", bracket + 1));
            }
            Ok(acted)
        }
        None => Ok(false),
    }
}

/// One generated visit instant, spread across the date/hour/minute/restaurant
/// inputs. Association goes through the nearest-ancestor label because the
/// form has no stable input naming. Only empty fields are written.
pub fn fill_datetime<R: Rng>(
    snap: &PageSnapshot,
    cfg: &RunConfig,
    driver: &mut dyn PageDriver,
    rng: &mut R,
    now: NaiveDateTime,
    log: &mut RunLog,
) -> Result<bool, AutomatonError> {
    if snap.fields.iter().all(|f| !f.value.is_empty()) {
        return Ok(false);
    }

    let window_start = cfg.date_start.and_time(NaiveTime::MIN);
    let window_end = cfg.date_end.and_time(NaiveTime::MIN);
    let date = random_instant(window_start, window_end, rng)?.date();
    let time = random_time_of_day(date, cfg.hour_start, cfg.hour_end, now, rng)?;
    let hour = format!("{:02}", time.hour());
    let minute = format!("{:02}", time.minute());

    let mut changed = false;
    for field in snap.fields.iter().filter(|f| f.value.is_empty()) {
        let context = format!("{} {}", field.label, field.placeholder);
        let wrote = if field.kind == TextKind::Date || field.placeholder.contains("jj") {
            driver.fill_text(&field.handle, &date.format("%Y-%m-%d").to_string())?
        } else if context.contains("heure") && !context.contains("minute") {
            driver.fill_text(&field.handle, &hour)?
        } else if context.contains("minute") {
            driver.fill_text(&field.handle, &minute)?
        } else if context.contains("restaurant") || context.contains("numéro") {
            driver.fill_text(&field.handle, &cfg.restaurant_num)?
        } else {
            false
        };
        changed |= wrote;
    }

    if changed {
        log.push(format!(
            "Date: {} {hour}:{minute}, Restaurant: {}",
            date.format("%d/%m/%Y"),
            cfg.restaurant_num
        ));
    }
    Ok(changed)
}

pub fn fill_order_mode<R: Rng>(
    snap: &PageSnapshot,
    cfg: &RunConfig,
    driver: &mut dyn PageDriver,
    rng: &mut R,
    log: &mut RunLog,
) -> Result<bool, AutomatonError> {
    if snap.radios.is_empty() || snap.radios.iter().any(|r| r.checked) {
        return Ok(false);
    }
    let index = match cfg.order_mode {
        OrderMode::Choice(n) => n.saturating_sub(1),
        OrderMode::Random => rng.random_range(0..snap.radios.len()),
    };
    match snap.radios.get(index) {
        Some(radio) => {
            let acted = driver.activate(&radio.handle)?;
            if acted {
                log.push(format!("Mode commande: option {}", index + 1));
            }
            Ok(acted)
        }
        None => Ok(false),
    }
}

/// Place/pickup/delivery pages carry no configured preference.
pub fn fill_random_radio<R: Rng>(
    snap: &PageSnapshot,
    driver: &mut dyn PageDriver,
    rng: &mut R,
    log: &mut RunLog,
) -> Result<bool, AutomatonError> {
    if snap.radios.is_empty() || snap.radios.iter().any(|r| r.checked) {
        return Ok(false);
    }
    let index = rng.random_range(0..snap.radios.len());
    let acted = driver.activate(&snap.radios[index].handle)?;
    if acted {
        log.push(format!("Selection aleatoire: option {}", index + 1));
    }
    Ok(acted)
}

/// Best smiley first, then the configured comment if a free-text field is
/// present.
pub fn fill_satisfaction(
    snap: &PageSnapshot,
    cfg: &RunConfig,
    driver: &mut dyn PageDriver,
    log: &mut RunLog,
) -> Result<bool, AutomatonError> {
    let mut changed = false;
    if let Some(best) = snap.scales.first()
        && !snap.scales.iter().any(|s| s.selected)
        && driver.activate(&best.handle)?
    {
        log.push("Satisfaction: meilleur choix");
        changed = true;
    }
    if !cfg.comment.is_empty() {
        let empty_comment = snap
            .fields
            .iter()
            .find(|f| f.kind == TextKind::Multiline && f.value.is_empty());
        if let Some(field) = empty_comment
            && driver.fill_text(&field.handle, &cfg.comment)?
        {
            log.push("Commentaire ajoute");
            changed = true;
        }
    }
    Ok(changed)
}

/// Affirmative radio, first radio as fallback.
pub fn fill_exactness(
    snap: &PageSnapshot,
    driver: &mut dyn PageDriver,
    log: &mut RunLog,
) -> Result<bool, AutomatonError> {
    if snap.radios.iter().any(|r| r.checked) {
        return Ok(false);
    }
    let target = snap
        .radios
        .iter()
        .find(|r| r.label.contains("oui"))
        .or_else(|| snap.radios.first());
    match target {
        Some(radio) => {
            let acted = driver.activate(&radio.handle)?;
            if acted {
                log.push("Commande exacte: oui");
            }
            Ok(acted)
        }
        None => Ok(false),
    }
}

/// Negative radio, second radio as fallback.
pub fn fill_problem(
    snap: &PageSnapshot,
    driver: &mut dyn PageDriver,
    log: &mut RunLog,
) -> Result<bool, AutomatonError> {
    if snap.radios.iter().any(|r| r.checked) {
        return Ok(false);
    }
    let target = snap
        .radios
        .iter()
        .find(|r| r.label.contains("non"))
        .or_else(|| snap.radios.get(1));
    match target {
        Some(radio) => {
            let acted = driver.activate(&radio.handle)?;
            if acted {
                log.push("Probleme: non");
            }
            Ok(acted)
        }
        None => Ok(false),
    }
}

/// "None of these" checkbox, last checkbox as fallback.
pub fn fill_improve(
    snap: &PageSnapshot,
    driver: &mut dyn PageDriver,
    log: &mut RunLog,
) -> Result<bool, AutomatonError> {
    if snap.checkboxes.iter().any(|c| c.checked) {
        return Ok(false);
    }
    let target = snap
        .checkboxes
        .iter()
        .find(|c| c.label.contains("aucune"))
        .or_else(|| snap.checkboxes.last());
    match target {
        Some(cb) => {
            let acted = driver.activate(&cb.handle)?;
            if acted {
                log.push("Amelioration: aucune");
            }
            Ok(acted)
        }
        None => Ok(false),
    }
}

/// Classifier-free sweep over every control role. Each sub-pass only touches
/// elements not already in a definite state, so repeated invocation is safe.
pub fn fill_generic<R: Rng>(
    snap: &PageSnapshot,
    cfg: &RunConfig,
    driver: &mut dyn PageDriver,
    rng: &mut R,
    log: &mut RunLog,
) -> Result<bool, AutomatonError> {
    let mut changed = false;

    for (_, group) in snap.radio_groups() {
        if group.iter().any(|r| r.checked) {
            continue;
        }
        let rating = random_rating(cfg.rating_mode, rng);
        let index = rating_to_index(rating, group.len());
        changed |= driver.activate(&group[index].handle)?;
    }

    for group in snap.scale_groups() {
        if group.iter().any(|s| s.selected) {
            continue;
        }
        let rating = random_rating(cfg.rating_mode, rng);
        let index = rating_to_index(rating, group.len());
        changed |= driver.activate(&group[index].handle)?;
    }

    for cb in &snap.checkboxes {
        if !cb.checked && rng.random_bool(0.5) {
            changed |= driver.activate(&cb.handle)?;
        }
    }

    if !cfg.default_text.is_empty() {
        for field in &snap.fields {
            if field.kind != TextKind::Date && field.value.is_empty() {
                changed |= driver.fill_text(&field.handle, &cfg.default_text)?;
            }
        }
    }

    for select in &snap.selects {
        if select.selected_index <= 0 && select.option_count > 1 {
            changed |= driver.select_index(&select.handle, 1)?;
        }
    }

    if changed {
        log.push("Champs remplis");
    }
    Ok(changed)
}
