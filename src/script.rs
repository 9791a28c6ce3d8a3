//! The generic in-page variant, emitted as a self-contained script with the
//! operator's configuration interpolated as literals.
//!
//! Free text goes through [`escape_single_quoted`] before interpolation so
//! the emitted source stays syntactically valid; the surrounding bookmarklet
//! URL packaging is the hosting page's job, not ours.

use crate::config::{RatingMode, RunConfig};

/// The values the emitted script embeds. Narrower than [`RunConfig`]: the
/// generic variant has no classifier, so the site-specific knobs (date
/// window, order mode, restaurant) do not apply.
#[derive(Debug, Clone)]
pub struct ScriptConfig {
    pub age: String,
    pub rating_mode: RatingMode,
    pub default_text: String,
    pub delay_ms: u64,
    pub auto_next: bool,
}

impl From<&RunConfig> for ScriptConfig {
    fn from(cfg: &RunConfig) -> Self {
        Self {
            age: cfg.age.clone().unwrap_or_default(),
            rating_mode: cfg.rating_mode,
            default_text: cfg.default_text.clone(),
            delay_ms: cfg.step_delay.as_millis() as u64,
            auto_next: cfg.auto_next,
        }
    }
}

/// Escape a value for a single-quoted script literal.
pub fn escape_single_quoted(text: &str) -> String {
    text.replace('\'', "\\'").replace('\n', "\\n")
}

/// Render the self-contained in-page script.
pub fn emit_bookmarklet(cfg: &ScriptConfig) -> String {
    TEMPLATE
        .replace("__AGE__", &escape_single_quoted(&cfg.age))
        .replace("__RATING_MODE__", cfg.rating_mode.as_str())
        .replace("__DEFAULT_TEXT__", &escape_single_quoted(&cfg.default_text))
        .replace("__DELAY__", &cfg.delay_ms.to_string())
        .replace("__AUTO_NEXT__", if cfg.auto_next { "true" } else { "false" })
}

/// Collapse whitespace so the script fits a one-line bookmarklet.
pub fn minify(script: &str) -> String {
    script.split_whitespace().collect::<Vec<_>>().join(" ")
}

const TEMPLATE: &str = r#"(function(){
const CONFIG = {
    age: '__AGE__',
    ratingMode: '__RATING_MODE__',
    defaultText: '__DEFAULT_TEXT__',
    delay: __DELAY__,
    autoNext: __AUTO_NEXT__
};

function getRandomRating(mode) {
    switch (mode) {
        case 'max': return 10;
        case 'high': return Math.floor(Math.random() * 3) + 8;
        case 'medium': return Math.floor(Math.random() * 3) + 5;
        case 'random': return Math.floor(Math.random() * 10) + 1;
        default: return 9;
    }
}

function sleep(ms) {
    return new Promise(r => setTimeout(r, ms));
}

function clickElement(el) {
    if (!el) return false;
    el.click();
    el.dispatchEvent(new Event('change', { bubbles: true }));
    el.dispatchEvent(new Event('input', { bubbles: true }));
    return true;
}

function fillRadioButtons() {
    const ageRadio = document.querySelector('input[name*="age"][value="' + CONFIG.age + '"]');
    if (ageRadio) {
        clickElement(ageRadio);
        return true;
    }

    const radioGroups = {};
    document.querySelectorAll('input[type="radio"]').forEach(radio => {
        if (!radioGroups[radio.name]) radioGroups[radio.name] = [];
        radioGroups[radio.name].push(radio);
    });

    let filled = false;
    Object.values(radioGroups).forEach(radios => {
        if (radios.length > 0 && !radios.some(r => r.checked)) {
            const rating = getRandomRating(CONFIG.ratingMode);
            const targetIndex = Math.floor((rating / 10) * radios.length);
            const target = radios[Math.min(targetIndex, radios.length - 1)];
            if (target) {
                clickElement(target);
                filled = true;
            }
        }
    });
    return filled;
}

function fillScaleButtons() {
    let filled = false;
    document.querySelectorAll('[class*="scale"], [class*="rating"], [class*="nps"]').forEach(container => {
        const buttons = container.querySelectorAll('button, [role="radio"], label');
        if (buttons.length > 0) {
            const rating = getRandomRating(CONFIG.ratingMode);
            const targetIndex = Math.floor((rating / 10) * buttons.length);
            const btn = buttons[Math.min(targetIndex, buttons.length - 1)];
            if (btn && !btn.classList.contains('selected')) {
                clickElement(btn);
                filled = true;
            }
        }
    });

    document.querySelectorAll('[data-value], [data-score]').forEach(el => {
        const parent = el.closest('[class*="question"], fieldset, [role="radiogroup"]');
        if (parent && !parent.querySelector('.selected, [aria-checked="true"], :checked')) {
            const siblings = parent.querySelectorAll('[data-value], [data-score]');
            const rating = getRandomRating(CONFIG.ratingMode);
            const targetIndex = Math.floor((rating / 10) * siblings.length);
            const target = siblings[Math.min(targetIndex, siblings.length - 1)];
            if (target) {
                clickElement(target);
                filled = true;
            }
        }
    });
    return filled;
}

function fillTextFields() {
    let filled = false;
    document.querySelectorAll('textarea, input[type="text"]:not([readonly])').forEach(field => {
        if (!field.value && field.offsetParent !== null) {
            field.value = CONFIG.defaultText;
            field.dispatchEvent(new Event('input', { bubbles: true }));
            field.dispatchEvent(new Event('change', { bubbles: true }));
            filled = true;
        }
    });
    return filled;
}

function fillCheckboxes() {
    let filled = false;
    document.querySelectorAll('input[type="checkbox"]').forEach(cb => {
        if (!cb.checked && Math.random() > 0.5) {
            clickElement(cb);
            filled = true;
        }
    });
    return filled;
}

function fillDropdowns() {
    let filled = false;
    document.querySelectorAll('select').forEach(select => {
        if (select.selectedIndex <= 0 && select.options.length > 1) {
            select.selectedIndex = 1;
            select.dispatchEvent(new Event('change', { bubbles: true }));
            filled = true;
        }
    });
    return filled;
}

function clickNext() {
    const selectors = [
        'button[id*="forward"]',
        'button[id*="next"]',
        '[class*="next"]',
        '[class*="forward"]',
        'button[type="submit"]',
        'input[type="submit"]'
    ];
    for (const selector of selectors) {
        try {
            const btn = document.querySelector(selector);
            if (btn && btn.offsetParent !== null) {
                btn.click();
                return true;
            }
        } catch (e) {}
    }

    for (const btn of document.querySelectorAll('button, input[type="submit"], [role="button"]')) {
        const text = (btn.textContent || btn.value || '').toLowerCase();
        if (text.includes('suivant') || text.includes('next') || text.includes('continuer')) {
            btn.click();
            return true;
        }
    }
    return false;
}

async function autoFill() {
    console.log('Remplissage automatique...');
    let attempts = 0;
    const maxAttempts = 50;

    while (attempts < maxAttempts) {
        attempts++;
        console.log('Page ' + attempts);

        await sleep(CONFIG.delay);

        const didFill = [fillRadioButtons(), fillScaleButtons(), fillTextFields(),
            fillCheckboxes(), fillDropdowns()].some(Boolean);

        await sleep(CONFIG.delay);

        if (document.querySelectorAll('[class*="complete"], [class*="success"], [class*="thank"]').length > 0) {
            console.log('Questionnaire termine');
            break;
        }

        if (CONFIG.autoNext) {
            if (clickNext()) {
                await sleep(CONFIG.delay * 2);
            } else if (!didFill) {
                console.log('Aucune action possible');
                break;
            }
        } else {
            break;
        }
    }
}

autoFill();
})();"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ScriptConfig {
        ScriptConfig {
            age: "3".to_string(),
            rating_mode: RatingMode::High,
            default_text: "Tres bien".to_string(),
            delay_ms: 800,
            auto_next: true,
        }
    }

    #[test]
    fn escapes_quotes_and_newlines() {
        assert_eq!(escape_single_quoted("d'accord\nmerci"), "d\\'accord\\nmerci");
        assert_eq!(escape_single_quoted("rien"), "rien");
    }

    #[test]
    fn interpolates_config_literals() {
        let script = emit_bookmarklet(&config());
        assert!(script.contains("ratingMode: 'high'"));
        assert!(script.contains("defaultText: 'Tres bien'"));
        assert!(script.contains("delay: 800"));
        assert!(script.contains("autoNext: true"));
        assert!(script.contains("maxAttempts = 50"));
    }

    #[test]
    fn free_text_cannot_break_the_literal() {
        let mut cfg = config();
        cfg.default_text = "c'est\nbon".to_string();
        let script = emit_bookmarklet(&cfg);
        assert!(script.contains(r"defaultText: 'c\'est\nbon'"));
        assert!(!script.contains("c'est\nbon"));
    }

    #[test]
    fn script_config_borrows_the_relevant_run_config_fields() {
        use crate::config::RunConfig;
        use chrono::NaiveDate;

        let mut run = RunConfig::rolling_window(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
        run.age = Some("3".to_string());
        run.default_text = "RAS".to_string();
        let cfg = ScriptConfig::from(&run);
        assert_eq!(cfg.age, "3");
        assert_eq!(cfg.default_text, "RAS");
        assert_eq!(cfg.delay_ms, 1000);
        assert!(cfg.auto_next);
    }

    #[test]
    fn minified_script_is_one_line() {
        let script = minify(&emit_bookmarklet(&config()));
        assert!(!script.contains('\n'));
        assert!(script.starts_with("(function(){"));
    }
}
