//! Chrome-backed implementation of the automaton's page contract.
//!
//! Every snapshot re-runs an injected script that walks the visible DOM,
//! tags interactive elements with sequential `data-eid` handles and returns
//! the role-grouped JSON the core deserializes. Actions target those handles
//! and synthesize the change/input notifications the survey app listens for.

use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

use headless_chrome::{Browser, LaunchOptions, Tab};
use tracing::debug;

use survey_autofill::error::AutomatonError;
use survey_autofill::page::{PageDriver, PageSnapshot};

const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Script injected on every snapshot. Reads the DOM without touching layout;
/// `data-eid` handles are reassigned each time, so they are only used within
/// the same loop iteration.
const SNAPSHOT_JS: &str = r#"
(() => {
  let id = 0;
  const tag = (el) => {
    const handle = 'e' + (id++);
    el.setAttribute('data-eid', handle);
    return handle;
  };
  const label = (el) => {
    const box = el.closest('div, label, fieldset');
    return ((box && box.innerText) || '').toLowerCase().slice(0, 200);
  };

  const snap = {
    text: (document.body.innerText || '').toLowerCase(),
    radios: [], checkboxes: [], fields: [], selects: [], scales: [], buttons: [],
    completion_marker: false
  };

  document.querySelectorAll('input[type="radio"]').forEach(el => {
    snap.radios.push({
      handle: tag(el),
      name: el.name || '',
      value: el.value || '',
      label: label(el),
      checked: !!el.checked
    });
  });

  document.querySelectorAll('input[type="checkbox"]').forEach(el => {
    snap.checkboxes.push({ handle: tag(el), label: label(el), checked: !!el.checked });
  });

  document.querySelectorAll(
    'textarea, input[type="text"]:not([readonly]), input[type="date"], input[type="number"], input[type="tel"]'
  ).forEach(el => {
    if (el.offsetParent === null) return;
    const kind = el.type === 'date' ? 'date' : (el.tagName === 'TEXTAREA' ? 'multiline' : 'text');
    snap.fields.push({
      handle: tag(el),
      kind,
      placeholder: (el.placeholder || '').toLowerCase(),
      label: label(el),
      value: el.value || ''
    });
  });

  document.querySelectorAll('select').forEach(el => {
    snap.selects.push({ handle: tag(el), selected_index: el.selectedIndex, option_count: el.options.length });
  });

  const seen = new Set();
  document.querySelectorAll(
    '[class*="scale"], [class*="rating"], [class*="nps"], [class*="smiley"], [role="radiogroup"]'
  ).forEach((box, group) => {
    box.querySelectorAll('button, [role="radio"], [data-value], [data-score]').forEach(el => {
      if (seen.has(el)) return;
      seen.add(el);
      const selected = el.classList.contains('selected') || el.getAttribute('aria-checked') === 'true';
      snap.scales.push({ handle: tag(el), group: 'g' + group, selected });
    });
  });

  document.querySelectorAll('button, input[type="submit"], [role="button"]').forEach(el => {
    if (el.offsetParent === null) return;
    snap.buttons.push({
      handle: tag(el),
      text: ((el.innerText || el.value || '') + '').trim().slice(0, 80),
      id_attr: (el.id || '').toLowerCase(),
      class_attr: ((el.className || '') + '').toLowerCase(),
      submit: el.getAttribute('type') === 'submit'
    });
  });

  snap.completion_marker =
    document.querySelectorAll('[class*="complete"], [class*="success"], [class*="thank"]').length > 0;

  return JSON.stringify(snap);
})()
"#;

/// One browser session, owned exclusively by one run. Dropping it closes
/// the session, so no exit path leaks a browser across runs.
pub struct ChromeDriver {
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeDriver {
    pub fn launch(headless: bool) -> Result<Self, AutomatonError> {
        let options = LaunchOptions {
            headless,
            args: vec![
                OsStr::new("--no-first-run"),
                OsStr::new("--no-default-browser-check"),
            ],
            idle_browser_timeout: Duration::from_secs(120),
            ..Default::default()
        };
        let browser = Browser::new(options)?;
        let tab = browser.new_tab()?;
        Ok(Self {
            _browser: browser,
            tab,
        })
    }

    /// Navigate to the survey entry point and wait for the page body.
    pub fn open(&mut self, url: &str) -> Result<(), AutomatonError> {
        debug!("ouverture de {url}");
        self.tab.navigate_to(url)?;
        self.tab
            .wait_for_element_with_custom_timeout("body", NAVIGATION_TIMEOUT)
            .map_err(|e| AutomatonError::NavigationTimeout(format!("{e:#}")))?;
        Ok(())
    }

    fn eval_bool(&self, js: &str) -> Result<bool, AutomatonError> {
        let result = self.tab.evaluate(js, false)?;
        Ok(result.value.and_then(|v| v.as_bool()).unwrap_or(false))
    }
}

impl PageDriver for ChromeDriver {
    fn snapshot(&mut self) -> Result<PageSnapshot, AutomatonError> {
        let result = self.tab.evaluate(SNAPSHOT_JS, false)?;
        let raw = result
            .value
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_default();
        serde_json::from_str(&raw)
            .map_err(|e| AutomatonError::Runtime(format!("instantane illisible: {e}")))
    }

    fn activate(&mut self, handle: &str) -> Result<bool, AutomatonError> {
        let js = format!(
            r#"(() => {{
  const el = document.querySelector('[data-eid="{handle}"]');
  if (!el) return false;
  el.click();
  el.dispatchEvent(new Event('change', {{ bubbles: true }}));
  el.dispatchEvent(new Event('input', {{ bubbles: true }}));
  return true;
}})()"#
        );
        self.eval_bool(&js)
    }

    fn fill_text(&mut self, handle: &str, value: &str) -> Result<bool, AutomatonError> {
        // serde_json produces a double-quoted literal that is also valid JS.
        let quoted = serde_json::to_string(value)
            .map_err(|e| AutomatonError::Runtime(format!("valeur non serialisable: {e}")))?;
        let js = format!(
            r#"(() => {{
  const el = document.querySelector('[data-eid="{handle}"]');
  if (!el) return false;
  el.value = {quoted};
  el.dispatchEvent(new Event('input', {{ bubbles: true }}));
  el.dispatchEvent(new Event('change', {{ bubbles: true }}));
  return true;
}})()"#
        );
        self.eval_bool(&js)
    }

    fn select_index(&mut self, handle: &str, index: usize) -> Result<bool, AutomatonError> {
        let js = format!(
            r#"(() => {{
  const el = document.querySelector('[data-eid="{handle}"]');
  if (!el || el.options.length <= {index}) return false;
  el.selectedIndex = {index};
  el.dispatchEvent(new Event('change', {{ bubbles: true }}));
  return true;
}})()"#
        );
        self.eval_bool(&js)
    }
}
