//! The contract between the automaton and whatever executes it: a read-only
//! snapshot of the current page plus an element-activation surface.

use serde::Deserialize;

use crate::error::AutomatonError;

/// Read-only view of one page at one instant: lowercased visible text plus
/// interactive elements grouped by role. Recomputed fresh on every loop
/// iteration because the underlying page mutates between iterations; element
/// handles are only meaningful until the next snapshot.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageSnapshot {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub radios: Vec<RadioInput>,
    #[serde(default)]
    pub checkboxes: Vec<CheckInput>,
    #[serde(default)]
    pub fields: Vec<TextInput>,
    #[serde(default)]
    pub selects: Vec<SelectInput>,
    #[serde(default)]
    pub scales: Vec<ScaleChoice>,
    #[serde(default)]
    pub buttons: Vec<ButtonControl>,
    /// Any element whose class mentions complete/success/thank; the
    /// class-based completion signal.
    #[serde(default)]
    pub completion_marker: bool,
}

impl PageSnapshot {
    /// Radios grouped by `name`, first-seen order preserved.
    pub fn radio_groups(&self) -> Vec<(&str, Vec<&RadioInput>)> {
        let mut groups: Vec<(&str, Vec<&RadioInput>)> = Vec::new();
        for radio in &self.radios {
            match groups.iter_mut().find(|(name, _)| *name == radio.name) {
                Some((_, members)) => members.push(radio),
                None => groups.push((radio.name.as_str(), vec![radio])),
            }
        }
        groups
    }

    /// Scale choices grouped by their container, first-seen order preserved.
    pub fn scale_groups(&self) -> Vec<Vec<&ScaleChoice>> {
        let mut groups: Vec<(&str, Vec<&ScaleChoice>)> = Vec::new();
        for choice in &self.scales {
            match groups.iter_mut().find(|(group, _)| *group == choice.group) {
                Some((_, members)) => members.push(choice),
                None => groups.push((choice.group.as_str(), vec![choice])),
            }
        }
        groups.into_iter().map(|(_, members)| members).collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RadioInput {
    pub handle: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
    /// Nearest-ancestor text, lowercased. The target form has no stable
    /// attribute naming, so label association goes through this.
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub checked: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckInput {
    pub handle: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub checked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextKind {
    Date,
    #[default]
    Text,
    Multiline,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextInput {
    pub handle: String,
    #[serde(default)]
    pub kind: TextKind,
    #[serde(default)]
    pub placeholder: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectInput {
    pub handle: String,
    /// -1 when nothing is selected; 0 is usually the placeholder option.
    #[serde(default)]
    pub selected_index: i64,
    #[serde(default)]
    pub option_count: usize,
}

/// One choice inside a scored/smiley widget, best-first in document order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScaleChoice {
    pub handle: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub selected: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ButtonControl {
    pub handle: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub id_attr: String,
    #[serde(default)]
    pub class_attr: String,
    /// Explicit type="submit" attribute, not default button behavior.
    #[serde(default)]
    pub submit: bool,
}

/// What an execution harness must supply. One driver owns one page/session
/// exclusively for the duration of a run.
pub trait PageDriver {
    /// Capture a fresh view of the current page.
    fn snapshot(&mut self) -> Result<PageSnapshot, AutomatonError>;

    /// Perform the native selection action on `handle`, then synthesize the
    /// bubbling `change` and `input` notifications a reactive page listens
    /// for. `Ok(false)` when the element no longer exists.
    fn activate(&mut self, handle: &str) -> Result<bool, AutomatonError>;

    /// Write `value` into a text control, with the same notifications.
    fn fill_text(&mut self, handle: &str, value: &str) -> Result<bool, AutomatonError>;

    /// Move a dropdown to `index` and notify.
    fn select_index(&mut self, handle: &str, index: usize) -> Result<bool, AutomatonError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn radio(handle: &str, name: &str) -> RadioInput {
        RadioInput {
            handle: handle.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn radio_groups_preserve_first_seen_order() {
        let snap = PageSnapshot {
            radios: vec![radio("e0", "b"), radio("e1", "a"), radio("e2", "b")],
            ..Default::default()
        };
        let groups = snap.radio_groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "b");
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].0, "a");
    }

    #[test]
    fn snapshot_parses_from_harness_json() {
        let raw = r#"{
            "text": "quel jour",
            "radios": [{"handle": "e0", "name": "q1", "value": "2", "label": "oui", "checked": false}],
            "fields": [{"handle": "e1", "kind": "date", "placeholder": "jj/mm", "label": "", "value": ""}],
            "selects": [{"handle": "e2", "selected_index": -1, "option_count": 4}],
            "completion_marker": true
        }"#;
        let snap: PageSnapshot = serde_json::from_str(raw).unwrap();
        assert_eq!(snap.radios[0].value, "2");
        assert_eq!(snap.fields[0].kind, TextKind::Date);
        assert_eq!(snap.selects[0].selected_index, -1);
        assert!(snap.completion_marker);
        assert!(snap.buttons.is_empty());
    }
}
