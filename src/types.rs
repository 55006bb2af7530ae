use std::ops::Deref;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ActionKind {
    Click {
        x: i32,
        y: i32,
        #[serde(default)]
        button: MouseButton,
    },
    KeyTap {
        key: String,
    },
}

/// One recorded input event. `offset_index` is the action's slot in its
/// sequence and determines when it fires during playback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub offset_index: usize,
    #[serde(flatten)]
    pub kind: ActionKind,
}

/// A frozen, ordered list of actions. Insertion order is playback order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MacroSequence {
    actions: Vec<Action>,
}

impl MacroSequence {
    pub fn new(actions: Vec<Action>) -> Self {
        Self { actions }
    }

    /// Builds a sequence from bare kinds, numbering them in order.
    pub fn from_kinds<I>(kinds: I) -> Self
    where
        I: IntoIterator<Item = ActionKind>,
    {
        let actions = kinds
            .into_iter()
            .enumerate()
            .map(|(offset_index, kind)| Action { offset_index, kind })
            .collect();
        Self { actions }
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }
}

impl Deref for MacroSequence {
    type Target = [Action];

    fn deref(&self) -> &[Action] {
        &self.actions
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyTransition {
    Down,
    Up,
}

/// Raw input delivered by the key/pointer listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum InputEvent {
    Key {
        key: String,
        transition: KeyTransition,
    },
    Click {
        x: i32,
        y: i32,
        button: MouseButton,
    },
}

impl InputEvent {
    pub fn key_down(key: impl Into<String>) -> Self {
        Self::Key {
            key: key.into(),
            transition: KeyTransition::Down,
        }
    }

    pub fn key_up(key: impl Into<String>) -> Self {
        Self::Key {
            key: key.into(),
            transition: KeyTransition::Up,
        }
    }
}

/// Last segment of a combo label: `Ctrl+Shift+T` -> `T`.
pub fn primary_key(label: &str) -> &str {
    label
        .rsplit('+')
        .next()
        .map(str::trim)
        .unwrap_or_else(|| label.trim())
}

/// Whether a key label names a modifier on its own.
pub fn is_modifier_label(label: &str) -> bool {
    matches!(
        label.trim().to_lowercase().as_str(),
        "ctrl" | "control" | "shift" | "alt" | "altgr" | "meta" | "command" | "cmd" | "super"
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum Notification {
    #[serde(rename_all = "camelCase")]
    AutoClickerStarted { interval_ms: u64 },
    AutoClickerStopped,
    MacroRecordingToggled { recording: bool },
    MacroPlayed {
        sequence: MacroSequence,
        speed: f64,
        times: i64,
    },
    MacroFinished,
    MacroStopped,
    ActuatorFailure { message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub recording: bool,
    pub buffered_actions: usize,
    pub auto_clicker_running: bool,
    pub playing: bool,
    pub hotkey_held: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_without_button_defaults_to_left() {
        let action: Action =
            serde_json::from_str(r#"{"offsetIndex":3,"type":"click","x":10,"y":-4}"#).unwrap();
        assert_eq!(
            action,
            Action {
                offset_index: 3,
                kind: ActionKind::Click {
                    x: 10,
                    y: -4,
                    button: MouseButton::Left,
                },
            }
        );
    }

    #[test]
    fn sequence_serializes_as_plain_array() {
        let sequence = MacroSequence::from_kinds([
            ActionKind::Click {
                x: 5,
                y: 6,
                button: MouseButton::Right,
            },
            ActionKind::KeyTap { key: "Ctrl+A".into() },
        ]);

        let json = serde_json::to_value(&sequence).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"offsetIndex": 0, "type": "click", "x": 5, "y": 6, "button": "right"},
                {"offsetIndex": 1, "type": "key-tap", "key": "Ctrl+A"},
            ])
        );

        let back: MacroSequence = serde_json::from_value(json).unwrap();
        assert_eq!(back, sequence);
    }

    #[test]
    fn combo_labels_split_into_primary_and_modifiers() {
        assert_eq!(primary_key("Ctrl+Shift+T"), "T");
        assert_eq!(primary_key("F8"), "F8");
        assert!(is_modifier_label("Ctrl"));
        assert!(is_modifier_label("shift"));
        assert!(!is_modifier_label("Ctrl+C"));
        assert!(!is_modifier_label("C"));
    }

    #[test]
    fn notification_is_tagged_by_event_name() {
        let json = serde_json::to_value(Notification::AutoClickerStarted { interval_ms: 50 }).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"event": "auto-clicker-started", "intervalMs": 50})
        );
    }
}
