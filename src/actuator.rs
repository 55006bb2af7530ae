use std::{
    sync::mpsc::{self, Sender},
    thread,
};

use enigo::{Enigo, Key, KeyboardControllable, MouseButton as EnigoMouseButton, MouseControllable};
use parking_lot::Mutex;

use crate::{
    error::ActuatorError,
    types::{primary_key, MouseButton},
};

/// Performs synthetic input on the OS. Implementations must be callable
/// from any timer thread.
pub trait Actuator: Send + Sync {
    fn move_to(&self, x: i32, y: i32) -> Result<(), ActuatorError>;
    fn click(&self, button: MouseButton) -> Result<(), ActuatorError>;
    fn key_down(&self, key: &str) -> Result<(), ActuatorError>;
    fn key_up(&self, key: &str) -> Result<(), ActuatorError>;
    fn key_tap(&self, key: &str) -> Result<(), ActuatorError>;
}

enum InputCommand {
    MoveTo(i32, i32),
    Click(EnigoMouseButton),
    KeyDown(Key),
    KeyUp(Key),
    Chord { modifiers: Vec<Key>, key: Key },
    Type(String),
}

/// Actuator backed by enigo. The enigo handle is not `Send`, so it lives on
/// a dedicated worker thread fed through a channel.
pub struct EnigoActuator {
    commands: Mutex<Sender<InputCommand>>,
}

impl EnigoActuator {
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel::<InputCommand>();

        thread::spawn(move || {
            let mut enigo = Enigo::new();
            for command in rx {
                apply_command(&mut enigo, command);
            }
            log::debug!("input worker exiting");
        });

        Self {
            commands: Mutex::new(tx),
        }
    }

    fn send(&self, command: InputCommand) -> Result<(), ActuatorError> {
        self.commands
            .lock()
            .send(command)
            .map_err(|_| ActuatorError::Disconnected)
    }
}

impl Actuator for EnigoActuator {
    fn move_to(&self, x: i32, y: i32) -> Result<(), ActuatorError> {
        self.send(InputCommand::MoveTo(x, y))
    }

    fn click(&self, button: MouseButton) -> Result<(), ActuatorError> {
        self.send(InputCommand::Click(to_enigo_button(button)))
    }

    fn key_down(&self, key: &str) -> Result<(), ActuatorError> {
        let key = label_to_enigo_key(key).ok_or_else(|| ActuatorError::UnknownKey(key.into()))?;
        self.send(InputCommand::KeyDown(key))
    }

    fn key_up(&self, key: &str) -> Result<(), ActuatorError> {
        let key = label_to_enigo_key(key).ok_or_else(|| ActuatorError::UnknownKey(key.into()))?;
        self.send(InputCommand::KeyUp(key))
    }

    fn key_tap(&self, label: &str) -> Result<(), ActuatorError> {
        if let Some((modifiers, key)) = parse_chord(label) {
            return self.send(InputCommand::Chord { modifiers, key });
        }

        let fallback = primary_key(label);
        if fallback.is_empty() {
            return Err(ActuatorError::UnknownKey(label.into()));
        }
        self.send(InputCommand::Type(fallback.to_string()))
    }
}

fn apply_command(enigo: &mut Enigo, command: InputCommand) {
    match command {
        InputCommand::MoveTo(x, y) => enigo.mouse_move_to(x, y),
        InputCommand::Click(button) => enigo.mouse_click(button),
        InputCommand::KeyDown(key) => enigo.key_down(key),
        InputCommand::KeyUp(key) => enigo.key_up(key),
        InputCommand::Chord { modifiers, key } => {
            for modifier in &modifiers {
                enigo.key_down(*modifier);
            }
            enigo.key_click(key);
            for modifier in modifiers.iter().rev() {
                enigo.key_up(*modifier);
            }
        }
        InputCommand::Type(text) => enigo.key_sequence(&text),
    }
}

fn to_enigo_button(button: MouseButton) -> EnigoMouseButton {
    match button {
        MouseButton::Left => EnigoMouseButton::Left,
        MouseButton::Right => EnigoMouseButton::Right,
        MouseButton::Middle => EnigoMouseButton::Middle,
    }
}

/// Splits a combo label such as `Ctrl+Shift+A` into modifier keys and the
/// primary key. Returns `None` when any part is unknown.
pub(crate) fn parse_chord(label: &str) -> Option<(Vec<Key>, Key)> {
    let mut parts: Vec<&str> = label.split('+').map(str::trim).collect();
    let primary = parts.pop()?;
    let key = label_to_enigo_key(primary)?;
    let modifiers = parts
        .into_iter()
        .map(modifier_key)
        .collect::<Option<Vec<_>>>()?;
    Some((modifiers, key))
}

fn modifier_key(segment: &str) -> Option<Key> {
    match segment.to_lowercase().as_str() {
        "shift" => Some(Key::Shift),
        "ctrl" | "control" => Some(Key::Control),
        "alt" | "altgr" => Some(Key::Alt),
        "meta" | "command" | "cmd" | "super" => Some(Key::Meta),
        _ => None,
    }
}

/// Maps a key label (as produced by the listener or typed into settings)
/// to an enigo key. Combo labels resolve to their last segment.
pub(crate) fn label_to_enigo_key(label: &str) -> Option<Key> {
    let segment = primary_key(label);
    if segment.is_empty() {
        return None;
    }

    let normalized = segment.to_lowercase();
    let key = match normalized.as_str() {
        "enter" | "return" => Some(Key::Return),
        "tab" => Some(Key::Tab),
        "space" => Some(Key::Space),
        "backspace" => Some(Key::Backspace),
        "escape" | "esc" => Some(Key::Escape),
        "capslock" => Some(Key::CapsLock),
        "home" => Some(Key::Home),
        "end" => Some(Key::End),
        "pageup" => Some(Key::PageUp),
        "pagedown" => Some(Key::PageDown),
        #[cfg(not(target_os = "macos"))]
        "insert" => Some(Key::Insert),
        "delete" => Some(Key::Delete),
        "up" | "uparrow" => Some(Key::UpArrow),
        "down" | "downarrow" => Some(Key::DownArrow),
        "left" | "leftarrow" => Some(Key::LeftArrow),
        "right" | "rightarrow" => Some(Key::RightArrow),
        "f1" => Some(Key::F1),
        "f2" => Some(Key::F2),
        "f3" => Some(Key::F3),
        "f4" => Some(Key::F4),
        "f5" => Some(Key::F5),
        "f6" => Some(Key::F6),
        "f7" => Some(Key::F7),
        "f8" => Some(Key::F8),
        "f9" => Some(Key::F9),
        "f10" => Some(Key::F10),
        "f11" => Some(Key::F11),
        "f12" => Some(Key::F12),
        _ => modifier_key(&normalized),
    };

    if key.is_some() {
        return key;
    }

    if let Some(stripped) = normalized.strip_prefix("numpad") {
        let symbol = match stripped {
            "" => None,
            "plus" => Some('+'),
            "minus" => Some('-'),
            "multiply" => Some('*'),
            "divide" => Some('/'),
            digit if digit.len() == 1 => digit.chars().next(),
            _ => None,
        };
        return symbol.map(Key::Layout);
    }

    let mut chars = segment.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => Some(Key::Layout(ch.to_ascii_lowercase())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_keys_are_case_insensitive() {
        assert_eq!(label_to_enigo_key("F6"), Some(Key::F6));
        assert_eq!(label_to_enigo_key("esc"), Some(Key::Escape));
        assert_eq!(label_to_enigo_key("Enter"), Some(Key::Return));
        assert_eq!(label_to_enigo_key("Shift"), Some(Key::Shift));
    }

    #[test]
    fn single_characters_map_to_layout_keys() {
        assert_eq!(label_to_enigo_key("A"), Some(Key::Layout('a')));
        assert_eq!(label_to_enigo_key("-"), Some(Key::Layout('-')));
        assert_eq!(label_to_enigo_key("NumPad7"), Some(Key::Layout('7')));
        assert_eq!(label_to_enigo_key("NumPadPlus"), Some(Key::Layout('+')));
    }

    #[test]
    fn unknown_words_do_not_map() {
        assert_eq!(label_to_enigo_key("Hyper"), None);
        assert_eq!(label_to_enigo_key(""), None);
    }

    #[test]
    fn combo_labels_split_into_modifiers_and_key() {
        assert_eq!(
            parse_chord("Ctrl+Shift+T"),
            Some((vec![Key::Control, Key::Shift], Key::Layout('t')))
        );
        assert_eq!(parse_chord("Space"), Some((vec![], Key::Space)));
        assert_eq!(parse_chord("Hyper+T"), None);
    }
}
