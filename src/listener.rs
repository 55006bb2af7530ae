use std::sync::Arc;

use rdev::{Button as RdevButton, Event as RdevEvent, EventType, Key as RdevKey};

use crate::{
    engine::Engine,
    types::{InputEvent, MouseButton},
};

/// Modifier keys currently held, used to label combos such as `Ctrl+C`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct ModifierState {
    ctrl: bool,
    shift: bool,
    alt: bool,
    meta: bool,
}

impl ModifierState {
    fn update(&mut self, key: RdevKey, pressed: bool) {
        match key {
            RdevKey::ControlLeft | RdevKey::ControlRight => self.ctrl = pressed,
            RdevKey::ShiftLeft | RdevKey::ShiftRight => self.shift = pressed,
            RdevKey::Alt | RdevKey::AltGr => self.alt = pressed,
            RdevKey::MetaLeft | RdevKey::MetaRight => self.meta = pressed,
            _ => {}
        }
    }

    fn describe_combo(&self, key: RdevKey) -> String {
        let mut parts: Vec<String> = Vec::new();
        let held = [
            (self.ctrl, "Ctrl", matches!(key, RdevKey::ControlLeft | RdevKey::ControlRight)),
            (self.shift, "Shift", matches!(key, RdevKey::ShiftLeft | RdevKey::ShiftRight)),
            (self.alt, "Alt", matches!(key, RdevKey::Alt | RdevKey::AltGr)),
            (self.meta, "Meta", matches!(key, RdevKey::MetaLeft | RdevKey::MetaRight)),
        ];
        for (down, label, is_self) in held {
            if down && !is_self {
                parts.push(label.to_string());
            }
        }
        parts.push(friendly_key_name(key));
        parts.join("+")
    }
}

/// Turns global rdev events into engine input events.
///
/// Auto-repeated key presses are collapsed so a held key produces a single
/// down transition, held modifiers are folded into the label of the key
/// pressed with them, and the last pointer position is tracked so clicks
/// carry coordinates.
#[derive(Debug, Default)]
pub struct InputTranslator {
    pressed: Vec<RdevKey>,
    modifiers: ModifierState,
    pointer: (i32, i32),
}

impl InputTranslator {
    pub fn translate(&mut self, event_type: &EventType) -> Option<InputEvent> {
        match *event_type {
            EventType::KeyPress(key) => {
                if self.pressed.contains(&key) {
                    return None;
                }
                self.pressed.push(key);
                self.modifiers.update(key, true);
                Some(InputEvent::key_down(self.modifiers.describe_combo(key)))
            }
            EventType::KeyRelease(key) => {
                self.pressed.retain(|held| *held != key);
                let label = self.modifiers.describe_combo(key);
                self.modifiers.update(key, false);
                Some(InputEvent::key_up(label))
            }
            EventType::MouseMove { x, y } => {
                self.pointer = (x as i32, y as i32);
                None
            }
            EventType::ButtonPress(button) => {
                let button = convert_button(button)?;
                let (x, y) = self.pointer;
                Some(InputEvent::Click { x, y, button })
            }
            EventType::ButtonRelease(_) | EventType::Wheel { .. } => None,
        }
    }
}

/// Blocks the calling thread, feeding every global input event to `engine`.
pub fn listen(engine: Arc<Engine>) -> Result<(), rdev::ListenError> {
    let mut translator = InputTranslator::default();
    rdev::listen(move |event: RdevEvent| {
        let Some(input) = translator.translate(&event.event_type) else {
            return;
        };
        if let Err(err) = engine.handle_event(&input) {
            log::warn!("failed to handle {input:?}: {err}");
        }
    })
}

fn convert_button(button: RdevButton) -> Option<MouseButton> {
    match button {
        RdevButton::Left => Some(MouseButton::Left),
        RdevButton::Right => Some(MouseButton::Right),
        RdevButton::Middle => Some(MouseButton::Middle),
        RdevButton::Unknown(_) => None,
    }
}

/// Stable, layout-independent label for a physical key. The labels round
/// trip through the actuator's key parser.
pub fn friendly_key_name(key: RdevKey) -> String {
    match key {
        RdevKey::Backspace => "Backspace".into(),
        RdevKey::Tab => "Tab".into(),
        RdevKey::Return | RdevKey::KpReturn => "Enter".into(),
        RdevKey::Escape => "Esc".into(),
        RdevKey::Space => "Space".into(),
        RdevKey::ControlLeft | RdevKey::ControlRight => "Ctrl".into(),
        RdevKey::ShiftLeft | RdevKey::ShiftRight => "Shift".into(),
        RdevKey::Alt | RdevKey::AltGr => "Alt".into(),
        RdevKey::MetaLeft | RdevKey::MetaRight => "Meta".into(),
        RdevKey::CapsLock => "CapsLock".into(),
        RdevKey::Home => "Home".into(),
        RdevKey::End => "End".into(),
        RdevKey::PageUp => "PageUp".into(),
        RdevKey::PageDown => "PageDown".into(),
        RdevKey::Insert => "Insert".into(),
        RdevKey::Delete | RdevKey::KpDelete => "Delete".into(),
        RdevKey::LeftArrow => "Left".into(),
        RdevKey::RightArrow => "Right".into(),
        RdevKey::UpArrow => "Up".into(),
        RdevKey::DownArrow => "Down".into(),
        RdevKey::KpPlus => "NumPadPlus".into(),
        RdevKey::KpMinus => "NumPadMinus".into(),
        RdevKey::KpMultiply => "NumPadMultiply".into(),
        RdevKey::KpDivide => "NumPadDivide".into(),
        RdevKey::Minus => "-".into(),
        RdevKey::Equal => "=".into(),
        RdevKey::LeftBracket => "[".into(),
        RdevKey::RightBracket => "]".into(),
        RdevKey::SemiColon => ";".into(),
        RdevKey::Quote => "'".into(),
        RdevKey::BackQuote => "`".into(),
        RdevKey::BackSlash => "\\".into(),
        RdevKey::Comma => ",".into(),
        RdevKey::Dot => ".".into(),
        RdevKey::Slash => "/".into(),
        RdevKey::Function => "Fn".into(),
        _ => {
            let raw = format!("{:?}", key);
            if let Some(stripped) = raw.strip_prefix("Key") {
                stripped.to_uppercase()
            } else if let Some(digit) = raw.strip_prefix("Num").filter(|rest| rest.len() == 1) {
                digit.to_string()
            } else if let Some(stripped) = raw.strip_prefix("Kp") {
                format!("NumPad{}", stripped)
            } else {
                raw
            }
        }
    }
}
