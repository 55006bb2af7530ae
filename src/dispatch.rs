//! Routing of raw input events to engine commands.
//!
//! `dispatch` is pure: it looks at a snapshot of the engine, the current
//! settings and one event, and returns the hotkey controller's next state
//! plus the commands the engine should carry out.

use crate::{
    hotkey::{HotkeyButtonController, KeyOutput},
    settings::Settings,
    types::{is_modifier_label, primary_key, ActionKind, InputEvent, KeyTransition},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSnapshot {
    pub recording: bool,
    pub playing: bool,
    pub hotkey: HotkeyButtonController,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    ToggleAutoClicker,
    StartRecording,
    StopRecording,
    StartPlayback,
    StopPlayback,
    PressKey(String),
    ReleaseKey(String),
    Record(ActionKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub hotkey: HotkeyButtonController,
    pub commands: Vec<EngineCommand>,
}

/// Compares a pressed label against a bound hotkey. A plain hotkey also
/// matches while modifiers are held.
fn same_key(label: &str, hotkey: &str) -> bool {
    let hotkey = hotkey.trim();
    label.eq_ignore_ascii_case(hotkey) || primary_key(label).eq_ignore_ascii_case(hotkey)
}

pub fn dispatch(snapshot: &DispatchSnapshot, settings: &Settings, event: &InputEvent) -> Dispatch {
    let unchanged = |commands| Dispatch {
        hotkey: snapshot.hotkey.clone(),
        commands,
    };

    let (key, transition) = match event {
        InputEvent::Key { key, transition } => (key.as_str(), *transition),
        InputEvent::Click { x, y, button } => {
            let commands = if snapshot.recording {
                vec![EngineCommand::Record(ActionKind::Click {
                    x: *x,
                    y: *y,
                    button: *button,
                })]
            } else {
                Vec::new()
            };
            return unchanged(commands);
        }
    };

    let is_down = transition == KeyTransition::Down;

    if same_key(key, &settings.auto_clicker_hotkey) {
        let commands = if is_down {
            vec![EngineCommand::ToggleAutoClicker]
        } else {
            Vec::new()
        };
        return unchanged(commands);
    }

    if same_key(key, &settings.record_hotkey) {
        let commands = match (is_down, snapshot.recording) {
            (true, true) => vec![EngineCommand::StopRecording],
            (true, false) => vec![EngineCommand::StartRecording],
            (false, _) => Vec::new(),
        };
        return unchanged(commands);
    }

    if same_key(key, &settings.playback_hotkey) {
        let commands = match (is_down, snapshot.playing) {
            (true, true) => vec![EngineCommand::StopPlayback],
            (true, false) => vec![EngineCommand::StartPlayback],
            (false, _) => Vec::new(),
        };
        return unchanged(commands);
    }

    if same_key(key, &settings.hotkey_button) {
        let binding = settings.hotkey_binding();
        let (hotkey, output) = snapshot.hotkey.on_transition(&binding, transition);
        let commands = match output {
            Some(KeyOutput::Press(key)) => vec![EngineCommand::PressKey(key)],
            Some(KeyOutput::Release(key)) => vec![EngineCommand::ReleaseKey(key)],
            None => Vec::new(),
        };
        return Dispatch { hotkey, commands };
    }

    // modifiers are recorded as part of the combo that follows them
    let commands = if snapshot.recording && is_down && !is_modifier_label(primary_key(key)) {
        vec![EngineCommand::Record(ActionKind::KeyTap { key: key.to_string() })]
    } else {
        Vec::new()
    };
    unchanged(commands)
}
