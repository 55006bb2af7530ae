use std::path::Path;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, EngineError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HotkeyMode {
    #[default]
    Hold,
    Toggle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Milliseconds between auto-clicks.
    pub auto_clicker_speed: u64,
    /// Physical key watched by the hotkey button controller.
    pub hotkey_button: String,
    /// Synthetic key held by the controller; `hotkey_button` when unset.
    pub hotkey_output: Option<String>,
    pub hotkey_mode: HotkeyMode,
    /// Playback speed multiplier, 1.0 = one action every 100ms.
    pub macro_speed: f64,
    /// Repetitions per playback, -1 repeats until stopped.
    pub macro_repeat: i64,
    pub auto_clicker_hotkey: String,
    pub record_hotkey: String,
    pub playback_hotkey: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_clicker_speed: 100,
            hotkey_button: "F6".into(),
            hotkey_output: None,
            hotkey_mode: HotkeyMode::Hold,
            macro_speed: 1.0,
            macro_repeat: 1,
            auto_clicker_hotkey: "F8".into(),
            record_hotkey: "F9".into(),
            playback_hotkey: "F10".into(),
        }
    }
}

/// The part of the settings the hotkey controller depends on. A change in
/// any field forces a held key to be released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotkeyBinding {
    pub trigger: String,
    pub output: String,
    pub mode: HotkeyMode,
}

impl Settings {
    /// Reads settings from a JSON file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let settings = match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str::<Settings>(&raw)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::info!("no settings at {}, using defaults", path.display());
                Settings::default()
            }
            Err(err) => return Err(err.into()),
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.auto_clicker_speed == 0 {
            return Err(EngineError::InvalidArgument(
                "autoClickerSpeed must be positive".into(),
            ));
        }
        if !(self.macro_speed.is_finite() && self.macro_speed > 0.0) {
            return Err(EngineError::InvalidArgument(format!(
                "macroSpeed must be a positive number, got {}",
                self.macro_speed
            )));
        }
        if self.macro_repeat < -1 {
            return Err(EngineError::InvalidArgument(format!(
                "macroRepeat must be -1 or greater, got {}",
                self.macro_repeat
            )));
        }
        Ok(())
    }

    pub fn hotkey_binding(&self) -> HotkeyBinding {
        HotkeyBinding {
            trigger: self.hotkey_button.clone(),
            output: self
                .hotkey_output
                .clone()
                .unwrap_or_else(|| self.hotkey_button.clone()),
            mode: self.hotkey_mode,
        }
    }
}

/// Owner of the current settings. The engine only reads through it, apart
/// from passing host saves along.
pub trait SettingsStore: Send + Sync {
    fn get(&self) -> Settings;
    fn save(&self, settings: Settings);
}

#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    current: RwLock<Settings>,
}

impl MemorySettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            current: RwLock::new(settings),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self) -> Settings {
        self.current.read().clone()
    }

    fn save(&self, settings: Settings) {
        *self.current.write() = settings;
    }
}
