//! Input automation engine: auto-clicker, hold/toggle hotkey button, and
//! macro recording and playback, driven by global hotkeys.
//!
//! The engine never touches the OS directly. It schedules work on a
//! [`Scheduler`], performs input through an [`Actuator`] and reports to a
//! [`NotificationSink`]; the host wires real implementations of these in.

pub mod actuator;
pub mod autoclicker;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod hotkey;
pub mod listener;
pub mod macro_player;
pub mod notify;
pub mod recorder;
pub mod scheduler;
pub mod settings;
pub mod store;
pub mod types;
pub mod virtual_clock;

pub use actuator::{Actuator, EnigoActuator};
pub use autoclicker::AutoClicker;
pub use dispatch::{dispatch, Dispatch, DispatchSnapshot, EngineCommand};
pub use engine::{Collaborators, Engine};
pub use error::{ActuatorError, ConfigError, EngineError};
pub use hotkey::{HotkeyButtonController, KeyOutput};
pub use macro_player::{MacroPlayer, Repeat};
pub use notify::{LogSink, NotificationSink};
pub use recorder::MacroRecorder;
pub use scheduler::{Scheduler, ThreadScheduler, TimerToken};
pub use settings::{HotkeyBinding, HotkeyMode, MemorySettingsStore, Settings, SettingsStore};
pub use store::{MacroStore, MemoryMacroStore};
pub use types::{
    Action, ActionKind, EngineStatus, InputEvent, KeyTransition, MacroSequence, MouseButton,
    Notification,
};
pub use virtual_clock::VirtualScheduler;
