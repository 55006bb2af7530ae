use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use parking_lot::Mutex;

use crate::{
    actuator::Actuator,
    autoclicker::AutoClicker,
    dispatch::{dispatch, DispatchSnapshot, EngineCommand},
    error::EngineError,
    hotkey::{HotkeyButtonController, KeyOutput},
    macro_player::MacroPlayer,
    notify::NotificationSink,
    recorder::MacroRecorder,
    scheduler::Scheduler,
    settings::{Settings, SettingsStore},
    store::MacroStore,
    types::{ActionKind, EngineStatus, InputEvent, MacroSequence},
};

/// Services the engine talks to.
pub struct Collaborators {
    pub actuator: Arc<dyn Actuator>,
    pub scheduler: Arc<dyn Scheduler>,
    pub notifier: Arc<dyn NotificationSink>,
    pub settings: Arc<dyn SettingsStore>,
    pub macros: Arc<dyn MacroStore>,
}

/// Owns the automation components and the shared state between them.
/// One engine lives for the lifetime of the host application.
pub struct Engine {
    settings: Arc<dyn SettingsStore>,
    actuator: Arc<dyn Actuator>,
    macros: Arc<dyn MacroStore>,
    alive: Arc<AtomicBool>,
    auto_clicker: AutoClicker,
    recorder: MacroRecorder,
    player: MacroPlayer,
    hotkey: Mutex<HotkeyButtonController>,
}

impl Engine {
    pub fn new(collaborators: Collaborators) -> Self {
        let Collaborators {
            actuator,
            scheduler,
            notifier,
            settings,
            macros,
        } = collaborators;
        let alive = Arc::new(AtomicBool::new(true));

        Self {
            auto_clicker: AutoClicker::new(
                scheduler.clone(),
                actuator.clone(),
                notifier.clone(),
                alive.clone(),
            ),
            recorder: MacroRecorder::new(macros.clone(), notifier.clone()),
            player: MacroPlayer::new(scheduler, actuator.clone(), notifier, alive.clone()),
            hotkey: Mutex::new(HotkeyButtonController::default()),
            settings,
            actuator,
            macros,
            alive,
        }
    }

    pub fn settings(&self) -> Settings {
        self.settings.get()
    }

    /// Stores new settings. A held hotkey is released first when its key or
    /// mode changes, so no synthetic key stays stuck down.
    pub fn save_settings(&self, settings: Settings) -> Result<(), EngineError> {
        settings.validate()?;
        let previous = self.settings.get();

        let output = {
            let mut hotkey = self.hotkey.lock();
            let (next, output) =
                hotkey.on_rebind(&previous.hotkey_binding(), &settings.hotkey_binding());
            *hotkey = next;
            self.settings.save(settings);
            output
        };

        if let Some(output) = output {
            log::info!("hotkey binding changed while held, releasing");
            self.emit_key(output)?;
        }
        Ok(())
    }

    pub fn start_auto_clicker(&self, speed_ms: u64) -> Result<(), EngineError> {
        self.auto_clicker.start(speed_ms)
    }

    pub fn stop_auto_clicker(&self) -> Result<(), EngineError> {
        self.auto_clicker.stop()
    }

    /// Flips the auto-clicker using the configured speed.
    pub fn toggle_auto_clicker(&self) -> Result<bool, EngineError> {
        self.auto_clicker.toggle(self.settings.get().auto_clicker_speed)
    }

    pub fn start_macro_recording(&self) {
        self.recorder.start_recording();
    }

    pub fn record_action(&self, kind: ActionKind) {
        self.recorder.record_action(kind);
    }

    pub fn stop_macro_recording(&self) -> MacroSequence {
        self.recorder.stop_recording()
    }

    pub fn play_macro(
        &self,
        sequence: &MacroSequence,
        speed: f64,
        times: i64,
    ) -> Result<(), EngineError> {
        self.player.play(sequence, speed, times)
    }

    pub fn stop_macro(&self) -> Result<(), EngineError> {
        self.player.stop()
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            recording: self.recorder.is_recording(),
            buffered_actions: self.recorder.buffered_actions(),
            auto_clicker_running: self.auto_clicker.is_active(),
            playing: self.player.is_playing(),
            hotkey_held: self.hotkey.lock().is_held(),
        }
    }

    /// Entry point for the key/pointer listener.
    pub fn handle_event(&self, event: &InputEvent) -> Result<(), EngineError> {
        let settings = self.settings.get();

        let commands = {
            let mut hotkey = self.hotkey.lock();
            let snapshot = DispatchSnapshot {
                recording: self.recorder.is_recording(),
                playing: self.player.is_playing(),
                hotkey: hotkey.clone(),
            };
            let routed = dispatch(&snapshot, &settings, event);
            *hotkey = routed.hotkey;
            routed.commands
        };

        for command in commands {
            self.apply(command, &settings)?;
        }
        Ok(())
    }

    fn apply(&self, command: EngineCommand, settings: &Settings) -> Result<(), EngineError> {
        match command {
            EngineCommand::ToggleAutoClicker => {
                self.auto_clicker.toggle(settings.auto_clicker_speed)?;
            }
            EngineCommand::StartRecording => self.recorder.start_recording(),
            EngineCommand::StopRecording => {
                self.recorder.stop_recording();
            }
            EngineCommand::StartPlayback => match self.macros.load() {
                Some(sequence) => {
                    self.player
                        .play(&sequence, settings.macro_speed, settings.macro_repeat)?
                }
                None => log::info!("no recorded macro to play"),
            },
            EngineCommand::StopPlayback => self.player.stop()?,
            EngineCommand::PressKey(key) => self.emit_key(KeyOutput::Press(key))?,
            EngineCommand::ReleaseKey(key) => self.emit_key(KeyOutput::Release(key))?,
            EngineCommand::Record(kind) => self.recorder.record_action(kind),
        }
        Ok(())
    }

    fn emit_key(&self, output: KeyOutput) -> Result<(), EngineError> {
        match output {
            KeyOutput::Press(key) => self.actuator.key_down(&key)?,
            KeyOutput::Release(key) => self.actuator.key_up(&key)?,
        }
        Ok(())
    }

    /// Stops all activity and drops callbacks that are still queued.
    pub fn shutdown(&self) {
        if !self.alive.swap(false, Ordering::Relaxed) {
            return;
        }
        log::info!("engine shutting down");

        // both stops are infallible
        let _ = self.auto_clicker.stop();
        let _ = self.player.stop();

        let held = std::mem::take(&mut *self.hotkey.lock());
        if let Some(key) = held.held_key() {
            if let Err(err) = self.actuator.key_up(key) {
                log::warn!("failed to release {key} on shutdown: {err}");
            }
        }
    }
}
