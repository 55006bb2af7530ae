#![allow(dead_code)]

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use macroarc::{
    Actuator, ActuatorError, ActionKind, Collaborators, Engine, MacroSequence, MacroStore,
    MemoryMacroStore, MemorySettingsStore, MouseButton, Notification, NotificationSink, Settings,
    VirtualScheduler,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    MoveTo(i32, i32),
    Click(MouseButton),
    KeyDown(String),
    KeyUp(String),
    KeyTap(String),
}

/// Actuator that records every call with the virtual time it happened at.
pub struct FakeActuator {
    clock: Arc<VirtualScheduler>,
    calls: Mutex<Vec<(Duration, Call)>>,
    fail_clicks: AtomicBool,
    failing_key: Mutex<Option<String>>,
}

impl FakeActuator {
    pub fn new(clock: Arc<VirtualScheduler>) -> Self {
        Self {
            clock,
            calls: Mutex::new(Vec::new()),
            fail_clicks: AtomicBool::new(false),
            failing_key: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().iter().map(|(_, call)| call.clone()).collect()
    }

    pub fn timed_calls(&self) -> Vec<(Duration, Call)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn click_times(&self) -> Vec<Duration> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, call)| matches!(call, Call::Click(_)))
            .map(|(at, _)| *at)
            .collect()
    }

    pub fn fail_clicks(&self, fail: bool) {
        self.fail_clicks.store(fail, Ordering::SeqCst);
    }

    pub fn fail_key(&self, key: &str) {
        *self.failing_key.lock().unwrap() = Some(key.to_string());
    }

    fn push(&self, call: Call) {
        let now = self.clock.now();
        self.calls.lock().unwrap().push((now, call));
    }

    fn check_key(&self, key: &str) -> Result<(), ActuatorError> {
        match self.failing_key.lock().unwrap().as_deref() {
            Some(failing) if failing == key => Err(ActuatorError::UnknownKey(key.to_string())),
            _ => Ok(()),
        }
    }
}

impl Actuator for FakeActuator {
    fn move_to(&self, x: i32, y: i32) -> Result<(), ActuatorError> {
        self.push(Call::MoveTo(x, y));
        Ok(())
    }

    fn click(&self, button: MouseButton) -> Result<(), ActuatorError> {
        if self.fail_clicks.load(Ordering::SeqCst) {
            return Err(ActuatorError::Disconnected);
        }
        self.push(Call::Click(button));
        Ok(())
    }

    fn key_down(&self, key: &str) -> Result<(), ActuatorError> {
        self.check_key(key)?;
        self.push(Call::KeyDown(key.to_string()));
        Ok(())
    }

    fn key_up(&self, key: &str) -> Result<(), ActuatorError> {
        self.check_key(key)?;
        self.push(Call::KeyUp(key.to_string()));
        Ok(())
    }

    fn key_tap(&self, key: &str) -> Result<(), ActuatorError> {
        self.check_key(key)?;
        self.push(Call::KeyTap(key.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<Notification> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, predicate: impl Fn(&Notification) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|event| predicate(event)).count()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notification: Notification) {
        self.events.lock().unwrap().push(notification);
    }
}

pub struct Harness {
    pub engine: Engine,
    pub clock: Arc<VirtualScheduler>,
    pub actuator: Arc<FakeActuator>,
    pub sink: Arc<RecordingSink>,
    pub macros: Arc<MemoryMacroStore>,
}

impl Harness {
    pub fn new(settings: Settings) -> Self {
        let clock = Arc::new(VirtualScheduler::new());
        let actuator = Arc::new(FakeActuator::new(clock.clone()));
        let sink = Arc::new(RecordingSink::default());
        let macros = Arc::new(MemoryMacroStore::new());

        let engine = Engine::new(Collaborators {
            actuator: actuator.clone(),
            scheduler: clock.clone(),
            notifier: sink.clone(),
            settings: Arc::new(MemorySettingsStore::new(settings)),
            macros: macros.clone(),
        });

        Self {
            engine,
            clock,
            actuator,
            sink,
            macros,
        }
    }

    pub fn advance_ms(&self, ms: u64) {
        self.clock.advance(Duration::from_millis(ms));
    }

    pub fn stored_macro(&self) -> Option<MacroSequence> {
        self.macros.load()
    }
}

pub fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

pub fn taps(keys: &[&str]) -> MacroSequence {
    MacroSequence::from_kinds(keys.iter().map(|key| ActionKind::KeyTap {
        key: key.to_string(),
    }))
}
