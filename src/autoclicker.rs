use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use parking_lot::Mutex;

use crate::{
    actuator::Actuator,
    error::EngineError,
    notify::NotificationSink,
    scheduler::{Scheduler, TimerToken},
    types::{MouseButton, Notification},
};

#[derive(Default)]
pub struct AutoClickerState {
    pub(crate) active: Option<ActiveClicker>,
}

pub(crate) struct ActiveClicker {
    token: TimerToken,
    stop_flag: Arc<AtomicBool>,
    interval_ms: u64,
}

/// Repeating left click at the pointer's current position.
pub struct AutoClicker {
    state: Mutex<AutoClickerState>,
    scheduler: Arc<dyn Scheduler>,
    actuator: Arc<dyn Actuator>,
    notifier: Arc<dyn NotificationSink>,
    alive: Arc<AtomicBool>,
}

impl AutoClicker {
    pub fn new(
        scheduler: Arc<dyn Scheduler>,
        actuator: Arc<dyn Actuator>,
        notifier: Arc<dyn NotificationSink>,
        alive: Arc<AtomicBool>,
    ) -> Self {
        Self {
            state: Mutex::new(AutoClickerState::default()),
            scheduler,
            actuator,
            notifier,
            alive,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().active.is_some()
    }

    /// Interval of the running clicker, if any.
    pub fn interval_ms(&self) -> Option<u64> {
        self.state.lock().active.as_ref().map(|active| active.interval_ms)
    }

    /// Starts clicking every `interval_ms`. A running clicker is replaced.
    pub fn start(&self, interval_ms: u64) -> Result<(), EngineError> {
        validate_interval(interval_ms)?;
        let mut clicker = self.state.lock();
        self.start_locked(&mut clicker, interval_ms);
        Ok(())
    }

    fn start_locked(&self, clicker: &mut AutoClickerState, interval_ms: u64) {
        if let Some(previous) = clicker.active.take() {
            self.halt(previous);
        }

        let stop_flag = Arc::new(AtomicBool::new(false));
        let tick_flag = stop_flag.clone();
        let alive = self.alive.clone();
        let actuator = self.actuator.clone();
        let notifier = self.notifier.clone();

        let token = self.scheduler.every(
            Duration::from_millis(interval_ms),
            Box::new(move || {
                if tick_flag.load(Ordering::Relaxed) || !alive.load(Ordering::Relaxed) {
                    return;
                }
                if let Err(err) = actuator.click(MouseButton::Left) {
                    log::warn!("auto-click failed: {err}");
                    notifier.notify(Notification::ActuatorFailure {
                        message: err.to_string(),
                    });
                }
            }),
        );

        clicker.active = Some(ActiveClicker {
            token,
            stop_flag,
            interval_ms,
        });
        log::info!("auto-clicker running every {interval_ms}ms");
    }

    /// Stops the clicker. Does nothing when it is not running.
    pub fn stop(&self) -> Result<(), EngineError> {
        let previous = self.state.lock().active.take();
        match previous {
            Some(active) => {
                self.halt(active);
                log::info!("auto-clicker stopped");
            }
            None => log::debug!("auto-clicker stop requested while idle"),
        }
        Ok(())
    }

    /// Flips the clicker, starting it at `interval_ms`. Returns whether it
    /// is running afterwards.
    pub fn toggle(&self, interval_ms: u64) -> Result<bool, EngineError> {
        let mut clicker = self.state.lock();
        let notification = match clicker.active.take() {
            Some(active) => {
                self.halt(active);
                log::info!("auto-clicker stopped");
                Notification::AutoClickerStopped
            }
            None => {
                validate_interval(interval_ms)?;
                self.start_locked(&mut clicker, interval_ms);
                Notification::AutoClickerStarted { interval_ms }
            }
        };
        let running = clicker.active.is_some();
        drop(clicker);

        self.notifier.notify(notification);
        Ok(running)
    }

    fn halt(&self, active: ActiveClicker) {
        active.stop_flag.store(true, Ordering::Relaxed);
        self.scheduler.cancel(active.token);
    }
}

fn validate_interval(interval_ms: u64) -> Result<(), EngineError> {
    if interval_ms == 0 {
        return Err(EngineError::InvalidArgument(
            "auto-click interval must be positive".into(),
        ));
    }
    Ok(())
}
