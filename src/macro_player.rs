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
    error::{ActuatorError, EngineError},
    notify::NotificationSink,
    scheduler::{Scheduler, TimerToken},
    types::{Action, ActionKind, MacroSequence, Notification},
};

/// Milliseconds between consecutive actions at speed 1.0.
pub const BASE_STEP_MS: f64 = 100.0;
/// Pause after the last action slot before the next repetition starts.
pub const SETTLE_GAP: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    Times(u32),
    Forever,
}

impl Repeat {
    /// `-1` means forever; anything below is rejected.
    pub fn from_count(times: i64) -> Result<Self, EngineError> {
        match times {
            -1 => Ok(Repeat::Forever),
            t if t < -1 => Err(EngineError::InvalidArgument(format!(
                "repeat count must be -1 or greater, got {t}"
            ))),
            t => Ok(Repeat::Times(u32::try_from(t).unwrap_or(u32::MAX))),
        }
    }

    fn exhausted(self, played: u32) -> bool {
        match self {
            Repeat::Times(limit) => played >= limit,
            Repeat::Forever => false,
        }
    }
}

#[derive(Default)]
pub struct MacroPlaybackState {
    pub(crate) playing: bool,
    pub(crate) run_id: u64,
    pub(crate) played: u32,
    pub(crate) next_repetition: Option<TimerToken>,
}

struct PlaybackRun {
    id: u64,
    timeline: Vec<(Duration, ActionKind)>,
    period: Duration,
    repeat: Repeat,
}

/// Firing offsets of every action within a repetition, plus the delay
/// until the next repetition. Fails when a delay does not fit a `Duration`.
fn plan_repetition(
    actions: &[Action],
    speed: f64,
) -> Result<(Vec<(Duration, ActionKind)>, Duration), EngineError> {
    let step_ms = BASE_STEP_MS / speed;
    let too_slow = || {
        EngineError::InvalidArgument(format!(
            "playback speed {speed} is too slow to schedule {} actions",
            actions.len()
        ))
    };
    let offset = |slots: usize| {
        Duration::try_from_secs_f64(slots as f64 * step_ms / 1000.0).map_err(|_| too_slow())
    };

    let timeline = actions
        .iter()
        .map(|action| Ok((offset(action.offset_index)?, action.kind.clone())))
        .collect::<Result<Vec<_>, EngineError>>()?;
    let period = offset(actions.len())?
        .checked_add(SETTLE_GAP)
        .ok_or_else(|| too_slow())?;
    Ok((timeline, period))
}

struct PlayerShared {
    state: Mutex<MacroPlaybackState>,
    scheduler: Arc<dyn Scheduler>,
    actuator: Arc<dyn Actuator>,
    notifier: Arc<dyn NotificationSink>,
    alive: Arc<AtomicBool>,
}

/// Replays a macro sequence a number of times at a speed multiplier.
///
/// Each repetition schedules all of its actions up front, action `i` firing
/// `i * 100 / speed` ms after the repetition began, and schedules the next
/// repetition `len * 100 / speed + 100` ms after it began. A repetition
/// first checks the run is still current and the count is not used up.
/// Stopping prevents further repetitions; actions already scheduled for the
/// current repetition still fire. A speed too small for its delays to fit a
/// `Duration` is rejected before anything starts.
pub struct MacroPlayer {
    shared: Arc<PlayerShared>,
}

impl MacroPlayer {
    pub fn new(
        scheduler: Arc<dyn Scheduler>,
        actuator: Arc<dyn Actuator>,
        notifier: Arc<dyn NotificationSink>,
        alive: Arc<AtomicBool>,
    ) -> Self {
        Self {
            shared: Arc::new(PlayerShared {
                state: Mutex::new(MacroPlaybackState::default()),
                scheduler,
                actuator,
                notifier,
                alive,
            }),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.shared.state.lock().playing
    }

    /// Repetitions started so far by the current or most recent run.
    pub fn played(&self) -> u32 {
        self.shared.state.lock().played
    }

    pub fn play(&self, sequence: &MacroSequence, speed: f64, times: i64) -> Result<(), EngineError> {
        if !(speed.is_finite() && speed > 0.0) {
            return Err(EngineError::InvalidArgument(format!(
                "playback speed must be a positive number, got {speed}"
            )));
        }
        let repeat = Repeat::from_count(times)?;

        let plan = if sequence.is_empty() {
            None
        } else {
            Some(plan_repetition(sequence.actions(), speed)?)
        };

        let run = {
            let mut player = self.shared.state.lock();
            if player.playing {
                log::debug!("playback rejected, run {} in flight", player.run_id);
                return Err(EngineError::AlreadyPlaying);
            }
            let Some((timeline, period)) = plan else {
                log::debug!("empty macro, nothing to play");
                return Ok(());
            };

            player.playing = true;
            player.run_id += 1;
            player.played = 0;
            player.next_repetition = None;

            Arc::new(PlaybackRun {
                id: player.run_id,
                timeline,
                period,
                repeat,
            })
        };

        log::info!(
            "playing {} actions at {speed}x, {times} time(s)",
            sequence.len()
        );
        self.shared.notifier.notify(Notification::MacroPlayed {
            sequence: sequence.clone(),
            speed,
            times,
        });

        run_repetition(&self.shared, run);
        Ok(())
    }

    /// Requests the current run to end. Does nothing when idle.
    pub fn stop(&self) -> Result<(), EngineError> {
        let pending = {
            let mut player = self.shared.state.lock();
            if !player.playing {
                log::debug!("playback stop requested while idle");
                return Ok(());
            }
            player.playing = false;
            player.next_repetition.take()
        };

        if let Some(token) = pending {
            self.shared.scheduler.cancel(token);
        }
        log::info!("playback stopped");
        self.shared.notifier.notify(Notification::MacroStopped);
        Ok(())
    }
}

fn run_repetition(shared: &Arc<PlayerShared>, run: Arc<PlaybackRun>) {
    let repetition = {
        let mut player = shared.state.lock();
        if !player.playing || player.run_id != run.id || !shared.alive.load(Ordering::Relaxed) {
            log::debug!("run {} no longer current, skipping repetition", run.id);
            return;
        }
        if run.repeat.exhausted(player.played) {
            player.playing = false;
            player.next_repetition = None;
            drop(player);
            log::info!("playback finished");
            shared.notifier.notify(Notification::MacroFinished);
            return;
        }
        player.played = player.played.saturating_add(1);
        player.played
    };

    log::debug!("run {} repetition {repetition}", run.id);

    for (offset, kind) in &run.timeline {
        let shared_for_action = shared.clone();
        let kind = kind.clone();
        shared.scheduler.after(
            *offset,
            Box::new(move || {
                if shared_for_action.alive.load(Ordering::Relaxed) {
                    dispatch_action(&shared_for_action, &kind);
                }
            }),
        );
    }

    let shared_for_next = shared.clone();
    let next_run = run.clone();
    let token = shared.scheduler.after(
        run.period,
        Box::new(move || run_repetition(&shared_for_next, next_run)),
    );

    let mut player = shared.state.lock();
    if player.playing && player.run_id == run.id {
        player.next_repetition = Some(token);
    } else {
        drop(player);
        shared.scheduler.cancel(token);
    }
}

fn dispatch_action(shared: &PlayerShared, kind: &ActionKind) {
    let result = match kind {
        ActionKind::Click { x, y, button } => shared
            .actuator
            .move_to(*x, *y)
            .and_then(|()| shared.actuator.click(*button)),
        ActionKind::KeyTap { key } => shared.actuator.key_tap(key),
    };

    if let Err(err) = result {
        report_failure(shared, kind, err);
    }
}

fn report_failure(shared: &PlayerShared, kind: &ActionKind, err: ActuatorError) {
    log::warn!("macro action {kind:?} failed: {err}");
    shared.notifier.notify(Notification::ActuatorFailure {
        message: err.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_count_parsing() {
        assert_eq!(Repeat::from_count(-1), Ok(Repeat::Forever));
        assert_eq!(Repeat::from_count(0), Ok(Repeat::Times(0)));
        assert_eq!(Repeat::from_count(3), Ok(Repeat::Times(3)));
        assert!(matches!(
            Repeat::from_count(-2),
            Err(EngineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn exhaustion_respects_limit() {
        assert!(Repeat::Times(0).exhausted(0));
        assert!(!Repeat::Times(2).exhausted(1));
        assert!(Repeat::Times(2).exhausted(2));
        assert!(!Repeat::Forever.exhausted(u32::MAX));
    }
}
