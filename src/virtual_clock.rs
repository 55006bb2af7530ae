//! Deterministic scheduler driven by an explicit virtual clock.
//!
//! Nothing fires until [`VirtualScheduler::advance`] is called. Callbacks run
//! on the advancing thread, in due-time order, ties broken by scheduling
//! order. Callbacks may schedule or cancel further timers; anything that
//! becomes due within the advanced window fires in the same call.

use std::{
    collections::{BTreeMap, HashSet},
    time::Duration,
};

use parking_lot::Mutex;

use crate::scheduler::{OnceCallback, RepeatCallback, Scheduler, TimerToken};

const MIN_INTERVAL: Duration = Duration::from_nanos(1);

enum Task {
    Once(OnceCallback),
    Repeat {
        interval: Duration,
        callback: RepeatCallback,
    },
}

#[derive(Default)]
struct Clock {
    now: Duration,
    next_id: u64,
    next_seq: u64,
    queue: BTreeMap<(Duration, u64), (u64, Task)>,
    active: HashSet<u64>,
    repeating: HashSet<u64>,
}

impl Clock {
    fn push(&mut self, due: Duration, id: u64, task: Task) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.insert((due, seq), (id, task));
    }
}

#[derive(Default)]
pub struct VirtualScheduler {
    clock: Mutex<Clock>,
}

impl VirtualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time elapsed on the virtual clock.
    pub fn now(&self) -> Duration {
        self.clock.lock().now
    }

    /// Number of timers that are scheduled and not cancelled.
    pub fn pending(&self) -> usize {
        self.clock.lock().active.len()
    }

    /// Number of live repeating timers.
    pub fn active_repeating(&self) -> usize {
        let clock = self.clock.lock();
        clock.repeating.intersection(&clock.active).count()
    }

    /// Moves the clock forward by `by`, firing everything that falls due.
    pub fn advance(&self, by: Duration) {
        let target = self.clock.lock().now + by;

        loop {
            let next = {
                let mut clock = self.clock.lock();
                match clock.queue.first_key_value() {
                    Some((&(due, _), _)) if due <= target => {
                        let ((due, _), (id, task)) = match clock.queue.pop_first() {
                            Some(entry) => entry,
                            None => break,
                        };
                        clock.now = due;
                        if let Task::Once(_) = task {
                            clock.active.remove(&id);
                        }
                        Some((due, id, task))
                    }
                    _ => {
                        clock.now = target;
                        None
                    }
                }
            };

            let Some((due, id, task)) = next else { break };

            match task {
                Task::Once(callback) => callback(),
                Task::Repeat {
                    interval,
                    mut callback,
                } => {
                    callback();
                    let mut clock = self.clock.lock();
                    if clock.active.contains(&id) {
                        if let Some(next) = due.checked_add(interval) {
                            clock.push(next, id, Task::Repeat { interval, callback });
                        }
                    }
                }
            }
        }
    }

    fn schedule(&self, delay: Duration, task: Task) -> TimerToken {
        let mut clock = self.clock.lock();
        let id = clock.next_id;
        clock.next_id += 1;
        clock.active.insert(id);
        if matches!(task, Task::Repeat { .. }) {
            clock.repeating.insert(id);
        }
        match clock.now.checked_add(delay) {
            Some(due) => clock.push(due, id, task),
            None => log::warn!("timer {id}: delay {delay:?} is out of range, it will not fire"),
        }
        TimerToken(id)
    }
}

impl Scheduler for VirtualScheduler {
    fn after(&self, delay: Duration, callback: OnceCallback) -> TimerToken {
        self.schedule(delay, Task::Once(callback))
    }

    fn every(&self, interval: Duration, callback: RepeatCallback) -> TimerToken {
        let interval = interval.max(MIN_INTERVAL);
        self.schedule(interval, Task::Repeat { interval, callback })
    }

    fn cancel(&self, token: TimerToken) {
        let mut clock = self.clock.lock();
        if clock.active.remove(&token.0) {
            clock.repeating.remove(&token.0);
            clock.queue.retain(|_, (id, _)| *id != token.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};

    fn fired_log() -> Arc<StdMutex<Vec<(u128, &'static str)>>> {
        Arc::new(StdMutex::new(Vec::new()))
    }

    #[test]
    fn fires_in_due_order() {
        let scheduler = VirtualScheduler::new();
        let fired = fired_log();

        for (delay, label) in [(30, "c"), (10, "a"), (20, "b")] {
            let fired = fired.clone();
            scheduler.after(
                Duration::from_millis(delay),
                Box::new(move || fired.lock().unwrap().push((delay as u128, label))),
            );
        }

        scheduler.advance(Duration::from_millis(25));
        assert_eq!(*fired.lock().unwrap(), vec![(10, "a"), (20, "b")]);
        assert_eq!(scheduler.now(), Duration::from_millis(25));

        scheduler.advance(Duration::from_millis(5));
        assert_eq!(fired.lock().unwrap().len(), 3);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn repeating_timer_ticks_until_cancelled() {
        let scheduler = Arc::new(VirtualScheduler::new());
        let ticks = Arc::new(StdMutex::new(0u32));

        let counter = ticks.clone();
        let token = scheduler.every(
            Duration::from_millis(10),
            Box::new(move || *counter.lock().unwrap() += 1),
        );
        assert_eq!(scheduler.active_repeating(), 1);

        scheduler.advance(Duration::from_millis(35));
        assert_eq!(*ticks.lock().unwrap(), 3);

        scheduler.cancel(token);
        assert_eq!(scheduler.active_repeating(), 0);
        scheduler.advance(Duration::from_millis(100));
        assert_eq!(*ticks.lock().unwrap(), 3);
    }

    #[test]
    fn callbacks_can_schedule_into_the_current_window() {
        let scheduler = Arc::new(VirtualScheduler::new());
        let fired = fired_log();

        let inner_scheduler = scheduler.clone();
        let inner_log = fired.clone();
        scheduler.after(
            Duration::from_millis(10),
            Box::new(move || {
                inner_log.lock().unwrap().push((10, "outer"));
                let nested_log = inner_log.clone();
                inner_scheduler.after(
                    Duration::from_millis(5),
                    Box::new(move || nested_log.lock().unwrap().push((15, "nested"))),
                );
            }),
        );

        scheduler.advance(Duration::from_millis(20));
        assert_eq!(*fired.lock().unwrap(), vec![(10, "outer"), (15, "nested")]);
    }

    #[test]
    fn repeating_callback_can_cancel_itself() {
        let scheduler = Arc::new(VirtualScheduler::new());
        let ticks = Arc::new(StdMutex::new(0u32));
        let token_slot: Arc<StdMutex<Option<TimerToken>>> = Arc::new(StdMutex::new(None));

        let counter = ticks.clone();
        let slot = token_slot.clone();
        let handle = scheduler.clone();
        let token = scheduler.every(
            Duration::from_millis(10),
            Box::new(move || {
                let mut count = counter.lock().unwrap();
                *count += 1;
                if *count == 2 {
                    if let Some(token) = *slot.lock().unwrap() {
                        handle.cancel(token);
                    }
                }
            }),
        );
        *token_slot.lock().unwrap() = Some(token);

        scheduler.advance(Duration::from_millis(100));
        assert_eq!(*ticks.lock().unwrap(), 2);
        assert_eq!(scheduler.pending(), 0);
    }
}
