use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex, MutexGuard};

pub type OnceCallback = Box<dyn FnOnce() + Send + 'static>;
pub type RepeatCallback = Box<dyn FnMut() + Send + 'static>;

/// Opaque handle to a scheduled callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(pub(crate) u64);

/// Timer service the engine schedules all of its work on. Callbacks run in
/// due-time order, ties broken by scheduling order, possibly on another
/// thread than the caller.
pub trait Scheduler: Send + Sync {
    fn after(&self, delay: Duration, callback: OnceCallback) -> TimerToken;
    fn every(&self, interval: Duration, callback: RepeatCallback) -> TimerToken;
    /// Cancelling an unknown or already fired token is a no-op.
    fn cancel(&self, token: TimerToken);
}

const MIN_INTERVAL: Duration = Duration::from_millis(1);

enum Task {
    Once(OnceCallback),
    Repeat {
        interval: Duration,
        callback: RepeatCallback,
    },
}

#[derive(Default)]
struct Timers {
    next_id: u64,
    next_seq: u64,
    queue: BTreeMap<(Instant, u64), (u64, Task)>,
    active: HashSet<u64>,
    shutdown: bool,
}

impl Timers {
    fn push(&mut self, due: Instant, id: u64, task: Task) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.insert((due, seq), (id, task));
    }
}

#[derive(Default)]
struct Shared {
    timers: Mutex<Timers>,
    wake: Condvar,
}

/// Runs every timer on one worker thread, in deadline order. A slow
/// callback delays the ones behind it but never lets them overtake it.
pub struct ThreadScheduler {
    shared: Arc<Shared>,
}

impl Default for ThreadScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadScheduler {
    pub fn new() -> Self {
        let shared = Arc::new(Shared::default());
        let worker = shared.clone();
        thread::spawn(move || run_timers(&worker));
        Self { shared }
    }

    /// Cancels every outstanding timer.
    pub fn cancel_all(&self) {
        let mut timers = self.shared.timers.lock();
        timers.active.clear();
        timers.queue.clear();
    }

    fn schedule(&self, delay: Duration, task: Task) -> TimerToken {
        let mut timers = self.shared.timers.lock();
        let id = timers.next_id;
        timers.next_id += 1;
        timers.active.insert(id);

        match Instant::now().checked_add(delay) {
            Some(due) => timers.push(due, id, task),
            // stays registered so cancel still works, but never fires
            None => log::warn!("timer {id}: delay {delay:?} is out of range, it will not fire"),
        }
        drop(timers);

        self.shared.wake.notify_one();
        TimerToken(id)
    }
}

fn run_timers(shared: &Shared) {
    let mut timers = shared.timers.lock();
    loop {
        if timers.shutdown {
            return;
        }

        let next_due = timers.queue.first_key_value().map(|(&(due, _), _)| due);
        match next_due {
            None => shared.wake.wait(&mut timers),
            Some(due) if due > Instant::now() => {
                shared.wake.wait_until(&mut timers, due);
            }
            Some(_) => {
                let Some(((due, _), (id, task))) = timers.queue.pop_first() else {
                    continue;
                };
                if let Task::Once(_) = task {
                    timers.active.remove(&id);
                }
                fire(&mut timers, due, id, task);
            }
        }
    }
}

fn fire(timers: &mut MutexGuard<'_, Timers>, due: Instant, id: u64, task: Task) {
    let repeat = MutexGuard::unlocked(timers, || match task {
        Task::Once(callback) => {
            callback();
            None
        }
        Task::Repeat {
            interval,
            mut callback,
        } => {
            callback();
            Some((interval, callback))
        }
    });

    let Some((interval, callback)) = repeat else {
        return;
    };
    if !timers.active.contains(&id) {
        return;
    }
    match due.checked_add(interval) {
        // missed ticks are skipped rather than fired in a burst
        Some(next) => timers.push(next.max(Instant::now()), id, Task::Repeat { interval, callback }),
        None => log::warn!("timer {id}: next tick is out of range, it will not fire again"),
    }
}

impl Scheduler for ThreadScheduler {
    fn after(&self, delay: Duration, callback: OnceCallback) -> TimerToken {
        self.schedule(delay, Task::Once(callback))
    }

    fn every(&self, interval: Duration, callback: RepeatCallback) -> TimerToken {
        let interval = interval.max(MIN_INTERVAL);
        self.schedule(interval, Task::Repeat { interval, callback })
    }

    fn cancel(&self, token: TimerToken) {
        let mut timers = self.shared.timers.lock();
        if timers.active.remove(&token.0) {
            timers.queue.retain(|_, (id, _)| *id != token.0);
        }
    }
}

impl Drop for ThreadScheduler {
    fn drop(&mut self) {
        let mut timers = self.shared.timers.lock();
        timers.shutdown = true;
        timers.active.clear();
        timers.queue.clear();
        drop(timers);
        self.shared.wake.notify_all();
    }
}
