use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    notify::NotificationSink,
    store::MacroStore,
    types::{Action, ActionKind, MacroSequence, Notification},
};

#[derive(Default)]
pub struct RecorderState {
    pub(crate) active: bool,
    pub(crate) actions: Vec<Action>,
}

/// Collects actions between a start and a stop signal.
pub struct MacroRecorder {
    state: Mutex<RecorderState>,
    store: Arc<dyn MacroStore>,
    notifier: Arc<dyn NotificationSink>,
}

impl MacroRecorder {
    pub fn new(store: Arc<dyn MacroStore>, notifier: Arc<dyn NotificationSink>) -> Self {
        Self {
            state: Mutex::new(RecorderState::default()),
            store,
            notifier,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.state.lock().active
    }

    pub fn buffered_actions(&self) -> usize {
        self.state.lock().actions.len()
    }

    /// Begins a new recording, discarding any recording in progress.
    pub fn start_recording(&self) {
        {
            let mut recorder = self.state.lock();
            if recorder.active {
                log::info!(
                    "restarting recording, dropping {} buffered actions",
                    recorder.actions.len()
                );
            }
            recorder.actions.clear();
            recorder.active = true;
        }
        self.notifier
            .notify(Notification::MacroRecordingToggled { recording: true });
    }

    /// Appends an action. Ignored unless recording.
    pub fn record_action(&self, kind: ActionKind) {
        let mut recorder = self.state.lock();
        if !recorder.active {
            return;
        }
        let offset_index = recorder.actions.len();
        log::debug!("recorded #{offset_index}: {kind:?}");
        recorder.actions.push(Action { offset_index, kind });
    }

    /// Ends the recording and hands the frozen sequence to the store.
    /// Without an active recording this returns an empty sequence.
    pub fn stop_recording(&self) -> MacroSequence {
        let sequence = {
            let mut recorder = self.state.lock();
            if !recorder.active {
                return MacroSequence::default();
            }
            recorder.active = false;
            MacroSequence::new(std::mem::take(&mut recorder.actions))
        };

        log::info!("recording stopped with {} actions", sequence.len());
        self.store.save(&sequence);
        self.notifier
            .notify(Notification::MacroRecordingToggled { recording: false });
        sequence
    }
}
