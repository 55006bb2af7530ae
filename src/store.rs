use parking_lot::Mutex;

use crate::types::MacroSequence;

/// Keeps the most recently recorded macro.
pub trait MacroStore: Send + Sync {
    fn save(&self, sequence: &MacroSequence);
    fn load(&self) -> Option<MacroSequence>;
}

#[derive(Debug, Default)]
pub struct MemoryMacroStore {
    latest: Mutex<Option<MacroSequence>>,
}

impl MemoryMacroStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MacroStore for MemoryMacroStore {
    fn save(&self, sequence: &MacroSequence) {
        *self.latest.lock() = Some(sequence.clone());
    }

    fn load(&self) -> Option<MacroSequence> {
        self.latest.lock().clone()
    }
}
