// sal-core/src/deploy/state.rs
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sal_common::model::{OperationKind, OperationState};

/// Shared slot holding the one in-flight operation. Clones share the slot.
#[derive(Debug, Clone, Default)]
pub struct OperationTracker {
    state: Arc<Mutex<OperationState>>,
}

impl OperationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> OperationState {
        self.lock().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.lock().is_busy()
    }

    /// Claims the slot. Returns `false`, leaving the state untouched, if another
    /// operation holds it.
    pub(crate) fn try_begin(&self, kind: OperationKind, target: &str, message: String) -> bool {
        let mut state = self.lock();
        if state.is_busy() {
            return false;
        }
        *state = OperationState {
            kind,
            target_name: target.to_string(),
            progress: 0.0,
            status_message: message,
            complete: false,
            success: false,
        };
        true
    }

    /// Explains a rejection. Never overwrites the message of a running operation.
    pub(crate) fn note_rejection(&self, message: String) {
        let mut state = self.lock();
        if !state.is_busy() {
            state.status_message = message;
        }
    }

    /// Progress never moves backwards within an operation.
    pub(crate) fn update(&self, progress: f32, message: &str) {
        let mut state = self.lock();
        if !state.is_busy() {
            return;
        }
        state.progress = progress.clamp(state.progress, 1.0);
        state.status_message = message.to_string();
    }

    pub(crate) fn finish(&self, success: bool, message: String) {
        let mut state = self.lock();
        if success {
            state.progress = 1.0;
        }
        state.complete = true;
        state.success = success;
        state.kind = OperationKind::None;
        state.status_message = message;
    }

    fn lock(&self) -> MutexGuard<'_, OperationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_begin_is_refused() {
        let tracker = OperationTracker::new();
        assert!(tracker.try_begin(OperationKind::Installing, "wifi", "Installing wifi...".into()));
        let before = tracker.snapshot();
        assert!(!tracker.try_begin(OperationKind::Uninstalling, "clock", String::new()));
        tracker.note_rejection("Device not connected".into());
        assert_eq!(tracker.snapshot(), before);
    }

    #[test]
    fn progress_is_monotonic() {
        let tracker = OperationTracker::new();
        tracker.try_begin(OperationKind::Installing, "wifi", String::new());
        tracker.update(0.5, "half");
        tracker.update(0.2, "late report");
        let state = tracker.snapshot();
        assert_eq!(state.progress, 0.5);
        assert_eq!(state.status_message, "late report");
        tracker.update(7.0, "overflow");
        assert_eq!(tracker.snapshot().progress, 1.0);
    }

    #[test]
    fn finish_releases_slot() {
        let tracker = OperationTracker::new();
        tracker.try_begin(OperationKind::Refreshing, "", String::new());
        assert!(tracker.is_busy());
        tracker.finish(false, "nope".into());
        let state = tracker.snapshot();
        assert!(!state.is_busy());
        assert!(state.complete);
        assert!(!state.success);
        assert!(tracker.try_begin(OperationKind::Installing, "wifi", String::new()));
    }

    #[test]
    fn idle_rejection_only_sets_message() {
        let tracker = OperationTracker::new();
        tracker.note_rejection("Plugin not found locally".into());
        let state = tracker.snapshot();
        assert_eq!(state.kind, OperationKind::None);
        assert_eq!(state.progress, 0.0);
        assert!(!state.complete);
        assert_eq!(state.status_message, "Plugin not found locally");
    }
}
