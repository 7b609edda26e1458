//! Run-state tracking for in-flight agent sessions.
//!
//! One [`RunRecord`] per feature the scheduler has asked to start. The
//! record set is the authority for slot accounting and for the guarantee
//! that a feature is never started twice concurrently. All access happens
//! from the scheduler task that owns the tracker; there is no internal
//! locking.

use std::collections::HashMap;

use tracing::{debug, warn};

use agentboard_core::{AgentEvent, AgentEventKind, FeatureId, Time};

/// State of one tracked run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Start requested, not yet confirmed by the collaborator
    Pending,
    /// Session confirmed started
    Running,
}

/// The scheduler's record of one in-flight feature run. Ephemeral: never
/// persisted to disk.
#[derive(Debug, Clone)]
pub struct RunRecord {
    /// Feature being run
    pub feature_id: FeatureId,

    /// Pending or running
    pub state: RunState,

    /// When the start request was issued
    pub started_at: Time,
}

/// Owns all RunRecords for one project.
#[derive(Debug, Default)]
pub struct RunTracker {
    records: HashMap<FeatureId, RunRecord>,
}

impl RunTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records currently held, pending and running alike.
    pub fn in_flight(&self) -> usize {
        self.records.len()
    }

    /// Number of pending records.
    pub fn pending_count(&self) -> usize {
        self.count(RunState::Pending)
    }

    /// Number of running records.
    pub fn running_count(&self) -> usize {
        self.count(RunState::Running)
    }

    fn count(&self, state: RunState) -> usize {
        self.records.values().filter(|r| r.state == state).count()
    }

    /// Whether any record exists for the feature.
    pub fn contains(&self, feature_id: FeatureId) -> bool {
        self.records.contains_key(&feature_id)
    }

    /// Create a pending record after a start request was accepted.
    ///
    /// Returns `false` without touching anything if a record already
    /// exists: a feature must never be tracked twice while in flight.
    pub fn mark_pending(&mut self, feature_id: FeatureId) -> bool {
        if self.records.contains_key(&feature_id) {
            warn!("Refusing duplicate run record for feature {feature_id}");
            return false;
        }
        self.records.insert(
            feature_id,
            RunRecord {
                feature_id,
                state: RunState::Pending,
                started_at: chrono::Utc::now(),
            },
        );
        true
    }

    /// Move a pending record to running on start confirmation.
    ///
    /// A confirmation with no pending record (a stale event from before a
    /// restart or teardown) is dropped: the record is never created
    /// retroactively, preferring under-counted concurrency over a second
    /// session for the same feature. Returns whether a record was updated.
    pub fn confirm_start(&mut self, feature_id: FeatureId) -> bool {
        match self.records.get_mut(&feature_id) {
            Some(record) => {
                record.state = RunState::Running;
                true
            }
            None => {
                warn!("Ignoring stale start confirmation for feature {feature_id}");
                false
            }
        }
    }

    /// Remove the record, whatever its state, freeing its slot.
    pub fn settle(&mut self, feature_id: FeatureId) -> Option<RunRecord> {
        let removed = self.records.remove(&feature_id);
        if removed.is_none() {
            debug!("Settle for untracked feature {feature_id}");
        }
        removed
    }

    /// Drop all pending records (auto mode was disabled: no start
    /// confirmation should be trusted afterwards). Running records stay;
    /// already-started sessions are not killed by disabling auto mode.
    pub fn clear_pending(&mut self) -> usize {
        let before = self.records.len();
        self.records.retain(|_, r| r.state == RunState::Running);
        before - self.records.len()
    }

    /// Apply a collaborator event to the record set.
    pub fn apply(&mut self, event: &AgentEvent) {
        match &event.kind {
            AgentEventKind::Started => {
                self.confirm_start(event.feature_id);
            }
            AgentEventKind::Completed | AgentEventKind::Failed { .. } => {
                self.settle(event.feature_id);
            }
        }
    }

    /// Snapshot of the current records, for status displays.
    pub fn records(&self) -> Vec<RunRecord> {
        self.records.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_then_start_then_settle() {
        let mut tracker = RunTracker::new();
        let id = FeatureId::new();

        assert!(tracker.mark_pending(id));
        assert_eq!(tracker.pending_count(), 1);
        assert_eq!(tracker.running_count(), 0);

        assert!(tracker.confirm_start(id));
        assert_eq!(tracker.pending_count(), 0);
        assert_eq!(tracker.running_count(), 1);

        assert!(tracker.settle(id).is_some());
        assert_eq!(tracker.in_flight(), 0);
    }

    #[test]
    fn duplicate_pending_is_refused() {
        let mut tracker = RunTracker::new();
        let id = FeatureId::new();

        assert!(tracker.mark_pending(id));
        assert!(!tracker.mark_pending(id));
        assert_eq!(tracker.in_flight(), 1);

        tracker.confirm_start(id);
        assert!(!tracker.mark_pending(id));
        assert_eq!(tracker.in_flight(), 1);
    }

    #[test]
    fn stale_start_confirmation_is_a_no_op() {
        let mut tracker = RunTracker::new();
        let id = FeatureId::new();

        assert!(!tracker.confirm_start(id));
        assert_eq!(tracker.in_flight(), 0);
    }

    #[test]
    fn settle_removes_pending_records_too() {
        let mut tracker = RunTracker::new();
        let id = FeatureId::new();

        tracker.mark_pending(id);
        assert!(tracker.settle(id).is_some());
        assert_eq!(tracker.in_flight(), 0);
    }

    #[test]
    fn settle_unknown_feature_is_a_no_op() {
        let mut tracker = RunTracker::new();
        assert!(tracker.settle(FeatureId::new()).is_none());
    }

    #[test]
    fn clear_pending_keeps_running_records() {
        let mut tracker = RunTracker::new();
        let pending = FeatureId::new();
        let running = FeatureId::new();

        tracker.mark_pending(pending);
        tracker.mark_pending(running);
        tracker.confirm_start(running);

        assert_eq!(tracker.clear_pending(), 1);
        assert!(!tracker.contains(pending));
        assert!(tracker.contains(running));
    }

    #[test]
    fn events_drive_the_state_machine() {
        let mut tracker = RunTracker::new();
        let id = FeatureId::new();

        tracker.mark_pending(id);
        tracker.apply(&AgentEvent::now(id, AgentEventKind::Started));
        assert_eq!(tracker.running_count(), 1);

        tracker.apply(&AgentEvent::now(
            id,
            AgentEventKind::Failed {
                message: "boom".into(),
            },
        ));
        assert_eq!(tracker.in_flight(), 0);
    }
}
