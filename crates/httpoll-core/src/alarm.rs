//! Alarm condition tracking across poll cycles.
//!
//! Two independent condition slots, one per [`ConditionKind`], each
//! guarded by its own mutex so the cycle path and the rule-removal path
//! can mutate them concurrently. Raise and clear are edge-triggered:
//! both return a [`Transition`] so callers only react (log, notify the
//! sink) when the state actually changed.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The fixed set of tracked conditions.
///
/// The numeric ids are part of the external contract with alarm
/// renderers/stores and must not be renumbered.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    RetrievalFailure = 1,
    ExtractionFailure = 2,
}

impl ConditionKind {
    /// Stable numeric identifier for external collaborators.
    pub const fn id(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConditionKind::RetrievalFailure => f.write_str("retrieval_failure"),
            ConditionKind::ExtractionFailure => f.write_str("extraction_failure"),
        }
    }
}

/// Current state of one condition slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionState {
    pub active: bool,
    pub message: String,
    /// Time of the last transition; `None` until the first one.
    pub since: Option<DateTime<Utc>>,
}

impl ConditionState {
    fn inactive() -> Self {
        Self {
            active: false,
            message: String::new(),
            since: None,
        }
    }
}

/// Edge reported by [`AlarmTracker::raise`] / [`AlarmTracker::clear`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Inactive -> active.
    Raised,
    /// Already active; message changed.
    Updated,
    /// Active -> inactive.
    Cleared,
    /// No state change (idempotent raise or clear).
    Unchanged,
}

/// Tracks the two alarm conditions for one source.
///
/// Created with both conditions inactive. No ordering dependency exists
/// between the slots; each is driven only by its own cycle outcome.
#[derive(Debug)]
pub struct AlarmTracker {
    retrieval: Mutex<ConditionState>,
    extraction: Mutex<ConditionState>,
}

impl AlarmTracker {
    pub fn new() -> Self {
        Self {
            retrieval: Mutex::new(ConditionState::inactive()),
            extraction: Mutex::new(ConditionState::inactive()),
        }
    }

    fn slot(&self, kind: ConditionKind) -> &Mutex<ConditionState> {
        match kind {
            ConditionKind::RetrievalFailure => &self.retrieval,
            ConditionKind::ExtractionFailure => &self.extraction,
        }
    }

    /// Activate a condition. No-op when already active with the same
    /// message; a different message updates the message and `since`.
    pub fn raise(&self, kind: ConditionKind, message: &str, at: DateTime<Utc>) -> Transition {
        let mut state = self.slot(kind).lock().unwrap();
        if state.active {
            if state.message == message {
                return Transition::Unchanged;
            }
            state.message = message.to_string();
            state.since = Some(at);
            return Transition::Updated;
        }
        state.active = true;
        state.message = message.to_string();
        state.since = Some(at);
        Transition::Raised
    }

    /// Deactivate a condition. No-op when already inactive.
    pub fn clear(&self, kind: ConditionKind, at: DateTime<Utc>) -> Transition {
        let mut state = self.slot(kind).lock().unwrap();
        if !state.active {
            return Transition::Unchanged;
        }
        state.active = false;
        state.message.clear();
        state.since = Some(at);
        Transition::Cleared
    }

    pub fn is_active(&self, kind: ConditionKind) -> bool {
        self.slot(kind).lock().unwrap().active
    }

    pub fn state(&self, kind: ConditionKind) -> ConditionState {
        self.slot(kind).lock().unwrap().clone()
    }
}

impl Default for AlarmTracker {
    fn default() -> Self {
        Self::new()
    }
}
