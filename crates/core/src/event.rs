//! Agent session events consumed by the run-state tracker.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::id::FeatureId;
use crate::Time;

/// An asynchronous notification from the agent-execution collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentEvent {
    /// The feature the session is working on
    pub feature_id: FeatureId,

    /// What happened
    pub kind: AgentEventKind,

    /// Working directory of the session, when the collaborator scopes
    /// events by project. `None` means unscoped.
    pub workdir: Option<PathBuf>,

    /// When the collaborator emitted the event
    pub at: Time,
}

impl AgentEvent {
    /// Create an unscoped event stamped now.
    pub fn now(feature_id: FeatureId, kind: AgentEventKind) -> Self {
        Self {
            feature_id,
            kind,
            workdir: None,
            at: chrono::Utc::now(),
        }
    }

    /// Scope the event to a working directory (builder style).
    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(workdir.into());
        self
    }
}

/// Kinds of agent session events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentEventKind {
    /// The session actually started executing
    Started,
    /// The session finished successfully
    Completed,
    /// The session failed
    Failed {
        /// Human-readable failure reason
        message: String,
    },
}

impl AgentEventKind {
    /// Whether this event settles the run (frees its concurrency slot).
    pub fn settles(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed { .. })
    }
}
