//! Feature model - a card on the board.

use serde::{Deserialize, Serialize};

use crate::id::FeatureId;
use crate::Time;

/// A feature is a unit of work an agent session can implement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    /// Unique identifier
    pub id: FeatureId,

    /// Card title
    pub title: String,

    /// Detailed description; used as the agent prompt
    pub description: String,

    /// Current board column
    pub status: FeatureStatus,

    /// Scheduling priority
    #[serde(default)]
    pub priority: Priority,

    /// Features that must be completed or verified before this one starts
    #[serde(default)]
    pub dependencies: Vec<FeatureId>,

    /// Git branch this feature is scoped to. `None` means unassigned:
    /// the feature is visible only in the primary worktree context.
    #[serde(default)]
    pub branch_name: Option<String>,

    /// Creation timestamp
    pub created_at: Time,

    /// Last update timestamp
    pub updated_at: Time,
}

impl Feature {
    /// Create a new backlog feature.
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: FeatureId::new(),
            title: title.into(),
            description: description.into(),
            status: FeatureStatus::Backlog,
            priority: Priority::default(),
            dependencies: Vec::new(),
            branch_name: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the priority (builder style).
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Add a dependency (builder style).
    pub fn with_dependency(mut self, dep: FeatureId) -> Self {
        self.dependencies.push(dep);
        self
    }

    /// Scope the feature to a branch (builder style).
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch_name = Some(branch.into());
        self
    }

    /// Apply a partial update and bump `updated_at`.
    pub fn apply(&mut self, patch: FeaturePatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(branch_name) = patch.branch_name {
            self.branch_name = Some(branch_name);
        }
        if let Some(dependencies) = patch.dependencies {
            self.dependencies = dependencies;
        }
        self.updated_at = chrono::Utc::now();
    }
}

/// Board column a feature sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureStatus {
    /// Not started; the only status the scheduler admits from
    Backlog,
    /// An agent session is (or was) working on it
    InProgress,
    /// Agent work finished, awaiting human approval
    WaitingApproval,
    /// Approved and verified by a human
    Verified,
    /// Done
    Completed,
}

impl FeatureStatus {
    /// Whether a dependency in this status no longer blocks its dependents.
    pub fn satisfies_dependents(&self) -> bool {
        matches!(self, Self::Completed | Self::Verified)
    }

    /// Short lowercase name, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Backlog => "backlog",
            Self::InProgress => "in_progress",
            Self::WaitingApproval => "waiting_approval",
            Self::Verified => "verified",
            Self::Completed => "completed",
        }
    }
}

/// Scheduling priority: 1 is highest, 3 is lowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(u8);

impl Priority {
    /// Highest priority (1).
    pub const HIGH: Priority = Priority(1);
    /// Default priority (2).
    pub const NORMAL: Priority = Priority(2);
    /// Lowest priority (3).
    pub const LOW: Priority = Priority(3);

    /// Build from a raw level, clamped into 1..=3.
    pub fn from_level(level: u8) -> Self {
        Self(level.clamp(1, 3))
    }

    /// Raw level (1..=3).
    pub fn level(&self) -> u8 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Partial update for a feature. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeaturePatch {
    /// New status
    pub status: Option<FeatureStatus>,

    /// New priority
    pub priority: Option<Priority>,

    /// Assign the feature to a branch
    pub branch_name: Option<String>,

    /// Replace the dependency list
    pub dependencies: Option<Vec<FeatureId>>,
}

impl FeaturePatch {
    /// Patch that only changes the status.
    pub fn status(status: FeatureStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Patch that only assigns a branch.
    pub fn branch(branch: impl Into<String>) -> Self {
        Self {
            branch_name: Some(branch.into()),
            ..Default::default()
        }
    }
}

/// Filter for querying features.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureFilter {
    /// Filter by status
    pub status: Option<Vec<FeatureStatus>>,

    /// Filter by assigned branch
    pub branch_name: Option<String>,
}
