//! Per-tick eligibility filtering.
//!
//! A feature is runnable right now iff it is in the backlog, its branch
//! scoping matches the selected worktree context, and (when blocking is
//! enabled) none of its existing dependencies are incomplete. Each worktree
//! is an isolated checkout, so admitting a feature scoped to another branch
//! would write agent output into the wrong working tree.

use std::path::PathBuf;

use agentboard_core::{Feature, FeatureStatus, WorktreeContext};
use agentboard_graph::DependencyReport;

/// The branch the scheduler matches features against on one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchTarget {
    /// Branch of the selected context
    pub branch: String,

    /// Checkout root agent sessions run in
    pub path: PathBuf,

    /// Whether the selected context is the primary checkout
    pub is_primary: bool,
}

impl BranchTarget {
    /// Target for a known selected context.
    pub fn from_context(context: &WorktreeContext) -> Self {
        Self {
            branch: context.branch.clone(),
            path: context.path.clone(),
            is_primary: context.is_primary,
        }
    }

    /// Whether the target admits this feature's branch scoping. Features
    /// without a branch belong to the primary context only.
    pub fn admits(&self, feature: &Feature) -> bool {
        match &feature.branch_name {
            None => self.is_primary,
            Some(branch) => *branch == self.branch,
        }
    }
}

/// Compute the backlog features runnable right now, sorted by priority
/// (ascending; ties keep input order).
///
/// `blocking_enabled` gates only the dependency check: branch scoping and
/// backlog status always apply. Missing dependencies never suppress
/// eligibility; only existing, incomplete ones do (via `report.blocked`).
pub fn eligible_features<'a>(
    features: &'a [Feature],
    target: &BranchTarget,
    report: &DependencyReport,
    blocking_enabled: bool,
) -> Vec<&'a Feature> {
    let mut eligible: Vec<&Feature> = features
        .iter()
        .filter(|f| f.status == FeatureStatus::Backlog)
        .filter(|f| target.admits(f))
        .filter(|f| !blocking_enabled || !report.is_blocked(f.id))
        .collect();
    eligible.sort_by_key(|f| f.priority);
    eligible
}
