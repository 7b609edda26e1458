//! Worktree context model - an isolated checkout bound to one branch.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// An isolated execution environment for agent sessions.
///
/// Each context is a filesystem checkout bound to exactly one git branch.
/// A project has exactly one primary context; secondary contexts are linked
/// worktrees. Which context is "currently selected" is external mutable
/// state the scheduler reads but never writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorktreeContext {
    /// Filesystem root of the checkout
    pub path: PathBuf,

    /// Git branch bound to this context
    pub branch: String,

    /// Whether this is the project's primary checkout
    pub is_primary: bool,

    /// Advisory only; not consumed by eligibility logic
    pub has_uncommitted_changes: bool,
}

impl WorktreeContext {
    /// Create a primary context.
    pub fn primary(path: impl Into<PathBuf>, branch: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            branch: branch.into(),
            is_primary: true,
            has_uncommitted_changes: false,
        }
    }

    /// Create a secondary (linked worktree) context.
    pub fn secondary(path: impl Into<PathBuf>, branch: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            branch: branch.into(),
            is_primary: false,
            has_uncommitted_changes: false,
        }
    }
}
