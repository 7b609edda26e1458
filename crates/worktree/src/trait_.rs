//! Worktree provider abstraction.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use agentboard_core::WorktreeContext;

/// Error type for worktree operations.
pub type Result<T> = std::result::Result<T, WorktreeError>;

/// Errors that can occur while resolving worktree contexts.
#[derive(Debug, thiserror::Error)]
pub enum WorktreeError {
    /// Git operation error
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    /// No context exists at the given path
    #[error("No worktree context at {0}")]
    NoSuchContext(PathBuf),

    /// The project has no primary context
    #[error("Project has no primary context")]
    NoPrimaryContext,

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Supplies the isolated working contexts of a project.
///
/// Exactly one context is primary. The scheduler never mutates contexts or
/// selection through this trait except via [`WorktreeProvider::select`],
/// which exists for the board UI collaborator.
#[async_trait]
pub trait WorktreeProvider: Send + Sync {
    /// All contexts of the project, primary included.
    async fn contexts(&self) -> Result<Vec<WorktreeContext>>;

    /// The currently selected context, or `None` until a selection has
    /// been made.
    async fn selected(&self) -> Result<Option<WorktreeContext>>;

    /// Branch bound to the primary context. Used as the fallback match
    /// target while no selection exists.
    async fn primary_branch(&self) -> Result<String>;

    /// Record a selection change. Called by the UI, never by the
    /// scheduler.
    async fn select(&self, path: &Path) -> Result<()>;
}
