//! Fixed in-memory worktree provider, for tests and demos.

use std::path::Path;

use tokio::sync::RwLock;

use agentboard_core::WorktreeContext;

use super::{Result, WorktreeError, WorktreeProvider};

/// Provider over a fixed context list. Selection is still mutable, so
/// tests can model context switches happening between ticks.
pub struct StaticWorktreeProvider {
    contexts: Vec<WorktreeContext>,
    selected: RwLock<Option<usize>>,
}

impl StaticWorktreeProvider {
    /// Create a provider over the given contexts, with no selection.
    pub fn new(contexts: Vec<WorktreeContext>) -> Self {
        Self {
            contexts,
            selected: RwLock::new(None),
        }
    }

    /// Create a single-context provider: one primary checkout, selected.
    pub fn single(context: WorktreeContext) -> Self {
        Self {
            contexts: vec![context],
            selected: RwLock::new(Some(0)),
        }
    }

    /// Select a context by its bound branch. Test convenience.
    pub async fn select_branch(&self, branch: &str) -> Result<()> {
        let index = self
            .contexts
            .iter()
            .position(|c| c.branch == branch)
            .ok_or_else(|| WorktreeError::Other(format!("no context on branch {branch}")))?;
        *self.selected.write().await = Some(index);
        Ok(())
    }
}

#[async_trait::async_trait]
impl WorktreeProvider for StaticWorktreeProvider {
    async fn contexts(&self) -> Result<Vec<WorktreeContext>> {
        Ok(self.contexts.clone())
    }

    async fn selected(&self) -> Result<Option<WorktreeContext>> {
        Ok(self
            .selected
            .read()
            .await
            .map(|index| self.contexts[index].clone()))
    }

    async fn primary_branch(&self) -> Result<String> {
        self.contexts
            .iter()
            .find(|c| c.is_primary)
            .map(|c| c.branch.clone())
            .ok_or(WorktreeError::NoPrimaryContext)
    }

    async fn select(&self, path: &Path) -> Result<()> {
        let index = self
            .contexts
            .iter()
            .position(|c| c.path == path)
            .ok_or_else(|| WorktreeError::NoSuchContext(path.to_path_buf()))?;
        *self.selected.write().await = Some(index);
        Ok(())
    }
}
