//! git2-backed worktree provider.

use std::path::{Path, PathBuf};

use git2::{Repository, StatusOptions};
use tokio::sync::RwLock;
use tracing::debug;

use agentboard_core::WorktreeContext;

use super::{Result, WorktreeError, WorktreeProvider};

/// Discovers contexts from a real git repository: the primary checkout plus
/// every linked worktree.
///
/// libgit2 calls are synchronous, so discovery runs under
/// `spawn_blocking`. Selection state lives here (not in git) because git
/// has no notion of a "selected" worktree.
pub struct GitWorktreeProvider {
    repo_path: PathBuf,
    selected: RwLock<Option<PathBuf>>,
}

impl GitWorktreeProvider {
    /// Create a provider for the repository at `repo_path` (the primary
    /// checkout).
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
            selected: RwLock::new(None),
        }
    }

    async fn discover(&self) -> Result<Vec<WorktreeContext>> {
        let repo_path = self.repo_path.clone();
        tokio::task::spawn_blocking(move || discover_contexts(&repo_path))
            .await
            .map_err(|e| WorktreeError::Other(format!("worktree discovery task failed: {e}")))?
    }
}

#[async_trait::async_trait]
impl WorktreeProvider for GitWorktreeProvider {
    async fn contexts(&self) -> Result<Vec<WorktreeContext>> {
        self.discover().await
    }

    async fn selected(&self) -> Result<Option<WorktreeContext>> {
        let Some(path) = self.selected.read().await.clone() else {
            return Ok(None);
        };
        let contexts = self.discover().await?;
        contexts
            .into_iter()
            .find(|c| c.path == path)
            .map(Some)
            .ok_or(WorktreeError::NoSuchContext(path))
    }

    async fn primary_branch(&self) -> Result<String> {
        let contexts = self.discover().await?;
        contexts
            .into_iter()
            .find(|c| c.is_primary)
            .map(|c| c.branch)
            .ok_or(WorktreeError::NoPrimaryContext)
    }

    async fn select(&self, path: &Path) -> Result<()> {
        let contexts = self.discover().await?;
        if !contexts.iter().any(|c| c.path == path) {
            return Err(WorktreeError::NoSuchContext(path.to_path_buf()));
        }
        debug!("Selected worktree context {}", path.display());
        *self.selected.write().await = Some(path.to_path_buf());
        Ok(())
    }
}

fn discover_contexts(repo_path: &Path) -> Result<Vec<WorktreeContext>> {
    let repo = Repository::open(repo_path)?;
    let mut contexts = vec![context_for(&repo, repo_path, true)?];

    for name in repo.worktrees()?.iter().flatten() {
        let worktree = repo.find_worktree(name)?;
        let wt_path = worktree.path().to_path_buf();
        match Repository::open(&wt_path) {
            Ok(wt_repo) => contexts.push(context_for(&wt_repo, &wt_path, false)?),
            Err(e) => {
                // A stale worktree entry (deleted directory) is not fatal.
                debug!("Skipping worktree {name}: {e}");
            }
        }
    }

    Ok(contexts)
}

fn context_for(repo: &Repository, path: &Path, is_primary: bool) -> Result<WorktreeContext> {
    let head = repo.head()?;
    let branch = head
        .shorthand()
        .unwrap_or("HEAD")
        .to_string();

    let mut options = StatusOptions::new();
    options.include_untracked(true);
    let has_uncommitted_changes = !repo.statuses(Some(&mut options))?.is_empty();

    Ok(WorktreeContext {
        path: path.to_path_buf(),
        branch,
        is_primary,
        has_uncommitted_changes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Signature;

    fn init_repo(dir: &Path) -> Repository {
        let repo = Repository::init(dir).unwrap();
        {
            let mut index = repo.index().unwrap();
            let tree_id = index.write_tree().unwrap();
            let tree = repo.find_tree(tree_id).unwrap();
            let sig = Signature::now("test", "test@example.com").unwrap();
            repo.commit(Some("HEAD"), &sig, &sig, "init", &tree, &[])
                .unwrap();
        }
        repo
    }

    #[tokio::test]
    async fn primary_context_reports_head_branch() {
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path());

        let provider = GitWorktreeProvider::new(dir.path());
        let contexts = provider.contexts().await.unwrap();

        assert_eq!(contexts.len(), 1);
        assert!(contexts[0].is_primary);
        assert_eq!(provider.primary_branch().await.unwrap(), contexts[0].branch);
    }

    #[tokio::test]
    async fn selection_starts_uninitialized() {
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path());

        let provider = GitWorktreeProvider::new(dir.path());
        assert!(provider.selected().await.unwrap().is_none());

        provider.select(dir.path()).await.unwrap();
        let selected = provider.selected().await.unwrap().unwrap();
        assert!(selected.is_primary);
    }

    #[tokio::test]
    async fn selecting_unknown_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path());

        let provider = GitWorktreeProvider::new(dir.path());
        let err = provider.select(Path::new("/nowhere")).await.unwrap_err();
        assert!(matches!(err, WorktreeError::NoSuchContext(_)));
    }

    #[tokio::test]
    async fn untracked_files_set_dirty_flag() {
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path());
        std::fs::write(dir.path().join("scratch.txt"), "wip").unwrap();

        let provider = GitWorktreeProvider::new(dir.path());
        let contexts = provider.contexts().await.unwrap();
        assert!(contexts[0].has_uncommitted_changes);
    }
}
