//! Runner abstraction.

use std::path::Path;

use async_trait::async_trait;

use agentboard_core::Feature;

/// Error type for runner operations.
pub type Result<T> = std::result::Result<T, RunnerError>;

/// Errors that can occur while issuing a start request.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Failed to launch the agent process
    #[error("Failed to launch agent: {0}")]
    Launch(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Starts agent sessions for features.
///
/// `start_feature` only waits for the collaborator to *accept* the request,
/// never for the session to finish: `Ok(true)` means accepted, `Ok(false)`
/// means declined. Session lifecycle (started / completed / failed) arrives
/// asynchronously on the runner's event channel.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    /// Request a session implementing `feature` inside `workdir`.
    async fn start_feature(&self, feature: &Feature, workdir: &Path) -> Result<bool>;
}
