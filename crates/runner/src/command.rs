//! Process-spawning runner.
//!
//! Launches one agent process per feature (e.g. a headless coding-agent
//! CLI) and reports its lifecycle on the event channel. A successful spawn
//! counts as acceptance; the exit status decides completed vs failed.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use agentboard_core::{AgentEvent, AgentEventKind, Feature};

use super::{AgentRunner, Result};

/// How to launch the agent command.
#[derive(Debug, Clone)]
pub struct CommandConfig {
    /// Program to execute
    pub program: String,

    /// Arguments passed before the feature prompt
    pub args: Vec<String>,

    /// Extra environment variables
    pub env: Vec<(String, String)>,
}

impl CommandConfig {
    /// Config that runs `program` with no extra arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    /// Add arguments (builder style).
    pub fn with_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.args.extend(args);
        self
    }

    /// Add an environment variable (builder style).
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// Runner that spawns a configured agent command per feature.
///
/// The feature description is appended as the final argument (the prompt);
/// the feature id and title travel in `AGENTBOARD_FEATURE_ID` /
/// `AGENTBOARD_FEATURE_TITLE`. The child is not awaited by the caller: a
/// monitor task emits `Started` after the spawn and `Completed`/`Failed`
/// from the exit status.
pub struct CommandRunner {
    config: CommandConfig,
    events: mpsc::Sender<AgentEvent>,
}

impl CommandRunner {
    /// Create a runner that emits session events into `events`.
    pub fn new(config: CommandConfig, events: mpsc::Sender<AgentEvent>) -> Self {
        Self { config, events }
    }
}

#[async_trait::async_trait]
impl AgentRunner for CommandRunner {
    async fn start_feature(&self, feature: &Feature, workdir: &Path) -> Result<bool> {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args)
            .arg(&feature.description)
            .env("AGENTBOARD_FEATURE_ID", feature.id.to_string())
            .env("AGENTBOARD_FEATURE_TITLE", &feature.title)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        for (key, value) in &self.config.env {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn()?;
        debug!(
            "Spawned agent for feature {} in {}",
            feature.id,
            workdir.display()
        );

        let feature_id = feature.id;
        let workdir = workdir.to_path_buf();
        let events = self.events.clone();
        tokio::spawn(async move {
            let started = AgentEvent::now(feature_id, AgentEventKind::Started)
                .with_workdir(workdir.clone());
            if events.send(started).await.is_err() {
                // Receiver gone; the session keeps running unobserved.
                return;
            }

            let kind = match child.wait().await {
                Ok(status) if status.success() => AgentEventKind::Completed,
                Ok(status) => AgentEventKind::Failed {
                    message: format!("agent exited with {status}"),
                },
                Err(e) => AgentEventKind::Failed {
                    message: format!("failed to await agent: {e}"),
                },
            };
            if let AgentEventKind::Failed { message } = &kind {
                warn!("Agent session for {feature_id} failed: {message}");
            }
            let settled = AgentEvent::now(feature_id, kind).with_workdir(workdir);
            let _ = events.send(settled).await;
        });

        Ok(true)
    }
}
