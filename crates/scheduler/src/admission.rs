//! The concurrency admission loop.
//!
//! [`AutoScheduler`] is a single task that owns the RunTracker and drives a
//! recurring tick: compute free slots, re-derive eligibility from a fresh
//! feature snapshot and the current context selection, and issue start
//! requests for the highest-priority eligible features. Agent events and
//! control commands are consumed on the same task, so ticks are mutually
//! exclusive and slot accounting never races.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use agentboard_core::{
    AgentEvent, Feature, FeatureFilter, FeaturePatch, FeatureStatus, SchedulerConfig,
};
use agentboard_graph::resolve;
use agentboard_runner::AgentRunner;
use agentboard_storage::FeatureStore;
use agentboard_worktree::{WorktreeError, WorktreeProvider};

use crate::eligibility::{eligible_features, BranchTarget};
use crate::tracker::RunTracker;

/// Error type for scheduler handle operations.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// The scheduler task is gone
    #[error("Scheduler is no longer running")]
    Stopped,
}

/// Observable snapshot of the loop, published after every tick and event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStatus {
    /// Confirmed running sessions
    pub running: usize,

    /// Start-requested, unconfirmed sessions
    pub pending: usize,

    /// Current concurrency limit
    pub max_concurrency: usize,

    /// Whether auto mode is on
    pub active: bool,
}

enum Command {
    Disable,
    Enable,
    Shutdown,
}

/// Control handle for a running [`AutoScheduler`].
///
/// Cheap to clone; all clones talk to the same scheduler task.
#[derive(Clone)]
pub struct SchedulerHandle {
    active: Arc<AtomicBool>,
    commands: mpsc::Sender<Command>,
    config: Arc<watch::Sender<SchedulerConfig>>,
    status: watch::Receiver<SchedulerStatus>,
}

impl SchedulerHandle {
    /// Turn auto mode off: no new ticks admit features, and pending
    /// records are dropped. Running sessions are left alone; stopping them
    /// is a separate, explicit operation outside this loop.
    pub async fn disable(&self) -> Result<(), SchedulerError> {
        // Flip the flag first so an in-progress tick stops admitting
        // before the command is even processed.
        self.active.store(false, Ordering::SeqCst);
        self.commands
            .send(Command::Disable)
            .await
            .map_err(|_| SchedulerError::Stopped)
    }

    /// Turn auto mode back on.
    pub async fn enable(&self) -> Result<(), SchedulerError> {
        self.active.store(true, Ordering::SeqCst);
        self.commands
            .send(Command::Enable)
            .await
            .map_err(|_| SchedulerError::Stopped)
    }

    /// Stop the scheduler task entirely.
    pub async fn shutdown(&self) -> Result<(), SchedulerError> {
        self.active.store(false, Ordering::SeqCst);
        self.commands
            .send(Command::Shutdown)
            .await
            .map_err(|_| SchedulerError::Stopped)
    }

    /// Replace the scheduler configuration; the next tick reads it.
    pub fn update_config(&self, config: SchedulerConfig) -> Result<(), SchedulerError> {
        self.config
            .send(config)
            .map_err(|_| SchedulerError::Stopped)
    }

    /// Latest published status.
    pub fn status(&self) -> SchedulerStatus {
        *self.status.borrow()
    }
}

/// The admission loop actor.
///
/// Owns the run-state tracker and is the only writer to it. Collaborators
/// are injected: the feature store (snapshot + the one-time branch
/// assignment write), the worktree provider (read-only context selection),
/// and the agent runner (start requests, fire-and-forget).
pub struct AutoScheduler<S, W, R> {
    store: Arc<Mutex<S>>,
    worktrees: Arc<W>,
    runner: Arc<R>,
    tracker: RunTracker,
    active: Arc<AtomicBool>,
    config: watch::Receiver<SchedulerConfig>,
    config_tx: Arc<watch::Sender<SchedulerConfig>>,
    events: mpsc::Receiver<AgentEvent>,
    commands: mpsc::Receiver<Command>,
    commands_tx: mpsc::Sender<Command>,
    status: watch::Sender<SchedulerStatus>,
}

impl<S, W, R> AutoScheduler<S, W, R>
where
    S: FeatureStore,
    W: WorktreeProvider,
    R: AgentRunner,
{
    /// Create a scheduler consuming agent events from `events`.
    pub fn new(store: S, worktrees: W, runner: R, events: mpsc::Receiver<AgentEvent>) -> Self {
        Self::with_config(store, worktrees, runner, events, SchedulerConfig::default())
    }

    /// Create a scheduler with an explicit initial configuration.
    pub fn with_config(
        store: S,
        worktrees: W,
        runner: R,
        events: mpsc::Receiver<AgentEvent>,
        config: SchedulerConfig,
    ) -> Self {
        let (config_tx, config_rx) = watch::channel(config);
        let (commands_tx, commands_rx) = mpsc::channel(16);
        let (status_tx, _) = watch::channel(SchedulerStatus::default());
        Self {
            store: Arc::new(Mutex::new(store)),
            worktrees: Arc::new(worktrees),
            runner: Arc::new(runner),
            tracker: RunTracker::new(),
            active: Arc::new(AtomicBool::new(true)),
            config: config_rx,
            config_tx: Arc::new(config_tx),
            events,
            commands: commands_rx,
            commands_tx,
            status: status_tx,
        }
    }

    /// Control handle for this scheduler. Valid until the task stops.
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            active: self.active.clone(),
            commands: self.commands_tx.clone(),
            config: self.config_tx.clone(),
            status: self.status.subscribe(),
        }
    }

    /// Whether auto mode is currently on.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Read access to the tracker, for status and tests.
    pub fn tracker(&self) -> &RunTracker {
        &self.tracker
    }

    /// Drive the loop until shutdown. Ticks, agent events, and commands are
    /// all handled on this task.
    pub async fn run(mut self) {
        let mut tick_interval = self.config.borrow().tick_interval;
        let mut interval = tokio::time::interval(tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Admission loop started (tick every {:?})", tick_interval);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let current = self.config.borrow().tick_interval;
                    if current != tick_interval {
                        tick_interval = current;
                        interval = tokio::time::interval(tick_interval);
                        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    }
                    if self.is_active() {
                        self.run_tick().await;
                    }
                }
                Some(event) = self.events.recv() => {
                    self.handle_event(event);
                }
                command = self.commands.recv() => {
                    match command {
                        Some(Command::Disable) => {
                            let dropped = self.tracker.clear_pending();
                            info!("Auto mode disabled; dropped {dropped} pending records");
                            self.publish_status();
                        }
                        Some(Command::Enable) => {
                            info!("Auto mode enabled");
                            self.publish_status();
                        }
                        Some(Command::Shutdown) | None => break,
                    }
                }
            }
        }

        info!("Admission loop stopped");
    }

    /// Execute one admission tick.
    ///
    /// Never blocks on agent work: start requests only wait for the
    /// collaborator to accept. Eligibility is re-derived from a fresh
    /// snapshot every time; nothing is cached across ticks.
    pub async fn run_tick(&mut self) {
        if !self.is_active() {
            return;
        }

        let config = self.config.borrow().clone();
        let slots = config
            .max_concurrency
            .get()
            .saturating_sub(self.tracker.in_flight());
        if slots == 0 {
            return;
        }

        let features = match self
            .store
            .lock()
            .await
            .list_features(&FeatureFilter::default())
            .await
        {
            Ok(features) => features,
            Err(e) => {
                warn!("Skipping tick: feature snapshot unavailable: {e}");
                return;
            }
        };

        let target = match self.branch_target().await {
            Ok(target) => target,
            Err(e) => {
                warn!("Skipping tick: no worktree context: {e}");
                return;
            }
        };

        let report = resolve(&features);
        let selected: Vec<Feature> =
            eligible_features(&features, &target, &report, config.blocking_enabled)
                .into_iter()
                .filter(|f| !self.tracker.contains(f.id))
                .take(slots)
                .cloned()
                .collect();

        for feature in selected {
            // Disabling auto mode can race an in-progress tick; re-check
            // before every start request.
            if !self.is_active() {
                debug!("Auto mode disabled mid-tick; abandoning remaining admissions");
                break;
            }
            self.admit(feature, &target).await;
        }

        self.publish_status();
    }

    /// Admit one feature: bind it to a branch if needed, issue the start
    /// request, and track the pending run. Failures are local to the
    /// feature; the tick moves on.
    async fn admit(&mut self, mut feature: Feature, target: &BranchTarget) {
        if feature.branch_name.is_none() && target.is_primary {
            // One-time binding of an unassigned feature to the branch it
            // first runs on, persisted before the session starts.
            let patch = FeaturePatch::branch(target.branch.clone());
            if let Err(e) = self
                .store
                .lock()
                .await
                .update_feature(feature.id, patch)
                .await
            {
                warn!(
                    "Not starting feature {}: branch assignment failed: {e}",
                    feature.id
                );
                return;
            }
            feature.branch_name = Some(target.branch.clone());
        }

        match self.runner.start_feature(&feature, &target.path).await {
            Ok(true) => {
                if !self.tracker.mark_pending(feature.id) {
                    // Guarded by the eligibility filter; a hit here means a
                    // bookkeeping bug, not a schedulable state.
                    error!("Started feature {} that was already tracked", feature.id);
                    return;
                }
                info!(
                    "Admitted feature {} ({}) on branch {}",
                    feature.id,
                    feature.title,
                    feature.branch_name.as_deref().unwrap_or("<none>")
                );
                let patch = FeaturePatch::status(FeatureStatus::InProgress);
                if let Err(e) = self
                    .store
                    .lock()
                    .await
                    .update_feature(feature.id, patch)
                    .await
                {
                    warn!("Failed to move feature {} to in_progress: {e}", feature.id);
                }
            }
            Ok(false) => {
                warn!("Runner declined feature {}", feature.id);
            }
            Err(e) => {
                warn!("Start request for feature {} failed: {e}", feature.id);
            }
        }
    }

    /// Feed one collaborator event through the tracker.
    pub fn handle_event(&mut self, event: AgentEvent) {
        debug!("Agent event for {}: {:?}", event.feature_id, event.kind);
        self.tracker.apply(&event);
        self.publish_status();
    }

    /// Resolve the branch/context target for this tick. Falls back to the
    /// primary context while no selection has been made yet.
    async fn branch_target(&self) -> Result<BranchTarget, WorktreeError> {
        if let Some(context) = self.worktrees.selected().await? {
            return Ok(BranchTarget::from_context(&context));
        }
        let contexts = self.worktrees.contexts().await?;
        contexts
            .iter()
            .find(|c| c.is_primary)
            .map(BranchTarget::from_context)
            .ok_or(WorktreeError::NoPrimaryContext)
    }

    fn publish_status(&self) {
        self.status.send_replace(SchedulerStatus {
            running: self.tracker.running_count(),
            pending: self.tracker.pending_count(),
            max_concurrency: self.config.borrow().max_concurrency.get(),
            active: self.is_active(),
        });
    }
}
