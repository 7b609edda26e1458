//! agentboard CLI - a feature board scheduled onto coding agents.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::info;

use agentboard_core::{
    Feature, FeatureFilter, FeatureId, FeaturePatch, FeatureStatus, Priority, SchedulerConfig,
};
use agentboard_graph::resolve;
use agentboard_runner::{CommandConfig, CommandRunner};
use agentboard_scheduler::AutoScheduler;
use agentboard_storage::{FeatureStore, JsonFeatureStore};
use agentboard_worktree::{GitWorktreeProvider, WorktreeProvider};

#[derive(Parser)]
#[command(name = "agentboard")]
#[command(about = "Kanban features implemented by autonomous coding agents", long_about = None)]
struct Cli {
    /// Project directory (the board lives in <project>/.agentboard)
    #[arg(long, default_value = ".")]
    project: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new feature to the backlog
    Add {
        /// Card title
        title: String,
        /// Description, used as the agent prompt
        description: String,
        /// Priority (1 = highest, 3 = lowest)
        #[arg(long, default_value = "2")]
        priority: u8,
        /// Scope the feature to a branch
        #[arg(long)]
        branch: Option<String>,
    },
    /// List features
    List {
        /// Filter by status
        #[arg(long)]
        status: Option<String>,
    },
    /// Show feature details
    Show {
        /// Feature ID
        id: String,
    },
    /// Declare that one feature depends on another
    Link {
        /// Dependent feature ID
        id: String,
        /// Feature it depends on
        depends_on: String,
    },
    /// Show the resolved execution order and dependency diagnostics
    Deps,
    /// Move a feature to waiting_approval
    Approve {
        /// Feature ID
        id: String,
    },
    /// Mark a feature verified
    Verify {
        /// Feature ID
        id: String,
    },
    /// Mark a feature completed
    Complete {
        /// Feature ID
        id: String,
    },
    /// Run auto mode: schedule backlog features onto agent sessions
    Run {
        /// Agent command to launch per feature
        #[arg(long, default_value = "claude")]
        agent: String,
        /// Extra arguments passed to the agent command
        #[arg(long)]
        agent_arg: Vec<String>,
        /// Max concurrent agent sessions
        #[arg(long, default_value = "1")]
        max_concurrency: usize,
        /// Schedule features even when their dependencies are incomplete
        #[arg(long)]
        ignore_blocking: bool,
        /// Tick interval in milliseconds
        #[arg(long, default_value = "1000")]
        tick_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut store = JsonFeatureStore::new(cli.project.join(".agentboard")).await?;

    match cli.command {
        Commands::Add {
            title,
            description,
            priority,
            branch,
        } => {
            let mut feature =
                Feature::new(title, description).with_priority(Priority::from_level(priority));
            if let Some(branch) = branch {
                feature = feature.with_branch(branch);
            }
            store.save_feature(&feature).await?;
            println!("Added feature: {} - {}", feature.id, feature.title);
        }
        Commands::List { status } => {
            let filter = FeatureFilter {
                status: parse_status(status.as_deref())?.map(|s| vec![s]),
                ..Default::default()
            };
            let features = store.list_features(&filter).await?;

            println!("Features ({})", features.len());
            for feature in features {
                println!(
                    "  {} | {:>16} | p{} | {} - {}",
                    feature.id,
                    feature.status.as_str(),
                    feature.priority,
                    feature.branch_name.as_deref().unwrap_or("<unassigned>"),
                    feature.title,
                );
            }
        }
        Commands::Show { id } => {
            let Some(feature) = store.load_feature(parse_id(&id)?).await? else {
                println!("Feature not found");
                return Ok(());
            };

            println!("Feature: {}", feature.id);
            println!("  Title: {}", feature.title);
            println!("  Status: {}", feature.status.as_str());
            println!("  Priority: {}", feature.priority);
            println!(
                "  Branch: {}",
                feature.branch_name.as_deref().unwrap_or("<unassigned>")
            );
            println!("  Created: {}", feature.created_at);
            if !feature.dependencies.is_empty() {
                println!("  Depends on:");
                for dep in &feature.dependencies {
                    println!("    {dep}");
                }
            }
            println!("  {}", feature.description);
        }
        Commands::Link { id, depends_on } => {
            let id = parse_id(&id)?;
            let dep = parse_id(&depends_on)?;
            let Some(feature) = store.load_feature(id).await? else {
                anyhow::bail!("Feature not found: {id}");
            };
            let mut dependencies = feature.dependencies;
            if !dependencies.contains(&dep) {
                dependencies.push(dep);
            }
            store
                .update_feature(
                    id,
                    FeaturePatch {
                        dependencies: Some(dependencies),
                        ..Default::default()
                    },
                )
                .await?;
            println!("{id} now depends on {dep}");
        }
        Commands::Deps => {
            let features = store.list_features(&FeatureFilter::default()).await?;
            let report = resolve(&features);
            let by_id: HashMap<FeatureId, &Feature> =
                features.iter().map(|f| (f.id, f)).collect();

            println!("Execution order:");
            for (position, id) in report.order.iter().enumerate() {
                let title = by_id.get(id).map(|f| f.title.as_str()).unwrap_or("?");
                let marker = if report.in_cycle(*id) { " [cycle]" } else { "" };
                println!("  {:>3}. {} - {}{}", position + 1, id, title, marker);
            }
            for cycle in &report.cycles {
                let ids: Vec<String> = cycle.iter().map(|id| id.to_string()).collect();
                println!("Cycle: {}", ids.join(" -> "));
            }
            for (id, missing) in &report.missing {
                for dep in missing {
                    println!("Missing dependency: {id} -> {dep}");
                }
            }
            for (id, blocked) in &report.blocked {
                for dep in blocked {
                    println!("Blocked: {id} waits for {dep}");
                }
            }
        }
        Commands::Approve { id } => {
            set_status(&mut store, &id, FeatureStatus::WaitingApproval).await?;
        }
        Commands::Verify { id } => {
            set_status(&mut store, &id, FeatureStatus::Verified).await?;
        }
        Commands::Complete { id } => {
            set_status(&mut store, &id, FeatureStatus::Completed).await?;
        }
        Commands::Run {
            agent,
            agent_arg,
            max_concurrency,
            ignore_blocking,
            tick_ms,
        } => {
            let max = NonZeroUsize::new(max_concurrency)
                .ok_or_else(|| anyhow::anyhow!("max-concurrency must be at least 1"))?;
            let config = SchedulerConfig::new()
                .with_max_concurrency(max)
                .with_blocking(!ignore_blocking)
                .with_tick_interval(Duration::from_millis(tick_ms));

            let provider = GitWorktreeProvider::new(&cli.project);
            info!(
                "Scheduling against primary branch {}",
                provider.primary_branch().await?
            );

            let (events_tx, events_rx) = mpsc::channel(64);
            let runner =
                CommandRunner::new(CommandConfig::new(agent).with_args(agent_arg), events_tx);

            let scheduler = AutoScheduler::with_config(store, provider, runner, events_rx, config);
            let handle = scheduler.handle();
            let join = tokio::spawn(scheduler.run());

            println!("Auto mode on; Ctrl-C to stop scheduling.");
            tokio::signal::ctrl_c().await?;

            let status = handle.status();
            println!(
                "Stopping: {} running, {} pending (running sessions are left alone)",
                status.running, status.pending
            );
            handle.disable().await?;
            handle.shutdown().await?;
            join.await?;
        }
    }

    Ok(())
}

async fn set_status(store: &mut JsonFeatureStore, id: &str, status: FeatureStatus) -> Result<()> {
    let id = parse_id(id)?;
    store
        .update_feature(id, FeaturePatch::status(status))
        .await?;
    println!("{id} -> {}", status.as_str());
    Ok(())
}

fn parse_id(s: &str) -> Result<FeatureId> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("Invalid feature ID: {s}"))
}

fn parse_status(s: Option<&str>) -> Result<Option<FeatureStatus>> {
    let Some(s) = s else { return Ok(None) };
    let status = match s.to_lowercase().as_str() {
        "backlog" => FeatureStatus::Backlog,
        "in_progress" => FeatureStatus::InProgress,
        "waiting_approval" => FeatureStatus::WaitingApproval,
        "verified" => FeatureStatus::Verified,
        "completed" => FeatureStatus::Completed,
        other => anyhow::bail!("Unknown status: {other}"),
    };
    Ok(Some(status))
}
