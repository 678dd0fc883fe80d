// SPDX-License-Identifier: MIT

//! `pg` — administrative CLI for the programs-playground execution core.
//!
//! This binary and `pgd` share one process model (spec §9): there is no
//! wire protocol between them, so `pg` opens the same on-disk [`Store`]
//! directly. Treat mutating subcommands as offline/maintenance tooling —
//! running them alongside a live `pgd` violates the single-writer-per-process
//! assumption documented on [`pg_store::Store`]. `pg runs cancel` is the one
//! exception that talks to the cluster (it needs a live job runtime to tear
//! down the run's job), so it bootstraps the same way `pgd` does.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use pg_config::Settings;
use pg_core::{EnvironmentId, EnvironmentStatus, ProgramId, RetentionPolicyId, RunId, RunStatus};
use pg_engine::{EnvironmentManager, RetentionConfig, RetentionReconciler};
use pg_quota::{FixedQuotaLimits, UserQuotaLimits};
use pg_store::Store;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "pg", version, about = "programs-playground execution core")]
struct Cli {
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the daemon in the foreground: build engine, run executor, and
    /// all background reconcilers.
    Serve,
    /// Program inspection.
    Programs {
        #[command(subcommand)]
        command: ProgramsCommand,
    },
    /// Environment lifecycle operations.
    Environments {
        #[command(subcommand)]
        command: EnvironmentsCommand,
    },
    /// Run inspection and cancellation.
    Runs {
        #[command(subcommand)]
        command: RunsCommand,
    },
    /// Retention policy preview and manual sweep.
    Retention {
        #[command(subcommand)]
        command: RetentionCommand,
    },
    /// Per-user quota usage.
    Quota {
        #[command(subcommand)]
        command: QuotaCommand,
    },
}

#[derive(Subcommand)]
enum ProgramsCommand {
    /// List known programs.
    List {
        #[arg(long)]
        owner: Option<String>,
    },
    /// Show one program.
    Show { id: String },
}

#[derive(Subcommand)]
enum EnvironmentsCommand {
    /// List environments, optionally filtered by program and/or status.
    List {
        #[arg(long)]
        program: Option<String>,
        #[arg(long)]
        status: Option<String>,
    },
    Start { id: String },
    Stop { id: String },
    MarkReady { id: String },
    MarkFailed { id: String, error: String },
}

#[derive(Subcommand)]
enum RunsCommand {
    /// List runs, optionally filtered by owner and/or status.
    List {
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        status: Option<String>,
    },
    Show { id: String },
    /// Cancel a run (spec §4.4 "Cancellation").
    Cancel {
        id: String,
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum RetentionCommand {
    /// List configured retention policies.
    List,
    /// Preview what a policy would delete without deleting anything.
    Preview { id: String },
    /// Run one retention sweep cycle immediately.
    RunCycle,
}

#[derive(Subcommand)]
enum QuotaCommand {
    /// Show a user's current usage against the fixed default limits.
    Show { user_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let settings = Settings::load()?;

    match cli.command {
        Command::Serve => {
            let app = Arc::new(pg_daemon::Application::bootstrap(settings).await?);
            let cancellation = tokio_util::sync::CancellationToken::new();
            let shutdown_token = cancellation.clone();
            tokio::spawn(async move {
                let _ = tokio::signal::ctrl_c().await;
                shutdown_token.cancel();
            });
            app.run(cancellation).await
        }
        Command::Programs { command } => {
            let store = Store::open(settings.metadata_dir())?;
            run_programs(&store, command, cli.format)
        }
        Command::Environments { command } => {
            let store = Arc::new(Store::open(settings.metadata_dir())?);
            run_environments(store, command, cli.format)
        }
        Command::Runs { command } => run_runs(settings, command, cli.format).await,
        Command::Retention { command } => {
            let store = Arc::new(Store::open(settings.metadata_dir())?);
            run_retention(store, &settings, command, cli.format).await
        }
        Command::Quota { command } => {
            let store = Store::open(settings.metadata_dir())?;
            run_quota(&store, command, cli.format)
        }
    }
}

fn print_json_or<T: serde::Serialize>(format: OutputFormat, value: &T, text: impl FnOnce()) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => text(),
    }
    Ok(())
}

fn run_programs(store: &Store, command: ProgramsCommand, format: OutputFormat) -> Result<()> {
    match command {
        ProgramsCommand::List { owner } => {
            let programs = store.programs.list_filter(|p| owner.as_deref().map_or(true, |o| p.owner == o));
            print_json_or(format, &programs, || {
                if programs.is_empty() {
                    println!("no programs");
                }
                for p in &programs {
                    println!("{}  {:<24}  {}  owner={}", p.id, p.name, p.image_build_status, p.owner);
                }
            })
        }
        ProgramsCommand::Show { id } => {
            let id: ProgramId = id.parse().context("invalid program id")?;
            let program = store.programs.get(id.as_uuid()).context("program not found")?;
            print_json_or(format, &program, || println!("{:#?}", program))
        }
    }
}

fn run_environments(store: Arc<Store>, command: EnvironmentsCommand, format: OutputFormat) -> Result<()> {
    let manager = EnvironmentManager::new(store, pg_core::SystemClock);
    match command {
        EnvironmentsCommand::List { program, status } => {
            let program_filter: Option<ProgramId> =
                program.map(|p| p.parse()).transpose().context("invalid program id")?;
            let status_filter = status.map(|s| parse_environment_status(&s)).transpose()?;
            let environments = manager.list_environments(program_filter, status_filter);
            print_json_or(format, &environments, || {
                if environments.is_empty() {
                    println!("no environments");
                }
                for e in &environments {
                    println!("{}  program={}  {}", e.id, e.program_id, e.status);
                }
            })
        }
        EnvironmentsCommand::Start { id } => {
            let env = manager.start_environment(parse_environment_id(&id)?)?;
            print_json_or(format, &env, || println!("{} -> {}", env.id, env.status))
        }
        EnvironmentsCommand::Stop { id } => {
            let env = manager.stop_environment(parse_environment_id(&id)?)?;
            print_json_or(format, &env, || println!("{} -> {}", env.id, env.status))
        }
        EnvironmentsCommand::MarkReady { id } => {
            let env = manager.mark_ready(parse_environment_id(&id)?)?;
            print_json_or(format, &env, || println!("{} -> {}", env.id, env.status))
        }
        EnvironmentsCommand::MarkFailed { id, error } => {
            let env = manager.mark_failed(parse_environment_id(&id)?, error)?;
            print_json_or(format, &env, || println!("{} -> {}", env.id, env.status))
        }
    }
}

async fn run_runs(settings: Settings, command: RunsCommand, format: OutputFormat) -> Result<()> {
    let store = Store::open(settings.metadata_dir())?;
    match command {
        RunsCommand::List { owner, status } => {
            let status_filter = status.map(|s| parse_run_status(&s)).transpose()?;
            let runs = store.runs.list_filter(|r| {
                owner.as_deref().map_or(true, |o| r.owner_id == o) && status_filter.map_or(true, |s| r.status == s)
            });
            print_json_or(format, &runs, || {
                if runs.is_empty() {
                    println!("no runs");
                }
                for r in &runs {
                    println!("{}  owner={}  env={}  {}", r.id, r.owner_id, r.environment_id, r.status);
                }
            })
        }
        RunsCommand::Show { id } => {
            let id: RunId = id.parse().context("invalid run id")?;
            let run = store.runs.get(id.as_uuid()).context("run not found")?;
            print_json_or(format, &run, || println!("{:#?}", run))
        }
        RunsCommand::Cancel { id, force } => {
            let id: RunId = id.parse().context("invalid run id")?;
            let app = pg_daemon::Application::bootstrap(settings).await?;
            app.run_executor.cancel_run(id, force).await?;
            println!("cancelled {id}");
            Ok(())
        }
    }
}

async fn run_retention(
    store: Arc<Store>,
    settings: &Settings,
    command: RetentionCommand,
    format: OutputFormat,
) -> Result<()> {
    match command {
        RetentionCommand::List => {
            let policies = store.retention_policies.list();
            print_json_or(format, &policies, || {
                if policies.is_empty() {
                    println!("no retention policies");
                }
                for p in &policies {
                    println!(
                        "{}  {:<28}  {}/{:?}  threshold={}  enabled={}",
                        p.id, p.name, p.resource_type, p.condition, p.threshold, p.enabled
                    );
                }
            })
        }
        RetentionCommand::Preview { id } => {
            let id: RetentionPolicyId = id.parse().context("invalid retention policy id")?;
            let reconciler = RetentionReconciler::new(store, pg_core::SystemClock, retention_config(settings));
            let preview = reconciler.preview_policy(id)?;
            print_json_or(format, &preview, || {
                println!(
                    "policy {id} would affect {} resource(s), freeing {} bytes:",
                    preview.matching_count, preview.total_size_bytes
                );
                for matched in &preview.resource_ids {
                    println!("  {matched}");
                }
            })
        }
        RetentionCommand::RunCycle => {
            let reconciler = RetentionReconciler::new(store, pg_core::SystemClock, retention_config(settings));
            let metrics = reconciler.tick().await;
            print_json_or(format, &metrics, || {
                println!(
                    "evaluated {} policies: {} artifacts, {} runs, {} environments, {} logs deleted, {} errors",
                    metrics.policies_evaluated,
                    metrics.artifacts_deleted,
                    metrics.runs_deleted,
                    metrics.environments_cleaned,
                    metrics.logs_deleted,
                    metrics.errors.len()
                );
                for err in &metrics.errors {
                    println!("  error: {err}");
                }
            })
        }
    }
}

fn retention_config(settings: &Settings) -> RetentionConfig {
    RetentionConfig {
        enabled: settings.retention_policy_enabled,
        interval_seconds: settings.retention_policy_interval_seconds,
        default_run_retention_days: settings.run_retention_days,
    }
}

fn run_quota(store: &Store, command: QuotaCommand, format: OutputFormat) -> Result<()> {
    match command {
        QuotaCommand::Show { user_id } => {
            let limits = default_quota_limits();
            let usage = store
                .quota_usage
                .get(pg_store::user_keyed_uuid(&user_id))
                .unwrap_or_else(|| pg_core::QuotaUsage::empty(&user_id, chrono::Utc::now()));
            let concurrent = store.runs.list_filter(|r| r.owner_id == user_id && !r.status.is_terminal()).len();
            print_json_or(format, &usage, || {
                println!("user: {user_id}");
                println!("  concurrent runs:  {concurrent} / {}", limits.max_concurrent_runs);
                println!("  runs today:       {} / {}", usage.runs_today, limits.max_runs_per_day);
                println!(
                    "  cpu-hours month:  {:.2} / {:.2}",
                    usage.cpu_hours_month, limits.max_cpu_hours_per_month
                );
            })
        }
    }
}

fn default_quota_limits() -> UserQuotaLimits {
    FixedQuotaLimits(UserQuotaLimits::new(3, 50, 100.0, 10_240)).0
}

fn parse_environment_id(s: &str) -> Result<EnvironmentId> {
    s.parse().context("invalid environment id")
}

fn parse_environment_status(s: &str) -> Result<EnvironmentStatus> {
    use EnvironmentStatus::*;
    Ok(match s.to_ascii_lowercase().as_str() {
        "creating" => Creating,
        "ready" => Ready,
        "starting" => Starting,
        "running" => Running,
        "stopping" => Stopping,
        "stopped" => Stopped,
        "failed" => Failed,
        "deleting" => Deleting,
        other => bail!("unknown environment status: {other}"),
    })
}

fn parse_run_status(s: &str) -> Result<RunStatus> {
    use RunStatus::*;
    Ok(match s.to_ascii_lowercase().as_str() {
        "queued" => Queued,
        "starting" => Starting,
        "running" => Running,
        "succeeded" => Succeeded,
        "failed" => Failed,
        "cancelled" => Cancelled,
        other => bail!("unknown run status: {other}"),
    })
}
