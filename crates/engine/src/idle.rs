//! Idle Reconciler (spec §4.8, C8): stops long-idle `running` Environments,
//! deletes terminal Runs past a hard retention floor (independent of any
//! `RetentionPolicy`), and sweeps cluster jobs left behind by Runs that are
//! already terminal or gone.

use crate::environment::EnvironmentManager;
use pg_adapters::ClusterJobRuntime;
use pg_core::{Clock, EnvironmentStatus};
use pg_store::Store;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct IdleControllerConfig {
    pub enabled: bool,
    pub interval_seconds: u64,
    pub environment_idle_timeout_minutes: u64,
    pub run_retention_days: u64,
    pub stale_job_timeout_minutes: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ControllerMetrics {
    pub environments_checked: usize,
    pub environments_stopped: usize,
    pub runs_checked: usize,
    pub runs_deleted: usize,
    pub jobs_checked: usize,
    pub jobs_cleaned: usize,
    pub errors: Vec<String>,
    pub duration: StdDuration,
}

pub struct IdleController<C: Clock> {
    store: Arc<Store>,
    clock: C,
    environments: EnvironmentManager<C>,
    job_runtime: Arc<dyn ClusterJobRuntime>,
    config: IdleControllerConfig,
}

impl<C: Clock> IdleController<C> {
    pub fn new(
        store: Arc<Store>,
        clock: C,
        job_runtime: Arc<dyn ClusterJobRuntime>,
        config: IdleControllerConfig,
    ) -> Self {
        let environments = EnvironmentManager::new(store.clone(), clock.clone());
        Self { store, clock, environments, job_runtime, config }
    }

    fn age_days(&self, at: chrono::DateTime<chrono::Utc>) -> f64 {
        (self.clock.now() - at).num_seconds() as f64 / 86_400.0
    }

    fn age_minutes(&self, at: chrono::DateTime<chrono::Utc>) -> f64 {
        (self.clock.now() - at).num_seconds() as f64 / 60.0
    }

    /// Stop `running` Environments whose `updatedAt` is older than
    /// `environment_idle_timeout_minutes`. `running -> stopping` is always a
    /// valid transition, so failures here reflect a store-level problem,
    /// not a stale state machine.
    fn stop_idle_environments(&self, metrics: &mut ControllerMetrics) {
        let running = self.store.environments.list_filter(|e| e.status == EnvironmentStatus::Running);
        metrics.environments_checked += running.len();
        for env in running {
            if self.age_minutes(env.updated_at) < self.config.environment_idle_timeout_minutes as f64 {
                continue;
            }
            match self.environments.stop_environment(env.id) {
                Ok(_) => metrics.environments_stopped += 1,
                Err(e) => metrics.errors.push(format!("stop environment {}: {e}", env.id)),
            }
        }
    }

    /// Delete terminal Runs older than `run_retention_days`, independent of
    /// any configured `RetentionPolicy` — a hard floor so Runs don't pile up
    /// forever in a deployment that has no retention policies configured.
    fn delete_aged_runs(&self, metrics: &mut ControllerMetrics) {
        let terminal = self.store.runs.list_filter(|r| r.status.is_terminal());
        metrics.runs_checked += terminal.len();
        for run in terminal {
            let Some(completed_at) = run.completed_at else { continue };
            if self.age_days(completed_at) < self.config.run_retention_days as f64 {
                continue;
            }
            match self.store.runs.remove(run.id.as_uuid()) {
                Ok(_) => metrics.runs_deleted += 1,
                Err(e) => metrics.errors.push(format!("delete run {}: {e}", run.id)),
            }
        }
    }

    /// Delete cluster jobs labeled `mellea-run-*` whose associated Run is
    /// already terminal or no longer present, once the job has outlived
    /// `stale_job_timeout_minutes`. A job tied to a non-terminal Run is
    /// left alone — it's still doing work.
    async fn clean_stale_jobs(&self, metrics: &mut ControllerMetrics) {
        let jobs = match self.job_runtime.list_run_jobs().await {
            Ok(jobs) => jobs,
            Err(e) => {
                metrics.errors.push(format!("list run jobs: {e}"));
                return;
            }
        };
        metrics.jobs_checked += jobs.len();

        for job in jobs {
            if self.age_minutes(job.created_at) < self.config.stale_job_timeout_minutes as f64 {
                continue;
            }
            let run = self.store.runs.list_filter(|r| r.job_name.as_deref() == Some(job.name.as_str())).into_iter().next();
            let stale = match run {
                Some(r) => r.status.is_terminal(),
                None => true,
            };
            if !stale {
                continue;
            }
            match self.job_runtime.delete_job(&job.name).await {
                Ok(()) => metrics.jobs_cleaned += 1,
                Err(e) => metrics.errors.push(format!("delete job {}: {e}", job.name)),
            }
        }
    }

    /// One reconciliation pass over all three sweeps.
    pub async fn tick(&self) -> ControllerMetrics {
        let started = std::time::Instant::now();
        let mut metrics = ControllerMetrics::default();

        self.stop_idle_environments(&mut metrics);
        self.delete_aged_runs(&mut metrics);
        self.clean_stale_jobs(&mut metrics).await;

        if !metrics.errors.is_empty() {
            tracing::warn!(errors = ?metrics.errors, "idle controller tick completed with errors");
        }
        metrics.duration = started.elapsed();
        metrics
    }

    /// Spawn the tick loop as a background task, stopping cleanly when
    /// `cancellation` fires (spec §5).
    pub fn spawn(self: Arc<Self>, cancellation: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            if !self.config.enabled {
                return;
            }
            let interval = StdDuration::from_secs(self.config.interval_seconds);
            loop {
                let metrics = self.tick().await;
                tracing::debug!(
                    environments_stopped = metrics.environments_stopped,
                    runs_deleted = metrics.runs_deleted,
                    jobs_cleaned = metrics.jobs_cleaned,
                    "idle controller tick complete"
                );
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = cancellation.cancelled() => break,
                }
            }
        })
    }
}

#[cfg(test)]
#[path = "idle_tests.rs"]
mod tests;
