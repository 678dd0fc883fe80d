//! Run Executor (spec §4.4, C4): submits queued [`Run`]s as cluster jobs,
//! reconciles their status against the cluster, and finalizes terminal
//! runs (quota accounting, stdout capture, artifact persistence,
//! completion notification).

use crate::error::{EngineError, EngineResult};
use pg_adapters::{ClusterJobPhase, ClusterJobRuntime, CredentialService, JobSpec, Notifier};
use pg_artifacts::{ArtifactCollector, CollectArtifactRequest};
use pg_bus::{LogBus, LogEntry};
use pg_core::{
    ArtifactType, Clock, CoreError, CredentialId, EnvironmentId, ImageBuildStatus, ProgramId,
    ResourceLimits, Run, RunId, RunStatus,
};
use pg_quota::{QuotaEngine, QuotaLimitsResolver};
use pg_store::Store;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const MAX_CAPTURED_OUTPUT_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct RunExecutorConfig {
    pub enabled: bool,
    pub interval_seconds: u64,
    pub namespace: String,
    pub api_url: String,
    pub default_grace_seconds: u64,
}

pub struct RunExecutor<C: Clock> {
    store: Arc<Store>,
    clock: C,
    job_runtime: Arc<dyn ClusterJobRuntime>,
    credential_service: Arc<dyn CredentialService>,
    notifier: Arc<dyn Notifier>,
    log_bus: Arc<LogBus>,
    artifacts: Arc<ArtifactCollector<C>>,
    quota: QuotaEngine<C>,
    quota_limits: Arc<dyn QuotaLimitsResolver>,
    config: RunExecutorConfig,
}

impl<C: Clock> RunExecutor<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<Store>,
        clock: C,
        job_runtime: Arc<dyn ClusterJobRuntime>,
        credential_service: Arc<dyn CredentialService>,
        notifier: Arc<dyn Notifier>,
        log_bus: Arc<LogBus>,
        artifacts: Arc<ArtifactCollector<C>>,
        quota_limits: Arc<dyn QuotaLimitsResolver>,
        config: RunExecutorConfig,
    ) -> Self {
        let quota = QuotaEngine::new(store.clone(), clock.clone());
        Self {
            store,
            clock,
            job_runtime,
            credential_service,
            notifier,
            log_bus,
            artifacts,
            quota,
            quota_limits,
            config,
        }
    }

    /// Quota-checked Run creation: the path the external request surface
    /// (out of scope for this crate) calls at `POST /runs` time. Runs the
    /// Quota Engine's full pre-check and records the daily-run counter
    /// exactly once, before the Run ever enters the queue.
    pub fn create_run(
        &self,
        owner_id: impl Into<String>,
        environment_id: EnvironmentId,
        program_id: ProgramId,
        credential_ids: Vec<CredentialId>,
    ) -> EngineResult<Run> {
        let owner_id = owner_id.into();
        let limits = self.quota_limits.limits_for(&owner_id);
        self.quota.check_can_create_run(&owner_id, limits)?;

        let run = Run::new(owner_id.clone(), environment_id, program_id, credential_ids, &self.clock);
        self.store.runs.put(run.clone())?;
        self.quota.record_run_created(&owner_id)?;
        tracing::info!(run_id = %run.id, owner_id, "created run");
        Ok(run)
    }

    /// Spec §4.4 "Submission": loads the Run and its Environment/Program,
    /// waits out an in-progress image build, resolves credentials, and
    /// dispatches a cluster job. A Run left `queued` because its program is
    /// still building is retried on the next tick.
    pub async fn submit_run(&self, run_id: RunId) -> EngineResult<()> {
        let Some(run) = self.store.runs.get(run_id.as_uuid()) else {
            return Err(EngineError::from(CoreError::not_found("run", run_id)));
        };
        if run.status != RunStatus::Queued {
            return Ok(());
        }

        let Some(env) = self.store.environments.get(run.environment_id.as_uuid()) else {
            return self.fail_run(run_id, "environment not found").await;
        };
        let Some(program) = self.store.programs.get(run.program_id.as_uuid()) else {
            return self.fail_run(run_id, "program not found").await;
        };

        if env.image_tag.is_empty() {
            if program.image_build_status == ImageBuildStatus::Failed {
                let message =
                    program.image_build_error.clone().unwrap_or_else(|| "image build failed".to_string());
                return self.fail_run(run_id, message).await;
            }
            return Ok(());
        }

        let job_name = format!("mellea-run-{}", run.environment_id.short());
        let clock = self.clock.clone();
        self.store.runs.update(run_id.as_uuid(), |r| {
            let _ = r.transition_to(RunStatus::Starting, &clock, None);
            r.job_name = Some(job_name.clone());
        })?;

        let mut secret_names = Vec::new();
        for credential_id in &run.credential_ids {
            if let Some(secret) = self.credential_service.resolve_to_secret_name(*credential_id).await {
                secret_names.push(secret.0);
            }
        }

        let resource_limits = env.resource_limits.clone().unwrap_or(ResourceLimits {
            cpu_limit: program.resource_profile.cpu_limit,
            memory_limit_mb: program.resource_profile.memory_limit_mb,
        });

        let mut env_vars = HashMap::new();
        env_vars.insert("MELLEA_RUN_ID".to_string(), run_id.to_string());
        env_vars.insert("MELLEA_API_URL".to_string(), self.config.api_url.clone());

        let spec = JobSpec {
            name_prefix: job_name.clone(),
            namespace: self.config.namespace.clone(),
            image: env.image_tag.clone(),
            command: vec![program.entrypoint.clone()],
            env: env_vars,
            cpu_limit: resource_limits.cpu_limit,
            memory_limit_mb: resource_limits.memory_limit_mb,
            timeout_seconds: program.resource_profile.timeout_seconds,
            secret_names,
        };

        match self.job_runtime.create_job(spec).await {
            Ok(created_name) => {
                self.store.runs.update(run_id.as_uuid(), |r| r.job_name = Some(created_name))?;
                Ok(())
            }
            Err(e) => self.fail_run(run_id, e.to_string()).await,
        }
    }

    async fn fail_run(&self, run_id: RunId, message: impl Into<String>) -> EngineResult<()> {
        let message = message.into();
        let clock = self.clock.clone();
        self.store.runs.update(run_id.as_uuid(), |r| {
            let _ = r.transition_to(RunStatus::Failed, &clock, Some(message.clone()));
        })?;
        self.finalize_terminal_run(run_id).await
    }

    /// Spec §4.4 "Status sync": polls the cluster job and maps its phase
    /// onto the Run state machine. An unmapped transition (e.g. the
    /// cluster reports `running` for a Run already marked `succeeded`) is
    /// logged and ignored rather than propagated.
    pub async fn sync_run_status(&self, run_id: RunId) -> EngineResult<()> {
        let Some(run) = self.store.runs.get(run_id.as_uuid()) else { return Ok(()) };
        if run.status.is_terminal() {
            return Ok(());
        }
        let Some(job_name) = run.job_name.clone() else { return Ok(()) };

        let status = match self.job_runtime.get_job_status(&job_name).await {
            Ok(status) => status,
            Err(_) => return Ok(()),
        };

        let mapped = match status.phase {
            ClusterJobPhase::Pending => RunStatus::Starting,
            ClusterJobPhase::Running => RunStatus::Running,
            ClusterJobPhase::Succeeded => RunStatus::Succeeded,
            ClusterJobPhase::Failed => RunStatus::Failed,
        };
        if mapped == run.status {
            return Ok(());
        }
        if !run.status.can_transition(mapped) {
            tracing::debug!(run_id = %run_id, from = %run.status, to = %mapped, "ignoring unreachable job status transition");
            return Ok(());
        }

        let clock = self.clock.clone();
        let error_message = status.error_message.clone();
        self.store.runs.update(run_id.as_uuid(), |r| {
            let _ = r.transition_to(mapped, &clock, error_message.clone());
            if let Some(code) = status.exit_code {
                r.exit_code = Some(code);
            }
        })?;

        if mapped.is_terminal() {
            self.finalize_terminal_run(run_id).await?;
        }
        Ok(())
    }

    /// Spec §4.4 "Cancellation": SIGTERM and wait out the grace period
    /// (polling for a terminal phase), then escalate to deletion. `force`
    /// skips straight to deletion.
    pub async fn cancel_run(&self, run_id: RunId, force: bool) -> EngineResult<()> {
        let Some(run) = self.store.runs.get(run_id.as_uuid()) else {
            return Err(EngineError::from(CoreError::not_found("run", run_id)));
        };
        if run.status.is_terminal() {
            return Err(EngineError::from(CoreError::invalid_transition(run.status, RunStatus::Cancelled)));
        }

        if let Some(job_name) = &run.job_name {
            if !force {
                let deadline = tokio::time::Instant::now() + StdDuration::from_secs(self.config.default_grace_seconds);
                loop {
                    match self.job_runtime.get_job_status(job_name).await {
                        Ok(status)
                            if matches!(status.phase, ClusterJobPhase::Succeeded | ClusterJobPhase::Failed) =>
                        {
                            break
                        }
                        _ => {}
                    }
                    if tokio::time::Instant::now() >= deadline {
                        break;
                    }
                    tokio::time::sleep(StdDuration::from_millis(250)).await;
                }
            }
            let _ = self.job_runtime.delete_job(job_name).await;
        }

        let reason = if force { "force cancelled" } else { "cancelled" };
        let clock = self.clock.clone();
        self.store.runs.update(run_id.as_uuid(), |r| {
            let _ = r.transition_to(RunStatus::Cancelled, &clock, Some(reason.to_string()));
        })?;
        self.finalize_terminal_run(run_id).await
    }

    /// Common terminal-transition side effects (spec §4.4 "On terminal
    /// transition"): CPU-hours accounting, bounded stdout capture,
    /// artifact persistence, a completion log entry, and notification.
    /// Called exactly once per Run, immediately after the code path that
    /// drove it into a terminal state.
    async fn finalize_terminal_run(&self, run_id: RunId) -> EngineResult<()> {
        let Some(run) = self.store.runs.get(run_id.as_uuid()) else { return Ok(()) };
        if !run.status.is_terminal() {
            return Ok(());
        }

        let cpu_cores = self.store.programs.get(run.program_id.as_uuid()).map(|p| p.resource_profile.cpu_limit).unwrap_or(1.0);
        if let Some(hours) = run.cpu_hours(cpu_cores) {
            if let Err(e) = self.quota.record_cpu_hours(&run.owner_id, hours) {
                tracing::warn!(run_id = %run_id, error = %e, "failed to record cpu hours");
            }
        }

        let mut output_bytes = Vec::new();
        if let Some(job_name) = &run.job_name {
            if let Ok(lines) = self.job_runtime.stream_logs(job_name).await {
                output_bytes = lines.join("\n").into_bytes();
            }
            let _ = self.job_runtime.delete_job(job_name).await;
        }
        if output_bytes.len() > MAX_CAPTURED_OUTPUT_BYTES {
            output_bytes.truncate(MAX_CAPTURED_OUTPUT_BYTES);
        }

        if !output_bytes.is_empty() {
            let output = String::from_utf8_lossy(&output_bytes).into_owned();
            let output_for_run = output.clone();
            self.store.runs.update(run_id.as_uuid(), |r| r.output = Some(output_for_run.clone()))?;

            let limits = self.quota_limits.limits_for(&run.owner_id);
            let request = CollectArtifactRequest {
                run_id,
                owner_id: run.owner_id.clone(),
                name: "stdout.log".to_string(),
                artifact_type: ArtifactType::Log,
                mime_type: Some("text/plain".to_string()),
                tags: Vec::new(),
                metadata: HashMap::new(),
                retention_days: None,
            };
            if let Err(e) = self.artifacts.collect_artifact(request, &output_bytes, limits.max_storage_mb) {
                tracing::warn!(run_id = %run_id, error = %e, "failed to persist run output artifact");
            }
        }

        self.log_bus.publish(LogEntry::completion(run_id, self.clock.now()));
        self.notifier.notify_run_completed(&run.owner_id, run_id, run.status).await;
        Ok(())
    }

    /// One executor loop pass (spec §4.4 "Executor loop"): pick up queued
    /// Runs in creation order honouring the concurrent-runs quota cap
    /// (daily/monthly were already gated at creation time), then reconcile
    /// every non-terminal Run against its cluster job.
    pub async fn tick(&self) {
        let mut queued = self.store.runs.list_filter(|r| r.status == RunStatus::Queued);
        queued.sort_by_key(|r| r.created_at);
        for run in queued {
            let limits = self.quota_limits.limits_for(&run.owner_id);
            if self.quota.check_concurrent_runs(&run.owner_id, limits).is_err() {
                continue;
            }
            if let Err(e) = self.submit_run(run.id).await {
                tracing::warn!(run_id = %run.id, error = %e, "submit_run failed");
            }
        }

        let active = self.store.runs.list_filter(|r| matches!(r.status, RunStatus::Starting | RunStatus::Running));
        for run in active {
            if let Err(e) = self.sync_run_status(run.id).await {
                tracing::warn!(run_id = %run.id, error = %e, "sync_run_status failed");
            }
        }
    }

    /// Spawn the executor loop as a background task, stopping cleanly when
    /// `cancellation` fires (spec §5).
    pub fn spawn(self: Arc<Self>, cancellation: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            if !self.config.enabled {
                return;
            }
            let interval = StdDuration::from_secs(self.config.interval_seconds);
            loop {
                self.tick().await;
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = cancellation.cancelled() => break,
                }
            }
        })
    }
}

#[cfg(test)]
#[path = "run_executor_tests.rs"]
mod tests;
