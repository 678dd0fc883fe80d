// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pg-daemon: the composition root (spec §9 "Global singletons"). Wires
//! one instance of every component named in spec §2 from a [`Settings`]
//! value, then spawns the background reconcilers (Warm Pool, Run
//! Executor, Retention, Idle) as cooperatively-cancellable tasks (spec
//! §5).
//!
//! There is exactly one `Application` per `data_dir` at a time — the
//! Metadata Store assumes a single writer process (spec §9). Running a
//! second `pgd` (or a `pg` CLI command that mutates the store) against
//! the same `data_dir` concurrently is an unsupported configuration.

use pg_adapters::{
    ClusterJobRuntime, CredentialService, KubeCredentialService, KubeJobRuntime, LoggingNotifier,
    Notifier, Registry, RegistryCredentials, SubprocessRegistry,
};
use pg_artifacts::ArtifactCollector;
use pg_build::{BuildBackend, BuildEngine, ClusterJobBackend, LocalDaemonBackend};
use pg_bus::LogBus;
use pg_config::{self as config, Settings};
use pg_core::{Clock, SystemClock};
use pg_engine::{
    IdleController, IdleControllerConfig, RetentionConfig, RetentionReconciler, RunExecutor,
    RunExecutorConfig, WarmPoolConfig, WarmPoolReconciler,
};
use pg_metrics::{LlmMetricsCollector, ModelPricing};
use pg_quota::{FixedQuotaLimits, QuotaLimitsResolver};
use pg_store::Store;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Default per-user quota limits applied when no plan/billing integration
/// is wired up (spec §4.6 — the limits themselves are out of core scope).
pub fn default_quota_limits() -> FixedQuotaLimits {
    FixedQuotaLimits(pg_quota::UserQuotaLimits::new(3, 50, 100.0, 10_240))
}

/// Every long-lived component the daemon owns, built once from
/// [`Settings`] and shared by reference with the background tasks.
pub struct Application<C: Clock = SystemClock> {
    pub store: Arc<Store>,
    pub clock: C,
    pub log_bus: Arc<LogBus>,
    pub build_engine: Arc<BuildEngine<C>>,
    pub run_executor: Arc<RunExecutor<C>>,
    pub warm_pool: Arc<WarmPoolReconciler<C>>,
    pub retention: Arc<RetentionReconciler<C>>,
    pub idle: Arc<IdleController<C>>,
    pub artifacts: Arc<ArtifactCollector<C>>,
    pub llm_metrics: Arc<LlmMetricsCollector<C>>,
    settings: Settings,
}

fn build_backend_for(settings: &Settings, job_runtime: Arc<dyn ClusterJobRuntime>) -> Arc<dyn BuildBackend> {
    match settings.build_backend {
        config::BuildBackend::Local => Arc::new(LocalDaemonBackend::new()),
        config::BuildBackend::Cluster => Arc::new(ClusterJobBackend::new(
            job_runtime,
            settings.build_namespace.clone(),
            settings.build_cpu_limit,
            settings.build_memory_limit_mb,
            settings.build_timeout_seconds,
        )),
    }
}

impl Application<SystemClock> {
    /// Construct every component against a real cluster connection and
    /// the system clock. The only async step is connecting to Kubernetes.
    pub async fn bootstrap(settings: Settings) -> anyhow::Result<Self> {
        let job_runtime: Arc<dyn ClusterJobRuntime> = Arc::new(KubeJobRuntime::connect().await?);
        Self::bootstrap_with(settings, SystemClock, job_runtime)
    }
}

impl<C: Clock> Application<C> {
    /// Construct every component against caller-supplied clock and
    /// cluster-job runtime. Exposed separately from [`Application::bootstrap`]
    /// so tests can substitute a [`pg_core::FakeClock`] and a
    /// `FakeJobRuntime` without touching a real cluster.
    pub fn bootstrap_with(
        settings: Settings,
        clock: C,
        job_runtime: Arc<dyn ClusterJobRuntime>,
    ) -> anyhow::Result<Self> {
        std::fs::create_dir_all(settings.workspaces_dir())?;
        std::fs::create_dir_all(settings.artifacts_dir())?;
        let store = Arc::new(Store::open(settings.metadata_dir())?);

        let registry: Option<Arc<dyn Registry>> =
            settings.registry_url.as_ref().map(|url| Arc::new(SubprocessRegistry::new(Some(url.clone()))) as Arc<dyn Registry>);
        let registry_credentials = RegistryCredentials {
            username: settings.registry_username.clone(),
            password: settings.registry_password.clone(),
            insecure: settings.registry_insecure,
        };

        let idle_job_runtime = job_runtime.clone();
        let backend = build_backend_for(&settings, job_runtime.clone());
        let build_engine = Arc::new(BuildEngine::new(
            store.clone(),
            clock.clone(),
            backend,
            registry,
            registry_credentials,
            settings.data_dir.clone(),
        ));

        let credential_service: Arc<dyn CredentialService> =
            Arc::new(KubeCredentialService::new(settings.credentials_namespace.clone()));
        let notifier: Arc<dyn Notifier> = Arc::new(LoggingNotifier);
        let log_bus = Arc::new(LogBus::new());

        let artifacts = Arc::new(ArtifactCollector::new(
            store.clone(),
            clock.clone(),
            settings.artifacts_dir(),
            settings.artifact_max_single_size_mb,
            Some(settings.artifact_retention_days),
        ));

        let llm_metrics = Arc::new(LlmMetricsCollector::new(store.clone(), clock.clone(), ModelPricing::new()));

        let quota_limits: Arc<dyn QuotaLimitsResolver> = Arc::new(default_quota_limits());
        let run_executor = Arc::new(RunExecutor::new(
            store.clone(),
            clock.clone(),
            job_runtime,
            credential_service,
            notifier,
            log_bus.clone(),
            artifacts.clone(),
            quota_limits,
            RunExecutorConfig {
                enabled: settings.run_executor_enabled,
                interval_seconds: settings.run_executor_interval_seconds,
                namespace: settings.build_namespace.clone(),
                api_url: format!("http://localhost/{}", settings.credentials_namespace),
                default_grace_seconds: 30,
            },
        ));

        let warm_pool = Arc::new(WarmPoolReconciler::new(
            store.clone(),
            clock.clone(),
            build_engine.clone(),
            WarmPoolConfig {
                enabled: settings.warmup_enabled,
                interval_seconds: settings.warmup_interval_seconds,
                pool_size: settings.warmup_pool_size,
                max_age_minutes: settings.warmup_max_age_minutes,
                popular_deps_count: settings.warmup_popular_deps_count,
            },
        ));

        let retention = Arc::new(RetentionReconciler::new(
            store.clone(),
            clock.clone(),
            RetentionConfig {
                enabled: settings.retention_policy_enabled,
                interval_seconds: settings.retention_policy_interval_seconds,
                default_run_retention_days: settings.run_retention_days,
            },
        ));

        let idle = Arc::new(IdleController::new(
            store.clone(),
            clock.clone(),
            idle_job_runtime,
            IdleControllerConfig {
                enabled: settings.idle_controller_enabled,
                interval_seconds: settings.idle_controller_interval_seconds,
                environment_idle_timeout_minutes: settings.environment_idle_timeout_minutes,
                run_retention_days: settings.run_retention_days,
                stale_job_timeout_minutes: settings.stale_job_timeout_minutes,
            },
        ));

        Ok(Self {
            store,
            clock,
            log_bus,
            build_engine,
            run_executor,
            warm_pool,
            retention,
            idle,
            artifacts,
            llm_metrics,
            settings,
        })
    }

    /// Spawn every enabled reconciler and the Run Executor loop, then
    /// block until `cancellation` fires. Each background task checks its
    /// own `enabled` flag and returns immediately if disabled (spec §6).
    pub async fn run(self: Arc<Self>, cancellation: CancellationToken) -> anyhow::Result<()> {
        tracing::info!(data_dir = %self.settings.data_dir.display(), "programs-playground daemon starting");
        let handles: Vec<JoinHandle<()>> = vec![
            self.run_executor.clone().spawn(cancellation.clone()),
            self.warm_pool.clone().spawn(cancellation.clone()),
            self.retention.clone().spawn(cancellation.clone()),
            self.idle.clone().spawn(cancellation.clone()),
        ];
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "background task panicked");
            }
        }
        tracing::info!("programs-playground daemon stopped");
        Ok(())
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
