//! `Settings`: every environment-prefixed configuration option from
//! spec §6, with typed defaults.

use crate::backend::BuildBackend;
use crate::env;
use crate::error::{ConfigError, ConfigResult};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,

    pub build_backend: BuildBackend,
    pub build_namespace: String,
    pub build_cpu_limit: f64,
    pub build_memory_limit_mb: u64,
    pub build_timeout_seconds: u64,

    pub registry_url: Option<String>,
    pub registry_username: Option<String>,
    pub registry_password: Option<String>,
    pub registry_insecure: bool,

    pub idle_controller_enabled: bool,
    pub idle_controller_interval_seconds: u64,
    pub environment_idle_timeout_minutes: u64,
    pub run_retention_days: u64,
    pub stale_job_timeout_minutes: u64,

    pub warmup_enabled: bool,
    pub warmup_interval_seconds: u64,
    pub warmup_pool_size: usize,
    pub warmup_max_age_minutes: u64,
    pub warmup_popular_deps_count: usize,

    pub run_executor_enabled: bool,
    pub run_executor_interval_seconds: u64,

    pub artifact_retention_days: u64,
    pub artifact_max_single_size_mb: u64,
    pub artifact_cleanup_interval_seconds: u64,

    pub retention_policy_enabled: bool,
    pub retention_policy_interval_seconds: u64,

    pub llm_metrics_retention_days: u64,

    pub credentials_namespace: String,
}

impl Settings {
    /// Load from `PG_*` environment variables, falling back to the
    /// defaults below. `PG_DATA_DIR` falls back to
    /// `$XDG_DATA_HOME/programs-playground` (or the platform equivalent)
    /// when unset.
    pub fn load() -> ConfigResult<Self> {
        let data_dir = match env::opt_string("PG_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_dir()
                .ok_or(ConfigError::NoDataDir)?
                .join("programs-playground"),
        };

        let build_backend_raw = env::string("PG_BUILD_BACKEND", "local");
        let build_backend: BuildBackend = build_backend_raw.parse().map_err(|_| {
            ConfigError::InvalidValue { key: "PG_BUILD_BACKEND", value: build_backend_raw.clone() }
        })?;

        let settings = Self {
            data_dir,

            build_backend,
            build_namespace: env::string("PG_BUILD_NAMESPACE", "programs-playground-builds"),
            build_cpu_limit: env::parsed("PG_BUILD_CPU_LIMIT", 2.0)?,
            build_memory_limit_mb: env::parsed("PG_BUILD_MEMORY_LIMIT", 2048)?,
            build_timeout_seconds: env::parsed("PG_BUILD_TIMEOUT_SECONDS", 600)?,

            registry_url: env::opt_string("PG_REGISTRY_URL"),
            registry_username: env::opt_string("PG_REGISTRY_USERNAME"),
            registry_password: env::opt_string("PG_REGISTRY_PASSWORD"),
            registry_insecure: env::parsed("PG_REGISTRY_INSECURE", false)?,

            idle_controller_enabled: env::parsed("PG_IDLE_CONTROLLER_ENABLED", true)?,
            idle_controller_interval_seconds: env::parsed(
                "PG_IDLE_CONTROLLER_INTERVAL_SECONDS",
                60,
            )?,
            environment_idle_timeout_minutes: env::parsed(
                "PG_ENVIRONMENT_IDLE_TIMEOUT_MINUTES",
                30,
            )?,
            run_retention_days: env::parsed("PG_RUN_RETENTION_DAYS", 30)?,
            stale_job_timeout_minutes: env::parsed("PG_STALE_JOB_TIMEOUT_MINUTES", 120)?,

            warmup_enabled: env::parsed("PG_WARMUP_ENABLED", true)?,
            warmup_interval_seconds: env::parsed("PG_WARMUP_INTERVAL_SECONDS", 300)?,
            warmup_pool_size: env::parsed("PG_WARMUP_POOL_SIZE", 3)?,
            warmup_max_age_minutes: env::parsed("PG_WARMUP_MAX_AGE_MINUTES", 120)?,
            warmup_popular_deps_count: env::parsed("PG_WARMUP_POPULAR_DEPS_COUNT", 5)?,

            run_executor_enabled: env::parsed("PG_RUN_EXECUTOR_ENABLED", true)?,
            run_executor_interval_seconds: env::parsed("PG_RUN_EXECUTOR_INTERVAL_SECONDS", 5)?,

            artifact_retention_days: env::parsed("PG_ARTIFACT_RETENTION_DAYS", 14)?,
            artifact_max_single_size_mb: env::parsed("PG_ARTIFACT_MAX_SINGLE_SIZE_MB", 512)?,
            artifact_cleanup_interval_seconds: env::parsed(
                "PG_ARTIFACT_CLEANUP_INTERVAL_SECONDS",
                3600,
            )?,

            retention_policy_enabled: env::parsed("PG_RETENTION_POLICY_ENABLED", true)?,
            retention_policy_interval_seconds: env::parsed(
                "PG_RETENTION_POLICY_INTERVAL_SECONDS",
                3600,
            )?,

            llm_metrics_retention_days: env::parsed("PG_LLM_METRICS_RETENTION_DAYS", 90)?,

            credentials_namespace: env::string(
                "PG_CREDENTIALS_NAMESPACE",
                "programs-playground-credentials",
            ),
        };

        tracing::debug!(
            data_dir = %settings.data_dir.display(),
            backend = %settings.build_backend,
            "loaded configuration"
        );
        Ok(settings)
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.data_dir.join("metadata")
    }

    pub fn workspaces_dir(&self) -> PathBuf {
        self.data_dir.join("workspaces")
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.data_dir.join("artifacts")
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
