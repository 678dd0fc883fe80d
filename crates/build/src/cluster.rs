//! Cluster-job build backend (spec §4.2): dispatches a short-lived cluster
//! `Job` that builds and pushes, then polls it to completion so it can
//! still satisfy the synchronous [`crate::BuildBackend`] contract.

use crate::backend::{BackendBuildOutput, BuildBackend, DepLayerRequest, ProgramLayerRequest};
use crate::error::{BuildError, BuildEngineResult};
use async_trait::async_trait;
use pg_adapters::{ClusterJobPhase, ClusterJobRuntime, JobSpec};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub struct ClusterJobBackend {
    runtime: Arc<dyn ClusterJobRuntime>,
    namespace: String,
    cpu_limit: f64,
    memory_limit_mb: u64,
    timeout_seconds: u64,
    poll_interval: Duration,
}

impl ClusterJobBackend {
    pub fn new(
        runtime: Arc<dyn ClusterJobRuntime>,
        namespace: impl Into<String>,
        cpu_limit: f64,
        memory_limit_mb: u64,
        timeout_seconds: u64,
    ) -> Self {
        Self {
            runtime,
            namespace: namespace.into(),
            cpu_limit,
            memory_limit_mb,
            timeout_seconds,
            poll_interval: Duration::from_secs(2),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Run `command` as a cluster job in the configured namespace and poll
    /// until it reaches a terminal phase, bounded by `timeout_seconds`.
    async fn run_to_completion(
        &self,
        name_prefix: &str,
        image: &str,
        command: Vec<String>,
        env: HashMap<String, String>,
    ) -> BuildEngineResult<String> {
        let spec = JobSpec {
            name_prefix: name_prefix.to_string(),
            namespace: self.namespace.clone(),
            image: image.to_string(),
            command,
            env,
            cpu_limit: self.cpu_limit,
            memory_limit_mb: self.memory_limit_mb,
            timeout_seconds: self.timeout_seconds,
            secret_names: Vec::new(),
        };
        let job_name = self.runtime.create_job(spec).await.map_err(|e| BuildError::Backend(e.to_string()))?;

        let deadline = tokio::time::Instant::now() + Duration::from_secs(self.timeout_seconds);
        loop {
            let status = self
                .runtime
                .get_job_status(&job_name)
                .await
                .map_err(|e| BuildError::Backend(e.to_string()))?;
            match status.phase {
                ClusterJobPhase::Succeeded => return Ok(job_name),
                ClusterJobPhase::Failed => {
                    return Err(BuildError::Backend(
                        status.error_message.unwrap_or_else(|| format!("build job {job_name} failed")),
                    ))
                }
                ClusterJobPhase::Pending | ClusterJobPhase::Running => {
                    if tokio::time::Instant::now() >= deadline {
                        return Err(BuildError::Backend(format!("build job {job_name} timed out")));
                    }
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }
}

#[async_trait]
impl BuildBackend for ClusterJobBackend {
    async fn build_dependency_layer(&self, req: DepLayerRequest) -> BuildEngineResult<BackendBuildOutput> {
        let packages = req
            .packages
            .iter()
            .map(|p| format!("{}=={}", p.name, p.version))
            .collect::<Vec<_>>()
            .join(" ");
        let mut env = HashMap::new();
        env.insert("PG_BUILD_PYTHON_VERSION".to_string(), req.python_version.clone());
        env.insert("PG_BUILD_PACKAGES".to_string(), packages);
        env.insert("PG_BUILD_IMAGE_TAG".to_string(), req.image_tag.clone());
        let job_name = self
            .run_to_completion(
                "pg-build-deps",
                "pg-builder:latest",
                vec!["build-deps".to_string()],
                env,
            )
            .await?;
        Ok(BackendBuildOutput { image_tag: req.image_tag, size_bytes: None, build_job_name: Some(job_name) })
    }

    async fn build_program_layer(&self, req: ProgramLayerRequest) -> BuildEngineResult<BackendBuildOutput> {
        let mut env = HashMap::new();
        env.insert("PG_BUILD_BASE_IMAGE".to_string(), req.base_image_tag.clone());
        env.insert("PG_BUILD_IMAGE_TAG".to_string(), req.image_tag.clone());
        env.insert("PG_BUILD_ENTRYPOINT".to_string(), req.entrypoint.clone());
        env.insert("PG_BUILD_WORKSPACE".to_string(), req.workspace_dir.display().to_string());
        let job_name = self
            .run_to_completion(
                "pg-build-prog",
                "pg-builder:latest",
                vec!["build-program".to_string()],
                env,
            )
            .await?;
        Ok(BackendBuildOutput { image_tag: req.image_tag, size_bytes: None, build_job_name: Some(job_name) })
    }

    async fn image_exists(&self, _image_tag: &str) -> BuildEngineResult<bool> {
        // The cluster backend has no cheap registry-inspect primitive in
        // this adapter surface (spec §6 only specifies push); treat a
        // cached entry as unconfirmed so the caller falls back to a
        // rebuild rather than trusting a possibly-evicted registry tag.
        Ok(false)
    }

    async fn delete_image(&self, _image_tag: &str) -> BuildEngineResult<()> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "cluster_tests.rs"]
mod tests;
