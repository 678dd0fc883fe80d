//! Local-daemon build backend (spec §4.2): synchronous, shells out to
//! `docker build`/`docker image inspect` on the daemon host, mirroring the
//! teacher's subprocess-adapter style (`SubprocessRegistry`,
//! `docker_spawn`).

use crate::backend::{BackendBuildOutput, BuildBackend, DepLayerRequest, ProgramLayerRequest};
use crate::error::{BuildError, BuildEngineResult};
use async_trait::async_trait;
use std::io::Write as _;
use tokio::process::Command;

/// Builds images via the `docker` CLI already present on the host running
/// the daemon. Appropriate for single-node deployments; multi-tenant
/// clusters should use [`crate::ClusterJobBackend`] instead.
pub struct LocalDaemonBackend;

impl Default for LocalDaemonBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalDaemonBackend {
    pub fn new() -> Self {
        Self
    }

    async fn run_docker(args: &[&str]) -> BuildEngineResult<std::process::Output> {
        Command::new("docker")
            .args(args)
            .output()
            .await
            .map_err(|e| BuildError::Backend(format!("docker {args:?}: {e}")))
    }

    async fn docker_build(dockerfile: &std::path::Path, context: &std::path::Path, tag: &str) -> BuildEngineResult<()> {
        let output = Command::new("docker")
            .args(["build", "-f"])
            .arg(dockerfile)
            .args(["-t", tag])
            .arg(context)
            .output()
            .await
            .map_err(|e| BuildError::Backend(format!("docker build: {e}")))?;
        if !output.status.success() {
            return Err(BuildError::Backend(String::from_utf8_lossy(&output.stderr).to_string()));
        }
        Ok(())
    }

    async fn inspect_size(tag: &str) -> Option<u64> {
        let output = Self::run_docker(&["image", "inspect", "--format={{.Size}}", tag]).await.ok()?;
        if !output.status.success() {
            return None;
        }
        String::from_utf8_lossy(&output.stdout).trim().parse().ok()
    }
}

#[async_trait]
impl BuildBackend for LocalDaemonBackend {
    async fn build_dependency_layer(&self, req: DepLayerRequest) -> BuildEngineResult<BackendBuildOutput> {
        let dir = tempfile::tempdir()?;
        let dockerfile_path = dir.path().join("Dockerfile");
        let mut lines = vec![format!("FROM python:{}-slim", req.python_version)];
        if !req.packages.is_empty() {
            let spec = req
                .packages
                .iter()
                .map(|p| format!("{}=={}", p.name, p.version))
                .collect::<Vec<_>>()
                .join(" ");
            lines.push(format!("RUN pip install --no-cache-dir {spec}"));
        }
        let mut file = std::fs::File::create(&dockerfile_path)?;
        file.write_all(lines.join("\n").as_bytes())?;

        Self::docker_build(&dockerfile_path, dir.path(), &req.image_tag).await?;
        let size_bytes = Self::inspect_size(&req.image_tag).await;
        Ok(BackendBuildOutput { image_tag: req.image_tag, size_bytes, build_job_name: None })
    }

    async fn build_program_layer(&self, req: ProgramLayerRequest) -> BuildEngineResult<BackendBuildOutput> {
        let dockerfile_path = req.workspace_dir.join(".pg-build.Dockerfile");
        let contents = format!(
            "FROM {}\nCOPY . /workspace\nWORKDIR /workspace\nENTRYPOINT [\"python\", \"{}\"]\n",
            req.base_image_tag, req.entrypoint
        );
        std::fs::write(&dockerfile_path, contents)?;
        let result = Self::docker_build(&dockerfile_path, &req.workspace_dir, &req.image_tag).await;
        let _ = std::fs::remove_file(&dockerfile_path);
        result?;

        let size_bytes = Self::inspect_size(&req.image_tag).await;
        Ok(BackendBuildOutput { image_tag: req.image_tag, size_bytes, build_job_name: None })
    }

    async fn image_exists(&self, image_tag: &str) -> BuildEngineResult<bool> {
        let output = Self::run_docker(&["image", "inspect", image_tag]).await?;
        Ok(output.status.success())
    }

    async fn delete_image(&self, image_tag: &str) -> BuildEngineResult<()> {
        let _ = Self::run_docker(&["image", "rm", "-f", image_tag]).await;
        Ok(())
    }
}
