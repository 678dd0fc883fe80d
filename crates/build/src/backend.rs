//! `BuildBackend`: the one interface both the local-daemon and cluster-job
//! builders satisfy (spec §4.2 "Backends") — one async-trait, several
//! backends, a fake behind `test-support`.

use crate::error::BuildEngineResult;
use async_trait::async_trait;
use pg_core::PackageSpec;
use std::path::PathBuf;

/// Build (or reuse) a dependency layer image from a python version and a
/// canonicalised package list.
#[derive(Debug, Clone)]
pub struct DepLayerRequest {
    pub image_tag: String,
    pub python_version: String,
    pub packages: Vec<PackageSpec>,
}

/// Build a program layer on top of an already-built dependency layer.
#[derive(Debug, Clone)]
pub struct ProgramLayerRequest {
    pub base_image_tag: String,
    pub image_tag: String,
    pub workspace_dir: PathBuf,
    pub entrypoint: String,
}

#[derive(Debug, Clone, Default)]
pub struct BackendBuildOutput {
    pub image_tag: String,
    pub size_bytes: Option<u64>,
    /// Set only by the cluster backend (spec §4.2: "returns a
    /// `buildJobName`").
    pub build_job_name: Option<String>,
}

#[async_trait]
pub trait BuildBackend: Send + Sync + 'static {
    async fn build_dependency_layer(&self, req: DepLayerRequest) -> BuildEngineResult<BackendBuildOutput>;

    async fn build_program_layer(&self, req: ProgramLayerRequest) -> BuildEngineResult<BackendBuildOutput>;

    /// Confirm a previously-cached image tag is still reachable (spec
    /// §4.2 step 2: "the backend confirms the image is reachable").
    async fn image_exists(&self, image_tag: &str) -> BuildEngineResult<bool>;

    /// Best-effort deletion of an image, used by `pruneStale` (spec §4.2).
    async fn delete_image(&self, image_tag: &str) -> BuildEngineResult<()>;
}
