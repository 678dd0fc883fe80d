//! `Store`: the sole construction point for every on-disk collection
//! (spec §4.1). One `Collection<T>` per entity type, all rooted at a
//! single metadata directory.

use crate::collection::Collection;
use crate::error::StoreResult;
use pg_core::{
    Artifact, ArtifactUsage, Credential, Environment, LayerCacheEntry, LlmUsageMetric, Program,
    QuotaUsage, RetentionPolicy, Run,
};
use std::path::{Path, PathBuf};

pub struct Store {
    root: PathBuf,
    pub programs: Collection<Program>,
    pub environments: Collection<Environment>,
    pub runs: Collection<Run>,
    pub layer_cache: Collection<LayerCacheEntry>,
    pub artifacts: Collection<Artifact>,
    pub artifact_usage: Collection<ArtifactUsage>,
    pub credentials: Collection<Credential>,
    pub retention_policies: Collection<RetentionPolicy>,
    pub llm_metrics: Collection<LlmUsageMetric>,
    pub quota_usage: Collection<QuotaUsage>,
}

impl Store {
    /// Open (or create) the metadata directory at `root`, loading all
    /// nine collections from it.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root).map_err(|source| crate::error::StoreError::Io {
            path: root.display().to_string(),
            source,
        })?;

        Ok(Self {
            programs: Collection::load(&root, "programs")?,
            environments: Collection::load(&root, "environments")?,
            runs: Collection::load(&root, "runs")?,
            layer_cache: Collection::load(&root, "layer_cache")?,
            artifacts: Collection::load(&root, "artifacts")?,
            artifact_usage: Collection::load(&root, "artifact_usage")?,
            credentials: Collection::load(&root, "credentials")?,
            retention_policies: Collection::load(&root, "retention_policies")?,
            llm_metrics: Collection::load(&root, "llm_metrics")?,
            quota_usage: Collection::load(&root, "quota_usage")?,
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
