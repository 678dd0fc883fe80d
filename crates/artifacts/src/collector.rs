//! Artifact Collector (spec §4.9, C9): stores run outputs under a
//! content-addressed path, tracks per-user storage usage, and enforces
//! per-object and per-user size caps. Mirrors `pg-quota`'s
//! `Engine<C: Clock> { store, clock }` shape (spec §4.6).

use crate::error::{ArtifactError, ArtifactResult};
use pg_core::{Artifact, ArtifactId, ArtifactType, ArtifactUsage, Clock, CoreError, QuotaKind, RunId};
use pg_store::Store;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Everything `collectArtifact` needs beyond the raw bytes (spec §4.9
/// `collectArtifact(runId, ownerId, name, content, userQuotas, …)`).
#[derive(Debug, Clone)]
pub struct CollectArtifactRequest {
    pub run_id: RunId,
    pub owner_id: String,
    pub name: String,
    pub artifact_type: ArtifactType,
    pub mime_type: Option<String>,
    pub tags: Vec<String>,
    pub metadata: HashMap<String, String>,
    /// Overrides the collector's configured default when set.
    pub retention_days: Option<u64>,
}

pub struct ArtifactCollector<C: Clock> {
    store: Arc<Store>,
    clock: C,
    artifacts_dir: PathBuf,
    max_single_size_mb: u64,
    default_retention_days: Option<u64>,
}

impl<C: Clock> ArtifactCollector<C> {
    pub fn new(
        store: Arc<Store>,
        clock: C,
        artifacts_dir: PathBuf,
        max_single_size_mb: u64,
        default_retention_days: Option<u64>,
    ) -> Self {
        Self { store, clock, artifacts_dir, max_single_size_mb, default_retention_days }
    }

    fn usage(&self, owner_id: &str) -> ArtifactUsage {
        let now = self.clock.now();
        self.store
            .artifact_usage
            .get(pg_store::user_keyed_uuid(owner_id))
            .unwrap_or_else(|| ArtifactUsage::empty(owner_id, now))
    }

    /// Spec §4.9 `collectArtifact`. `max_storage_mb` is the caller's
    /// per-user quota limit (plan/billing lookup lives outside this crate,
    /// same convention as [`pg_quota::UserQuotaLimits`]).
    pub fn collect_artifact(
        &self,
        req: CollectArtifactRequest,
        content: &[u8],
        max_storage_mb: u64,
    ) -> ArtifactResult<Artifact> {
        let size_bytes = content.len() as u64;
        let limit_bytes = self.max_single_size_mb * 1024 * 1024;
        if size_bytes > limit_bytes {
            return Err(ArtifactError::TooLarge { size_bytes, limit_bytes });
        }

        let usage = self.usage(&req.owner_id);
        let storage_limit_bytes = max_storage_mb * 1024 * 1024;
        let projected = usage.total_bytes + size_bytes;
        if projected > storage_limit_bytes {
            return Err(CoreError::quota_exceeded(
                QuotaKind::Storage,
                projected as f64,
                storage_limit_bytes as f64,
            )
            .into());
        }

        let mut hasher = Sha256::new();
        hasher.update(content);
        let checksum = format!("{:x}", hasher.finalize());

        let now = self.clock.now();
        let id = ArtifactId::new();
        let storage_path = format!("{}/{id}", req.owner_id);
        let full_path = self.artifacts_dir.join(&req.owner_id).join(id.to_string());
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&full_path, content)?;

        let retention_days = req.retention_days.or(self.default_retention_days);
        let expires_at = retention_days.map(|days| now + chrono::Duration::days(days as i64));

        let artifact = Artifact {
            id,
            run_id: req.run_id,
            owner_id: req.owner_id.clone(),
            name: req.name,
            artifact_type: req.artifact_type,
            size_bytes,
            storage_path,
            mime_type: req.mime_type,
            checksum,
            created_at: now,
            expires_at,
            tags: req.tags,
            metadata: req.metadata,
        };
        self.store.artifacts.put(artifact.clone())?;

        let usage_id = pg_store::user_keyed_uuid(&req.owner_id);
        if self.store.artifact_usage.get(usage_id).is_none() {
            self.store.artifact_usage.put(ArtifactUsage::empty(&req.owner_id, now))?;
        }
        self.store.artifact_usage.update(usage_id, |u| u.add(size_bytes, now))?;

        tracing::info!(artifact_id = %artifact.id, owner_id = %artifact.owner_id, size_bytes, "collected artifact");
        Ok(artifact)
    }

    /// Spec §4.9 `recalculateUserUsage`: scans all Artifacts of `owner_id`
    /// and rewrites [`ArtifactUsage`] from scratch, self-healing any drift
    /// between incremental updates and reality.
    pub fn recalculate_user_usage(&self, owner_id: &str) -> ArtifactResult<ArtifactUsage> {
        let artifacts = self.store.artifacts.list_filter(|a| a.owner_id == owner_id);
        let total_bytes: u64 = artifacts.iter().map(|a| a.size_bytes).sum();
        let artifact_count = artifacts.len() as u64;
        let now = self.clock.now();

        let usage = ArtifactUsage { user_id: owner_id.to_string(), total_bytes, artifact_count, last_updated: now };
        self.store.artifact_usage.put(usage.clone())?;
        Ok(usage)
    }
}

#[cfg(test)]
#[path = "collector_tests.rs"]
mod tests;
