//! Artifact and ArtifactUsage entities (spec §3, §4.9).

use crate::id::define_uuid_id;
use crate::run::RunId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

define_uuid_id! {
    /// Unique identifier for an [`Artifact`].
    pub struct ArtifactId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    File,
    Directory,
    Log,
    Output,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    pub run_id: RunId,
    pub owner_id: String,
    pub name: String,
    pub artifact_type: ArtifactType,
    pub size_bytes: u64,
    pub storage_path: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    pub checksum: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

crate::builder! {
    pub struct ArtifactBuilder => Artifact {
        into {
            owner_id: String = "user-1",
            name: String = "stdout.log",
            storage_path: String = "artifacts/user-1/placeholder",
            checksum: String = "deadbeef",
        }
        set {
            artifact_type: ArtifactType = ArtifactType::Log,
            size_bytes: u64 = 0,
            tags: Vec<String> = Vec::new(),
            metadata: HashMap<String, String> = HashMap::new(),
        }
        option {
            mime_type: String = None,
            expires_at: DateTime<Utc> = None,
        }
        computed {
            id: ArtifactId = ArtifactId::new(),
            run_id: RunId = RunId::new(),
            created_at: DateTime<Utc> = Utc::now(),
        }
    }
}

/// `{userId, totalBytes, artifactCount, lastUpdated}` — id is the user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactUsage {
    pub user_id: String,
    pub total_bytes: u64,
    pub artifact_count: u64,
    pub last_updated: DateTime<Utc>,
}

impl ArtifactUsage {
    pub fn empty(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self { user_id: user_id.into(), total_bytes: 0, artifact_count: 0, last_updated: now }
    }

    pub fn add(&mut self, size_bytes: u64, now: DateTime<Utc>) {
        self.total_bytes += size_bytes;
        self.artifact_count += 1;
        self.last_updated = now;
    }

    pub fn remove(&mut self, size_bytes: u64, now: DateTime<Utc>) {
        self.total_bytes = self.total_bytes.saturating_sub(size_bytes);
        self.artifact_count = self.artifact_count.saturating_sub(1);
        self.last_updated = now;
    }
}

#[cfg(test)]
#[path = "artifact_tests.rs"]
mod tests;
