//! Artifact Collector error taxonomy (spec §4.9, §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact exceeds artifact_max_single_size_mb ({size_bytes} bytes > {limit_bytes} bytes)")]
    TooLarge { size_bytes: u64, limit_bytes: u64 },

    #[error(transparent)]
    Core(#[from] pg_core::CoreError),

    #[error(transparent)]
    Store(#[from] pg_store::StoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type ArtifactResult<T> = Result<T, ArtifactError>;
