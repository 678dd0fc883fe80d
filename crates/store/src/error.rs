//! Storage-layer error taxonomy (spec §4.1, §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error reading/writing {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },

    #[error("corrupt collection file {path}: {source}")]
    Corrupt { path: String, #[source] source: serde_json::Error },

    #[error(transparent)]
    Core(#[from] pg_core::CoreError),
}

pub type StoreResult<T> = Result<T, StoreError>;
