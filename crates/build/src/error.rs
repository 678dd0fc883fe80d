//! Build Engine error taxonomy (spec §4.2, §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("build backend unavailable: {0}")]
    Backend(String),

    /// A newer build for the same program superseded this one
    /// (spec §4.2: "last-writer wins").
    #[error("superseded by a newer build for the same program")]
    Superseded,

    #[error(transparent)]
    Store(#[from] pg_store::StoreError),

    #[error(transparent)]
    Core(#[from] pg_core::CoreError),

    #[error(transparent)]
    Adapter(#[from] pg_adapters::AdapterError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type BuildEngineResult<T> = Result<T, BuildError>;
