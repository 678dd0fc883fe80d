//! Shared error taxonomy for the reconcilers and executors in this crate
//! (spec §7). Per-tick reconciler errors are *not* propagated through this
//! type — they're captured into the relevant `*Metrics.errors` field so one
//! bad item never stops a tick (spec §7 "Propagation policy").

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] pg_core::CoreError),

    #[error(transparent)]
    Store(#[from] pg_store::StoreError),

    #[error(transparent)]
    Adapter(#[from] pg_adapters::AdapterError),

    #[error(transparent)]
    Build(#[from] pg_build::BuildError),

    #[error(transparent)]
    Artifact(#[from] pg_artifacts::ArtifactError),
}

pub type EngineResult<T> = Result<T, EngineError>;
