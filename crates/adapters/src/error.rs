//! Adapter error taxonomy. Collapses into [`pg_core::CoreError::BackendUnavailable`]
//! at call sites that surface errors to users (spec §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("cluster job runtime unavailable: {0}")]
    ClusterUnavailable(String),

    #[error("job {0} not found")]
    JobNotFound(String),

    #[error("registry push failed: {0}")]
    RegistryPush(String),

    #[error("credential service unavailable: {0}")]
    CredentialUnavailable(String),
}

pub type AdapterResult<T> = Result<T, AdapterError>;

impl From<AdapterError> for pg_core::CoreError {
    fn from(err: AdapterError) -> Self {
        pg_core::CoreError::BackendUnavailable(err.to_string())
    }
}
