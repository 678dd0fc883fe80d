//! Configuration loading errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("could not determine a default data directory; set PG_DATA_DIR explicitly")]
    NoDataDir,
}

pub type ConfigResult<T> = Result<T, ConfigError>;
