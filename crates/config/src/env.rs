//! Small helpers for reading typed, defaulted values out of `PG_`-prefixed
//! environment variables.

use crate::error::{ConfigError, ConfigResult};
use std::str::FromStr;

pub fn string(key: &'static str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn opt_string(key: &'static str) -> Option<String> {
    std::env::var(key).ok()
}

pub fn parsed<T>(key: &'static str, default: T) -> ConfigResult<T>
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        Err(_) => Ok(default),
    }
}
