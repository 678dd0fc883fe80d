// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::unwrap_used))]

//! pg-config: typed, `PG_`-prefixed environment configuration (spec §6).

mod backend;
mod env;
mod error;
mod settings;

pub use backend::BuildBackend;
pub use error::{ConfigError, ConfigResult};
pub use settings::Settings;
