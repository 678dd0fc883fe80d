// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Quota Engine (spec §4.6, C6): per-user counters for concurrent runs,
//! daily runs, and monthly CPU-hours, with day/month rollover on read.

mod engine;
mod limits;

pub use engine::QuotaEngine;
pub use limits::{FixedQuotaLimits, QuotaLimitsResolver, UserQuotaLimits};
