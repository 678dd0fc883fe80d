// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pg-artifacts: the Artifact Collector (spec §4.9, C9). Stores Run
//! outputs under a content-addressed path, tracks per-user storage usage,
//! and enforces per-object and per-user size caps.

pub mod collector;
pub mod error;

pub use collector::{ArtifactCollector, CollectArtifactRequest};
pub use error::{ArtifactError, ArtifactResult};
