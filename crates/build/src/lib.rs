// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pg-build: the two-layer dependency/program image build pipeline
//! (spec §4.2). Two [`BuildBackend`] implementations — [`LocalDaemonBackend`]
//! (shells out to `docker` on the daemon host) and [`ClusterJobBackend`]
//! (dispatches a short-lived cluster job and polls it) — sit behind
//! [`BuildEngine`], which owns cache coalescing and per-program
//! cancellation.

pub mod backend;
pub mod cluster;
pub mod engine;
pub mod error;
pub mod local;
pub mod result;

pub use backend::{BackendBuildOutput, BuildBackend, DepLayerRequest, ProgramLayerRequest};
pub use cluster::ClusterJobBackend;
pub use engine::BuildEngine;
pub use error::{BuildEngineResult, BuildError};
pub use local::LocalDaemonBackend;
pub use result::BuildResult;
