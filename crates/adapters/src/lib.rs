// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pg-adapters: external-interface contracts (spec §6 "Outbound
//! integrations") and their implementations. The core never depends on
//! concrete backend crates (`kube`, `k8s-openapi`) directly — only this
//! crate, `pg-build`, and `pg-daemon`'s binary wiring do.

pub mod broker;
pub mod cluster;
pub mod credential;
pub mod error;
pub mod notifier;
pub mod registry;

pub use broker::{Broker, BrokerStream};
pub use cluster::{ClusterJobPhase, ClusterJobRuntime, ClusterJobStatus, JobSpec, JobSummary, KubeJobRuntime};
pub use credential::{CredentialService, KubeCredentialService, SecretName};
pub use error::{AdapterError, AdapterResult};
pub use notifier::{LoggingNotifier, Notifier};
pub use registry::{Registry, RegistryCredentials, SubprocessRegistry};

#[cfg(any(test, feature = "test-support"))]
pub use cluster::FakeJobRuntime;
#[cfg(any(test, feature = "test-support"))]
pub use credential::StaticCredentialService;
#[cfg(any(test, feature = "test-support"))]
pub use notifier::RecordingNotifier;
#[cfg(any(test, feature = "test-support"))]
pub use registry::FakeRegistry;
