// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pg-core: shared entity types, IDs, clock, and state machines for the
//! programs-playground execution core.

pub mod macros;

pub mod artifact;
pub mod clock;
pub mod credential;
pub mod environment;
pub mod error;
pub mod id;
pub mod layer_cache;
pub mod llm_metric;
pub mod program;
pub mod quota;
pub mod retention_policy;
pub mod run;

pub use artifact::{Artifact, ArtifactId, ArtifactType, ArtifactUsage};
pub use clock::{Clock, FakeClock, SystemClock};
pub use credential::{Credential, CredentialId};
pub use environment::{Environment, EnvironmentId, EnvironmentStatus, ResourceLimits};
pub use error::{CoreError, CoreResult, QuotaKind};
pub use layer_cache::{compute_cache_key, compute_packages_hash, LayerCacheEntry, LayerCacheEntryId};
pub use llm_metric::{LlmUsageMetric, LlmUsageMetricId};
pub use program::{
    DependencySource, Dependencies, ImageBuildStatus, PackageSpec, Program, ProgramId,
    ResourceProfile, SharePermission, ShareeType, Sharing, SharedWith,
};
pub use quota::{day_key, month_key, QuotaUsage};
pub use retention_policy::{RetentionCondition, RetentionPolicy, RetentionPolicyId, RetentionResourceType};
pub use run::{Run, RunId, RunStatus};
