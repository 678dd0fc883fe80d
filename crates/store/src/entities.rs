//! `HasId` impls binding pg-core entities to their collection key.

use crate::collection::HasId;
use pg_core::{
    Artifact, ArtifactUsage, Credential, Environment, LayerCacheEntry, LlmUsageMetric, Program,
    QuotaUsage, RetentionPolicy, Run,
};
use uuid::Uuid;

impl HasId for Program {
    fn id(&self) -> Uuid {
        self.id.as_uuid()
    }
}

impl HasId for Environment {
    fn id(&self) -> Uuid {
        self.id.as_uuid()
    }
}

impl HasId for Run {
    fn id(&self) -> Uuid {
        self.id.as_uuid()
    }
}

impl HasId for LayerCacheEntry {
    fn id(&self) -> Uuid {
        self.id.as_uuid()
    }
}

impl HasId for Artifact {
    fn id(&self) -> Uuid {
        self.id.as_uuid()
    }
}

impl HasId for Credential {
    fn id(&self) -> Uuid {
        self.id.as_uuid()
    }
}

impl HasId for RetentionPolicy {
    fn id(&self) -> Uuid {
        self.id.as_uuid()
    }
}

impl HasId for LlmUsageMetric {
    fn id(&self) -> Uuid {
        self.id.as_uuid()
    }
}

/// Per-user records keyed by a deterministic id derived from `user_id`, so
/// repeated lookups for the same user always resolve to the same slot.
pub fn user_keyed_uuid(user_id: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, user_id.as_bytes())
}

impl HasId for ArtifactUsage {
    fn id(&self) -> Uuid {
        user_keyed_uuid(&self.user_id)
    }
}

impl HasId for QuotaUsage {
    fn id(&self) -> Uuid {
        user_keyed_uuid(&self.user_id)
    }
}
