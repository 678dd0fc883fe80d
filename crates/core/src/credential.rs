//! Credential metadata entity (spec §3). The secret blob itself is
//! encrypted at rest by a collaborator outside the core (spec §1, §6);
//! this type only carries what the core needs to resolve a credential to
//! a cluster secret mount.

use crate::id::define_uuid_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

define_uuid_id! {
    /// Unique identifier for a [`Credential`].
    pub struct CredentialId;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub id: CredentialId,
    pub name: String,
    #[serde(rename = "type")]
    pub credential_type: String,
    #[serde(default)]
    pub provider: Option<String>,
    pub owner_id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_accessed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    /// Non-ownership existence/expiration check performed by the core
    /// (Open Question ii): who may *reference* a credential is delegated
    /// to the credential service; the core only verifies it exists and
    /// hasn't expired.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(exp) => exp > now,
            None => true,
        }
    }
}

crate::builder! {
    pub struct CredentialBuilder => Credential {
        into {
            name: String = "openai-key",
            credential_type: String = "api_key",
            owner_id: String = "user-1",
        }
        set {
            tags: Vec<String> = Vec::new(),
        }
        option {
            provider: String = None,
            last_accessed_at: DateTime<Utc> = None,
            expires_at: DateTime<Utc> = None,
        }
        computed {
            id: CredentialId = CredentialId::new(),
            created_at: DateTime<Utc> = Utc::now(),
            updated_at: DateTime<Utc> = Utc::now(),
        }
    }
}

#[cfg(test)]
#[path = "credential_tests.rs"]
mod tests;
