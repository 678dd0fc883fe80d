//! Credential resolution (spec §6 "Outbound integrations — Credential
//! service"). The core only ever sees a [`SecretName`] it can mount;
//! the encryption backend is out of scope (Open Question ii — no
//! ownership re-check happens here, only existence/non-expiration on
//! the pg-core side).

use async_trait::async_trait;
use pg_core::CredentialId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretName(pub String);

impl std::fmt::Display for SecretName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait CredentialService: Send + Sync + 'static {
    /// Resolve a credential id to the name of a cluster secret the job
    /// spec can mount, or `None` to skip mounting anything.
    async fn resolve_to_secret_name(&self, credential_id: CredentialId) -> Option<SecretName>;
}

/// Resolves credential ids to Kubernetes Secret names using a fixed
/// naming convention (`cred-<uuid-simple>`) under the configured
/// credentials namespace. The secret's existence is assumed to be
/// maintained by a separate provisioning process (out of scope).
pub struct KubeCredentialService {
    namespace: String,
}

impl KubeCredentialService {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self { namespace: namespace.into() }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

#[async_trait]
impl CredentialService for KubeCredentialService {
    async fn resolve_to_secret_name(&self, credential_id: CredentialId) -> Option<SecretName> {
        Some(SecretName(format!("cred-{}", credential_id.short())))
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::RwLock;
    use std::collections::HashMap;

    /// Fixed credential-id → secret-name mapping for tests.
    #[derive(Default)]
    pub struct StaticCredentialService {
        map: RwLock<HashMap<CredentialId, SecretName>>,
    }

    impl StaticCredentialService {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn register(&self, credential_id: CredentialId, secret_name: impl Into<String>) {
            self.map.write().insert(credential_id, SecretName(secret_name.into()));
        }
    }

    #[async_trait]
    impl CredentialService for StaticCredentialService {
        async fn resolve_to_secret_name(&self, credential_id: CredentialId) -> Option<SecretName> {
            self.map.read().get(&credential_id).cloned()
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::StaticCredentialService;

#[cfg(test)]
#[path = "credential_tests.rs"]
mod tests;
