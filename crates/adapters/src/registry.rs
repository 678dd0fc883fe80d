//! Image registry push/pull (spec §6 "Outbound integrations — Registry").

use crate::error::{AdapterError, AdapterResult};
use async_trait::async_trait;

#[derive(Debug, Clone, Default)]
pub struct RegistryCredentials {
    pub username: Option<String>,
    pub password: Option<String>,
    pub insecure: bool,
}

#[async_trait]
pub trait Registry: Send + Sync + 'static {
    /// Push a locally-built image tag to the configured registry.
    async fn push(&self, image_tag: &str, credentials: &RegistryCredentials) -> AdapterResult<()>;
}

/// Shells out to the `docker` CLI: spawn a process, check exit status.
pub struct SubprocessRegistry {
    registry_url: Option<String>,
}

impl SubprocessRegistry {
    pub fn new(registry_url: Option<String>) -> Self {
        Self { registry_url }
    }
}

#[async_trait]
impl Registry for SubprocessRegistry {
    async fn push(&self, image_tag: &str, credentials: &RegistryCredentials) -> AdapterResult<()> {
        if let (Some(url), Some(username), Some(password)) =
            (&self.registry_url, &credentials.username, &credentials.password)
        {
            let login = tokio::process::Command::new("docker")
                .args(["login", url, "-u", username, "--password-stdin"])
                .stdin(std::process::Stdio::piped())
                .spawn();
            if let Ok(mut child) = login {
                if let Some(mut stdin) = child.stdin.take() {
                    use tokio::io::AsyncWriteExt;
                    let _ = stdin.write_all(password.as_bytes()).await;
                }
                let _ = child.wait().await;
            }
        }

        let output = tokio::process::Command::new("docker")
            .args(["push", image_tag])
            .output()
            .await
            .map_err(|e| AdapterError::RegistryPush(e.to_string()))?;

        if !output.status.success() {
            return Err(AdapterError::RegistryPush(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }
        tracing::info!(image_tag, "pushed image to registry");
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// No-op [`Registry`] that records calls for assertions.
    #[derive(Clone, Default)]
    pub struct FakeRegistry {
        pub pushed: Arc<Mutex<Vec<String>>>,
    }

    impl FakeRegistry {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl Registry for FakeRegistry {
        async fn push(&self, image_tag: &str, _credentials: &RegistryCredentials) -> AdapterResult<()> {
            self.pushed.lock().push(image_tag.to_string());
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeRegistry;

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
