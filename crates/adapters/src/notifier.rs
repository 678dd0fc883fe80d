//! Run-completion notifications (spec §6 "Outbound integrations —
//! Notifier"), fire-and-forget. Downstream delivery (email, webhook) is
//! out of the core.

use async_trait::async_trait;
use pg_core::{RunId, RunStatus};

#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn notify_run_completed(&self, owner_id: &str, run_id: RunId, status: RunStatus);
}

/// Logs completions via `tracing` and does nothing else — the default
/// when no external notification channel is configured.
#[derive(Debug, Clone, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn notify_run_completed(&self, owner_id: &str, run_id: RunId, status: RunStatus) {
        tracing::info!(owner_id, %run_id, %status, "run completed");
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    pub struct RecordingNotifier {
        pub notifications: Arc<Mutex<Vec<(String, RunId, RunStatus)>>>,
    }

    impl RecordingNotifier {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify_run_completed(&self, owner_id: &str, run_id: RunId, status: RunStatus) {
            self.notifications.lock().push((owner_id.to_string(), run_id, status));
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::RecordingNotifier;

#[cfg(test)]
#[path = "notifier_tests.rs"]
mod tests;
