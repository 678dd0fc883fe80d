//! Log entry wire shape (spec §4.5): `{runId, content, timestamp, isComplete}`.

use chrono::{DateTime, Utc};
use pg_core::RunId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub run_id: RunId,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_complete: bool,
}

impl LogEntry {
    pub fn chunk(run_id: RunId, content: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self { run_id, content: content.into(), timestamp: now, is_complete: false }
    }

    pub fn completion(run_id: RunId, now: DateTime<Utc>) -> Self {
        Self { run_id, content: String::new(), timestamp: now, is_complete: true }
    }
}
