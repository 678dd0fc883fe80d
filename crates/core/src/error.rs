//! Shared error taxonomy (spec §7).
//!
//! `Unauthorized`/`Forbidden` are owned by the external transport layer and
//! have no variant here; everything the core itself can raise is covered.

use thiserror::Error;

/// The kind of quota that was exceeded, carried by [`CoreError::QuotaExceeded`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaKind {
    ConcurrentRuns,
    DailyRuns,
    MonthlyCpuHours,
    Storage,
}

crate::simple_display! {
    QuotaKind {
        ConcurrentRuns => "concurrent_runs",
        DailyRuns => "daily_runs",
        MonthlyCpuHours => "monthly_cpu_hours",
        Storage => "storage",
    }
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("quota exceeded: {kind} current={current} limit={limit}")]
    QuotaExceeded { kind: QuotaKind, current: f64, limit: f64 },

    #[error("conflict: {entity} {id} already exists")]
    Conflict { entity: &'static str, id: String },

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("build failed at {stage}: {message}")]
    BuildFailed { stage: String, message: String },

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("collection corrupt: {0}")]
    CollectionCorrupt(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound { entity, id: id.to_string() }
    }

    pub fn invalid_transition(from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        Self::InvalidStateTransition { from: from.to_string(), to: to.to_string() }
    }

    pub fn quota_exceeded(kind: QuotaKind, current: f64, limit: f64) -> Self {
        Self::QuotaExceeded { kind, current, limit }
    }
}
