//! Per-user quota limits (spec §4.6). These are supplied by the caller
//! (plan/billing lookup lives outside this crate) rather than read from
//! global daemon config, since limits vary per user.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UserQuotaLimits {
    pub max_concurrent_runs: u32,
    pub max_runs_per_day: u32,
    pub max_cpu_hours_per_month: f64,
    pub max_storage_mb: u64,
}

impl UserQuotaLimits {
    pub fn new(
        max_concurrent_runs: u32,
        max_runs_per_day: u32,
        max_cpu_hours_per_month: f64,
        max_storage_mb: u64,
    ) -> Self {
        Self { max_concurrent_runs, max_runs_per_day, max_cpu_hours_per_month, max_storage_mb }
    }
}

/// Resolves a user id to its plan limits. The plan/billing lookup itself
/// lives outside this crate — callers (the Run Executor, the HTTP layer)
/// supply an implementation.
pub trait QuotaLimitsResolver: Send + Sync + 'static {
    fn limits_for(&self, user_id: &str) -> UserQuotaLimits;
}

/// Applies the same configured limits to every user. The default when no
/// plan/billing integration is wired up.
#[derive(Debug, Clone, Copy)]
pub struct FixedQuotaLimits(pub UserQuotaLimits);

impl QuotaLimitsResolver for FixedQuotaLimits {
    fn limits_for(&self, _user_id: &str) -> UserQuotaLimits {
        self.0
    }
}
