//! Quota pre-checks and usage recording (spec §4.6, C6).

use crate::limits::UserQuotaLimits;
use pg_core::{Clock, CoreError, CoreResult, QuotaKind, QuotaUsage};
use pg_store::Store;
use std::sync::Arc;

/// All three pre-checks, run in spec §4.6's mandated order (concurrent
/// first, then daily, then monthly CPU-hours) so the first violated limit
/// is the one reported.
#[derive(Clone)]
pub struct QuotaEngine<C: Clock> {
    store: Arc<Store>,
    clock: C,
}

impl<C: Clock> QuotaEngine<C> {
    pub fn new(store: Arc<Store>, clock: C) -> Self {
        Self { store, clock }
    }

    fn usage(&self, user_id: &str) -> QuotaUsage {
        let now = self.clock.now();
        match self.store.quota_usage.get(pg_store::user_keyed_uuid(user_id)) {
            Some(mut usage) => {
                usage.roll_over(now);
                usage
            }
            None => QuotaUsage::empty(user_id, now),
        }
    }

    fn concurrent_runs(&self, user_id: &str) -> u32 {
        self.store
            .runs
            .list_filter(|run| run.owner_id == user_id && !run.status.is_terminal())
            .len() as u32
    }

    pub fn check_concurrent_runs(&self, user_id: &str, limits: UserQuotaLimits) -> CoreResult<()> {
        let current = self.concurrent_runs(user_id);
        if current >= limits.max_concurrent_runs {
            return Err(CoreError::quota_exceeded(
                QuotaKind::ConcurrentRuns,
                current as f64,
                limits.max_concurrent_runs as f64,
            ));
        }
        Ok(())
    }

    pub fn check_daily_runs(&self, user_id: &str, limits: UserQuotaLimits) -> CoreResult<()> {
        let usage = self.usage(user_id);
        if usage.runs_today >= limits.max_runs_per_day {
            return Err(CoreError::quota_exceeded(
                QuotaKind::DailyRuns,
                usage.runs_today as f64,
                limits.max_runs_per_day as f64,
            ));
        }
        Ok(())
    }

    pub fn check_monthly_cpu_hours(
        &self,
        user_id: &str,
        requested: f64,
        limits: UserQuotaLimits,
    ) -> CoreResult<()> {
        let usage = self.usage(user_id);
        let projected = usage.cpu_hours_month + requested;
        if projected > limits.max_cpu_hours_per_month {
            return Err(CoreError::quota_exceeded(
                QuotaKind::MonthlyCpuHours,
                projected,
                limits.max_cpu_hours_per_month,
            ));
        }
        Ok(())
    }

    /// All three checks, in §4.6's mandated order.
    pub fn check_can_create_run(&self, user_id: &str, limits: UserQuotaLimits) -> CoreResult<()> {
        self.check_concurrent_runs(user_id, limits)?;
        self.check_daily_runs(user_id, limits)?;
        self.check_monthly_cpu_hours(user_id, 0.0, limits)?;
        Ok(())
    }

    /// Increment the daily run counter. The executor calls this once, at
    /// Run creation time.
    pub fn record_run_created(&self, user_id: &str) -> CoreResult<()> {
        let now = self.clock.now();
        let id = pg_store::user_keyed_uuid(user_id);
        if self.store.quota_usage.get(id).is_none() {
            self.store.quota_usage.put(QuotaUsage::empty(user_id, now))?;
        }
        self.store.quota_usage.update(id, |usage| usage.record_run_created(now))?;
        Ok(())
    }

    /// Add `hours` to the monthly CPU-hours counter. The executor must call
    /// this exactly once, on a Run's terminal transition.
    pub fn record_cpu_hours(&self, user_id: &str, hours: f64) -> CoreResult<()> {
        let now = self.clock.now();
        let id = pg_store::user_keyed_uuid(user_id);
        if self.store.quota_usage.get(id).is_none() {
            self.store.quota_usage.put(QuotaUsage::empty(user_id, now))?;
        }
        self.store.quota_usage.update(id, |usage| usage.record_cpu_hours(hours, now))?;
        tracing::debug!(user_id, hours, "recorded cpu hours");
        Ok(())
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
