//! Retention Reconciler (spec §4.7, C7): evaluates [`RetentionPolicy`]
//! rows against Artifacts, Runs, Environments, and Logs (modeled as
//! Artifacts of type [`ArtifactType::Log`]), deleting whatever matches.
//!
//! System policies (`userId: None`) apply to every user; user-scoped
//! policies apply only to their own `userId`. Policies are evaluated in
//! descending `priority` order, but a resource is only ever deleted once
//! per cycle even if several policies would match it.

use crate::environment::EnvironmentManager;
use crate::error::EngineResult;
use pg_core::{
    Artifact, ArtifactType, Clock, Environment, EnvironmentStatus, RetentionCondition, RetentionPolicy,
    RetentionPolicyId, RetentionResourceType, Run,
};
use pg_store::Store;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct RetentionConfig {
    pub enabled: bool,
    pub interval_seconds: u64,
    /// Fallback run retention when no explicit [`RetentionPolicy`] covers runs.
    pub default_run_retention_days: u64,
}

#[derive(Debug, Clone, Default)]
pub struct RetentionMetrics {
    pub policies_evaluated: usize,
    pub artifacts_deleted: usize,
    pub runs_deleted: usize,
    pub environments_cleaned: usize,
    pub logs_deleted: usize,
    pub storage_freed_bytes: u64,
    pub errors: Vec<String>,
    pub duration: StdDuration,
}

/// Result of a dry-run policy evaluation: what a cycle would delete if the
/// policy ran, without mutating anything.
#[derive(Debug, Clone, Default)]
pub struct PolicyPreview {
    pub matching_count: usize,
    pub total_size_bytes: u64,
    pub resource_ids: Vec<Uuid>,
}

pub struct RetentionReconciler<C: Clock> {
    store: Arc<Store>,
    clock: C,
    environments: EnvironmentManager<C>,
    config: RetentionConfig,
}

impl<C: Clock> RetentionReconciler<C> {
    pub fn new(store: Arc<Store>, clock: C, config: RetentionConfig) -> Self {
        let environments = EnvironmentManager::new(store.clone(), clock.clone());
        Self { store, clock, environments, config }
    }

    fn age_days(&self, at: chrono::DateTime<chrono::Utc>) -> f64 {
        (self.clock.now() - at).num_seconds() as f64 / 86_400.0
    }

    fn applies_to(&self, policy: &RetentionPolicy, owner_id: &str) -> bool {
        policy.enabled && policy.user_id.as_deref().map_or(true, |u| u == owner_id)
    }

    fn artifact_matches(&self, policy: &RetentionPolicy, artifact: &Artifact) -> bool {
        if policy.resource_type != RetentionResourceType::Artifact || !self.applies_to(policy, &artifact.owner_id) {
            return false;
        }
        match policy.condition {
            RetentionCondition::AgeDays => self.age_days(artifact.created_at) >= policy.threshold,
            RetentionCondition::SizeBytes => artifact.size_bytes as f64 >= policy.threshold,
            RetentionCondition::UnusedDays | RetentionCondition::Status => false,
        }
    }

    fn log_matches(&self, policy: &RetentionPolicy, artifact: &Artifact) -> bool {
        if policy.resource_type != RetentionResourceType::Log || artifact.artifact_type != ArtifactType::Log {
            return false;
        }
        if !self.applies_to(policy, &artifact.owner_id) {
            return false;
        }
        matches!(policy.condition, RetentionCondition::AgeDays) && self.age_days(artifact.created_at) >= policy.threshold
    }

    fn run_matches(&self, policy: &RetentionPolicy, run: &Run) -> bool {
        if policy.resource_type != RetentionResourceType::Run || !self.applies_to(policy, &run.owner_id) {
            return false;
        }
        if !run.status.is_terminal() {
            return false;
        }
        match policy.condition {
            RetentionCondition::AgeDays => run.completed_at.map_or(false, |at| self.age_days(at) >= policy.threshold),
            RetentionCondition::Status => {
                policy.status_value.as_deref().map_or(false, |v| v == run.status.to_string())
            }
            RetentionCondition::SizeBytes | RetentionCondition::UnusedDays => false,
        }
    }

    fn environment_matches(&self, policy: &RetentionPolicy, env: &Environment) -> bool {
        if policy.resource_type != RetentionResourceType::Environment {
            return false;
        }
        if !matches!(env.status, EnvironmentStatus::Ready | EnvironmentStatus::Stopped | EnvironmentStatus::Failed) {
            return false;
        }
        match policy.condition {
            RetentionCondition::AgeDays => self.age_days(env.updated_at) >= policy.threshold,
            RetentionCondition::UnusedDays => self.age_days(env.updated_at) >= policy.threshold,
            RetentionCondition::SizeBytes | RetentionCondition::Status => false,
        }
    }

    fn enabled_policies_by_priority(&self) -> Vec<RetentionPolicy> {
        let mut policies = self.store.retention_policies.list_filter(|p| p.enabled);
        policies.sort_by_key(|p| std::cmp::Reverse(p.priority));
        policies
    }

    /// Dry run for a single policy: what would be deleted, with no mutation.
    pub fn preview_policy(&self, policy_id: RetentionPolicyId) -> EngineResult<PolicyPreview> {
        let Some(policy) = self.store.retention_policies.get(policy_id.as_uuid()) else {
            return Ok(PolicyPreview::default());
        };

        let mut preview = PolicyPreview::default();
        match policy.resource_type {
            RetentionResourceType::Artifact => {
                for artifact in self.store.artifacts.list_filter(|a| self.artifact_matches(&policy, a)) {
                    preview.matching_count += 1;
                    preview.total_size_bytes += artifact.size_bytes;
                    preview.resource_ids.push(artifact.id.as_uuid());
                }
            }
            RetentionResourceType::Log => {
                for artifact in self.store.artifacts.list_filter(|a| self.log_matches(&policy, a)) {
                    preview.matching_count += 1;
                    preview.total_size_bytes += artifact.size_bytes;
                    preview.resource_ids.push(artifact.id.as_uuid());
                }
            }
            RetentionResourceType::Run => {
                for run in self.store.runs.list_filter(|r| self.run_matches(&policy, r)) {
                    preview.matching_count += 1;
                    preview.resource_ids.push(run.id.as_uuid());
                }
            }
            RetentionResourceType::Environment => {
                for env in self.store.environments.list_filter(|e| self.environment_matches(&policy, e)) {
                    preview.matching_count += 1;
                    preview.resource_ids.push(env.id.as_uuid());
                }
            }
        }
        Ok(preview)
    }

    fn delete_artifact(&self, artifact: &Artifact) -> EngineResult<()> {
        self.store.artifacts.remove(artifact.id.as_uuid())?;
        let usage_id = pg_store::user_keyed_uuid(&artifact.owner_id);
        if self.store.artifact_usage.get(usage_id).is_some() {
            let now = self.clock.now();
            let size = artifact.size_bytes;
            self.store.artifact_usage.update(usage_id, |u| u.remove(size, now))?;
        }
        Ok(())
    }

    fn delete_run_and_dependents(&self, run: &Run) -> EngineResult<u64> {
        let mut freed = 0u64;
        for artifact in self.store.artifacts.list_filter(|a| a.run_id == run.id) {
            freed += artifact.size_bytes;
            self.delete_artifact(&artifact)?;
        }
        for metric in self.store.llm_metrics.list_filter(|m| m.run_id == run.id) {
            self.store.llm_metrics.remove(metric.id.as_uuid())?;
        }
        self.store.runs.remove(run.id.as_uuid())?;
        Ok(freed)
    }

    /// One reconciliation pass, evaluating every enabled policy in priority
    /// order and deleting each matching resource exactly once.
    pub async fn tick(&self) -> RetentionMetrics {
        let started = std::time::Instant::now();
        let mut metrics = RetentionMetrics::default();
        let policies = self.enabled_policies_by_priority();
        metrics.policies_evaluated = policies.len();

        let mut deleted_artifacts: HashSet<Uuid> = HashSet::new();
        let mut deleted_runs: HashSet<Uuid> = HashSet::new();
        let mut deleted_environments: HashSet<Uuid> = HashSet::new();

        for policy in &policies {
            match policy.resource_type {
                RetentionResourceType::Artifact => {
                    for artifact in self.store.artifacts.list_filter(|a| self.artifact_matches(policy, a)) {
                        if !deleted_artifacts.insert(artifact.id.as_uuid()) {
                            continue;
                        }
                        let size = artifact.size_bytes;
                        match self.delete_artifact(&artifact) {
                            Ok(()) => {
                                metrics.artifacts_deleted += 1;
                                metrics.storage_freed_bytes += size;
                            }
                            Err(e) => metrics.errors.push(format!("artifact {}: {e}", artifact.id)),
                        }
                    }
                }
                RetentionResourceType::Log => {
                    for artifact in self.store.artifacts.list_filter(|a| self.log_matches(policy, a)) {
                        if !deleted_artifacts.insert(artifact.id.as_uuid()) {
                            continue;
                        }
                        let size = artifact.size_bytes;
                        match self.delete_artifact(&artifact) {
                            Ok(()) => {
                                metrics.logs_deleted += 1;
                                metrics.storage_freed_bytes += size;
                            }
                            Err(e) => metrics.errors.push(format!("log {}: {e}", artifact.id)),
                        }
                    }
                }
                RetentionResourceType::Run => {
                    for run in self.store.runs.list_filter(|r| self.run_matches(policy, r)) {
                        if !deleted_runs.insert(run.id.as_uuid()) {
                            continue;
                        }
                        match self.delete_run_and_dependents(&run) {
                            Ok(freed) => {
                                metrics.runs_deleted += 1;
                                metrics.storage_freed_bytes += freed;
                            }
                            Err(e) => metrics.errors.push(format!("run {}: {e}", run.id)),
                        }
                    }
                }
                RetentionResourceType::Environment => {
                    for env in self.store.environments.list_filter(|e| self.environment_matches(policy, e)) {
                        if !deleted_environments.insert(env.id.as_uuid()) {
                            continue;
                        }
                        match self.environments.delete_environment(env.id) {
                            Ok(()) => metrics.environments_cleaned += 1,
                            Err(e) => metrics.errors.push(format!("environment {}: {e}", env.id)),
                        }
                    }
                }
            }
        }

        if !policies.iter().any(|p| p.resource_type == RetentionResourceType::Run) {
            let cutoff_days = self.config.default_run_retention_days as f64;
            for run in self.store.runs.list_filter(|r| {
                r.status.is_terminal() && r.completed_at.map_or(false, |at| self.age_days(at) >= cutoff_days)
            }) {
                if !deleted_runs.insert(run.id.as_uuid()) {
                    continue;
                }
                match self.delete_run_and_dependents(&run) {
                    Ok(freed) => {
                        metrics.runs_deleted += 1;
                        metrics.storage_freed_bytes += freed;
                    }
                    Err(e) => metrics.errors.push(format!("run {}: {e}", run.id)),
                }
            }
        }

        if !metrics.errors.is_empty() {
            tracing::warn!(errors = ?metrics.errors, "retention cycle completed with errors");
        }
        metrics.duration = started.elapsed();
        metrics
    }

    pub fn spawn(self: Arc<Self>, cancellation: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            if !self.config.enabled {
                return;
            }
            let interval = StdDuration::from_secs(self.config.interval_seconds);
            loop {
                let metrics = self.tick().await;
                tracing::debug!(
                    artifacts_deleted = metrics.artifacts_deleted,
                    runs_deleted = metrics.runs_deleted,
                    environments_cleaned = metrics.environments_cleaned,
                    logs_deleted = metrics.logs_deleted,
                    "retention cycle complete"
                );
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = cancellation.cancelled() => break,
                }
            }
        })
    }
}

#[cfg(test)]
#[path = "retention_tests.rs"]
mod tests;
