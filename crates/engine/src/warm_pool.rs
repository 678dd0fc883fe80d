//! Warm Pool reconciler (spec §4.3 "Warm Pool"): keeps a configurable
//! number of `ready` [`Environment`]s on hand for the most popular
//! Programs, so a Run never has to wait on a cold build+start.
//!
//! "Popular" ranks Programs by recent Run count first, tie-broken by their
//! dependency layer's cache `useCount` (Open Question iii).

use crate::environment::EnvironmentManager;
use crate::error::EngineResult;
use pg_build::BuildEngine;
use pg_core::{Clock, EnvironmentStatus, ImageBuildStatus, Program, ProgramId};
use pg_store::Store;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct WarmPoolConfig {
    pub enabled: bool,
    pub interval_seconds: u64,
    pub pool_size: usize,
    pub max_age_minutes: u64,
    pub popular_deps_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct WarmupMetrics {
    pub warm_pool_size: usize,
    pub environments_created: usize,
    pub environments_recycled: usize,
    pub layers_pre_built: usize,
    pub errors: Vec<String>,
    pub duration: StdDuration,
}

pub struct WarmPoolReconciler<C: Clock> {
    store: Arc<Store>,
    clock: C,
    environments: EnvironmentManager<C>,
    build_engine: Arc<BuildEngine<C>>,
    config: WarmPoolConfig,
}

impl<C: Clock> WarmPoolReconciler<C> {
    pub fn new(
        store: Arc<Store>,
        clock: C,
        build_engine: Arc<BuildEngine<C>>,
        config: WarmPoolConfig,
    ) -> Self {
        let environments = EnvironmentManager::new(store.clone(), clock.clone());
        Self { store, clock, environments, build_engine, config }
    }

    /// Ranks Programs with a built, ready image by recent Run count
    /// (descending), tie-broken by their dependency layer's `useCount`.
    fn popular_programs(&self, limit: usize) -> Vec<Program> {
        let mut run_counts: HashMap<ProgramId, usize> = HashMap::new();
        for run in self.store.runs.list() {
            *run_counts.entry(run.program_id).or_insert(0) += 1;
        }

        let mut candidates: Vec<Program> = self
            .store
            .programs
            .list_filter(|p| p.image_build_status == ImageBuildStatus::Ready && p.image_tag.is_some());

        candidates.sort_by(|a, b| {
            let runs_a = run_counts.get(&a.id).copied().unwrap_or(0);
            let runs_b = run_counts.get(&b.id).copied().unwrap_or(0);
            runs_b.cmp(&runs_a).then_with(|| {
                let use_a = self.cache_use_count(a);
                let use_b = self.cache_use_count(b);
                use_b.cmp(&use_a)
            })
        });
        candidates.truncate(limit);
        candidates
    }

    fn cache_use_count(&self, program: &Program) -> u64 {
        let cache_key =
            pg_core::compute_cache_key(&program.dependencies.python_version, &program.dependencies.packages);
        self.store
            .layer_cache
            .list_filter(|e| e.cache_key == cache_key)
            .into_iter()
            .next()
            .map(|e| e.use_count)
            .unwrap_or(0)
    }

    /// One reconciliation pass: recycle stale warm Environments, then top
    /// the pool back up to `pool_size` across the most popular Programs.
    pub async fn tick(&self) -> WarmupMetrics {
        let started = std::time::Instant::now();
        let mut metrics = WarmupMetrics::default();

        let cutoff = self.clock.now() - chrono::Duration::minutes(self.config.max_age_minutes as i64);
        let warm = self.store.environments.list_filter(|e| e.status == EnvironmentStatus::Ready);
        for env in &warm {
            if env.created_at < cutoff {
                match self.environments.delete_environment(env.id) {
                    Ok(()) => metrics.environments_recycled += 1,
                    Err(e) => metrics.errors.push(format!("recycle {}: {e}", env.id)),
                }
            }
        }

        let warm_after_recycle =
            self.store.environments.list_filter(|e| e.status == EnvironmentStatus::Ready).len();
        let deficit = self.config.pool_size.saturating_sub(warm_after_recycle);
        metrics.warm_pool_size = warm_after_recycle;

        if deficit > 0 {
            let popular = self.popular_programs(self.config.popular_deps_count.max(deficit));
            for program in popular.into_iter().cycle().take(deficit) {
                match self.provision_warm_environment(&program).await {
                    Ok(created) => {
                        metrics.environments_created += 1;
                        metrics.warm_pool_size += 1;
                        if created {
                            metrics.layers_pre_built += 1;
                        }
                    }
                    Err(e) => metrics.errors.push(format!("provision {}: {e}", program.id)),
                }
            }
        }

        metrics.duration = started.elapsed();
        if !metrics.errors.is_empty() {
            tracing::warn!(errors = ?metrics.errors, "warm pool tick completed with errors");
        }
        metrics
    }

    /// Returns `Ok(true)` if this provision triggered a fresh image build
    /// (as opposed to reusing an already-built tag).
    async fn provision_warm_environment(&self, program: &Program) -> EngineResult<bool> {
        let (image_tag, built) = match &program.image_tag {
            Some(tag) => (tag.clone(), false),
            None => {
                let result = self.build_engine.build_image(program, false, false).await?;
                let tag = result.image_tag.ok_or_else(|| {
                    pg_core::CoreError::BuildFailed {
                        stage: "warm_pool".to_string(),
                        message: result.error_message.unwrap_or_else(|| "build produced no image tag".to_string()),
                    }
                })?;
                (tag, true)
            }
        };

        let env = self.environments.create_environment(program.id, image_tag)?;
        self.environments.mark_ready(env.id)?;
        Ok(built)
    }

    /// Spawn the tick loop as a background task, stopping cleanly when
    /// `cancellation` fires (spec §5).
    pub fn spawn(self: Arc<Self>, cancellation: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            if !self.config.enabled {
                return;
            }
            let interval = StdDuration::from_secs(self.config.interval_seconds);
            loop {
                let metrics = self.tick().await;
                tracing::debug!(
                    warm_pool_size = metrics.warm_pool_size,
                    created = metrics.environments_created,
                    recycled = metrics.environments_recycled,
                    "warm pool tick complete"
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
#[path = "warm_pool_tests.rs"]
mod tests;
