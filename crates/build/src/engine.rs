//! `BuildEngine`: the two-layer build pipeline (spec §4.2).
//!
//! Coalesces concurrent builds that share a `cacheKey` behind a per-key
//! async mutex (the second caller blocks, then observes the first
//! caller's cache entry rather than rebuilding) and lets a newer
//! program-layer build for the same [`ProgramId`] cancel a stale one via a
//! `CancellationToken`, per spec §4.2's "last-writer wins" rule.

use crate::backend::{BuildBackend, DepLayerRequest, ProgramLayerRequest};
use crate::error::{BuildEngineResult};
use crate::result::BuildResult;
use pg_adapters::{Registry, RegistryCredentials};
use pg_core::{compute_cache_key, Clock, ImageBuildStatus, LayerCacheEntry, Program, ProgramId};
use pg_store::Store;
use parking_lot::Mutex as SyncMutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;

pub struct BuildEngine<C: Clock> {
    store: Arc<Store>,
    clock: C,
    backend: Arc<dyn BuildBackend>,
    registry: Option<Arc<dyn Registry>>,
    registry_credentials: RegistryCredentials,
    data_dir: PathBuf,
    cache_locks: SyncMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    program_tokens: SyncMutex<HashMap<ProgramId, CancellationToken>>,
}

impl<C: Clock> BuildEngine<C> {
    pub fn new(
        store: Arc<Store>,
        clock: C,
        backend: Arc<dyn BuildBackend>,
        registry: Option<Arc<dyn Registry>>,
        registry_credentials: RegistryCredentials,
        data_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            clock,
            backend,
            registry,
            registry_credentials,
            data_dir,
            cache_locks: SyncMutex::new(HashMap::new()),
            program_tokens: SyncMutex::new(HashMap::new()),
        }
    }

    fn cache_lock(&self, cache_key: &str) -> Arc<AsyncMutex<()>> {
        self.cache_locks.lock().entry(cache_key.to_string()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }

    fn find_cache_entry(&self, cache_key: &str) -> Option<LayerCacheEntry> {
        self.store.layer_cache.list_filter(|e| e.cache_key == cache_key).into_iter().next()
    }

    /// §4.2 pipeline. Concurrent calls for the *same program* cancel the
    /// prior in-flight call (last-writer wins); concurrent calls across
    /// programs that share a `cacheKey` coalesce on the dependency layer.
    pub async fn build_image(&self, program: &Program, force_rebuild: bool, push: bool) -> BuildEngineResult<BuildResult> {
        let started = Instant::now();

        self.store.programs.update(program.id.as_uuid(), |p| {
            p.image_build_status = ImageBuildStatus::Building;
        })?;

        let token = {
            let new_token = CancellationToken::new();
            let mut tokens = self.program_tokens.lock();
            if let Some(prev) = tokens.insert(program.id, new_token.clone()) {
                prev.cancel();
            }
            new_token
        };

        let outcome = tokio::select! {
            r = self.build_image_inner(program, force_rebuild, push, started) => r,
            _ = token.cancelled() => {
                tracing::info!(program_id = %program.id, "build superseded by a newer build for the same program");
                return Err(crate::error::BuildError::Superseded);
            }
        };

        match &outcome {
            Ok(result) if result.success => {
                self.store.programs.update(program.id.as_uuid(), |p| {
                    p.image_build_status = ImageBuildStatus::Ready;
                    p.image_tag = result.image_tag.clone();
                    p.image_build_error = None;
                })?;
            }
            Ok(result) => {
                // A failed program-layer build must not clobber a
                // previously-good imageTag (spec §4.2 "Failure semantics").
                self.store.programs.update(program.id.as_uuid(), |p| {
                    p.image_build_status = ImageBuildStatus::Failed;
                    p.image_build_error = result.error_message.clone();
                })?;
            }
            Err(e) => {
                self.store.programs.update(program.id.as_uuid(), |p| {
                    p.image_build_status = ImageBuildStatus::Failed;
                    p.image_build_error = Some(e.to_string());
                })?;
            }
        }
        outcome
    }

    async fn build_image_inner(
        &self,
        program: &Program,
        force_rebuild: bool,
        push: bool,
        started: Instant,
    ) -> BuildEngineResult<BuildResult> {
        let cache_key = compute_cache_key(&program.dependencies.python_version, &program.dependencies.packages);
        let lock = self.cache_lock(&cache_key);
        let _guard = lock.lock().await;

        let mut cache_hit = false;
        let mut deps_duration = None;
        let dep_image_tag = format!("deps-{cache_key}");

        if !force_rebuild {
            if let Some(entry) = self.find_cache_entry(&cache_key) {
                if self.backend.image_exists(&entry.image_tag).await.unwrap_or(false) {
                    self.store.layer_cache.update(entry.id.as_uuid(), |e| e.record_use(self.clock.now()))?;
                    cache_hit = true;
                }
            }
        }

        if !cache_hit {
            let deps_started = Instant::now();
            let dep_req = DepLayerRequest {
                image_tag: dep_image_tag.clone(),
                python_version: program.dependencies.python_version.clone(),
                packages: program.dependencies.packages.clone(),
            };
            // A failed dep-layer build must not create a cache entry
            // (spec §4.2 "Failure semantics").
            let dep_out = match self.backend.build_dependency_layer(dep_req).await {
                Ok(out) => out,
                Err(e) => {
                    return Ok(BuildResult::failure(e.to_string(), started.elapsed()));
                }
            };
            deps_duration = Some(deps_started.elapsed());

            let entry = LayerCacheEntry {
                id: pg_core::LayerCacheEntryId::new(),
                cache_key: cache_key.clone(),
                image_tag: dep_out.image_tag.clone(),
                python_version: program.dependencies.python_version.clone(),
                packages_hash: pg_core::compute_packages_hash(&program.dependencies.packages),
                package_count: program.dependencies.packages.len(),
                size_bytes: dep_out.size_bytes,
                created_at: self.clock.now(),
                last_used_at: self.clock.now(),
                use_count: 1,
            };
            self.store.layer_cache.put(entry)?;
        }

        let program_started = Instant::now();
        let prog_image_tag = format!("mellea-prog-{}-{}", program.id, program.id.short());
        let prog_req = ProgramLayerRequest {
            base_image_tag: dep_image_tag,
            image_tag: prog_image_tag.clone(),
            workspace_dir: self.data_dir.join(program.workspace_subpath()),
            entrypoint: program.entrypoint.clone(),
        };
        let prog_out = match self.backend.build_program_layer(prog_req).await {
            Ok(out) => out,
            Err(e) => {
                return Ok(BuildResult {
                    success: false,
                    cache_hit,
                    deps_duration,
                    error_message: Some(e.to_string()),
                    total_duration: started.elapsed(),
                    ..Default::default()
                });
            }
        };
        let program_duration = Some(program_started.elapsed());

        if push {
            if let Some(registry) = &self.registry {
                registry.push(&prog_out.image_tag, &self.registry_credentials).await?;
            }
        }

        Ok(BuildResult {
            success: true,
            image_tag: Some(prog_out.image_tag),
            cache_hit,
            total_duration: started.elapsed(),
            deps_duration,
            program_duration,
            error_message: None,
            build_job_name: prog_out.build_job_name,
        })
    }

    /// Remove layer cache entries unused for longer than `max_age_days`,
    /// best-effort deleting the underlying images (spec §4.2).
    pub async fn prune_stale(&self, max_age_days: i64) -> BuildEngineResult<usize> {
        let cutoff = self.clock.now() - chrono::Duration::days(max_age_days);
        let stale: Vec<LayerCacheEntry> =
            self.store.layer_cache.list_filter(|e| e.last_used_at < cutoff);
        for entry in &stale {
            let _ = self.backend.delete_image(&entry.image_tag).await;
            self.store.layer_cache.remove(entry.id.as_uuid())?;
        }
        Ok(stale.len())
    }

    /// Remove a single cache entry's metadata row without touching the
    /// underlying image (spec §4.2 `invalidateCacheEntry`).
    pub fn invalidate_cache_entry(&self, cache_key: &str) -> BuildEngineResult<bool> {
        if let Some(entry) = self.find_cache_entry(cache_key) {
            self.store.layer_cache.remove(entry.id.as_uuid())?;
            return Ok(true);
        }
        Ok(false)
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
