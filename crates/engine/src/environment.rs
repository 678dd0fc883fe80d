//! Environment Lifecycle Manager (spec §4.3, C3): CRUD plus the status
//! transitions an [`Environment`] moves through from `creating` to its
//! eventual removal. Mirrors `pg-quota`/`pg-artifacts`'s
//! `Engine<C: Clock> { store, clock }` shape.

use crate::error::{EngineError, EngineResult};
use pg_core::{Clock, CoreError, Environment, EnvironmentId, EnvironmentStatus, ProgramId};
use pg_store::Store;
use std::sync::Arc;

#[derive(Clone)]
pub struct EnvironmentManager<C: Clock> {
    store: Arc<Store>,
    clock: C,
}

impl<C: Clock> EnvironmentManager<C> {
    pub fn new(store: Arc<Store>, clock: C) -> Self {
        Self { store, clock }
    }

    pub fn create_environment(&self, program_id: ProgramId, image_tag: impl Into<String>) -> EngineResult<Environment> {
        let env = Environment::new(program_id, image_tag.into(), &self.clock);
        self.store.environments.put(env.clone())?;
        tracing::info!(environment_id = %env.id, program_id = %program_id, "created environment");
        Ok(env)
    }

    pub fn get_environment(&self, id: EnvironmentId) -> Option<Environment> {
        self.store.environments.get(id.as_uuid())
    }

    pub fn list_environments(
        &self,
        program_id: Option<ProgramId>,
        status: Option<EnvironmentStatus>,
    ) -> Vec<Environment> {
        self.store.environments.list_filter(|e| {
            program_id.map_or(true, |p| e.program_id == p) && status.map_or(true, |s| e.status == s)
        })
    }

    /// Apply a status transition, enforcing [`EnvironmentStatus::can_transition`]
    /// and the `startedAt`/`stoppedAt`/`errorMessage`/`containerId` side
    /// effects in [`Environment::transition_to`].
    pub fn update_status(
        &self,
        id: EnvironmentId,
        to: EnvironmentStatus,
        container_id: Option<String>,
        error_message: Option<String>,
    ) -> EngineResult<Environment> {
        let clock = self.clock.clone();
        let mut transition: Option<Result<(), CoreError>> = None;
        let updated = self.store.environments.update(id.as_uuid(), |env| {
            transition = Some(env.transition_to(to, &clock, container_id.clone(), error_message.clone()));
        })?;
        match transition {
            Some(Ok(())) => {}
            Some(Err(e)) => return Err(EngineError::from(e)),
            None => return Err(EngineError::from(CoreError::not_found("environment", id))),
        }
        updated.ok_or_else(|| EngineError::from(CoreError::not_found("environment", id)))
    }

    pub fn mark_ready(&self, id: EnvironmentId) -> EngineResult<Environment> {
        self.update_status(id, EnvironmentStatus::Ready, None, None)
    }

    pub fn mark_failed(&self, id: EnvironmentId, error: impl Into<String>) -> EngineResult<Environment> {
        self.update_status(id, EnvironmentStatus::Failed, None, Some(error.into()))
    }

    pub fn mark_running(&self, id: EnvironmentId, container_id: impl Into<String>) -> EngineResult<Environment> {
        self.update_status(id, EnvironmentStatus::Running, Some(container_id.into()), None)
    }

    pub fn mark_stopped(&self, id: EnvironmentId) -> EngineResult<Environment> {
        self.update_status(id, EnvironmentStatus::Stopped, None, None)
    }

    /// `ready -> starting`, claiming a warm Environment for a Run.
    pub fn start_environment(&self, id: EnvironmentId) -> EngineResult<Environment> {
        self.update_status(id, EnvironmentStatus::Starting, None, None)
    }

    /// `running -> stopping`.
    pub fn stop_environment(&self, id: EnvironmentId) -> EngineResult<Environment> {
        self.update_status(id, EnvironmentStatus::Stopping, None, None)
    }

    /// `{ready,stopped,failed} -> deleting -> ∅`. Rejects deletion from
    /// `running` (caller must stop first) via the normal transition check.
    pub fn delete_environment(&self, id: EnvironmentId) -> EngineResult<()> {
        self.update_status(id, EnvironmentStatus::Deleting, None, None)?;
        self.store.environments.remove(id.as_uuid())?;
        tracing::info!(environment_id = %id, "deleted environment");
        Ok(())
    }
}

#[cfg(test)]
#[path = "environment_tests.rs"]
mod tests;
