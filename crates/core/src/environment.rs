//! Environment entity and state machine (spec §3, §4.3).

use crate::clock::Clock;
use crate::error::{CoreError, CoreResult};
use crate::id::define_uuid_id;
use crate::program::ProgramId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

define_uuid_id! {
    /// Unique identifier for an [`Environment`].
    pub struct EnvironmentId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentStatus {
    Creating,
    Ready,
    Starting,
    Running,
    Stopping,
    Stopped,
    Failed,
    Deleting,
}

crate::simple_display! {
    EnvironmentStatus {
        Creating => "creating",
        Ready => "ready",
        Starting => "starting",
        Running => "running",
        Stopping => "stopping",
        Stopped => "stopped",
        Failed => "failed",
        Deleting => "deleting",
    }
}

impl EnvironmentStatus {
    /// The transition table from spec §3: "Lifecycles (summary)".
    ///
    /// `creating -> {ready|failed}`; `ready -> {starting|deleting}`;
    /// `starting -> {running|failed}`; `running -> {stopping|failed}`;
    /// `stopping -> stopped`; `{stopped,failed,ready} -> deleting -> ∅`.
    pub fn can_transition(self, to: EnvironmentStatus) -> bool {
        use EnvironmentStatus::*;
        matches!(
            (self, to),
            (Creating, Ready)
                | (Creating, Failed)
                | (Ready, Starting)
                | (Ready, Deleting)
                | (Starting, Running)
                | (Starting, Failed)
                | (Running, Stopping)
                | (Running, Failed)
                | (Stopping, Stopped)
                | (Stopped, Deleting)
                | (Failed, Deleting)
        )
    }

    pub fn is_terminal_for_deletion(self) -> bool {
        matches!(self, EnvironmentStatus::Stopped | EnvironmentStatus::Failed | EnvironmentStatus::Ready)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub cpu_limit: f64,
    pub memory_limit_mb: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Environment {
    pub id: EnvironmentId,
    pub program_id: ProgramId,
    pub image_tag: String,
    pub status: EnvironmentStatus,
    #[serde(default)]
    pub container_id: Option<String>,
    #[serde(default)]
    pub resource_limits: Option<ResourceLimits>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stopped_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl Environment {
    pub fn new(program_id: ProgramId, image_tag: String, clock: &impl Clock) -> Self {
        let now = clock.now();
        Self {
            id: EnvironmentId::new(),
            program_id,
            image_tag,
            status: EnvironmentStatus::Creating,
            container_id: None,
            resource_limits: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            stopped_at: None,
            error_message: None,
        }
    }

    /// Validate and apply a status transition, enforcing the side effects
    /// spec'd in §4.3: `startedAt` on first entry to `running`, `stoppedAt`
    /// on entry to `stopped`, `errorMessage` on entry to `failed`,
    /// `containerId` on entry to `running`.
    pub fn transition_to(
        &mut self,
        to: EnvironmentStatus,
        clock: &impl Clock,
        container_id: Option<String>,
        error_message: Option<String>,
    ) -> CoreResult<()> {
        if !self.status.can_transition(to) {
            return Err(CoreError::invalid_transition(self.status, to));
        }
        let now = clock.now();
        match to {
            EnvironmentStatus::Running => {
                if self.started_at.is_none() {
                    self.started_at = Some(now);
                }
                if let Some(cid) = container_id {
                    self.container_id = Some(cid);
                }
            }
            EnvironmentStatus::Stopped => {
                self.stopped_at = Some(now);
            }
            EnvironmentStatus::Failed => {
                self.error_message = error_message.or(self.error_message.take());
            }
            _ => {}
        }
        self.status = to;
        self.updated_at = now;
        Ok(())
    }

    pub fn mark_ready(&mut self, clock: &impl Clock) -> CoreResult<()> {
        self.transition_to(EnvironmentStatus::Ready, clock, None, None)
    }

    pub fn mark_failed(&mut self, error: impl Into<String>, clock: &impl Clock) -> CoreResult<()> {
        self.transition_to(EnvironmentStatus::Failed, clock, None, Some(error.into()))
    }

    pub fn mark_running(&mut self, container_id: impl Into<String>, clock: &impl Clock) -> CoreResult<()> {
        self.transition_to(EnvironmentStatus::Running, clock, Some(container_id.into()), None)
    }

    pub fn mark_stopped(&mut self, clock: &impl Clock) -> CoreResult<()> {
        self.transition_to(EnvironmentStatus::Stopped, clock, None, None)
    }

    pub fn start(&mut self, clock: &impl Clock) -> CoreResult<()> {
        self.transition_to(EnvironmentStatus::Starting, clock, None, None)
    }

    pub fn stop(&mut self, clock: &impl Clock) -> CoreResult<()> {
        self.transition_to(EnvironmentStatus::Stopping, clock, None, None)
    }

    /// Begin deletion. Rejects deletion from `running` per §4.3 (caller must
    /// stop first).
    pub fn begin_delete(&mut self, clock: &impl Clock) -> CoreResult<()> {
        self.transition_to(EnvironmentStatus::Deleting, clock, None, None)
    }
}

crate::builder! {
    pub struct EnvironmentBuilder => Environment {
        into {
            image_tag: String = "mellea-prog-test",
        }
        set {
            program_id: ProgramId = ProgramId::new(),
            status: EnvironmentStatus = EnvironmentStatus::Creating,
            resource_limits: Option<ResourceLimits> = None,
        }
        option {
            container_id: String = None,
            error_message: String = None,
            started_at: DateTime<Utc> = None,
            stopped_at: DateTime<Utc> = None,
        }
        computed {
            id: EnvironmentId = EnvironmentId::new(),
            created_at: DateTime<Utc> = Utc::now(),
            updated_at: DateTime<Utc> = Utc::now(),
        }
    }
}

#[cfg(test)]
#[path = "environment_tests.rs"]
mod tests;
