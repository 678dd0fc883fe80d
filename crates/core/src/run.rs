//! Run entity and state machine (spec §3, §4.4).

use crate::clock::Clock;
use crate::credential::CredentialId;
use crate::environment::EnvironmentId;
use crate::error::{CoreError, CoreResult};
use crate::id::define_uuid_id;
use crate::program::ProgramId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

define_uuid_id! {
    /// Unique identifier for a [`Run`].
    pub struct RunId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    Starting,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

crate::simple_display! {
    RunStatus {
        Queued => "queued",
        Starting => "starting",
        Running => "running",
        Succeeded => "succeeded",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Succeeded | RunStatus::Failed | RunStatus::Cancelled)
    }

    /// `queued -> {starting|cancelled}`; `starting -> {running|succeeded|failed|cancelled}`;
    /// `running -> {succeeded|failed|cancelled}`. Terminal states are sinks.
    ///
    /// `starting -> succeeded` is permitted (Open Question i): very fast jobs
    /// can complete before cluster polling ever observes `running`.
    pub fn can_transition(self, to: RunStatus) -> bool {
        use RunStatus::*;
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, to),
            (Queued, Starting)
                | (Queued, Cancelled)
                | (Starting, Running)
                | (Starting, Succeeded)
                | (Starting, Failed)
                | (Starting, Cancelled)
                | (Running, Succeeded)
                | (Running, Failed)
                | (Running, Cancelled)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub owner_id: String,
    pub environment_id: EnvironmentId,
    pub program_id: ProgramId,
    pub status: RunStatus,
    #[serde(default)]
    pub job_name: Option<String>,
    #[serde(default)]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub credential_ids: Vec<CredentialId>,
}

impl Run {
    pub fn new(
        owner_id: impl Into<String>,
        environment_id: EnvironmentId,
        program_id: ProgramId,
        credential_ids: Vec<CredentialId>,
        clock: &impl Clock,
    ) -> Self {
        Self {
            id: RunId::new(),
            owner_id: owner_id.into(),
            environment_id,
            program_id,
            status: RunStatus::Queued,
            job_name: None,
            exit_code: None,
            error_message: None,
            created_at: clock.now(),
            started_at: None,
            completed_at: None,
            output: None,
            output_path: None,
            credential_ids,
        }
    }

    /// Validate and apply a status transition, enforcing invariant 3:
    /// `startedAt` set iff the run ever entered `running`; `completedAt` set
    /// iff terminal.
    pub fn transition_to(
        &mut self,
        to: RunStatus,
        clock: &impl Clock,
        error_message: Option<String>,
    ) -> CoreResult<()> {
        if !self.status.can_transition(to) {
            return Err(CoreError::invalid_transition(self.status, to));
        }
        let now = clock.now();
        if to == RunStatus::Running && self.started_at.is_none() {
            self.started_at = Some(now);
        }
        if to.is_terminal() {
            self.completed_at = Some(now);
        }
        if error_message.is_some() {
            self.error_message = error_message;
        }
        self.status = to;
        Ok(())
    }

    pub fn mark_succeeded(&mut self, exit_code: i32, clock: &impl Clock) -> CoreResult<()> {
        self.transition_to(RunStatus::Succeeded, clock, None)?;
        self.exit_code = Some(exit_code);
        Ok(())
    }

    pub fn mark_failed(&mut self, error: impl Into<String>, clock: &impl Clock) -> CoreResult<()> {
        self.transition_to(RunStatus::Failed, clock, Some(error.into()))
    }

    pub fn mark_cancelled(&mut self, reason: impl Into<String>, clock: &impl Clock) -> CoreResult<()> {
        self.transition_to(RunStatus::Cancelled, clock, Some(reason.into()))
    }

    pub fn mark_starting(&mut self, job_name: impl Into<String>, clock: &impl Clock) -> CoreResult<()> {
        self.transition_to(RunStatus::Starting, clock, None)?;
        self.job_name = Some(job_name.into());
        Ok(())
    }

    pub fn mark_running(&mut self, clock: &impl Clock) -> CoreResult<()> {
        self.transition_to(RunStatus::Running, clock, None)
    }

    /// CPU-hours consumed by this run, given the program's cpu core count.
    /// Returns `None` until both `startedAt` and `completedAt` are set.
    pub fn cpu_hours(&self, cpu_cores: f64) -> Option<f64> {
        let started = self.started_at?;
        let completed = self.completed_at?;
        let hours = (completed - started).num_milliseconds() as f64 / (1000.0 * 3600.0);
        Some(hours.max(0.0) * cpu_cores)
    }
}

crate::builder! {
    pub struct RunBuilder => Run {
        into {
            owner_id: String = "user-1",
        }
        set {
            status: RunStatus = RunStatus::Queued,
            credential_ids: Vec<CredentialId> = Vec::new(),
        }
        option {
            job_name: String = None,
            exit_code: i32 = None,
            error_message: String = None,
            started_at: DateTime<Utc> = None,
            completed_at: DateTime<Utc> = None,
            output: String = None,
            output_path: String = None,
        }
        computed {
            id: RunId = RunId::new(),
            environment_id: EnvironmentId = EnvironmentId::new(),
            program_id: ProgramId = ProgramId::new(),
            created_at: DateTime<Utc> = Utc::now(),
        }
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
