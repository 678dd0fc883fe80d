//! RetentionPolicy entity (spec §3, §4.7).

use crate::id::define_uuid_id;
use serde::{Deserialize, Serialize};

define_uuid_id! {
    /// Unique identifier for a [`RetentionPolicy`].
    pub struct RetentionPolicyId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionResourceType {
    Artifact,
    Run,
    Environment,
    Log,
}

crate::simple_display! {
    RetentionResourceType {
        Artifact => "artifact",
        Run => "run",
        Environment => "environment",
        Log => "log",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionCondition {
    AgeDays,
    Status,
    SizeBytes,
    UnusedDays,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub id: RetentionPolicyId,
    pub name: String,
    pub resource_type: RetentionResourceType,
    pub condition: RetentionCondition,
    pub threshold: f64,
    #[serde(default)]
    pub status_value: Option<String>,
    pub enabled: bool,
    pub priority: i32,
    /// `null` userId = system policy, applies across all users.
    #[serde(default)]
    pub user_id: Option<String>,
}

impl RetentionPolicy {
    pub fn is_system_policy(&self) -> bool {
        self.user_id.is_none()
    }
}

crate::builder! {
    pub struct RetentionPolicyBuilder => RetentionPolicy {
        into {
            name: String = "default-artifact-retention",
        }
        set {
            resource_type: RetentionResourceType = RetentionResourceType::Artifact,
            condition: RetentionCondition = RetentionCondition::AgeDays,
            threshold: f64 = 30.0,
            enabled: bool = true,
            priority: i32 = 0,
        }
        option {
            status_value: String = None,
            user_id: String = None,
        }
        computed {
            id: RetentionPolicyId = RetentionPolicyId::new(),
        }
    }
}

#[cfg(test)]
#[path = "retention_policy_tests.rs"]
mod tests;
