//! Program entity: a user-supplied code bundle with declared dependencies.

use crate::id::define_uuid_id;
use serde::{Deserialize, Serialize};

define_uuid_id! {
    /// Unique identifier for a [`Program`].
    pub struct ProgramId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencySource {
    Pyproject,
    Requirements,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSpec {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub extras: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependencies {
    pub source: DependencySource,
    pub packages: Vec<PackageSpec>,
    pub python_version: String,
    #[serde(default)]
    pub lockfile_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceProfile {
    pub cpu_limit: f64,
    pub memory_limit_mb: u64,
    pub timeout_seconds: u64,
    #[serde(default)]
    pub ephemeral_storage_limit_mb: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageBuildStatus {
    Pending,
    Building,
    Ready,
    Failed,
}

crate::simple_display! {
    ImageBuildStatus {
        Pending => "pending",
        Building => "building",
        Ready => "ready",
        Failed => "failed",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sharing {
    Private,
    Shared,
    Public,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareeType {
    User,
    Group,
    Org,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SharePermission {
    View,
    Run,
    Edit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedWith {
    #[serde(rename = "type")]
    pub sharee_type: ShareeType,
    pub id: String,
    pub permission: SharePermission,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub id: ProgramId,
    pub name: String,
    pub entrypoint: String,
    pub project_root: String,
    pub dependencies: Dependencies,
    pub resource_profile: ResourceProfile,
    #[serde(default)]
    pub image_tag: Option<String>,
    pub image_build_status: ImageBuildStatus,
    #[serde(default)]
    pub image_build_error: Option<String>,
    pub owner: String,
    pub sharing: Sharing,
    #[serde(default)]
    pub shared_with: Vec<SharedWith>,
}

impl Program {
    /// Path to this program's workspace files on disk, relative to `data_dir`.
    pub fn workspace_subpath(&self) -> String {
        format!("workspaces/{}", self.id)
    }
}

crate::builder! {
    pub struct ProgramBuilder => Program {
        into {
            name: String = "demo",
            entrypoint: String = "main.py",
            project_root: String = ".",
            owner: String = "user-1",
        }
        set {
            dependencies: Dependencies = Dependencies {
                source: DependencySource::Pyproject,
                packages: Vec::new(),
                python_version: "3.12".to_string(),
                lockfile_hash: None,
            },
            resource_profile: ResourceProfile = ResourceProfile {
                cpu_limit: 1.0,
                memory_limit_mb: 512,
                timeout_seconds: 300,
                ephemeral_storage_limit_mb: None,
            },
            image_build_status: ImageBuildStatus = ImageBuildStatus::Pending,
            sharing: Sharing = Sharing::Private,
            shared_with: Vec<SharedWith> = Vec::new(),
        }
        option {
            image_tag: String = None,
            image_build_error: String = None,
        }
        computed {
            id: ProgramId = ProgramId::new(),
        }
    }
}

#[cfg(test)]
#[path = "program_tests.rs"]
mod tests;
