//! `BuildResult` (spec §4.2 step 6): the outcome handed back to whoever
//! requested a build, regardless of whether it succeeded.

use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct BuildResult {
    pub success: bool,
    pub image_tag: Option<String>,
    pub cache_hit: bool,
    pub total_duration: Duration,
    pub deps_duration: Option<Duration>,
    pub program_duration: Option<Duration>,
    pub error_message: Option<String>,
    pub build_job_name: Option<String>,
}

impl BuildResult {
    pub fn failure(error_message: impl Into<String>, total_duration: Duration) -> Self {
        Self {
            success: false,
            error_message: Some(error_message.into()),
            total_duration,
            ..Default::default()
        }
    }
}
