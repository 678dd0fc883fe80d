//! LLMUsageMetric entity (spec §3, §4.10).

use crate::id::define_uuid_id;
use crate::program::ProgramId;
use crate::run::RunId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

define_uuid_id! {
    /// Unique identifier for an [`LLMUsageMetric`].
    pub struct LlmUsageMetricId;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmUsageMetric {
    pub id: LlmUsageMetricId,
    pub run_id: RunId,
    pub program_id: ProgramId,
    pub user_id: String,
    pub provider: String,
    pub model_name: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub cost_usd: f64,
    pub latency_ms: u64,
    pub success: bool,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
}

crate::builder! {
    pub struct LlmUsageMetricBuilder => LlmUsageMetric {
        into {
            user_id: String = "user-1",
            provider: String = "anthropic",
            model_name: String = "claude-haiku",
        }
        set {
            input_tokens: u64 = 0,
            output_tokens: u64 = 0,
            total_tokens: u64 = 0,
            cost_usd: f64 = 0.0,
            latency_ms: u64 = 0,
            success: bool = true,
            metadata: HashMap<String, String> = HashMap::new(),
        }
        option {
            error_message: String = None,
        }
        computed {
            id: LlmUsageMetricId = LlmUsageMetricId::new(),
            run_id: RunId = RunId::new(),
            program_id: ProgramId = ProgramId::new(),
            created_at: DateTime<Utc> = Utc::now(),
        }
    }
}

#[cfg(test)]
#[path = "llm_metric_tests.rs"]
mod tests;
