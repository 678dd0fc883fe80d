//! LLM Metrics Collector (spec §4.10, C10): records per-call token/latency/
//! cost samples and aggregates over arbitrary windows. Mirrors `pg-quota`'s
//! `Engine<C: Clock> { store, clock }` shape (spec §4.6).

use crate::pricing::ModelPricing;
use chrono::{DateTime, Utc};
use pg_core::{Clock, CoreResult, LlmUsageMetric, LlmUsageMetricId, ProgramId, RunId};
use pg_store::Store;
use std::collections::HashMap;
use std::sync::Arc;

/// Everything `recordUsage` needs besides the derived fields
/// (`totalTokens`, `costUsd`, `id`, `createdAt`).
#[derive(Debug, Clone)]
pub struct RecordUsageRequest {
    pub run_id: RunId,
    pub program_id: ProgramId,
    pub user_id: String,
    pub provider: String,
    pub model_name: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub latency_ms: u64,
    pub success: bool,
    pub error_message: Option<String>,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderAggregate {
    pub calls: u64,
    pub total_tokens: u64,
    pub cost_usd: f64,
}

#[derive(Debug, Clone)]
pub struct AggregateUsage {
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub total_calls: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_tokens: u64,
    pub total_cost_usd: f64,
    pub avg_latency_ms: f64,
    pub by_provider: HashMap<String, ProviderAggregate>,
    pub by_model: HashMap<String, ProviderAggregate>,
}

pub struct LlmMetricsCollector<C: Clock> {
    store: Arc<Store>,
    clock: C,
    pricing: ModelPricing,
}

impl<C: Clock> LlmMetricsCollector<C> {
    pub fn new(store: Arc<Store>, clock: C, pricing: ModelPricing) -> Self {
        Self { store, clock, pricing }
    }

    /// Spec §4.10 `recordUsage`: `totalTokens = inputTokens + outputTokens`,
    /// cost looked up from the configured [`ModelPricing`] table.
    pub fn record_usage(&self, req: RecordUsageRequest) -> CoreResult<LlmUsageMetric> {
        let total_tokens = req.input_tokens + req.output_tokens;
        let cost_usd = self.pricing.cost_usd(&req.provider, &req.model_name, req.input_tokens, req.output_tokens);

        let metric = LlmUsageMetric {
            id: LlmUsageMetricId::new(),
            run_id: req.run_id,
            program_id: req.program_id,
            user_id: req.user_id,
            provider: req.provider,
            model_name: req.model_name,
            input_tokens: req.input_tokens,
            output_tokens: req.output_tokens,
            total_tokens,
            cost_usd,
            latency_ms: req.latency_ms,
            success: req.success,
            error_message: req.error_message,
            metadata: req.metadata,
            created_at: self.clock.now(),
        };
        self.store.llm_metrics.put(metric.clone())?;
        tracing::debug!(metric_id = %metric.id, provider = %metric.provider, model = %metric.model_name, cost_usd, "recorded llm usage");
        Ok(metric)
    }

    /// Spec §4.10 `getAggregate(days, userId?, programId?)`.
    pub fn get_aggregate(&self, days: i64, user_id: Option<&str>, program_id: Option<ProgramId>) -> AggregateUsage {
        let period_end = self.clock.now();
        let period_start = period_end - chrono::Duration::days(days);

        let rows: Vec<LlmUsageMetric> = self.store.llm_metrics.list_filter(|m| {
            m.created_at >= period_start
                && m.created_at <= period_end
                && user_id.map(|u| m.user_id == u).unwrap_or(true)
                && program_id.map(|p| m.program_id == p).unwrap_or(true)
        });

        let mut agg = AggregateUsage {
            period_start,
            period_end,
            total_calls: 0,
            successful_calls: 0,
            failed_calls: 0,
            total_input_tokens: 0,
            total_output_tokens: 0,
            total_tokens: 0,
            total_cost_usd: 0.0,
            avg_latency_ms: 0.0,
            by_provider: HashMap::new(),
            by_model: HashMap::new(),
        };

        let mut latency_sum: u128 = 0;
        for row in &rows {
            agg.total_calls += 1;
            if row.success {
                agg.successful_calls += 1;
            } else {
                agg.failed_calls += 1;
            }
            agg.total_input_tokens += row.input_tokens;
            agg.total_output_tokens += row.output_tokens;
            agg.total_tokens += row.total_tokens;
            agg.total_cost_usd += row.cost_usd;
            latency_sum += row.latency_ms as u128;

            let provider_entry = agg.by_provider.entry(row.provider.clone()).or_default();
            provider_entry.calls += 1;
            provider_entry.total_tokens += row.total_tokens;
            provider_entry.cost_usd += row.cost_usd;

            let model_entry = agg.by_model.entry(row.model_name.clone()).or_default();
            model_entry.calls += 1;
            model_entry.total_tokens += row.total_tokens;
            model_entry.cost_usd += row.cost_usd;
        }

        if agg.total_calls > 0 {
            agg.avg_latency_ms = latency_sum as f64 / agg.total_calls as f64;
        }
        agg
    }
}

#[cfg(test)]
#[path = "collector_tests.rs"]
mod tests;
