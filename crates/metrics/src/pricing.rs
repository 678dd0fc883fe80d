//! `ModelPricing` (spec §4.10): `provider -> {model -> (inputPer1k, outputPer1k)}`.
//! Exact `model` wins; otherwise the first glob pattern (`*` wildcard) that
//! matches the model name is used, e.g. `"*"` under `ollama` meaning every
//! local model is free. Unknown models cost $0 and log a warning.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rate {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ModelPricing {
    providers: HashMap<String, HashMap<String, Rate>>,
}

impl ModelPricing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_rate(&mut self, provider: impl Into<String>, model_pattern: impl Into<String>, rate: Rate) {
        self.providers.entry(provider.into()).or_default().insert(model_pattern.into(), rate);
    }

    fn rate_for(&self, provider: &str, model: &str) -> Option<Rate> {
        let models = self.providers.get(provider)?;
        if let Some(rate) = models.get(model) {
            return Some(*rate);
        }
        models.iter().find(|(pattern, _)| glob_match(pattern, model)).map(|(_, rate)| *rate)
    }

    /// Cost in USD for `input_tokens`/`output_tokens` under `provider`/`model`.
    /// Unrecognised provider/model combinations are free, with a warning.
    pub fn cost_usd(&self, provider: &str, model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
        match self.rate_for(provider, model) {
            Some(rate) => {
                (input_tokens as f64 / 1000.0) * rate.input_per_1k
                    + (output_tokens as f64 / 1000.0) * rate.output_per_1k
            }
            None => {
                tracing::warn!(provider, model, "no pricing entry for model, costing $0");
                0.0
            }
        }
    }
}

/// Minimal glob match supporting only the `*` wildcard (spec's only
/// documented pattern, e.g. `"*"`). Splits the pattern on `*` and checks
/// each literal segment appears in order within `text`.
fn glob_match(pattern: &str, text: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if !pattern.contains('*') {
        return pattern == text;
    }

    let mut segments = pattern.split('*').peekable();
    let mut cursor = 0;
    let anchored_start = !pattern.starts_with('*');
    let anchored_end = !pattern.ends_with('*');

    while let Some(segment) = segments.next() {
        if segment.is_empty() {
            continue;
        }
        match text[cursor..].find(segment) {
            Some(pos) => {
                if segments.peek().is_none() && anchored_end && cursor + pos + segment.len() != text.len() {
                    return false;
                }
                if cursor == 0 && anchored_start && pos != 0 {
                    return false;
                }
                cursor += pos + segment.len();
            }
            None => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_model_wins_over_glob() {
        let mut pricing = ModelPricing::new();
        pricing.set_rate("anthropic", "*", Rate { input_per_1k: 0.0, output_per_1k: 0.0 });
        pricing.set_rate("anthropic", "claude-haiku", Rate { input_per_1k: 0.25, output_per_1k: 1.25 });

        let cost = pricing.cost_usd("anthropic", "claude-haiku", 1000, 1000);
        assert!((cost - 1.5).abs() < 1e-9);
    }

    #[test]
    fn glob_catch_all_applies_to_unlisted_models() {
        let mut pricing = ModelPricing::new();
        pricing.set_rate("ollama", "*", Rate { input_per_1k: 0.0, output_per_1k: 0.0 });
        assert_eq!(pricing.cost_usd("ollama", "llama3", 10_000, 10_000), 0.0);
    }

    #[test]
    fn unknown_provider_costs_nothing() {
        let pricing = ModelPricing::new();
        assert_eq!(pricing.cost_usd("unknown", "mystery", 100, 100), 0.0);
    }

    #[test]
    fn prefix_glob_matches_model_family() {
        let mut pricing = ModelPricing::new();
        pricing.set_rate("openai", "gpt-4*", Rate { input_per_1k: 5.0, output_per_1k: 15.0 });
        let cost = pricing.cost_usd("openai", "gpt-4-turbo", 1000, 0);
        assert!((cost - 5.0).abs() < 1e-9);
    }
}
