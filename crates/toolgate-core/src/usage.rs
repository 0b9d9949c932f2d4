// Token usage aggregation
//
// Usage metadata is best-effort: a model response without usage counts
// yields a zero record, never an error.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::driver::CompletionMetadata;

/// Token counts for one model call (one loop round)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelCallUsage {
    /// Model that served the call
    pub model: String,
    /// Tokens consumed by the prompt
    pub input_tokens: u64,
    /// Tokens generated in the response
    pub output_tokens: u64,
    /// Total tokens for the call
    pub total_tokens: u64,
}

/// Running token totals for one model
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenTotals {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

/// Aggregate usage for a whole task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskUsage {
    /// Per-call records in round order
    pub calls: Vec<ModelCallUsage>,
    /// Totals keyed by model name
    pub per_model: BTreeMap<String, TokenTotals>,
}

impl TaskUsage {
    /// Sum of total tokens across all models
    pub fn total_tokens(&self) -> u64 {
        self.per_model.values().map(|t| t.total_tokens).sum()
    }
}

/// Folds per-round completion metadata into a task-level usage report
#[derive(Debug, Default)]
pub struct UsageAggregator {
    usage: TaskUsage,
}

impl UsageAggregator {
    /// Create a new empty aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Record usage from one model call.
    ///
    /// Absent counts are treated as zero; the record is kept either way so
    /// call indices line up with loop rounds.
    pub fn record(&mut self, model: &str, metadata: &CompletionMetadata) {
        let model_name = metadata.model.as_deref().unwrap_or(model);
        let call = ModelCallUsage {
            model: model_name.to_string(),
            input_tokens: metadata.prompt_tokens.unwrap_or(0) as u64,
            output_tokens: metadata.completion_tokens.unwrap_or(0) as u64,
            total_tokens: metadata.total_tokens.unwrap_or(0) as u64,
        };

        let totals = self
            .usage
            .per_model
            .entry(call.model.clone())
            .or_default();
        totals.input_tokens += call.input_tokens;
        totals.output_tokens += call.output_tokens;
        totals.total_tokens += call.total_tokens;

        self.usage.calls.push(call);
    }

    /// Number of recorded calls
    pub fn call_count(&self) -> usize {
        self.usage.calls.len()
    }

    /// Consume the aggregator, producing the task usage report
    pub fn finish(self) -> TaskUsage {
        self.usage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(prompt: u32, completion: u32, model: &str) -> CompletionMetadata {
        CompletionMetadata {
            prompt_tokens: Some(prompt),
            completion_tokens: Some(completion),
            total_tokens: Some(prompt + completion),
            model: Some(model.to_string()),
            finish_reason: None,
        }
    }

    #[test]
    fn test_totals_accumulate_per_model() {
        let mut agg = UsageAggregator::new();
        agg.record("gpt-4o", &metadata(100, 20, "gpt-4o"));
        agg.record("gpt-4o", &metadata(150, 30, "gpt-4o"));

        let usage = agg.finish();
        assert_eq!(usage.calls.len(), 2);
        let totals = usage.per_model.get("gpt-4o").unwrap();
        assert_eq!(totals.input_tokens, 250);
        assert_eq!(totals.output_tokens, 50);
        assert_eq!(usage.total_tokens(), 300);
    }

    #[test]
    fn test_missing_metadata_yields_zero_record() {
        let mut agg = UsageAggregator::new();
        agg.record("gpt-4o", &CompletionMetadata::default());

        let usage = agg.finish();
        assert_eq!(usage.calls.len(), 1);
        assert_eq!(usage.calls[0].model, "gpt-4o");
        assert_eq!(usage.calls[0].total_tokens, 0);
        assert_eq!(usage.total_tokens(), 0);
    }
}
