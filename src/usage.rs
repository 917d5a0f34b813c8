use std::collections::BTreeMap;

use parking_lot::Mutex;

/// Counter snapshot for one model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelUsage {
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub total: u64,
}

/// Thread-safe per-model call and token counters for one run.
///
/// Token amounts are tokenizer estimates, not API-reported usage. Updated
/// once per file's terminal transition: a persisted artifact records tokens
/// and a success, a failure records only the failure. Cache hits and
/// no-model skips record nothing.
#[derive(Debug, Default)]
pub struct UsageAccountant {
    by_model: Mutex<BTreeMap<String, ModelUsage>>,
}

impl UsageAccountant {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, model: &str, input_tokens: u64, output_tokens: u64) {
        let mut by_model = self.by_model.lock();
        let usage = entry(&mut by_model, model);
        usage.input_tokens += input_tokens;
        usage.output_tokens += output_tokens;
        usage.succeeded += 1;
        usage.total += 1;
    }

    pub fn record_failure(&self, model: &str) {
        let mut by_model = self.by_model.lock();
        let usage = entry(&mut by_model, model);
        usage.failed += 1;
        usage.total += 1;
    }

    /// Dry-run accounting: what a real run would have sent, without calling.
    pub fn record_estimate(&self, model: &str, input_tokens: u64) {
        let mut by_model = self.by_model.lock();
        let usage = entry(&mut by_model, model);
        usage.input_tokens += input_tokens;
        usage.total += 1;
    }

    /// Per-model totals in stable (name) order.
    pub fn snapshot(&self) -> Vec<ModelUsage> {
        self.by_model.lock().values().cloned().collect()
    }

    pub fn total_failed(&self) -> u64 {
        self.by_model.lock().values().map(|u| u.failed).sum()
    }

    pub fn total_succeeded(&self) -> u64 {
        self.by_model.lock().values().map(|u| u.succeeded).sum()
    }
}

fn entry<'a>(by_model: &'a mut BTreeMap<String, ModelUsage>, model: &str) -> &'a mut ModelUsage {
    by_model
        .entry(model.to_string())
        .or_insert_with(|| ModelUsage {
            model: model.to_string(),
            ..ModelUsage::default()
        })
}
