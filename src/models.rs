use tiktoken_rs::{cl100k_base, CoreBPE};

use crate::types::DocError;

/// Static description of one summarization model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDetails {
    pub name: String,
    pub context_window: usize,
    pub input_cost_per_1k_tokens: f64,
    pub output_cost_per_1k_tokens: f64,
}

impl ModelDetails {
    /// Dollar estimate for a token volume at this model's rates.
    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens as f64 / 1000.0) * self.input_cost_per_1k_tokens
            + (output_tokens as f64 / 1000.0) * self.output_cost_per_1k_tokens
    }
}

/// Tokens reserved for the model's reply when checking whether a prompt fits.
const OUTPUT_HEADROOM_TOKENS: usize = 2048;

/// Models this crate knows how to price and size.
fn builtin_models() -> Vec<ModelDetails> {
    vec![
        ModelDetails {
            name: "claude-3-haiku-20240307".to_string(),
            context_window: 200_000,
            input_cost_per_1k_tokens: 0.00025,
            output_cost_per_1k_tokens: 0.00125,
        },
        ModelDetails {
            name: "claude-3-5-sonnet-20241022".to_string(),
            context_window: 200_000,
            input_cost_per_1k_tokens: 0.003,
            output_cost_per_1k_tokens: 0.015,
        },
        ModelDetails {
            name: "claude-3-opus-20240229".to_string(),
            context_window: 200_000,
            input_cost_per_1k_tokens: 0.015,
            output_cost_per_1k_tokens: 0.075,
        },
    ]
}

/// Chooses which model handles a prompt of a given estimated size, if any.
pub trait ModelSelector: Send + Sync {
    fn select(&self, estimated_tokens: usize, content_type: &str) -> Option<&ModelDetails>;

    /// Every model this selector can hand out, for run-end cost reporting.
    fn models(&self) -> &[ModelDetails];
}

/// Default policy: cheapest configured model whose context window covers the
/// prompt plus reply headroom.
#[derive(Debug)]
pub struct CheapestFit {
    models: Vec<ModelDetails>,
}

impl CheapestFit {
    /// Build from configured model names. Unknown names are a config error so
    /// typos surface before any traversal starts.
    pub fn from_names<I, S>(names: I) -> Result<Self, DocError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let registry = builtin_models();
        let mut models = Vec::new();
        for name in names {
            let name = name.as_ref();
            let details = registry
                .iter()
                .find(|m| m.name == name)
                .cloned()
                .ok_or_else(|| {
                    let known: Vec<&str> =
                        registry.iter().map(|m| m.name.as_str()).collect();
                    DocError::Config(format!(
                        "unknown model '{}' (known models: {})",
                        name,
                        known.join(", ")
                    ))
                })?;
            models.push(details);
        }
        if models.is_empty() {
            return Err(DocError::Config("at least one model is required".to_string()));
        }
        models.sort_by(|a, b| {
            a.input_cost_per_1k_tokens
                .partial_cmp(&b.input_cost_per_1k_tokens)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(Self { models })
    }
}

impl ModelSelector for CheapestFit {
    fn select(&self, estimated_tokens: usize, _content_type: &str) -> Option<&ModelDetails> {
        self.models
            .iter()
            .find(|m| estimated_tokens + OUTPUT_HEADROOM_TOKENS <= m.context_window)
    }

    fn models(&self) -> &[ModelDetails] {
        &self.models
    }
}

/// Token estimator backing model selection and usage accounting.
///
/// Uses the cl100k BPE. That is not Claude's exact tokenizer, so counts are
/// estimates; they are only ever used for window checks and cost reporting,
/// never sent to the API.
pub struct TokenCounter {
    bpe: CoreBPE,
}

impl TokenCounter {
    pub fn new() -> Result<Self, DocError> {
        let bpe = cl100k_base()
            .map_err(|e| DocError::Config(format!("failed to load tokenizer: {}", e)))?;
        Ok(Self { bpe })
    }

    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}
