pub mod types;
pub mod aggregator;
pub mod anthropic;
pub mod checksum;
pub mod cli;
pub mod cli_types;
pub mod config;
pub mod ignore;
pub mod limiter;
pub mod models;
pub mod permalink;
pub mod pipeline;
pub mod processor;
pub mod prompts;
pub mod store;
pub mod summarizer;
pub mod usage;
pub mod walker;

// Re-export commonly used types
pub use types::*;
pub use aggregator::FolderAggregator;
pub use anthropic::{AnthropicClient, ClientOptions};
pub use checksum::{fingerprint, should_reindex};
pub use cli::CliApp;
pub use config::LoredocConfig;
pub use ignore::IgnoreSet;
pub use limiter::ApiRateLimiter;
pub use models::{CheapestFit, ModelDetails, ModelSelector, TokenCounter};
pub use permalink::LinkStyle;
pub use pipeline::{DocPipeline, ProjectContext, RunReport, Services};
pub use processor::FileProcessor;
pub use store::ArtifactStore;
pub use summarizer::Summarizer;
pub use usage::{ModelUsage, UsageAccountant};
pub use walker::{TraversalHooks, Walker};
