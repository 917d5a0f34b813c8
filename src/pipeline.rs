use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::aggregator::FolderAggregator;
use crate::ignore::IgnoreSet;
use crate::limiter::ApiRateLimiter;
use crate::models::{ModelSelector, TokenCounter};
use crate::permalink::LinkStyle;
use crate::processor::FileProcessor;
use crate::store::ArtifactStore;
use crate::summarizer::Summarizer;
use crate::types::DocError;
use crate::usage::{ModelUsage, UsageAccountant};
use crate::walker::{TraversalHooks, Walker};

/// Immutable run metadata threaded through every file and folder task.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    pub project_name: String,
    pub repository_url: String,
    pub input_root: PathBuf,
    pub output_root: PathBuf,
    pub content_type: String,
    pub target_audience: String,
    pub file_prompt: String,
    pub folder_prompt: String,
    pub link_style: LinkStyle,
}

/// Shared wiring handed to the per-item workers.
pub struct Services {
    pub ctx: ProjectContext,
    pub ignore: IgnoreSet,
    pub store: ArtifactStore,
    pub limiter: ApiRateLimiter,
    pub summarizer: Arc<dyn Summarizer>,
    pub selector: Arc<dyn ModelSelector>,
    pub tokens: TokenCounter,
    pub accountant: UsageAccountant,
}

/// What a run did, for the end-of-run report.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub usage: Vec<ModelUsage>,
    pub elapsed: Duration,
    pub dry_run: bool,
}

impl RunReport {
    pub fn total_failed(&self) -> u64 {
        self.usage.iter().map(|u| u.failed).sum()
    }
}

/// Two-pass incremental documentation run.
///
/// Pass 1 walks the input tree and writes one artifact per changed text
/// file. Pass 2 walks the output tree bottom-up and aggregates each folder
/// from the child artifacts pass 1 left behind, which is what guarantees a
/// folder only aggregates after its whole subtree settled. A dry run
/// performs pass 1 without calls or writes, recording token estimates, and
/// skips pass 2 since there are no artifacts to aggregate.
pub struct DocPipeline {
    services: Arc<Services>,
    dry_run: bool,
}

impl DocPipeline {
    pub fn new(
        ctx: ProjectContext,
        ignore: IgnoreSet,
        summarizer: Arc<dyn Summarizer>,
        selector: Arc<dyn ModelSelector>,
        max_concurrent_calls: usize,
        dry_run: bool,
    ) -> Result<Self, DocError> {
        let services = Arc::new(Services {
            store: ArtifactStore::new(ctx.output_root.clone()),
            limiter: ApiRateLimiter::new(max_concurrent_calls)?,
            tokens: TokenCounter::new()?,
            accountant: UsageAccountant::new(),
            ignore,
            summarizer,
            selector,
            ctx,
        });
        Ok(Self { services, dry_run })
    }

    pub async fn run(&self) -> Result<RunReport, DocError> {
        let started = Instant::now();
        let services = &self.services;
        info!(
            "indexing {} into {}",
            services.ctx.input_root.display(),
            services.ctx.output_root.display()
        );

        let file_pass = Walker::new(
            services.ignore.clone(),
            TraversalHooks {
                on_file: Some(Arc::new(FileProcessor::new(services.clone(), self.dry_run))),
                on_folder: None,
            },
        );
        file_pass.walk(&services.ctx.input_root).await?;

        if self.dry_run {
            info!("dry run: skipping folder aggregation");
        } else {
            let folder_pass = Walker::new(
                services.ignore.clone(),
                TraversalHooks {
                    on_file: None,
                    on_folder: Some(Arc::new(FolderAggregator::new(services.clone()))),
                },
            );
            folder_pass.walk(&services.ctx.output_root).await?;
        }

        let report = RunReport {
            usage: services.accountant.snapshot(),
            elapsed: started.elapsed(),
            dry_run: self.dry_run,
        };
        if report.total_failed() > 0 {
            warn!(
                "{} item(s) failed and will be retried next run",
                report.total_failed()
            );
        }
        Ok(report)
    }
}
