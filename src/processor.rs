use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::checksum;
use crate::permalink;
use crate::pipeline::Services;
use crate::prompts;
use crate::types::{ArtifactStatus, FileArtifact, Fingerprint, ItemError};
use crate::walker::{FileHandler, FileVisit};

/// Per-file summarization, run as the file hook of the input-tree pass.
///
/// Each visited file ends in exactly one of: cache hit (checksum unchanged),
/// skip (no model fits), persisted, or failed. Failures are logged and
/// counted here and never escalate; the absence of a fresh artifact makes the
/// next run retry the file.
pub struct FileProcessor {
    services: Arc<Services>,
    dry_run: bool,
}

impl FileProcessor {
    pub fn new(services: Arc<Services>, dry_run: bool) -> Self {
        Self { services, dry_run }
    }

    async fn process(&self, visit: FileVisit) {
        let services = &self.services;
        let ctx = &services.ctx;

        let checksum = checksum::fingerprint(&[visit.content.as_str()]);
        let artifact_path = services.store.file_artifact_path(&visit.rel_path);
        if !checksum::should_reindex(&services.store, &artifact_path, &checksum).await {
            return;
        }

        let rel = permalink::slash_path(&visit.rel_path);
        let url = permalink::file_url(&ctx.repository_url, &visit.rel_path, ctx.link_style);
        let summary_prompt = prompts::file_summary(
            &ctx.project_name,
            &ctx.content_type,
            &rel,
            &url,
            &visit.content,
            &ctx.file_prompt,
        );
        let questions_prompt = prompts::file_questions(
            &ctx.project_name,
            &ctx.content_type,
            &ctx.target_audience,
            &rel,
            &visit.content,
        );

        let summary_tokens = services.tokens.count(&summary_prompt);
        let question_tokens = services.tokens.count(&questions_prompt);
        let input_tokens = (summary_tokens + question_tokens) as u64;
        let estimate = summary_tokens.max(question_tokens);
        let model = match services.selector.select(estimate, &ctx.content_type) {
            Some(model) => model.name.clone(),
            None => {
                warn!("no model fits {} (~{} prompt tokens), skipping", rel, estimate);
                return;
            }
        };

        if self.dry_run {
            info!("dry run: would index {} with {} (~{} tokens)", rel, model, input_tokens);
            services.accountant.record_estimate(&model, input_tokens);
            return;
        }

        debug!("summarizing {} with {}", rel, model);
        let outcome = self
            .summarize_and_persist(
                &visit,
                &rel,
                url,
                &artifact_path,
                checksum,
                &model,
                &summary_prompt,
                &questions_prompt,
            )
            .await;
        match outcome {
            Ok(artifact) => {
                let output_tokens =
                    (services.tokens.count(&artifact.summary)
                        + services.tokens.count(&artifact.questions)) as u64;
                services
                    .accountant
                    .record_success(&model, input_tokens, output_tokens);
                info!("indexed {} with {}", rel, model);
            }
            Err(e) => {
                services.accountant.record_failure(&model);
                error!("failed to index {}: {}", rel, e);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn summarize_and_persist(
        &self,
        visit: &FileVisit,
        rel: &str,
        url: String,
        artifact_path: &Path,
        checksum: Fingerprint,
        model: &str,
        summary_prompt: &str,
        questions_prompt: &str,
    ) -> Result<FileArtifact, ItemError> {
        let services = &self.services;
        // Both calls hold their own permit; a failure in either drops the
        // other mid-flight.
        let (summary, questions) = tokio::try_join!(
            services
                .limiter
                .submit(services.summarizer.generate(model, summary_prompt)),
            services
                .limiter
                .submit(services.summarizer.generate(model, questions_prompt)),
        )?;

        let status = if summary.trim().is_empty() {
            ArtifactStatus::Empty
        } else {
            ArtifactStatus::Complete
        };
        let artifact = FileArtifact {
            file_name: visit.file_name.clone(),
            file_path: rel.to_string(),
            url,
            summary,
            questions,
            checksum,
            status,
        };
        services
            .store
            .write_file_artifact(artifact_path, &artifact)
            .await?;
        Ok(artifact)
    }
}

#[async_trait]
impl FileHandler for FileProcessor {
    async fn on_file(&self, visit: FileVisit) {
        self.process(visit).await;
    }
}
