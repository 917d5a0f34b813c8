use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::checksum;
use crate::permalink;
use crate::pipeline::Services;
use crate::prompts;
use crate::store::{ChildKind, FOLDER_ARTIFACT_NAME};
use crate::types::{ArtifactStatus, FolderArtifact, ItemError};
use crate::walker::{FolderHandler, FolderVisit};

/// Bottom-up folder summarization, run as the folder hook of the output-tree
/// pass. By then every child file artifact exists (or terminally failed) and
/// every subfolder already aggregated, so one directory listing of the output
/// mirror is the whole input.
///
/// The folder fingerprint covers each child's name and recorded checksum,
/// never raw file contents: renames, additions, removals, and content changes
/// anywhere below all shift it, while reworded summaries alone do not.
pub struct FolderAggregator {
    services: Arc<Services>,
}

impl FolderAggregator {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }

    async fn aggregate(&self, visit: &FolderVisit) -> Result<(), ItemError> {
        let services = &self.services;
        let ctx = &services.ctx;
        let rel = permalink::slash_path(&visit.rel_path);

        let children = services
            .store
            .list_children(&visit.abs_path, &services.ignore)
            .await?;

        // Children without a readable artifact still contribute their name,
        // with an empty checksum; once they heal, the fingerprint moves and
        // this folder re-aggregates.
        let mut parts: Vec<String> = Vec::with_capacity(children.len());
        let mut files = Vec::new();
        let mut folders = Vec::new();
        for child in &children {
            match child.kind {
                ChildKind::File => match services.store.read_file_artifact(&child.path).await {
                    Ok(artifact) => {
                        parts.push(format!("{}:{}", child.name, artifact.checksum));
                        files.push(artifact);
                    }
                    Err(e) => {
                        warn!("dropping child of {}: {}", rel, e);
                        parts.push(format!("{}:", child.name));
                    }
                },
                ChildKind::Folder => {
                    let summary_path = child.path.join(FOLDER_ARTIFACT_NAME);
                    match services.store.read_folder_artifact(&summary_path).await {
                        Ok(artifact) => {
                            parts.push(format!("{}:{}", child.name, artifact.checksum));
                            // Embedded whole: a subfolder artifact already
                            // carries its subtree, so this one does too.
                            folders.push(artifact);
                        }
                        Err(e) => {
                            warn!("dropping child of {}: {}", rel, e);
                            parts.push(format!("{}:", child.name));
                        }
                    }
                }
            }
        }

        let checksum = checksum::fingerprint(&parts);
        let artifact_path = services.store.folder_artifact_path(&visit.rel_path);
        if !checksum::should_reindex(&services.store, &artifact_path, &checksum).await {
            return Ok(());
        }
        if files.is_empty() && folders.is_empty() {
            debug!("no readable child artifacts under {}, skipping aggregation", rel);
            return Ok(());
        }

        let prompt = prompts::folder_summary(
            &ctx.project_name,
            &ctx.content_type,
            &rel,
            &files,
            &folders,
            &ctx.folder_prompt,
        );
        let estimate = services.tokens.count(&prompt);
        let model = match services.selector.select(estimate, &ctx.content_type) {
            Some(model) => &model.name,
            None => {
                warn!("no model fits folder {} (~{} prompt tokens), skipping", rel, estimate);
                return Ok(());
            }
        };

        let summary = services
            .limiter
            .submit(services.summarizer.generate(model, &prompt))
            .await?;
        let status = if summary.trim().is_empty() {
            ArtifactStatus::Empty
        } else {
            ArtifactStatus::Complete
        };
        let artifact = FolderArtifact {
            folder_name: visit.folder_name.clone(),
            folder_path: rel.clone(),
            url: permalink::folder_url(&ctx.repository_url, &visit.rel_path, ctx.link_style),
            files,
            folders,
            summary,
            questions: String::new(),
            checksum,
            status,
        };
        services
            .store
            .write_folder_artifact(&artifact_path, &artifact)
            .await?;
        info!("aggregated {} with {}", rel, model);
        Ok(())
    }
}

#[async_trait]
impl FolderHandler for FolderAggregator {
    async fn on_folder(&self, visit: FolderVisit) {
        if let Err(e) = self.aggregate(&visit).await {
            error!(
                "failed to aggregate {}: {}",
                permalink::slash_path(&visit.rel_path),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::{scripted_services, ScriptedSummarizer};
    use crate::types::{FileArtifact, Fingerprint};
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn file_artifact(name: &str, checksum: &str) -> FileArtifact {
        FileArtifact {
            file_name: name.to_string(),
            file_path: name.to_string(),
            url: String::new(),
            summary: format!("summary of {}", name),
            questions: String::new(),
            checksum: Fingerprint::from_hex(checksum.to_string()),
            status: ArtifactStatus::Complete,
        }
    }

    fn p_visit(out: &Path) -> FolderVisit {
        FolderVisit {
            folder_name: "p".to_string(),
            rel_path: PathBuf::from("p"),
            abs_path: out.join("p"),
        }
    }

    async fn seed_file(services: &Services, rel: &str, artifact: &FileArtifact) {
        let path = services.store.root().join(rel);
        services.store.write_file_artifact(&path, artifact).await.unwrap();
    }

    #[tokio::test]
    async fn aggregates_children_into_summary_json() {
        let dir = TempDir::new().unwrap();
        let summarizer = Arc::new(ScriptedSummarizer::answering("folder summary"));
        let services = scripted_services(dir.path(), summarizer.clone());
        seed_file(&services, "p/a.json", &file_artifact("a.txt", "ca")).await;
        seed_file(&services, "p/b.json", &file_artifact("b.txt", "cb")).await;

        let aggregator = FolderAggregator::new(services.clone());
        aggregator.aggregate(&p_visit(services.store.root())).await.unwrap();

        assert_eq!(summarizer.calls(), 1);
        let path = services.store.folder_artifact_path(Path::new("p"));
        let artifact = services.store.read_folder_artifact(&path).await.unwrap();
        assert_eq!(artifact.folder_name, "p");
        assert_eq!(artifact.summary, "folder summary");
        let names: Vec<_> = artifact.files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
        assert_eq!(
            artifact.checksum,
            checksum::fingerprint(&["a.json:ca", "b.json:cb"])
        );
    }

    #[tokio::test]
    async fn unchanged_folder_is_a_cache_hit() {
        let dir = TempDir::new().unwrap();
        let summarizer = Arc::new(ScriptedSummarizer::answering("s"));
        let services = scripted_services(dir.path(), summarizer.clone());
        seed_file(&services, "p/a.json", &file_artifact("a.txt", "ca")).await;

        let aggregator = FolderAggregator::new(services.clone());
        let visit = p_visit(services.store.root());
        aggregator.aggregate(&visit).await.unwrap();
        aggregator.aggregate(&visit).await.unwrap();

        assert_eq!(summarizer.calls(), 1);
    }

    #[tokio::test]
    async fn child_checksum_change_forces_reaggregation() {
        let dir = TempDir::new().unwrap();
        let summarizer = Arc::new(ScriptedSummarizer::answering("s"));
        let services = scripted_services(dir.path(), summarizer.clone());
        seed_file(&services, "p/a.json", &file_artifact("a.txt", "ca")).await;

        let aggregator = FolderAggregator::new(services.clone());
        let visit = p_visit(services.store.root());
        aggregator.aggregate(&visit).await.unwrap();

        seed_file(&services, "p/a.json", &file_artifact("a.txt", "ca2")).await;
        aggregator.aggregate(&visit).await.unwrap();

        assert_eq!(summarizer.calls(), 2);
    }

    #[tokio::test]
    async fn membership_change_forces_reaggregation() {
        let dir = TempDir::new().unwrap();
        let summarizer = Arc::new(ScriptedSummarizer::answering("s"));
        let services = scripted_services(dir.path(), summarizer.clone());
        seed_file(&services, "p/a.json", &file_artifact("a.txt", "ca")).await;

        let aggregator = FolderAggregator::new(services.clone());
        let visit = p_visit(services.store.root());
        aggregator.aggregate(&visit).await.unwrap();

        seed_file(&services, "p/c.json", &file_artifact("c.txt", "cc")).await;
        aggregator.aggregate(&visit).await.unwrap();

        assert_eq!(summarizer.calls(), 2);
    }

    #[tokio::test]
    async fn unreadable_child_is_dropped_not_fatal() {
        let dir = TempDir::new().unwrap();
        let summarizer = Arc::new(ScriptedSummarizer::answering("s"));
        let services = scripted_services(dir.path(), summarizer.clone());
        seed_file(&services, "p/a.json", &file_artifact("a.txt", "ca")).await;
        tokio::fs::write(services.store.root().join("p/b.json"), b"{ corrupt")
            .await
            .unwrap();

        let aggregator = FolderAggregator::new(services.clone());
        aggregator.aggregate(&p_visit(services.store.root())).await.unwrap();

        let path = services.store.folder_artifact_path(Path::new("p"));
        let artifact = services.store.read_folder_artifact(&path).await.unwrap();
        assert_eq!(artifact.files.len(), 1);
        assert_eq!(artifact.files[0].file_name, "a.txt");
        // The dropped child still pins its slot in the fingerprint.
        assert_eq!(
            artifact.checksum,
            checksum::fingerprint(&["a.json:ca", "b.json:"])
        );
    }

    #[tokio::test]
    async fn embedded_subfolders_keep_their_whole_subtree() {
        let dir = TempDir::new().unwrap();
        let summarizer = Arc::new(ScriptedSummarizer::answering("s"));
        let services = scripted_services(dir.path(), summarizer.clone());
        seed_file(&services, "p/q/a.json", &file_artifact("a.txt", "ca")).await;

        let aggregator = FolderAggregator::new(services.clone());
        // Aggregate the subfolder first, the way post-order delivers them.
        aggregator
            .aggregate(&FolderVisit {
                folder_name: "q".to_string(),
                rel_path: PathBuf::from("p/q"),
                abs_path: services.store.root().join("p/q"),
            })
            .await
            .unwrap();
        aggregator.aggregate(&p_visit(services.store.root())).await.unwrap();

        // p's artifact is self-contained: the embedded q is a full copy of
        // q's own summary.json, file artifacts included.
        let path = services.store.folder_artifact_path(Path::new("p"));
        let artifact = services.store.read_folder_artifact(&path).await.unwrap();
        assert!(artifact.files.is_empty());
        assert_eq!(artifact.folders.len(), 1);
        let embedded = &artifact.folders[0];
        assert_eq!(embedded.folder_name, "q");
        assert_eq!(embedded.summary, "s");
        assert_eq!(embedded.files.len(), 1);
        assert_eq!(embedded.files[0].file_name, "a.txt");
        assert_eq!(embedded.files[0].summary, "summary of a.txt");
    }

    #[tokio::test]
    async fn all_children_unreadable_skips_the_call() {
        let dir = TempDir::new().unwrap();
        let summarizer = Arc::new(ScriptedSummarizer::answering("s"));
        let services = scripted_services(dir.path(), summarizer.clone());
        tokio::fs::create_dir_all(services.store.root().join("p")).await.unwrap();
        tokio::fs::write(services.store.root().join("p/a.json"), b"nope")
            .await
            .unwrap();

        let aggregator = FolderAggregator::new(services.clone());
        aggregator.aggregate(&p_visit(services.store.root())).await.unwrap();

        assert_eq!(summarizer.calls(), 0);
        let path = services.store.folder_artifact_path(Path::new("p"));
        assert!(services.store.read_folder_artifact(&path).await.is_err());
    }
}
