//! End-to-end runs over real temp trees, covering incremental reindexing,
//! change propagation, and per-item failure isolation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use loredoc::{
    CheapestFit, DocError, DocPipeline, IgnoreSet, LinkStyle, LlmError, ProjectContext,
    RunReport, Summarizer, WalkError,
};

/// Counts every API call and fails permanently when the prompt carries the
/// failure marker, so a single file can be made to error.
#[derive(Default)]
struct CountingSummarizer {
    calls: AtomicUsize,
}

const FAILURE_MARKER: &str = "EXPLODE-ON-SUMMARY";

#[async_trait]
impl Summarizer for CountingSummarizer {
    async fn generate(&self, _model: &str, prompt: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if prompt.contains(FAILURE_MARKER) {
            return Err(LlmError::Api {
                status: 400,
                message: "prompt rejected".to_string(),
            });
        }
        Ok("a concise summary".to_string())
    }
}

fn context(input: &Path, output: &Path) -> ProjectContext {
    ProjectContext {
        project_name: "demo".to_string(),
        repository_url: "https://github.com/acme/demo".to_string(),
        input_root: input.to_path_buf(),
        output_root: output.to_path_buf(),
        content_type: "code".to_string(),
        target_audience: "smart developer".to_string(),
        file_prompt: String::new(),
        folder_prompt: String::new(),
        link_style: LinkStyle::Github,
    }
}

async fn run(
    input: &Path,
    output: &Path,
    ignore: &[&str],
    summarizer: Arc<CountingSummarizer>,
    dry_run: bool,
) -> RunReport {
    let pipeline = DocPipeline::new(
        context(input, output),
        IgnoreSet::new(ignore).unwrap(),
        summarizer,
        Arc::new(CheapestFit::from_names(["claude-3-haiku-20240307"]).unwrap()),
        4,
        dry_run,
    )
    .unwrap();
    pipeline.run().await.unwrap()
}

/// Every artifact file under `root`, by path, with its exact bytes.
fn snapshot_tree(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    let mut snapshot = BTreeMap::new();
    collect_files(root, &mut snapshot);
    snapshot
}

fn collect_files(dir: &Path, snapshot: &mut BTreeMap<PathBuf, Vec<u8>>) {
    for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            collect_files(&path, snapshot);
        } else {
            let bytes = std::fs::read(&path).unwrap();
            snapshot.insert(path, bytes);
        }
    }
}

#[tokio::test]
async fn first_run_makes_two_calls_per_file_and_one_per_folder() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("repo");
    let output = dir.path().join("docs");
    std::fs::create_dir_all(input.join("p")).unwrap();
    std::fs::write(input.join("p/a.txt"), "alpha").unwrap();
    std::fs::write(input.join("p/b.txt"), "bravo").unwrap();

    let summarizer = Arc::new(CountingSummarizer::default());
    run(&input, &output, &[], summarizer.clone(), false).await;

    // Two calls per file (summary and questions) plus one per folder. The
    // walk root itself gets no aggregate.
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 5);
    assert!(output.join("p/a.json").is_file());
    assert!(output.join("p/b.json").is_file());
    assert!(output.join("p/summary.json").is_file());
    assert!(!output.join("summary.json").exists());
}

#[tokio::test]
async fn folder_artifacts_embed_their_whole_subtree() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("repo");
    let output = dir.path().join("docs");
    std::fs::create_dir_all(input.join("q/p")).unwrap();
    std::fs::write(input.join("q/p/a.txt"), "alpha").unwrap();

    let summarizer = Arc::new(CountingSummarizer::default());
    run(&input, &output, &[], summarizer.clone(), false).await;

    // q's summary.json is self-contained: the embedded p is a full copy of
    // p's own summary.json, a's file artifact included.
    let top = std::fs::read_to_string(output.join("q/summary.json")).unwrap();
    let top: serde_json::Value = serde_json::from_str(&top).unwrap();
    let embedded = &top["folders"][0];
    assert_eq!(embedded["folder_name"], "p");
    assert_eq!(embedded["files"][0]["file_name"], "a.txt");
    assert_eq!(embedded["files"][0]["summary"], "a concise summary");
}

#[tokio::test]
async fn unchanged_tree_rewrites_nothing_and_calls_nothing() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("repo");
    let output = dir.path().join("docs");
    std::fs::create_dir_all(input.join("p")).unwrap();
    std::fs::write(input.join("p/a.txt"), "alpha").unwrap();
    std::fs::write(input.join("p/b.txt"), "bravo").unwrap();

    let summarizer = Arc::new(CountingSummarizer::default());
    run(&input, &output, &[], summarizer.clone(), false).await;
    let after_first = snapshot_tree(&output);
    let calls_after_first = summarizer.calls.load(Ordering::SeqCst);

    run(&input, &output, &[], summarizer.clone(), false).await;

    assert_eq!(summarizer.calls.load(Ordering::SeqCst), calls_after_first);
    assert_eq!(snapshot_tree(&output), after_first);
}

#[tokio::test]
async fn editing_one_file_reindexes_it_and_every_ancestor_folder() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("repo");
    let output = dir.path().join("docs");
    std::fs::create_dir_all(input.join("q/p")).unwrap();
    std::fs::write(input.join("q/p/a.txt"), "alpha").unwrap();
    std::fs::write(input.join("q/p/b.txt"), "bravo").unwrap();

    let summarizer = Arc::new(CountingSummarizer::default());
    run(&input, &output, &[], summarizer.clone(), false).await;
    // 2 calls each for a and b, one each for folders p and q.
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 6);
    let after_first = snapshot_tree(&output);

    std::fs::write(input.join("q/p/a.txt"), "alpha, revised").unwrap();
    run(&input, &output, &[], summarizer.clone(), false).await;

    // Only a is re-summarized (2 calls); its new checksum ripples through
    // p's and then q's aggregate (1 call each).
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 10);

    let after_second = snapshot_tree(&output);
    assert_ne!(
        after_first[&output.join("q/p/a.json")],
        after_second[&output.join("q/p/a.json")]
    );
    assert_eq!(
        after_first[&output.join("q/p/b.json")],
        after_second[&output.join("q/p/b.json")]
    );
    assert_ne!(
        after_first[&output.join("q/p/summary.json")],
        after_second[&output.join("q/p/summary.json")]
    );
    assert_ne!(
        after_first[&output.join("q/summary.json")],
        after_second[&output.join("q/summary.json")]
    );
}

#[tokio::test]
async fn a_failing_file_does_not_stop_its_siblings_or_parent() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("repo");
    let output = dir.path().join("docs");
    std::fs::create_dir_all(input.join("p")).unwrap();
    std::fs::write(input.join("p/bad.txt"), FAILURE_MARKER).unwrap();
    std::fs::write(input.join("p/good.txt"), "fine content").unwrap();

    let summarizer = Arc::new(CountingSummarizer::default());
    let report = run(&input, &output, &[], summarizer.clone(), false).await;

    assert_eq!(report.total_failed(), 1);
    assert!(!output.join("p/bad.json").exists());
    assert!(output.join("p/good.json").is_file());

    // The parent aggregates from whatever artifacts exist.
    let folder = std::fs::read_to_string(output.join("p/summary.json")).unwrap();
    let folder: serde_json::Value = serde_json::from_str(&folder).unwrap();
    let files = folder["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["file_name"], "good.txt");

    // A later run with the file fixed picks it up and refreshes the parent.
    std::fs::write(input.join("p/bad.txt"), "now fine").unwrap();
    let report = run(&input, &output, &[], summarizer.clone(), false).await;
    assert_eq!(report.total_failed(), 0);
    assert!(output.join("p/bad.json").is_file());
}

#[tokio::test]
async fn ignored_and_binary_entries_produce_no_artifacts() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("repo");
    let output = dir.path().join("docs");
    std::fs::create_dir_all(input.join("node_modules")).unwrap();
    std::fs::write(input.join("keep.txt"), "keep me").unwrap();
    std::fs::write(input.join("skip.log"), "skip me").unwrap();
    std::fs::write(input.join("blob.bin"), [0u8, 159, 146, 150]).unwrap();
    std::fs::write(input.join("node_modules/dep.txt"), "vendored").unwrap();

    let summarizer = Arc::new(CountingSummarizer::default());
    run(
        &input,
        &output,
        &["*.log", "node_modules"],
        summarizer.clone(),
        false,
    )
    .await;

    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 2);
    assert!(output.join("keep.json").is_file());
    assert!(!output.join("skip.json").exists());
    assert!(!output.join("blob.json").exists());
    assert!(!output.join("node_modules").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn a_dangling_symlink_does_not_abort_the_run() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("repo");
    let output = dir.path().join("docs");
    std::fs::create_dir_all(&input).unwrap();
    std::fs::write(input.join("keep.txt"), "kept").unwrap();
    std::os::unix::fs::symlink(input.join("absent"), input.join("dangling")).unwrap();

    let summarizer = Arc::new(CountingSummarizer::default());
    let report = run(&input, &output, &[], summarizer.clone(), false).await;

    assert_eq!(report.total_failed(), 0);
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 2);
    assert!(output.join("keep.json").is_file());
    assert!(!output.join("dangling.json").exists());
}

#[tokio::test]
async fn removed_sources_keep_their_stale_artifacts() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("repo");
    let output = dir.path().join("docs");
    std::fs::create_dir_all(input.join("p")).unwrap();
    std::fs::write(input.join("p/a.txt"), "alpha").unwrap();
    std::fs::write(input.join("p/b.txt"), "bravo").unwrap();

    let summarizer = Arc::new(CountingSummarizer::default());
    run(&input, &output, &[], summarizer.clone(), false).await;
    let calls_after_first = summarizer.calls.load(Ordering::SeqCst);

    // Removing a source leaves its artifact behind, and the parent's
    // aggregate still covers it, so nothing is recomputed.
    std::fs::remove_file(input.join("p/a.txt")).unwrap();
    run(&input, &output, &[], summarizer.clone(), false).await;

    assert_eq!(summarizer.calls.load(Ordering::SeqCst), calls_after_first);
    assert!(output.join("p/a.json").is_file());
}

#[tokio::test]
async fn dry_run_estimates_without_calls_or_writes() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("repo");
    let output = dir.path().join("docs");
    std::fs::create_dir_all(input.join("p")).unwrap();
    std::fs::write(input.join("p/a.txt"), "alpha").unwrap();

    let summarizer = Arc::new(CountingSummarizer::default());
    let report = run(&input, &output, &[], summarizer.clone(), true).await;

    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 0);
    assert!(!output.exists());
    assert!(report.dry_run);
    assert_eq!(report.usage.len(), 1);
    assert_eq!(report.usage[0].total, 1);
    assert!(report.usage[0].input_tokens > 0);
    assert_eq!(report.usage[0].succeeded, 0);
}

#[cfg(unix)]
#[tokio::test]
async fn an_unreadable_directory_fails_the_whole_run() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let input = dir.path().join("repo");
    let output = dir.path().join("docs");
    let locked = input.join("locked");
    std::fs::create_dir_all(&locked).unwrap();
    std::fs::write(input.join("keep.txt"), "kept").unwrap();
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
    if std::fs::read_dir(&locked).is_ok() {
        // Permission bits do not bind this user (root); nothing to observe.
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let pipeline = DocPipeline::new(
        context(&input, &output),
        IgnoreSet::new(Vec::<String>::new()).unwrap(),
        Arc::new(CountingSummarizer::default()),
        Arc::new(CheapestFit::from_names(["claude-3-haiku-20240307"]).unwrap()),
        4,
        false,
    )
    .unwrap();
    let err = pipeline.run().await.unwrap_err();
    assert!(matches!(err, DocError::Walk(WalkError::List { .. })));

    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
}
