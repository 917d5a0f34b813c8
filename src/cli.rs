use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use colored::Colorize;

use crate::{
    anthropic::AnthropicClient,
    cli_types::{Commands, IndexArgs, InitArgs},
    config::{LoredocConfig, CONFIG_FILE_NAME},
    ignore::IgnoreSet,
    models::{CheapestFit, ModelSelector},
    pipeline::{DocPipeline, RunReport},
    summarizer::Summarizer,
    types::LlmError,
};

pub struct CliApp {
    config_path: PathBuf,
}

impl CliApp {
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub async fn run(self, command: Commands) -> Result<()> {
        match command {
            Commands::Init(args) => self.init(args),
            Commands::Index(args) => self.index(args).await,
        }
    }

    /// Write a default config next to the tree the user wants documented.
    fn init(&self, args: InitArgs) -> Result<()> {
        let target = args.path.join(CONFIG_FILE_NAME);
        if target.exists() && !args.force {
            println!(
                "{} {} already exists, pass --force to overwrite",
                "!".yellow().bold(),
                target.display()
            );
            return Ok(());
        }

        std::fs::create_dir_all(&args.path)
            .with_context(|| format!("Failed to create {}", args.path.display()))?;
        let rendered = LoredocConfig::default().to_toml()?;
        std::fs::write(&target, rendered)
            .with_context(|| format!("Failed to write {}", target.display()))?;

        println!("{} wrote {}", "✓".green().bold(), target.display());
        println!(
            "  edit it, export {}, then run {}",
            "ANTHROPIC_API_KEY".bold(),
            "loredoc index".bold()
        );
        Ok(())
    }

    async fn index(&self, args: IndexArgs) -> Result<()> {
        let mut config = LoredocConfig::load_or_default(&self.config_path)
            .with_context(|| format!("Failed to load {}", self.config_path.display()))?;
        apply_overrides(&mut config, &args);

        let ignore = IgnoreSet::new(&config.ignore)?;
        let selector = Arc::new(CheapestFit::from_names(&config.llms)?);
        let summarizer: Arc<dyn Summarizer> = if args.dry_run {
            Arc::new(OfflineSummarizer)
        } else {
            let api_key = args
                .api_key
                .filter(|key| !key.trim().is_empty())
                .context("No API key configured. Pass --api-key or set ANTHROPIC_API_KEY.")?;
            Arc::new(AnthropicClient::new(config.client_options(api_key))?)
        };

        let pipeline = DocPipeline::new(
            config.project_context(),
            ignore,
            summarizer,
            selector.clone(),
            config.max_concurrent_calls,
            args.dry_run,
        )?;
        let report = pipeline.run().await?;
        print_report(&report, selector.as_ref());

        // Per-item failures were already isolated and logged; the run itself
        // succeeded and the next run retries them.
        Ok(())
    }
}

fn apply_overrides(config: &mut LoredocConfig, args: &IndexArgs) {
    if let Some(path) = &args.path {
        config.root = path.clone();
    }
    if let Some(output) = &args.output {
        config.output = output.clone();
    }
    if let Some(name) = &args.name {
        config.name = name.clone();
    }
    if let Some(repo_url) = &args.repo_url {
        config.repository_url = repo_url.clone();
    }
    if let Some(concurrency) = args.concurrency {
        config.max_concurrent_calls = concurrency;
    }
}

fn print_report(report: &RunReport, selector: &dyn ModelSelector) {
    println!();
    if report.dry_run {
        println!("{}", "Dry run estimate".bold());
    } else {
        println!("{}", "Run summary".bold());
    }

    if report.usage.is_empty() {
        println!("  nothing to do, every artifact is up to date");
    }

    let mut total_cost = 0.0;
    for usage in &report.usage {
        let cost = selector
            .models()
            .iter()
            .find(|m| m.name == usage.model)
            .map(|m| m.cost(usage.input_tokens, usage.output_tokens));
        if let Some(cost) = cost {
            total_cost += cost;
        }
        let cost_column = cost.map(|c| format!("  ${:.4}", c)).unwrap_or_default();
        if report.dry_run {
            println!(
                "  {:<28} {:>4} item(s) {:>9} prompt tokens{}",
                usage.model, usage.total, usage.input_tokens, cost_column
            );
        } else {
            println!(
                "  {:<28} {:>4} ok {:>3} failed {:>9} in {:>8} out{}",
                usage.model,
                usage.succeeded,
                usage.failed,
                usage.input_tokens,
                usage.output_tokens,
                cost_column
            );
        }
    }

    let failed = report.total_failed();
    if failed > 0 {
        println!(
            "  {} {} item(s) failed, rerun to retry them",
            "!".yellow().bold(),
            failed
        );
    }
    println!(
        "  total ${:.4} in {:.1}s",
        total_cost,
        report.elapsed.as_secs_f64()
    );
}

/// Stands in for the API client on dry runs, which never call it.
struct OfflineSummarizer;

#[async_trait]
impl Summarizer for OfflineSummarizer {
    async fn generate(&self, _model: &str, _prompt: &str) -> Result<String, LlmError> {
        Err(LlmError::InvalidResponse(
            "dry run issued an API call".to_string(),
        ))
    }
}
