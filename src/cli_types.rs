use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "loredoc")]
#[command(version)]
#[command(about = "Incremental LLM documentation generator", long_about = None)]
pub struct Cli {
    /// Path to the config file
    #[arg(short, long, global = true, default_value = "loredoc.toml")]
    pub config: PathBuf,

    /// Verbose logging (RUST_LOG overrides this)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default loredoc.toml
    Init(InitArgs),

    /// Walk the repository and write JSON summary artifacts
    Index(IndexArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Directory to initialize
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct IndexArgs {
    /// Input tree to document (overrides the config root)
    pub path: Option<PathBuf>,

    /// Output directory (overrides the config output)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Project name used in prompts
    #[arg(long)]
    pub name: Option<String>,

    /// Repository URL used for artifact permalinks
    #[arg(long)]
    pub repo_url: Option<String>,

    /// Maximum concurrent API calls
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Walk and estimate without calling the API or writing artifacts
    #[arg(long)]
    pub dry_run: bool,

    /// Anthropic API key
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}
