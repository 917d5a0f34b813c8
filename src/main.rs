use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use loredoc::cli::CliApp;
use loredoc::cli_types::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    CliApp::new(cli.config.clone()).run(cli.command).await
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
