use std::path::PathBuf;

use anyhow::bail;
use clap::Parser;
use intercept_cli::{GlobalArgs, exit_with_error, write_json};
use intercept_planner::mission::DataCoordinator;

/// Probe every configured provider.
#[derive(Parser, Debug)]
#[command(author, version, about = "Provider health report")]
struct Cli {
    /// Output path (`-` for stdout)
    #[arg(long, default_value = "-")]
    output: PathBuf,

    /// Exit non-zero when any provider is down
    #[arg(long)]
    strict: bool,

    #[command(flatten)]
    global: GlobalArgs,
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        exit_with_error("status", &error);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.global.bootstrap()?;
    let coordinator = DataCoordinator::from_config(&config)?;
    let report = coordinator.status().await;
    write_json(&cli.output, &report)?;
    if cli.strict && !report.all_up() {
        bail!("one or more providers are down");
    }
    Ok(())
}
