use std::path::PathBuf;

use clap::Parser;
use intercept_cli::{GlobalArgs, exit_with_error, write_json};
use intercept_planner::mission::DataCoordinator;

/// Show what every configured provider knows about one object.
#[derive(Parser, Debug)]
#[command(author, version, about = "Catalogue entries and element sets for one object")]
struct Cli {
    /// Object name or designation (e.g. "Ceres", "99942", "25544")
    object: String,

    /// Output path (`-` for stdout)
    #[arg(long, default_value = "-")]
    output: PathBuf,

    #[command(flatten)]
    global: GlobalArgs,
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        exit_with_error("info", &error);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.global.bootstrap()?;
    let coordinator = DataCoordinator::from_config(&config)?;
    let info = coordinator.object_info(&cli.object).await?;
    if !info.failures.is_empty() {
        tracing::warn!(failed = info.failures.len(), "some providers did not recognise the object");
    }
    write_json(&cli.output, &info)
}
