use std::path::PathBuf;

use clap::Parser;
use intercept_cli::{GlobalArgs, exit_with_error, write_json};
use intercept_planner::mission::DataCoordinator;
use intercept_planner::sources::ObjectType;

/// Search every configured provider for matching objects.
#[derive(Parser, Debug)]
#[command(author, version, about = "Object search across providers")]
struct Cli {
    /// Name or designation fragment
    query: String,

    /// Restrict to an object type (repeatable): planet, asteroid, comet, satellite
    #[arg(long = "type")]
    types: Vec<ObjectType>,

    /// Output path (`-` for stdout)
    #[arg(long, default_value = "-")]
    output: PathBuf,

    #[command(flatten)]
    global: GlobalArgs,
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        exit_with_error("search", &error);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.global.bootstrap()?;
    let coordinator = DataCoordinator::from_config(&config)?;
    let results = coordinator.search_objects(&cli.query, &cli.types).await?;
    if !results.failures.is_empty() {
        tracing::warn!(failed = results.failures.len(), "some providers did not answer");
    }
    write_json(&cli.output, &results)
}
