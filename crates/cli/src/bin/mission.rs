use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use intercept_cli::{GlobalArgs, exit_with_error, write_json};
use intercept_planner::mission::{MissionRequest, MissionSimulator};
use intercept_planner::propulsion::{PropulsionType, RoleSplit};

/// Exit status when the simulation ran but produced no successful intercept.
const EXIT_NO_INTERCEPT: u8 = 2;

/// Simulate an interceptor swarm against a sourced target.
#[derive(Parser, Debug)]
#[command(author, version, about = "Intercept mission simulator")]
struct Cli {
    /// Target designation
    #[arg(long)]
    target: String,

    /// Intercept date (date, timestamp, or Julian Date)
    #[arg(long)]
    date: String,

    /// Number of interceptors
    #[arg(long, default_value_t = 1)]
    swarm: u32,

    /// chemical, ion, or nuclear
    #[arg(long, default_value = "chemical")]
    propulsion: PropulsionType,

    /// balanced, scout, impactor, or relay
    #[arg(long, default_value = "balanced")]
    roles: RoleSplit,

    /// Output path (`-` for stdout)
    #[arg(long, default_value = "-")]
    output: PathBuf,

    #[command(flatten)]
    global: GlobalArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_NO_INTERCEPT),
        Err(error) => exit_with_error("mission", &error),
    }
}

async fn run() -> anyhow::Result<bool> {
    let cli = Cli::parse();
    let config = cli.global.bootstrap()?;
    let simulator = MissionSimulator::from_config(&config)?;
    let request = MissionRequest {
        target_object: cli.target,
        intercept_date: cli.date,
        swarm_size: cli.swarm,
        propulsion_type: cli.propulsion,
        role_split: cli.roles,
    };
    let result = simulator.simulate(&request).await;
    write_json(&cli.output, &result)?;
    if let Some(error) = &result.error {
        eprintln!("mission: {error}");
    }
    Ok(result.success)
}
