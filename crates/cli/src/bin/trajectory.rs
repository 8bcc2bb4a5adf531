use std::path::PathBuf;

use anyhow::bail;
use clap::Parser;
use intercept_cli::{GlobalArgs, OutputFormat, exit_with_error, resolve_format, write_json};
use intercept_planner::common::StepSize;
use intercept_planner::common::time::parse_epoch;
use intercept_planner::export::{self, Format};
use intercept_planner::mission::{DataCoordinator, TrajectoryReport};
use serde::Serialize;

/// Fetch a sourced trajectory for one or more objects.
#[derive(Parser, Debug)]
#[command(author, version, about = "Sourced trajectory fetcher (Horizons, MPC, Space-Track)")]
struct Cli {
    /// Object designations (`Ceres`, `99942`, `25544`, ...)
    #[arg(required = true)]
    objects: Vec<String>,

    /// Window start (date, timestamp, or Julian Date)
    #[arg(long)]
    start: String,

    /// Window end (date, timestamp, or Julian Date)
    #[arg(long)]
    end: String,

    /// Sampling step such as `1d`, `6h`, or `30m`
    #[arg(long, default_value = "1d")]
    step: StepSize,

    /// Output path (`-` for stdout)
    #[arg(long, default_value = "-")]
    output: PathBuf,

    /// Output format (defaults from the output extension; stdout is JSON)
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    #[command(flatten)]
    global: GlobalArgs,
}

#[derive(Serialize)]
struct BatchEntry {
    object: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<TrajectoryReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        exit_with_error("trajectory", &error);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.global.bootstrap()?;
    let start_jd = parse_epoch(&cli.start)?;
    let end_jd = parse_epoch(&cli.end)?;
    let format = resolve_format(&cli.output, cli.format);
    let coordinator = DataCoordinator::from_config(&config)?;

    if let [object] = cli.objects.as_slice() {
        let report = coordinator
            .fetch_trajectory(object, start_jd, end_jd, cli.step)
            .await?;
        return match format {
            Format::Json => write_json(&cli.output, &report),
            Format::Csv => {
                let mut writer = export::writer_for_path(&cli.output)?;
                export::trajectory::write_csv(&mut *writer, &report.trajectory)?;
                Ok(())
            }
        };
    }

    if format == Format::Csv {
        bail!("CSV output takes a single object; use JSON for {} objects", cli.objects.len());
    }
    let results = coordinator
        .fetch_many(&cli.objects, start_jd, end_jd, cli.step)
        .await;
    let failed = results.iter().filter(|(_, result)| result.is_err()).count();
    let entries: Vec<BatchEntry> = results
        .into_iter()
        .map(|(object, result)| match result {
            Ok(report) => BatchEntry {
                object,
                report: Some(report),
                error: None,
            },
            Err(err) => BatchEntry {
                object,
                report: None,
                error: Some(err.to_string()),
            },
        })
        .collect();
    write_json(&cli.output, &entries)?;
    if failed > 0 {
        bail!("{failed} of {} objects could not be sourced", entries.len());
    }
    Ok(())
}
