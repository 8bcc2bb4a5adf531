//! Plumbing shared by the command-line front-ends.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, ValueEnum};
use intercept_planner::config::AppConfig;
use intercept_planner::export::{self, Format};
use serde::Serialize;

/// Environment variable holding a `tracing` filter directive.
pub const LOG_ENV: &str = "INTERCEPT_LOG";

/// Flags every binary accepts.
#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Configuration file (`.toml`, otherwise YAML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log provider attempts and outcomes
    #[arg(long, short, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

impl GlobalArgs {
    /// Install logging, then load `.env`, the config file, and `INTERCEPT_*` overrides.
    pub fn bootstrap(&self) -> anyhow::Result<AppConfig> {
        init_tracing(self.quiet, self.verbose)?;
        AppConfig::load_with_dotenv(self.config.as_deref()).context("failed to load configuration")
    }
}

/// Logs go to stderr; `INTERCEPT_LOG` overrides the flag-derived level.
pub fn init_tracing(quiet: bool, verbose: bool) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "info"
    } else {
        "warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))
}

/// Write `value` as pretty JSON to `path` (`-` for stdout).
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let mut writer = export::writer_for_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    export::json::write_pretty(&mut *writer, value)?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Json,
}

impl From<OutputFormat> for Format {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Csv => Format::Csv,
            OutputFormat::Json => Format::Json,
        }
    }
}

/// `--format` wins; otherwise the output extension decides.
pub fn resolve_format(path: &Path, explicit: Option<OutputFormat>) -> Format {
    explicit.map_or_else(|| Format::from_path(path), Format::from)
}

/// Report a failed run the same way from every binary.
pub fn exit_with_error(bin: &str, error: &anyhow::Error) -> ! {
    eprintln!("{bin} error: {error:#}");
    std::process::exit(1);
}
