//! Per-provider settings.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// The closed set of providers the planner knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceKind {
    Horizons,
    Mpc,
    SpaceTrack,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] =
        [SourceKind::Horizons, SourceKind::Mpc, SourceKind::SpaceTrack];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Horizons => "horizons",
            SourceKind::Mpc => "mpc",
            SourceKind::SpaceTrack => "space_track",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "horizons" | "jpl_horizons" => Ok(SourceKind::Horizons),
            "mpc" | "minor_planet_center" => Ok(SourceKind::Mpc),
            "space_track" | "spacetrack" => Ok(SourceKind::SpaceTrack),
            other => Err(ConfigError::invalid(
                "coordinator.priority",
                format!("unknown provider `{other}`"),
            )),
        }
    }
}

/// Token-bucket parameters for one provider.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RateLimitConfig {
    pub capacity: u32,
    pub refill_per_second: f64,
    pub max_wait_ms: u64,
}

impl RateLimitConfig {
    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }
}

/// Connection, retry, and credential settings for one provider.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SourceConfig {
    pub enabled: bool,
    pub base_url: String,
    pub timeout_secs: u64,
    pub retry_count: u32,
    pub backoff_ms: u64,
    pub max_backoff_ms: u64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    pub rate_limit: RateLimitConfig,
}

impl SourceConfig {
    fn with_url(base_url: &str) -> Self {
        Self {
            enabled: true,
            base_url: base_url.to_string(),
            timeout_secs: 30,
            retry_count: 2,
            backoff_ms: 500,
            max_backoff_ms: 8_000,
            username: None,
            password: None,
            rate_limit: RateLimitConfig {
                capacity: 5,
                refill_per_second: 1.0,
                max_wait_ms: 2_000,
            },
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    /// `(username, password)` when both are present and non-empty.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        }
    }

    pub(crate) fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::invalid(
                format!("sources.{name}.base_url"),
                "must not be empty",
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::invalid(
                format!("sources.{name}.timeout_secs"),
                "must be at least 1",
            ));
        }
        if self.rate_limit.capacity == 0 {
            return Err(ConfigError::invalid(
                format!("sources.{name}.rate_limit.capacity"),
                "must be at least 1",
            ));
        }
        let refill = self.rate_limit.refill_per_second;
        if refill <= 0.0 || !refill.is_finite() {
            return Err(ConfigError::invalid(
                format!("sources.{name}.rate_limit.refill_per_second"),
                "must be a positive number",
            ));
        }
        if self.max_backoff_ms < self.backoff_ms {
            return Err(ConfigError::invalid(
                format!("sources.{name}.max_backoff_ms"),
                "must not be smaller than backoff_ms",
            ));
        }
        Ok(())
    }
}

/// Settings for every provider, keyed by provider name.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SourcesConfig {
    pub horizons: SourceConfig,
    pub mpc: SourceConfig,
    pub space_track: SourceConfig,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        let mut space_track = SourceConfig::with_url("https://www.space-track.org");
        // Space-Track allows 30 requests per minute.
        space_track.rate_limit = RateLimitConfig {
            capacity: 5,
            refill_per_second: 0.5,
            max_wait_ms: 4_000,
        };
        Self {
            horizons: SourceConfig::with_url("https://ssd.jpl.nasa.gov/api"),
            mpc: SourceConfig::with_url("https://www.minorplanetcenter.net/web_service"),
            space_track,
        }
    }
}

impl SourcesConfig {
    pub fn get(&self, kind: SourceKind) -> &SourceConfig {
        match kind {
            SourceKind::Horizons => &self.horizons,
            SourceKind::Mpc => &self.mpc,
            SourceKind::SpaceTrack => &self.space_track,
        }
    }
}
