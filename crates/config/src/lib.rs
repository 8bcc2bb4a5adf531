//! Configuration models and loaders for the intercept planner.
//!
//! Sources, lowest to highest precedence:
//! 1. built-in defaults,
//! 2. an optional file (`.toml` parsed as TOML, anything else as YAML),
//! 3. `INTERCEPT_*` environment variables, `__` separating sections
//!    (`INTERCEPT_SOURCES__SPACE_TRACK__USERNAME` → `sources.space_track.username`).

mod error;
mod sources;

pub use error::ConfigError;
pub use sources::{RateLimitConfig, SourceConfig, SourceKind, SourcesConfig};

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Serialized};
use intercept_core::StepSize;
use serde::{Deserialize, Serialize};

/// Environment prefix for overrides.
pub const ENV_PREFIX: &str = "INTERCEPT_";

/// Complete application configuration, built once and passed by reference.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub mission: MissionConfig,
}

/// Fallback order and request budgets.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CoordinatorConfig {
    /// Provider names in the order they are tried.
    pub priority: Vec<String>,
    pub request_deadline_secs: u64,
    pub search_parallelism: usize,
    pub search_deadline_secs: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            priority: SourceKind::ALL.iter().map(|k| k.as_str().to_string()).collect(),
            request_deadline_secs: 120,
            search_parallelism: 3,
            search_deadline_secs: 30,
        }
    }
}

impl CoordinatorConfig {
    /// Parsed priority list; unknown or repeated names are rejected.
    pub fn providers(&self) -> Result<Vec<SourceKind>, ConfigError> {
        if self.priority.is_empty() {
            return Err(ConfigError::Invalid {
                field: "coordinator.priority".into(),
                reason: "at least one provider is required".into(),
            });
        }
        let mut seen = BTreeSet::new();
        self.priority
            .iter()
            .map(|name| {
                let kind: SourceKind = name.parse()?;
                if !seen.insert(kind) {
                    return Err(ConfigError::Invalid {
                        field: "coordinator.priority".into(),
                        reason: format!("provider `{kind}` listed more than once"),
                    });
                }
                Ok(kind)
            })
            .collect()
    }

    pub fn request_deadline(&self) -> Duration {
        Duration::from_secs(self.request_deadline_secs)
    }

    pub fn search_deadline(&self) -> Duration {
        Duration::from_secs(self.search_deadline_secs)
    }
}

/// Mission simulation parameters.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MissionConfig {
    /// Fixed departure reference point in km.
    pub origin_position_km: [f64; 3],
    /// Days fetched on either side of the intercept date.
    pub window_padding_days: f64,
    pub step: StepSize,
    /// Points on the reported interceptor arc.
    pub arc_points: usize,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            origin_position_km: [0.0; 3],
            window_padding_days: 30.0,
            step: StepSize::ONE_DAY,
            arc_points: 10,
        }
    }
}

impl AppConfig {
    /// Load defaults, then `path` if given, then the environment, and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config: AppConfig = Self::figment(path)?.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// [`AppConfig::load`] after reading a `.env` file from the working directory, if any.
    pub fn load_with_dotenv(path: Option<&Path>) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load(path)
    }

    /// Build the provider chain without extracting it.
    pub fn figment(path: Option<&Path>) -> Result<Figment, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));
        if let Some(path) = path {
            figment = merge_file(figment, path)?;
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.coordinator.providers()?;
        if self.coordinator.search_parallelism == 0 {
            return Err(ConfigError::Invalid {
                field: "coordinator.search_parallelism".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.coordinator.request_deadline_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "coordinator.request_deadline_secs".into(),
                reason: "must be at least 1".into(),
            });
        }
        for kind in SourceKind::ALL {
            self.sources.get(kind).validate(kind.as_str())?;
        }
        if self.mission.arc_points < 2 {
            return Err(ConfigError::Invalid {
                field: "mission.arc_points".into(),
                reason: format!("need at least 2 points, got {}", self.mission.arc_points),
            });
        }
        let padding = self.mission.window_padding_days;
        if !padding.is_finite() || padding < 0.0 {
            return Err(ConfigError::Invalid {
                field: "mission.window_padding_days".into(),
                reason: "must be a non-negative number of days".into(),
            });
        }
        if self.mission.origin_position_km.iter().any(|c| !c.is_finite()) {
            return Err(ConfigError::Invalid {
                field: "mission.origin_position_km".into(),
                reason: "components must be finite".into(),
            });
        }
        Ok(())
    }
}

/// Layer a config file over `figment`, dispatching on the extension.
fn merge_file(figment: Figment, path: &Path) -> Result<Figment, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    if path.extension().map(|ext| ext == "toml").unwrap_or(false) {
        let table: toml::Table = toml::from_str(&contents)?;
        Ok(figment.merge(Serialized::defaults(table)))
    } else {
        let value: serde_yaml::Value = serde_yaml::from_str(&contents)?;
        if value.is_null() {
            return Ok(figment);
        }
        Ok(figment.merge(Serialized::defaults(value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(
            config.coordinator.providers().unwrap(),
            vec![SourceKind::Horizons, SourceKind::Mpc, SourceKind::SpaceTrack]
        );
        assert_eq!(config.mission.arc_points, 10);
        assert_eq!(config.mission.step, StepSize::ONE_DAY);
    }

    #[test]
    fn duplicate_and_unknown_providers_are_rejected() {
        let mut config = AppConfig::default();
        config.coordinator.priority = vec!["mpc".into(), "MPC".into()];
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
        config.coordinator.priority = vec!["celestrak".into()];
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
        config.coordinator.priority.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn limiter_and_arc_bounds_are_checked() {
        let mut config = AppConfig::default();
        config.sources.mpc.rate_limit.capacity = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sources.mpc.rate_limit.capacity"));

        let mut config = AppConfig::default();
        config.sources.horizons.rate_limit.refill_per_second = 0.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.mission.arc_points = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn credentials_need_both_halves() {
        let mut source = AppConfig::default().sources.space_track;
        assert_eq!(source.credentials(), None);
        source.username = Some("someone".into());
        assert_eq!(source.credentials(), None);
        source.password = Some("secret".into());
        assert_eq!(source.credentials(), Some(("someone", "secret")));
    }
}
