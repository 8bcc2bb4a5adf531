//! Propulsion mode descriptors and swarm composition for interceptor missions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Propulsion family of the interceptor swarm.
///
/// Anything other than the known families deserializes to `Unknown`, which
/// is costed like chemical propulsion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropulsionType {
    #[default]
    Chemical,
    Ion,
    Nuclear,
    #[serde(other)]
    Unknown,
}

impl PropulsionType {
    /// Multiplier applied to the required delta-v.
    pub fn delta_v_factor(self) -> f64 {
        match self {
            PropulsionType::Chemical => 1.0,
            PropulsionType::Ion => 0.3,
            PropulsionType::Nuclear => 0.1,
            PropulsionType::Unknown => 1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PropulsionType::Chemical => "chemical",
            PropulsionType::Ion => "ion",
            PropulsionType::Nuclear => "nuclear",
            PropulsionType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PropulsionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropulsionType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "chemical" => PropulsionType::Chemical,
            "ion" => PropulsionType::Ion,
            "nuclear" => PropulsionType::Nuclear,
            _ => PropulsionType::Unknown,
        })
    }
}

/// How the swarm divides its work. Descriptive only; it does not enter the metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleSplit {
    #[default]
    Balanced,
    Scout,
    Impactor,
    Relay,
    #[serde(other)]
    Custom,
}

impl FromStr for RoleSplit {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "balanced" => RoleSplit::Balanced,
            "scout" => RoleSplit::Scout,
            "impactor" => RoleSplit::Impactor,
            "relay" => RoleSplit::Relay,
            _ => RoleSplit::Custom,
        })
    }
}
