//! # intercept_sources
//!
//! Adapters for the external providers the planner pulls orbital data from:
//! - JPL Horizons (state-vector ephemerides)
//! - Minor Planet Center (classical elements for asteroids and comets)
//! - Space-Track (general-perturbation element sets for NORAD objects)
//!
//! Every adapter sits behind [`EphemerisSource`] and reports failures through
//! the shared [`SourceError`] taxonomy. Adapters never substitute data of
//! their own when a provider fails.

pub mod horizons;
pub mod limiter;
pub mod mpc;
pub mod retry;
pub mod space_track;

mod decode;
mod error;
mod http;

pub use error::SourceError;
pub use horizons::HorizonsSource;
pub use limiter::TokenBucket;
pub use mpc::MpcSource;
pub use retry::RetryPolicy;
pub use space_track::{Credentials, SpaceTrackSource};

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

use intercept_core::{StateVector, TimeGrid};
use intercept_orbits::OrbitalElements;
use serde::{Deserialize, Serialize};

/// Boxed future returned by [`EphemerisSource`] methods.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

// ── Types ──────────────────────────────────────────────────────────

/// Broad classification of a catalogued body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Planet,
    Asteroid,
    Comet,
    Satellite,
    #[serde(other)]
    Unknown,
}

impl ObjectType {
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectType::Planet => "planet",
            ObjectType::Asteroid => "asteroid",
            ObjectType::Comet => "comet",
            ObjectType::Satellite => "satellite",
            ObjectType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = std::convert::Infallible;

    /// Lenient mapping of provider vocabularies; unrecognised kinds become `Unknown`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Ok(match lower.as_str() {
            "planet" | "major body" | "dwarf planet" => ObjectType::Planet,
            "asteroid" | "minor planet" | "neo" | "nea" | "pha" => ObjectType::Asteroid,
            "comet" => ObjectType::Comet,
            "satellite" | "payload" | "rocket body" | "debris" => ObjectType::Satellite,
            _ => ObjectType::Unknown,
        })
    }
}

/// A body some provider knows about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CelestialObject {
    pub designation: String,
    pub object_type: ObjectType,
    /// Ids of the adapters likely to resolve this designation.
    pub source_hints: Vec<String>,
}

/// What kind of data an adapter returns for a trajectory request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provision {
    /// Ready-made state vectors on the requested grid.
    Ephemeris,
    /// Classical elements that must be propagated locally.
    Elements,
}

// ── Trait ──────────────────────────────────────────────────────────

/// A single external data provider.
///
/// Only the method matching [`EphemerisSource::provision`] needs a real
/// implementation; the other defaults to `NotFound`.
pub trait EphemerisSource: Send + Sync {
    /// Stable identifier used in configuration, logs, and `source` tags.
    fn id(&self) -> &str;

    fn provision(&self) -> Provision;

    /// State vectors for `object` on every epoch of `grid`.
    fn fetch_trajectory<'a>(
        &'a self,
        object: &'a str,
        grid: &'a TimeGrid,
    ) -> SourceFuture<'a, Vec<StateVector>> {
        let _ = grid;
        Box::pin(async move {
            Err(SourceError::NotFound(format!(
                "{} does not serve ephemerides for {object}",
                self.id()
            )))
        })
    }

    /// Latest classical elements for `object`.
    fn fetch_elements<'a>(&'a self, object: &'a str) -> SourceFuture<'a, OrbitalElements> {
        Box::pin(async move {
            Err(SourceError::NotFound(format!(
                "{} does not serve orbital elements for {object}",
                self.id()
            )))
        })
    }

    /// Objects matching `query`, restricted to `types` when non-empty.
    fn search<'a>(
        &'a self,
        query: &'a str,
        types: &'a [ObjectType],
    ) -> SourceFuture<'a, Vec<CelestialObject>> {
        let _ = (query, types);
        Box::pin(async { Ok(Vec::new()) })
    }

    /// Cheap liveness check used by status reporting.
    fn health_check(&self) -> SourceFuture<'_, ()>;
}

/// `true` when `object_type` passes the requested filter.
pub fn type_matches(types: &[ObjectType], object_type: ObjectType) -> bool {
    types.is_empty() || types.contains(&object_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_vocabularies_map_to_object_types() {
        assert_eq!("Comet".parse::<ObjectType>().unwrap(), ObjectType::Comet);
        assert_eq!("PAYLOAD".parse::<ObjectType>().unwrap(), ObjectType::Satellite);
        assert_eq!("trans-neptunian".parse::<ObjectType>().unwrap(), ObjectType::Unknown);
    }

    #[test]
    fn unknown_object_types_deserialize_leniently() {
        let parsed: ObjectType = serde_json::from_str("\"centaur\"").unwrap();
        assert_eq!(parsed, ObjectType::Unknown);
        assert_eq!(serde_json::to_string(&ObjectType::Asteroid).unwrap(), "\"asteroid\"");
    }

    #[test]
    fn empty_type_filter_accepts_everything() {
        assert!(type_matches(&[], ObjectType::Comet));
        assert!(!type_matches(&[ObjectType::Asteroid], ObjectType::Comet));
    }
}
