//! Sourced position/velocity samples.

use serde::{Deserialize, Serialize};

use crate::vector::Vector3;

/// Reference frame a state vector is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frame {
    /// Sun-centred, ecliptic and equinox of J2000.
    HeliocentricEclipticJ2000,
    /// Earth-centred, equatorial (TLE-derived satellite states).
    GeocentricEquatorial,
}

/// Position (km) and velocity (km/s) at an epoch, tagged with the source that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateVector {
    pub epoch_jd: f64,
    pub position_km: Vector3,
    pub velocity_km_s: Vector3,
    pub frame: Frame,
    pub source: String,
}
