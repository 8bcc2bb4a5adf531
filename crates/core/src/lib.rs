//! Core units, constants, and shared primitives for the Intercept Planner workspace.

pub mod state;
pub mod time;
pub mod trajectory;

pub use state::{Frame, StateVector};
pub use time::{StepSize, StepUnit, TimeError, TimeGrid};
pub use trajectory::{Trajectory, TrajectoryError, TrajectoryPoint};

/// Physical constants expressed in kilometre/second units unless stated otherwise.
pub mod constants {
    /// Kilometres per astronomical unit.
    pub const AU_KM: f64 = 149_597_870.7;
    /// Seconds per Julian day.
    pub const SECONDS_PER_DAY: f64 = 86_400.0;
    /// Heliocentric gravitational parameter (km³/s²).
    pub const MU_SUN_KM3_S2: f64 = 1.327_124_400_18e11;
    /// Geocentric gravitational parameter (km³/s²).
    pub const MU_EARTH_KM3_S2: f64 = 398_600.441_8;
    /// Julian Date of the Unix epoch (1970-01-01T00:00:00Z).
    pub const UNIX_EPOCH_JD: f64 = 2_440_587.5;
}

/// Basic unit conversion helpers.
pub mod units {
    use super::constants::AU_KM;

    /// Convert astronomical units to kilometres.
    #[inline]
    pub fn au_to_km(v: f64) -> f64 {
        v * AU_KM
    }

    /// Convert kilometres to astronomical units.
    #[inline]
    pub fn km_to_au(v: f64) -> f64 {
        v / AU_KM
    }

    /// Convert degrees to radians.
    #[inline]
    pub fn deg_to_rad(v: f64) -> f64 {
        v.to_radians()
    }

    /// Round to a fixed number of decimal places, as used for reported metrics.
    #[inline]
    pub fn round_to(v: f64, decimals: i32) -> f64 {
        let factor = 10f64.powi(decimals);
        (v * factor).round() / factor
    }
}

/// Minimal vector helpers to avoid ad-hoc `[f64; 3]` math everywhere.
pub mod vector {
    /// Alias for a 3D vector in kilometres or km/s depending on context.
    pub type Vector3 = [f64; 3];

    /// Euclidean norm of a vector.
    #[inline]
    pub fn norm(v: &Vector3) -> f64 {
        dot(v, v).sqrt()
    }

    /// Dot product of two vectors.
    #[inline]
    pub fn dot(a: &Vector3, b: &Vector3) -> f64 {
        a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
    }

    /// Cross product of two vectors.
    #[inline]
    pub fn cross(a: &Vector3, b: &Vector3) -> Vector3 {
        [
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ]
    }

    /// Vector addition.
    #[inline]
    pub fn add(a: &Vector3, b: &Vector3) -> Vector3 {
        [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
    }

    /// Vector subtraction.
    #[inline]
    pub fn sub(a: &Vector3, b: &Vector3) -> Vector3 {
        [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
    }

    /// Scale a vector by a scalar.
    #[inline]
    pub fn scale(v: &Vector3, s: f64) -> Vector3 {
        [v[0] * s, v[1] * s, v[2] * s]
    }

    /// Linear interpolation `a + t·(b − a)`.
    #[inline]
    pub fn lerp(a: &Vector3, b: &Vector3, t: f64) -> Vector3 {
        add(a, &scale(&sub(b, a), t))
    }

    /// Euclidean distance between two points.
    #[inline]
    pub fn distance(a: &Vector3, b: &Vector3) -> f64 {
        norm(&sub(a, b))
    }
}
