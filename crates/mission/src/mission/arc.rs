//! Interceptor path shapes reported alongside a mission result.

use intercept_core::vector::{Vector3, lerp};
use serde::{Deserialize, Serialize};

/// One point of the interceptor path, `t_days` after departure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArcPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub t_days: f64,
}

/// Strategy producing the reported interceptor path between origin and target.
pub trait TransferArc: Send + Sync {
    fn name(&self) -> &str;

    /// First point at `origin` with `t_days = 0`, last at `target` with
    /// `t_days = flight_time_days`.
    fn sample(&self, origin: &Vector3, target: &Vector3, flight_time_days: f64) -> Vec<ArcPoint>;
}

/// Straight segment with evenly spaced points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearArc {
    points: usize,
}

impl LinearArc {
    /// At least two points are always produced.
    pub fn new(points: usize) -> Self {
        Self {
            points: points.max(2),
        }
    }

    pub fn points(&self) -> usize {
        self.points
    }
}

impl Default for LinearArc {
    fn default() -> Self {
        Self::new(10)
    }
}

impl TransferArc for LinearArc {
    fn name(&self) -> &str {
        "linear"
    }

    fn sample(&self, origin: &Vector3, target: &Vector3, flight_time_days: f64) -> Vec<ArcPoint> {
        let last = (self.points - 1) as f64;
        (0..self.points)
            .map(|i| {
                let fraction = i as f64 / last;
                let [x, y, z] = lerp(origin, target, fraction);
                ArcPoint {
                    x,
                    y,
                    z,
                    t_days: fraction * flight_time_days,
                }
            })
            .collect()
    }
}
