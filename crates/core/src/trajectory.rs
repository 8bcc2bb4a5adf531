//! Ordered, sourced sequences of state vectors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::StateVector;
use crate::vector::{self, Vector3};

/// Violations of the trajectory ordering invariant.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrajectoryError {
    #[error("trajectory has no samples")]
    Empty,
    #[error("sample {index} has a non-finite epoch")]
    NonFiniteEpoch { index: usize },
    #[error("sample {index} at JD {current} does not follow JD {previous}")]
    NonIncreasing {
        index: usize,
        previous: f64,
        current: f64,
    },
}

/// A trajectory whose samples are strictly increasing in epoch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trajectory {
    samples: Vec<StateVector>,
}

impl Trajectory {
    pub fn new(samples: Vec<StateVector>) -> Result<Self, TrajectoryError> {
        if samples.is_empty() {
            return Err(TrajectoryError::Empty);
        }
        if let Some(index) = samples.iter().position(|s| !s.epoch_jd.is_finite()) {
            return Err(TrajectoryError::NonFiniteEpoch { index });
        }
        for (index, pair) in samples.windows(2).enumerate() {
            if pair[1].epoch_jd <= pair[0].epoch_jd {
                return Err(TrajectoryError::NonIncreasing {
                    index: index + 1,
                    previous: pair[0].epoch_jd,
                    current: pair[1].epoch_jd,
                });
            }
        }
        Ok(Self { samples })
    }

    pub fn samples(&self) -> &[StateVector] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<StateVector> {
        self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first_epoch(&self) -> f64 {
        self.samples[0].epoch_jd
    }

    pub fn last_epoch(&self) -> f64 {
        self.samples[self.samples.len() - 1].epoch_jd
    }

    /// Distinct sources in order of first appearance.
    pub fn sources(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for sample in &self.samples {
            if !seen.iter().any(|s| s == &sample.source) {
                seen.push(sample.source.clone());
            }
        }
        seen
    }

    /// Position at `epoch_jd`, linearly interpolated between the bracketing samples.
    ///
    /// Returns `None` outside `[first_epoch, last_epoch]`; nothing is extrapolated.
    pub fn position_at(&self, epoch_jd: f64) -> Option<Vector3> {
        if epoch_jd < self.first_epoch() || epoch_jd > self.last_epoch() {
            return None;
        }
        let upper = self
            .samples
            .partition_point(|sample| sample.epoch_jd < epoch_jd);
        let after = &self.samples[upper];
        if upper == 0 || after.epoch_jd == epoch_jd {
            return Some(after.position_km);
        }
        let before = &self.samples[upper - 1];
        let t = (epoch_jd - before.epoch_jd) / (after.epoch_jd - before.epoch_jd);
        Some(vector::lerp(&before.position_km, &after.position_km, t))
    }

    /// Flatten to the `{jd, x, y, z}` points used by reports and exports.
    pub fn points(&self) -> Vec<TrajectoryPoint> {
        self.samples
            .iter()
            .map(|sample| TrajectoryPoint {
                jd: sample.epoch_jd,
                x: sample.position_km[0],
                y: sample.position_km[1],
                z: sample.position_km[2],
            })
            .collect()
    }
}

/// Position-only trajectory sample in kilometres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub jd: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}
