//! Classical orbital elements and the inverse state-to-elements conversion.

use std::f64::consts::{PI, TAU};

use intercept_core::Frame;
use intercept_core::constants::{MU_EARTH_KM3_S2, MU_SUN_KM3_S2};
use intercept_core::units::{au_to_km, deg_to_rad};
use intercept_core::vector::{self, Vector3};
use serde::{Deserialize, Serialize};

use crate::PropagationError;

/// Eccentricities within this distance of 1 are treated as parabolic.
pub const PARABOLIC_TOLERANCE: f64 = 1e-10;

const DEGENERATE_TOLERANCE: f64 = 1e-11;

/// Body whose gravitational parameter governs the two-body motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CentralBody {
    #[default]
    Sun,
    Earth,
}

impl CentralBody {
    /// Gravitational parameter in km³/s².
    pub fn mu(self) -> f64 {
        match self {
            CentralBody::Sun => MU_SUN_KM3_S2,
            CentralBody::Earth => MU_EARTH_KM3_S2,
        }
    }

    pub fn frame(self) -> Frame {
        match self {
            CentralBody::Sun => Frame::HeliocentricEclipticJ2000,
            CentralBody::Earth => Frame::GeocentricEquatorial,
        }
    }
}

/// Conic section implied by the eccentricity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrbitRegime {
    Elliptical,
    Parabolic,
    Hyperbolic,
}

/// Keplerian elements at an epoch.
///
/// The semi-major axis is signed: positive for ellipses, negative for
/// hyperbolae. Angles are radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitalElements {
    pub semi_major_axis_km: f64,
    pub eccentricity: f64,
    pub inclination_rad: f64,
    pub ascending_node_rad: f64,
    pub argument_of_periapsis_rad: f64,
    pub mean_anomaly_rad: f64,
    pub epoch_jd: f64,
    #[serde(default)]
    pub central_body: CentralBody,
}

impl OrbitalElements {
    /// Heliocentric elements from the AU/degree form published by element catalogues.
    pub fn from_au_degrees(
        semi_major_axis_au: f64,
        eccentricity: f64,
        inclination_deg: f64,
        ascending_node_deg: f64,
        argument_of_periapsis_deg: f64,
        mean_anomaly_deg: f64,
        epoch_jd: f64,
    ) -> Self {
        Self {
            semi_major_axis_km: au_to_km(semi_major_axis_au),
            eccentricity,
            inclination_rad: deg_to_rad(inclination_deg),
            ascending_node_rad: deg_to_rad(ascending_node_deg),
            argument_of_periapsis_rad: deg_to_rad(argument_of_periapsis_deg),
            mean_anomaly_rad: deg_to_rad(mean_anomaly_deg),
            epoch_jd,
            central_body: CentralBody::Sun,
        }
    }

    pub fn regime(&self) -> OrbitRegime {
        if (self.eccentricity - 1.0).abs() <= PARABOLIC_TOLERANCE {
            OrbitRegime::Parabolic
        } else if self.eccentricity < 1.0 {
            OrbitRegime::Elliptical
        } else {
            OrbitRegime::Hyperbolic
        }
    }

    pub fn mu(&self) -> f64 {
        self.central_body.mu()
    }

    /// Mean motion in rad/s.
    pub fn mean_motion(&self) -> f64 {
        (self.mu() / self.semi_major_axis_km.abs().powi(3)).sqrt()
    }

    /// Reject element sets the propagator cannot handle.
    pub fn validate(&self) -> Result<OrbitRegime, PropagationError> {
        if self.eccentricity.is_finite() && self.regime() == OrbitRegime::Parabolic {
            return Err(PropagationError::InvalidRequest(format!(
                "parabolic orbit (e = {}) is not supported",
                self.eccentricity
            )));
        }
        let fields = [
            self.semi_major_axis_km,
            self.eccentricity,
            self.inclination_rad,
            self.ascending_node_rad,
            self.argument_of_periapsis_rad,
            self.mean_anomaly_rad,
            self.epoch_jd,
        ];
        if fields.iter().any(|value| !value.is_finite()) {
            return Err(PropagationError::InvalidRequest(
                "elements contain non-finite values".to_string(),
            ));
        }
        if self.eccentricity < 0.0 {
            return Err(PropagationError::InvalidRequest(format!(
                "eccentricity {} is negative",
                self.eccentricity
            )));
        }
        let regime = self.regime();
        match regime {
            OrbitRegime::Elliptical if self.semi_major_axis_km <= 0.0 => {
                Err(PropagationError::InvalidRequest(format!(
                    "elliptical orbit needs a positive semi-major axis, got {} km",
                    self.semi_major_axis_km
                )))
            }
            OrbitRegime::Hyperbolic if self.semi_major_axis_km >= 0.0 => {
                Err(PropagationError::InvalidRequest(format!(
                    "hyperbolic orbit needs a negative semi-major axis, got {} km",
                    self.semi_major_axis_km
                )))
            }
            _ => Ok(regime),
        }
    }
}

/// Recover classical elements from a position/velocity pair at `epoch_jd`.
pub fn elements_from_state(
    position_km: &Vector3,
    velocity_km_s: &Vector3,
    epoch_jd: f64,
    central_body: CentralBody,
) -> Result<OrbitalElements, PropagationError> {
    let mu = central_body.mu();
    let r = vector::norm(position_km);
    let v = vector::norm(velocity_km_s);
    let h = vector::cross(position_km, velocity_km_s);
    let h_norm = vector::norm(&h);
    if r <= 0.0 || h_norm <= DEGENERATE_TOLERANCE * r * v.max(1.0) {
        return Err(PropagationError::InvalidRequest(
            "state is rectilinear or at the origin".to_string(),
        ));
    }

    let radial_speed = vector::dot(position_km, velocity_km_s);
    let e_vec = vector::scale(
        &vector::sub(
            &vector::scale(position_km, v * v - mu / r),
            &vector::scale(velocity_km_s, radial_speed),
        ),
        1.0 / mu,
    );
    let e = vector::norm(&e_vec);
    let energy = 0.5 * v * v - mu / r;
    if energy.abs() <= f64::EPSILON * mu / r {
        return Err(PropagationError::InvalidRequest(
            "state is on a parabolic trajectory".to_string(),
        ));
    }
    let a = -mu / (2.0 * energy);

    let inclination = (h[2] / h_norm).clamp(-1.0, 1.0).acos();
    let node = [-h[1], h[0], 0.0];
    let node_norm = vector::norm(&node);
    let h_hat = vector::scale(&h, 1.0 / h_norm);

    // Equatorial orbits measure from the x axis; circular ones from the node.
    let node_dir = if node_norm > DEGENERATE_TOLERANCE * h_norm {
        vector::scale(&node, 1.0 / node_norm)
    } else {
        [1.0, 0.0, 0.0]
    };
    let ascending_node = node_dir[1].atan2(node_dir[0]);
    let angle_from = |from: &Vector3, to: &Vector3| {
        vector::dot(&vector::cross(from, to), &h_hat).atan2(vector::dot(from, to))
    };
    let (argument_of_periapsis, true_anomaly) = if e > DEGENERATE_TOLERANCE {
        (angle_from(&node_dir, &e_vec), angle_from(&e_vec, position_km))
    } else {
        (0.0, angle_from(&node_dir, position_km))
    };

    let mean_anomaly = if e < 1.0 {
        let ecc_anomaly = 2.0
            * ((1.0 - e).sqrt() * (true_anomaly / 2.0).sin())
                .atan2((1.0 + e).sqrt() * (true_anomaly / 2.0).cos());
        wrap_two_pi(ecc_anomaly - e * ecc_anomaly.sin())
    } else {
        let hyp_anomaly =
            2.0 * (((e - 1.0) / (e + 1.0)).sqrt() * (true_anomaly / 2.0).tan()).atanh();
        e * hyp_anomaly.sinh() - hyp_anomaly
    };

    Ok(OrbitalElements {
        semi_major_axis_km: a,
        eccentricity: e,
        inclination_rad: inclination,
        ascending_node_rad: wrap_two_pi(ascending_node),
        argument_of_periapsis_rad: wrap_two_pi(argument_of_periapsis),
        mean_anomaly_rad: mean_anomaly,
        epoch_jd,
        central_body,
    })
}

/// Wrap an angle into `[0, 2π)`.
pub fn wrap_two_pi(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// Wrap an angle into `[−π, π)`.
pub fn wrap_pi(angle: f64) -> f64 {
    (angle + PI).rem_euclid(TAU) - PI
}
