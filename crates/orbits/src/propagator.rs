//! Element → state-vector propagation over a time grid.

use intercept_core::constants::SECONDS_PER_DAY;
use intercept_core::vector::Vector3;
use intercept_core::{StateVector, TimeGrid, Trajectory};

use crate::PropagationError;
use crate::elements::{OrbitRegime, OrbitalElements};
use crate::kepler::KeplerSolver;

/// Pure two-body propagator; holds only the solver policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Propagator {
    solver: KeplerSolver,
}

impl Propagator {
    pub fn new(solver: KeplerSolver) -> Self {
        Self { solver }
    }

    /// Position (km) and velocity (km/s) at `epoch_jd`.
    pub fn position_velocity_at(
        &self,
        elements: &OrbitalElements,
        epoch_jd: f64,
    ) -> Result<(Vector3, Vector3), PropagationError> {
        let regime = elements.validate()?;
        if !epoch_jd.is_finite() {
            return Err(PropagationError::InvalidRequest(format!(
                "epoch {epoch_jd} is not finite"
            )));
        }
        let mu = elements.mu();
        let a = elements.semi_major_axis_km;
        let e = elements.eccentricity;
        let dt_seconds = (epoch_jd - elements.epoch_jd) * SECONDS_PER_DAY;
        let mean_anomaly = elements.mean_anomaly_rad + elements.mean_motion() * dt_seconds;

        let (radius, true_anomaly) = match regime {
            OrbitRegime::Elliptical => {
                let ecc = self.solver.eccentric_anomaly(mean_anomaly, e)?;
                let nu = 2.0
                    * ((1.0 + e).sqrt() * (ecc / 2.0).sin())
                        .atan2((1.0 - e).sqrt() * (ecc / 2.0).cos());
                (a * (1.0 - e * ecc.cos()), nu)
            }
            OrbitRegime::Hyperbolic => {
                let hyp = self.solver.hyperbolic_anomaly(mean_anomaly, e)?;
                let nu = 2.0
                    * ((e + 1.0).sqrt() * (hyp / 2.0).sinh())
                        .atan2((e - 1.0).sqrt() * (hyp / 2.0).cosh());
                (a * (1.0 - e * hyp.cosh()), nu)
            }
            OrbitRegime::Parabolic => unreachable!("validate rejects parabolic elements"),
        };

        let semi_latus_rectum = a * (1.0 - e * e);
        let h = (mu * semi_latus_rectum).sqrt();
        let (sin_nu, cos_nu) = true_anomaly.sin_cos();
        let r_pf = [radius * cos_nu, radius * sin_nu];
        let v_pf = [-mu / h * sin_nu, mu / h * (e + cos_nu)];

        let position = rotate_perifocal(elements, r_pf);
        let velocity = rotate_perifocal(elements, v_pf);
        if position.iter().chain(velocity.iter()).any(|c| !c.is_finite()) {
            return Err(PropagationError::Divergence {
                iterations: self.solver.max_iterations,
                last_step: f64::NAN,
            });
        }
        Ok((position, velocity))
    }

    /// Sample the orbit on every grid epoch, tagging each state with `source`.
    pub fn propagate(
        &self,
        elements: &OrbitalElements,
        grid: &TimeGrid,
        source: &str,
    ) -> Result<Trajectory, PropagationError> {
        let frame = elements.central_body.frame();
        let samples = grid
            .epochs()
            .map(|epoch_jd| {
                let (position_km, velocity_km_s) = self.position_velocity_at(elements, epoch_jd)?;
                Ok(StateVector {
                    epoch_jd,
                    position_km,
                    velocity_km_s,
                    frame,
                    source: source.to_string(),
                })
            })
            .collect::<Result<Vec<_>, PropagationError>>()?;
        Trajectory::new(samples).map_err(|err| PropagationError::InvalidRequest(err.to_string()))
    }
}

/// Rotate an in-plane perifocal vector by ω, i, Ω into the reference frame.
fn rotate_perifocal(elements: &OrbitalElements, perifocal: [f64; 2]) -> Vector3 {
    let (sin_w, cos_w) = elements.argument_of_periapsis_rad.sin_cos();
    let (sin_o, cos_o) = elements.ascending_node_rad.sin_cos();
    let (sin_i, cos_i) = elements.inclination_rad.sin_cos();
    let [p, q] = perifocal;
    [
        (cos_o * cos_w - sin_o * sin_w * cos_i) * p + (-cos_o * sin_w - sin_o * cos_w * cos_i) * q,
        (sin_o * cos_w + cos_o * sin_w * cos_i) * p + (-sin_o * sin_w + cos_o * cos_w * cos_i) * q,
        (sin_w * sin_i) * p + (cos_w * sin_i) * q,
    ]
}
