//! Newton–Raphson solutions of Kepler's equation.

use crate::PropagationError;
use crate::elements::wrap_pi;

/// Iteration policy shared by the elliptical and hyperbolic solvers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeplerSolver {
    pub tolerance: f64,
    pub max_iterations: u32,
}

impl Default for KeplerSolver {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 50,
        }
    }
}

impl KeplerSolver {
    /// Eccentric anomaly `E` with `M = E − e·sin E`, starting from `E₀ = M`.
    ///
    /// `M` is wrapped into `[−π, π)` first, so the returned anomaly lies in
    /// the same revolution.
    pub fn eccentric_anomaly(
        &self,
        mean_anomaly: f64,
        eccentricity: f64,
    ) -> Result<f64, PropagationError> {
        let m = wrap_pi(mean_anomaly);
        self.iterate(m, |e_anom| {
            let f = e_anom - eccentricity * e_anom.sin() - m;
            let f_prime = 1.0 - eccentricity * e_anom.cos();
            f / f_prime
        })
    }

    /// Hyperbolic anomaly `H` with `M = e·sinh H − H`, starting from `H₀ = asinh(M/e)`.
    pub fn hyperbolic_anomaly(
        &self,
        mean_anomaly: f64,
        eccentricity: f64,
    ) -> Result<f64, PropagationError> {
        let initial = (mean_anomaly / eccentricity).asinh();
        self.iterate(initial, |h_anom| {
            let f = eccentricity * h_anom.sinh() - h_anom - mean_anomaly;
            let f_prime = eccentricity * h_anom.cosh() - 1.0;
            f / f_prime
        })
    }

    fn iterate(
        &self,
        initial: f64,
        newton_step: impl Fn(f64) -> f64,
    ) -> Result<f64, PropagationError> {
        let mut anomaly = initial;
        let mut last_step = f64::INFINITY;
        for iteration in 1..=self.max_iterations {
            let step = newton_step(anomaly);
            anomaly -= step;
            if !anomaly.is_finite() || !step.is_finite() {
                return Err(PropagationError::Divergence {
                    iterations: iteration,
                    last_step: step,
                });
            }
            last_step = step;
            if step.abs() < self.tolerance {
                return Ok(anomaly);
            }
        }
        Err(PropagationError::Divergence {
            iterations: self.max_iterations,
            last_step,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circular_orbit_anomaly_equals_mean_anomaly() {
        let solver = KeplerSolver::default();
        let e_anom = solver.eccentric_anomaly(1.2, 0.0).unwrap();
        assert!((e_anom - 1.2).abs() < 1e-12);
    }

    #[test]
    fn eccentric_solution_satisfies_keplers_equation() {
        let solver = KeplerSolver::default();
        for &(m, e) in &[(0.3, 0.1), (2.5, 0.6), (-1.0, 0.9), (7.0, 0.3)] {
            let e_anom = solver.eccentric_anomaly(m, e).unwrap();
            let residual = e_anom - e * e_anom.sin() - wrap_pi(m);
            assert!(residual.abs() < 1e-9, "M={m} e={e} residual={residual}");
        }
    }

    #[test]
    fn hyperbolic_solution_satisfies_keplers_equation() {
        let solver = KeplerSolver::default();
        for &(m, e) in &[(0.5, 1.2), (25.0, 3.0), (-4.0, 1.05), (1_000.0, 1.5)] {
            let h_anom = solver.hyperbolic_anomaly(m, e).unwrap();
            let residual = e * h_anom.sinh() - h_anom - m;
            assert!(
                residual.abs() < 1e-6 * m.abs().max(1.0),
                "M={m} e={e} residual={residual}"
            );
        }
    }

    #[test]
    fn near_parabolic_input_converges_or_reports_divergence() {
        let solver = KeplerSolver::default();
        match solver.eccentric_anomaly(0.01, 0.999_999) {
            Ok(e_anom) => {
                let residual = e_anom - 0.999_999 * e_anom.sin() - 0.01;
                assert!(residual.abs() < 1e-8);
            }
            Err(err) => assert!(matches!(err, PropagationError::Divergence { .. })),
        }
    }

    /// A finite root of the hyperbolic equation, or an explicit divergence.
    fn assert_hyperbolic_root_or_divergence(m: f64, e: f64) {
        match KeplerSolver::default().hyperbolic_anomaly(m, e) {
            Ok(h_anom) => {
                assert!(h_anom.is_finite(), "M={m} e={e} H={h_anom}");
                let residual = e * h_anom.sinh() - h_anom - m;
                assert!(
                    residual.abs() < 1e-6 * m.abs().max(1.0),
                    "M={m} e={e} residual={residual}"
                );
            }
            Err(PropagationError::Divergence { iterations, .. }) => {
                assert!((1..=50).contains(&iterations))
            }
            Err(other) => panic!("M={m} e={e}: unexpected {other:?}"),
        }
    }

    #[test]
    fn barely_hyperbolic_input_converges_or_reports_divergence() {
        let e = 1.0 + 1e-9;
        for m in [1e-6, 0.01, 0.5, -3.0, 40.0] {
            assert_hyperbolic_root_or_divergence(m, e);
        }
    }

    #[test]
    fn huge_mean_anomalies_stay_finite() {
        for (m, e) in [(1e6, 1.5), (-1e6, 2.0), (1e6, 1.0 + 1e-9), (1e12, 4.0)] {
            assert_hyperbolic_root_or_divergence(m, e);
        }
        let h_anom = KeplerSolver::default().hyperbolic_anomaly(1e6, 1.5).unwrap();
        assert!((1.5 * h_anom.sinh() - h_anom - 1e6).abs() < 1e-3);
    }

    #[test]
    fn iteration_cap_is_enforced() {
        let solver = KeplerSolver {
            tolerance: 0.0,
            max_iterations: 3,
        };
        let err = solver.eccentric_anomaly(1.0, 0.5).unwrap_err();
        assert!(matches!(err, PropagationError::Divergence { iterations: 3, .. }));
    }
}
