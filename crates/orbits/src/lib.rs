//! Two-body orbit propagation: classical elements in, sourced state vectors out.

pub mod elements;
pub mod kepler;
pub mod propagator;

pub use elements::{CentralBody, OrbitRegime, OrbitalElements, elements_from_state};
pub use kepler::KeplerSolver;
pub use propagator::Propagator;

use thiserror::Error;

/// Failures raised while validating or propagating a set of elements.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropagationError {
    #[error("invalid orbital elements: {0}")]
    InvalidRequest(String),
    #[error(
        "Kepler solver did not converge after {iterations} iterations (last step {last_step:e})"
    )]
    Divergence { iterations: u32, last_step: f64 },
}
