//! Intercept planner: sourced trajectories and interceptor swarm estimates.
//!
//! The workspace crates are re-exported here so front-ends depend on one
//! package. Trajectories always come from an external provider; when none can
//! supply one, the caller gets the full list of provider failures instead.

pub use intercept_core as common;
pub use intercept_config as config;
pub use intercept_export as export;
pub use intercept_mission as mission;
pub use intercept_orbits as orbits;
pub use intercept_propulsion as propulsion;
pub use intercept_sources as sources;

/// Returns the version of the library for smoke tests.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
