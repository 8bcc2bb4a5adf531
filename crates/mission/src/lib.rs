//! Mission crate: multi-source trajectory coordination and intercept simulation.

pub mod coordinator;
pub mod mission;

pub use facade::*;
pub use intercept_propulsion as propulsion;

mod facade;
