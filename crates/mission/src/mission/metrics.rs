//! Closed-form intercept estimates from the straight-line distance to the target.

use intercept_core::constants::SECONDS_PER_DAY;
use intercept_core::vector::{Vector3, distance};
use intercept_propulsion::PropulsionType;

/// Delta-v ceiling before the propulsion factor (km/s).
pub const MAX_BASE_DELTA_V_KM_S: f64 = 15.0;
/// Kilometres of distance per km/s of base delta-v.
pub const DELTA_V_DISTANCE_SCALE_KM: f64 = 1.0e8;
/// Mean interceptor cruise speed (km/s).
pub const CRUISE_SPEED_KM_S: f64 = 50.0;

const BASE_SUCCESS_PROBABILITY: f64 = 0.85;
const SWARM_BONUS_PER_CRAFT: f64 = 0.01;
const MAX_SWARM_BONUS: f64 = 0.1;
const DELTA_V_PENALTY_THRESHOLD_KM_S: f64 = 5.0;
const DELTA_V_PENALTY_PER_KM_S: f64 = 0.05;
const SUCCESS_THRESHOLD: f64 = 0.6;

pub const DATA_PRODUCTS: [&str; 6] = [
    "High-resolution imagery",
    "Spectrographic analysis",
    "Magnetic field measurements",
    "Dust particle samples",
    "Gas composition data",
    "Surface temperature mapping",
];

/// Unrounded intercept estimates.
#[derive(Debug, Clone, PartialEq)]
pub struct InterceptMetrics {
    pub distance_km: f64,
    pub delta_v_km_s: f64,
    pub flight_time_days: f64,
    pub success_probability: f64,
    pub fuel_consumed_percent: f64,
    pub success: bool,
}

impl InterceptMetrics {
    pub fn compute(
        origin: &Vector3,
        target: &Vector3,
        swarm_size: u32,
        propulsion: PropulsionType,
    ) -> Self {
        let distance_km = distance(origin, target);
        let delta_v_km_s = required_delta_v(distance_km, propulsion);
        let success_probability = success_probability(swarm_size, delta_v_km_s);
        Self {
            distance_km,
            delta_v_km_s,
            flight_time_days: flight_time_days(distance_km),
            success_probability,
            fuel_consumed_percent: delta_v_km_s * f64::from(swarm_size) * 100.0,
            success: success_probability > SUCCESS_THRESHOLD,
        }
    }
}

pub fn required_delta_v(distance_km: f64, propulsion: PropulsionType) -> f64 {
    let base = (distance_km / DELTA_V_DISTANCE_SCALE_KM).min(MAX_BASE_DELTA_V_KM_S);
    base * propulsion.delta_v_factor()
}

pub fn flight_time_days(distance_km: f64) -> f64 {
    distance_km / (CRUISE_SPEED_KM_S * SECONDS_PER_DAY)
}

/// Non-decreasing in `swarm_size`, non-increasing in `delta_v_km_s`, within `[0.1, 1.0]`.
pub fn success_probability(swarm_size: u32, delta_v_km_s: f64) -> f64 {
    let extra_craft = f64::from(swarm_size.saturating_sub(1));
    let bonus = (extra_craft * SWARM_BONUS_PER_CRAFT).min(MAX_SWARM_BONUS);
    let excess = delta_v_km_s - DELTA_V_PENALTY_THRESHOLD_KM_S;
    let penalty = (excess * DELTA_V_PENALTY_PER_KM_S).max(0.0);
    (BASE_SUCCESS_PROBABILITY + bonus - penalty).clamp(0.1, 1.0)
}

/// One product per pair of interceptors, at most six.
pub fn data_products(swarm_size: u32) -> Vec<String> {
    let count = ((swarm_size / 2) as usize).min(DATA_PRODUCTS.len());
    DATA_PRODUCTS[..count].iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn apophis_distance_with_ion_swarm() {
        let metrics =
            InterceptMetrics::compute(&[0.0; 3], &[1.5e8, 0.0, 0.0], 5, PropulsionType::Ion);
        assert!((metrics.delta_v_km_s - 0.45).abs() < 1e-12);
        assert!((metrics.flight_time_days - 34.722_222).abs() < 1e-5);
        assert!((metrics.success_probability - 0.89).abs() < 1e-12);
        assert!((metrics.fuel_consumed_percent - 225.0).abs() < 1e-9);
        assert!(metrics.success);
        assert_eq!(data_products(5).len(), 2);
    }

    #[test]
    fn base_delta_v_is_capped_before_the_propulsion_factor() {
        assert_eq!(required_delta_v(5.0e9, PropulsionType::Chemical), 15.0);
        assert!((required_delta_v(5.0e9, PropulsionType::Nuclear) - 1.5).abs() < 1e-12);
        assert_eq!(required_delta_v(2.0e8, PropulsionType::Unknown), 2.0);
    }

    #[test]
    fn probability_moves_the_right_way() {
        let mut previous = 0.0;
        for swarm in 1..=20 {
            let p = success_probability(swarm, 3.0);
            assert!(p >= previous);
            previous = p;
        }
        let mut previous = 1.0;
        for tenth in 0..200 {
            let p = success_probability(4, f64::from(tenth) / 10.0);
            assert!(p <= previous);
            previous = p;
        }
        assert_eq!(success_probability(1, 100.0), 0.1);
        assert!(success_probability(1, 10.0) < 0.6 + 1e-12);
    }

    #[test]
    fn data_products_cap_at_six() {
        assert!(data_products(1).is_empty());
        assert_eq!(data_products(4), vec!["High-resolution imagery", "Spectrographic analysis"]);
        assert_eq!(data_products(40).len(), 6);
    }
}
