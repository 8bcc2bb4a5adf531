mod support;

use intercept_planner::config::MissionConfig;
use intercept_planner::mission::{
    DataCoordinator, FailureKind, MissionFailure, MissionRequest, MissionSimulator,
};
use intercept_planner::propulsion::{PropulsionType, RoleSplit};
use intercept_planner::sources::SourceError;
use pretty_assertions::assert_eq;

use support::{Behaviour, ScriptedSource, slots, state};

fn simulator_with(sources: Vec<ScriptedSource>) -> MissionSimulator {
    simulator_with_config(sources, &MissionConfig::default())
}

fn simulator_with_config(sources: Vec<ScriptedSource>, config: &MissionConfig) -> MissionSimulator {
    let (slots, _handles) = slots(sources);
    MissionSimulator::new(DataCoordinator::new(slots), config)
}

fn request(target: &str, swarm_size: u32, propulsion_type: PropulsionType) -> MissionRequest {
    MissionRequest {
        target_object: target.to_string(),
        intercept_date: "2029-04-13".to_string(),
        swarm_size,
        propulsion_type,
        role_split: RoleSplit::Balanced,
    }
}

#[tokio::test]
async fn apophis_swarm_with_ion_propulsion() {
    let simulator = simulator_with(vec![
        ScriptedSource::failing("A", SourceError::Unavailable("maintenance".into())),
        ScriptedSource::new("B", Behaviour::Fixed([1.5e8, 0.0, 0.0])),
    ]);

    let result = simulator.simulate(&request("Apophis", 5, PropulsionType::Ion)).await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.delta_v_required_km_s, 0.45);
    assert_eq!(result.flight_time_days, 34.7);
    assert_eq!(result.success_probability, 0.89);
    assert_eq!(result.fuel_consumed_percent, 225.0);
    assert_eq!(
        result.data_captured,
        vec!["High-resolution imagery".to_string(), "Spectrographic analysis".to_string()]
    );
    assert_eq!(result.sources_used, vec!["B".to_string()]);
    assert_eq!(result.interceptor_trajectory.len(), 10);
    let first = result.interceptor_trajectory[0];
    let last = result.interceptor_trajectory[9];
    assert_eq!((first.x, first.t_days), (0.0, 0.0));
    assert!((last.x - 1.5e8).abs() < 1e-3);
    assert!((last.t_days - 34.7).abs() < 1e-9);

    let json = serde_json::to_value(&result).unwrap();
    assert!(json.get("error").is_none());
    assert_eq!(json["interceptor_trajectory"][9]["t_days"], last.t_days);
}

#[tokio::test]
async fn probability_rises_with_swarm_size_and_falls_with_distance() {
    let mut previous = 0.0;
    for swarm in 1..=12 {
        let target = Behaviour::Fixed([3.0e8, 0.0, 0.0]);
        let simulator = simulator_with(vec![ScriptedSource::new("A", target)]);
        let result = simulator
            .simulate(&request("Target", swarm, PropulsionType::Chemical))
            .await;
        assert!(result.success_probability >= previous);
        previous = result.success_probability;
    }

    let mut previous = 1.0;
    let mut previous_dv = 0.0;
    for distance in [1.0e8, 4.0e8, 6.0e8, 9.0e8, 1.2e9, 2.0e9] {
        let target = Behaviour::Fixed([0.0, distance, 0.0]);
        let simulator = simulator_with(vec![ScriptedSource::new("A", target)]);
        let result = simulator
            .simulate(&request("Target", 3, PropulsionType::Chemical))
            .await;
        assert!(result.delta_v_required_km_s >= previous_dv);
        assert!(result.success_probability <= previous);
        previous = result.success_probability;
        previous_dv = result.delta_v_required_km_s;
    }
}

#[tokio::test]
async fn unsuccessful_missions_carry_no_arc_or_data() {
    // 1.5e9 km with chemical propulsion needs 15 km/s: p = 0.85 - 0.5 = 0.35.
    let far = Behaviour::Fixed([1.5e9, 0.0, 0.0]);
    let simulator = simulator_with(vec![ScriptedSource::new("A", far)]);
    let result = simulator.simulate(&request("Far", 1, PropulsionType::Chemical)).await;
    assert!(!result.success);
    assert_eq!(result.success_probability, 0.35);
    assert!(result.error.is_none());
    assert!(result.data_captured.is_empty());
    assert!(result.interceptor_trajectory.is_empty());
    assert_eq!(result.sources_used, vec!["A".to_string()]);
}

#[tokio::test]
async fn exhausted_sources_surface_verbatim() {
    let simulator = simulator_with(vec![
        ScriptedSource::failing("A", SourceError::NotFound("unknown".into())),
        ScriptedSource::failing("B", SourceError::RateLimited { retry_after: None }),
    ]);

    let result = simulator.simulate(&request("Nowhere", 4, PropulsionType::Nuclear)).await;

    assert!(!result.success);
    assert!(result.sources_used.is_empty());
    assert!(result.interceptor_trajectory.is_empty());
    let Some(MissionFailure::SourceExhausted(aggregate)) = &result.error else {
        panic!("expected SourceExhausted, got {:?}", result.error);
    };
    let kinds: Vec<FailureKind> = aggregate.failures.iter().map(|f| f.kind).collect();
    assert_eq!(kinds, vec![FailureKind::NotFound, FailureKind::RateLimited]);

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["error"]["kind"], "source_exhausted");
    assert_eq!(json["error"]["failures"][1]["source"], "B");
    assert_eq!(json["error"]["failures"][1]["kind"], "rate_limited");
}

#[tokio::test]
async fn stale_ephemerides_never_reach_the_metrics() {
    let stale = vec![
        state(2_400_000.5, [1.0e8, 0.0, 0.0], "A"),
        state(2_400_001.5, [1.0e8, 0.0, 0.0], "A"),
    ];
    let simulator = simulator_with(vec![ScriptedSource::new("A", Behaviour::Samples(stale))]);

    let result = simulator.simulate(&request("Apophis", 5, PropulsionType::Ion)).await;

    assert!(!result.success);
    assert!(result.sources_used.is_empty());
    let Some(MissionFailure::SourceExhausted(aggregate)) = &result.error else {
        panic!("expected SourceExhausted, got {:?}", result.error);
    };
    assert_eq!(aggregate.failures[0].kind, FailureKind::Unavailable);
    assert!(aggregate.failures[0].reason.contains("does not match requested grid"));
}

#[tokio::test]
async fn target_position_is_interpolated_between_samples() {
    // Samples fall on x.5 epochs; the noon intercept sits halfway between two of them.
    let config = MissionConfig {
        window_padding_days: 1.5,
        ..MissionConfig::default()
    };
    let moving = Behaviour::Linear {
        at_jd: 2_462_239.5,
        position: [1.4e8, 0.0, 0.0],
        km_per_day: [2.0e7, 0.0, 0.0],
    };
    let simulator = simulator_with_config(vec![ScriptedSource::new("A", moving)], &config);
    let mut req = request("Mover", 2, PropulsionType::Chemical);
    req.intercept_date = "2029-04-13T12:00:00Z".to_string();

    let result = simulator.simulate(&req).await;

    assert!(result.success, "{:?}", result.error);
    // Halfway between 1.4e8 and 1.6e8 km.
    assert_eq!(result.delta_v_required_km_s, 1.5);
    assert_eq!(result.flight_time_days, 34.7);
}
