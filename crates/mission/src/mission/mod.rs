//! Intercept mission simulation on top of coordinator-sourced target data.
//!
//! A request moves through a fixed sequence of phases:
//! `Requested → FetchingTargetData → (SourceExhausted | DataReady) →
//! ComputingIntercept → ResultReady`. Each transition is logged. Failures are
//! reported inside the [`MissionResult`] rather than as an `Err`, so callers
//! always get a serialisable outcome.

pub mod arc;
pub mod metrics;

use std::fmt;

use intercept_config::MissionConfig;
use intercept_core::time::{format_jd, parse_epoch};
use intercept_core::units::round_to;
use intercept_core::vector::Vector3;
use intercept_core::{StepSize, TimeGrid};
use intercept_propulsion::{PropulsionType, RoleSplit};
use serde::{Deserialize, Serialize};

use self::arc::{ArcPoint, LinearArc, TransferArc};
use self::metrics::{InterceptMetrics, data_products};
use crate::coordinator::{AggregateFailure, CoordinatorError, DataCoordinator};

/// Interceptor swarm mission against one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionRequest {
    pub target_object: String,
    /// Calendar date, timestamp, or Julian Date.
    pub intercept_date: String,
    pub swarm_size: u32,
    #[serde(default)]
    pub propulsion_type: PropulsionType,
    #[serde(default)]
    pub role_split: RoleSplit,
}

/// Why a mission produced no intercept.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MissionFailure {
    InvalidRequest { message: String },
    SourceExhausted(AggregateFailure),
}

impl fmt::Display for MissionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissionFailure::InvalidRequest { message } => write!(f, "invalid request: {message}"),
            MissionFailure::SourceExhausted(aggregate) => write!(f, "{aggregate}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissionResult {
    pub success: bool,
    pub target_object: String,
    pub intercept_date: String,
    pub delta_v_required_km_s: f64,
    pub flight_time_days: f64,
    pub fuel_consumed_percent: f64,
    pub success_probability: f64,
    pub data_captured: Vec<String>,
    pub interceptor_trajectory: Vec<ArcPoint>,
    pub sources_used: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<MissionFailure>,
}

impl MissionResult {
    fn failed(request: &MissionRequest, failure: MissionFailure) -> Self {
        Self {
            success: false,
            target_object: request.target_object.clone(),
            intercept_date: request.intercept_date.clone(),
            delta_v_required_km_s: 0.0,
            flight_time_days: 0.0,
            fuel_consumed_percent: 0.0,
            success_probability: 0.0,
            data_captured: Vec::new(),
            interceptor_trajectory: Vec::new(),
            sources_used: Vec::new(),
            error: Some(failure),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionPhase {
    Requested,
    FetchingTargetData,
    SourceExhausted,
    DataReady,
    ComputingIntercept,
    ResultReady,
}

impl fmt::Display for MissionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MissionPhase::Requested => "requested",
            MissionPhase::FetchingTargetData => "fetching_target_data",
            MissionPhase::SourceExhausted => "source_exhausted",
            MissionPhase::DataReady => "data_ready",
            MissionPhase::ComputingIntercept => "computing_intercept",
            MissionPhase::ResultReady => "result_ready",
        })
    }
}

fn enter(target: &str, phase: MissionPhase) {
    tracing::debug!(target_object = target, %phase, "mission phase");
}

/// Turns mission requests into results using real target positions.
pub struct MissionSimulator {
    coordinator: DataCoordinator,
    origin_km: Vector3,
    window_padding_days: f64,
    step: StepSize,
    arc: Box<dyn TransferArc>,
}

impl MissionSimulator {
    pub fn new(coordinator: DataCoordinator, config: &MissionConfig) -> Self {
        Self {
            coordinator,
            origin_km: config.origin_position_km,
            window_padding_days: config.window_padding_days,
            step: config.step,
            arc: Box::new(LinearArc::new(config.arc_points)),
        }
    }

    pub fn with_arc(mut self, arc: Box<dyn TransferArc>) -> Self {
        self.arc = arc;
        self
    }

    pub fn coordinator(&self) -> &DataCoordinator {
        &self.coordinator
    }

    pub async fn simulate(&self, request: &MissionRequest) -> MissionResult {
        let target = request.target_object.trim();
        enter(target, MissionPhase::Requested);
        let (intercept_jd, grid) = match self.validate(request) {
            Ok(checked) => checked,
            Err(message) => {
                tracing::warn!(target_object = target, %message, "mission request rejected");
                return MissionResult::failed(request, MissionFailure::InvalidRequest { message });
            }
        };

        enter(target, MissionPhase::FetchingTargetData);
        let report = match self.coordinator.fetch_on_grid(target, &grid).await {
            Ok(report) => report,
            Err(CoordinatorError::InvalidRequest(message)) => {
                return MissionResult::failed(request, MissionFailure::InvalidRequest { message });
            }
            Err(CoordinatorError::SourceExhausted(aggregate)) => {
                enter(target, MissionPhase::SourceExhausted);
                tracing::warn!(target_object = target, %aggregate, "no target data");
                return MissionResult::failed(request, MissionFailure::SourceExhausted(aggregate));
            }
        };
        enter(target, MissionPhase::DataReady);

        let Some(target_km) = report.trajectory.position_at(intercept_jd) else {
            let message = format!(
                "intercept date {} lies outside the retrieved trajectory ({} to {})",
                format_jd(intercept_jd),
                format_jd(report.trajectory.first_epoch()),
                format_jd(report.trajectory.last_epoch()),
            );
            return MissionResult::failed(request, MissionFailure::InvalidRequest { message });
        };

        enter(target, MissionPhase::ComputingIntercept);
        let metrics = InterceptMetrics::compute(
            &self.origin_km,
            &target_km,
            request.swarm_size,
            request.propulsion_type,
        );
        let flight_time_days = round_to(metrics.flight_time_days, 1);
        let (data_captured, interceptor_trajectory) = if metrics.success {
            (
                data_products(request.swarm_size),
                self.arc.sample(&self.origin_km, &target_km, flight_time_days),
            )
        } else {
            (Vec::new(), Vec::new())
        };

        enter(target, MissionPhase::ResultReady);
        tracing::info!(
            target_object = target,
            success = metrics.success,
            delta_v_km_s = metrics.delta_v_km_s,
            distance_km = metrics.distance_km,
            arc = self.arc.name(),
            role_split = ?request.role_split,
            "mission simulated"
        );
        MissionResult {
            success: metrics.success,
            target_object: target.to_string(),
            intercept_date: request.intercept_date.clone(),
            delta_v_required_km_s: round_to(metrics.delta_v_km_s, 3),
            flight_time_days,
            fuel_consumed_percent: round_to(metrics.fuel_consumed_percent, 1),
            success_probability: round_to(metrics.success_probability, 2),
            data_captured,
            interceptor_trajectory,
            sources_used: report.sources_used,
            error: None,
        }
    }

    /// Checks done before any I/O; returns the intercept JD and the fetch grid.
    fn validate(&self, request: &MissionRequest) -> Result<(f64, TimeGrid), String> {
        if request.swarm_size == 0 {
            return Err("swarm_size must be at least 1".to_string());
        }
        if request.target_object.trim().is_empty() {
            return Err("target_object must not be empty".to_string());
        }
        let intercept_jd = parse_epoch(&request.intercept_date).map_err(|err| err.to_string())?;
        let step_days = self.step.as_days();
        let start = intercept_jd - self.window_padding_days;
        // Round the window up to whole steps so the intercept is always bracketed.
        let steps = (2.0 * self.window_padding_days / step_days).ceil();
        let end = start + steps * step_days;
        let grid = TimeGrid::new(start, end, self.step).map_err(|err| err.to_string())?;
        Ok((intercept_jd, grid))
    }
}
