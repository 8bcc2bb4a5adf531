//! Ordered multi-source trajectory retrieval.
//!
//! Providers are tried one at a time in priority order. The first provider
//! that yields a valid trajectory wins; every earlier failure is kept so a
//! total failure can report the complete ordered reason list. Nothing is ever
//! synthesized in place of provider data.

mod fanout;
mod info;
mod slot;

pub use fanout::{Health, SearchResults, StatusReport};
pub use info::{ObjectInfo, SourcedElements};
pub use slot::SourceSlot;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use intercept_core::{StateVector, StepSize, TimeGrid, Trajectory, TrajectoryError};
use intercept_orbits::{PropagationError, Propagator};
use intercept_sources::{Provision, SourceError};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;
use tokio::time::Instant;

use self::slot::CallError;

pub(crate) const DEADLINE_REASON: &str = "request deadline exceeded";

/// Largest offset between a provider epoch and the grid epoch it stands for (under 0.1 s).
const GRID_MATCH_TOLERANCE_DAYS: f64 = 1e-6;

/// Failure category recorded for one provider attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    Unavailable,
    RateLimited,
    AuthRequired,
    PropagationDivergence,
    InvalidRequest,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureKind::NotFound => "not found",
            FailureKind::Unavailable => "unavailable",
            FailureKind::RateLimited => "rate limited",
            FailureKind::AuthRequired => "authentication required",
            FailureKind::PropagationDivergence => "propagation diverged",
            FailureKind::InvalidRequest => "invalid request",
        })
    }
}

/// What happened when one provider was asked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderOutcome {
    pub source: String,
    pub kind: FailureKind,
    pub reason: String,
}

impl ProviderOutcome {
    pub(crate) fn from_source_error(source: &str, err: &SourceError) -> Self {
        let kind = match err {
            SourceError::NotFound(_) => FailureKind::NotFound,
            SourceError::Unavailable(_) => FailureKind::Unavailable,
            SourceError::RateLimited { .. } => FailureKind::RateLimited,
            SourceError::AuthRequired(_) => FailureKind::AuthRequired,
        };
        Self {
            source: source.to_string(),
            kind,
            reason: err.to_string(),
        }
    }

    pub(crate) fn from_call_error(source: &str, err: &CallError) -> Self {
        match err {
            CallError::Source(err) => Self::from_source_error(source, err),
            CallError::DeadlineExceeded => Self::deadline(source),
        }
    }

    pub(crate) fn deadline(source: &str) -> Self {
        Self {
            source: source.to_string(),
            kind: FailureKind::Unavailable,
            reason: DEADLINE_REASON.to_string(),
        }
    }

    /// Outcome for a slot that has no provider behind it.
    pub(crate) fn disabled(slot: &SourceSlot) -> Self {
        let err = slot.disabled().cloned().unwrap_or_else(|| {
            SourceError::Unavailable(format!("{} is not configured", slot.id()))
        });
        Self::from_source_error(slot.id(), &err)
    }

    fn from_propagation_error(source: &str, err: &PropagationError) -> Self {
        let kind = match err {
            PropagationError::InvalidRequest(_) => FailureKind::InvalidRequest,
            PropagationError::Divergence { .. } => FailureKind::PropagationDivergence,
        };
        Self {
            source: source.to_string(),
            kind,
            reason: err.to_string(),
        }
    }
}

impl fmt::Display for ProviderOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.source, self.kind, self.reason)
    }
}

/// Every provider failed; one entry per provider, in priority order.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("no source could supply `{object}`: {}", summarize(.failures))]
pub struct AggregateFailure {
    pub object: String,
    pub failures: Vec<ProviderOutcome>,
    pub deadline_exceeded: bool,
}

fn summarize(failures: &[ProviderOutcome]) -> String {
    if failures.is_empty() {
        return "no sources configured".to_string();
    }
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors surfaced by coordinator operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinatorError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    SourceExhausted(AggregateFailure),
}

/// A sourced trajectory for one object.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryReport {
    pub object_name: String,
    pub sources_used: Vec<String>,
    pub trajectory: Trajectory,
    /// Providers that failed before the winning one answered.
    pub skipped: Vec<ProviderOutcome>,
}

impl TrajectoryReport {
    pub fn total_points(&self) -> usize {
        self.trajectory.len()
    }
}

impl Serialize for TrajectoryReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TrajectoryReport", 4)?;
        state.serialize_field("object_name", &self.object_name)?;
        state.serialize_field("total_points", &self.total_points())?;
        state.serialize_field("sources_used", &self.sources_used)?;
        state.serialize_field("trajectory_data", &self.trajectory.points())?;
        state.end()
    }
}

/// Runs providers in priority order and applies the no-fabrication rule.
#[derive(Debug, Clone)]
pub struct DataCoordinator {
    slots: Vec<Arc<SourceSlot>>,
    propagator: Propagator,
    request_deadline: Duration,
    search_parallelism: usize,
    search_deadline: Duration,
}

impl DataCoordinator {
    /// Slots are tried in the order given.
    pub fn new(slots: Vec<SourceSlot>) -> Self {
        Self {
            slots: slots.into_iter().map(Arc::new).collect(),
            propagator: Propagator::default(),
            request_deadline: Duration::from_secs(120),
            search_parallelism: 3,
            search_deadline: Duration::from_secs(30),
        }
    }

    pub fn with_request_deadline(mut self, deadline: Duration) -> Self {
        self.request_deadline = deadline;
        self
    }

    pub fn with_search_parallelism(mut self, parallelism: usize) -> Self {
        self.search_parallelism = parallelism.max(1);
        self
    }

    pub fn with_search_deadline(mut self, deadline: Duration) -> Self {
        self.search_deadline = deadline;
        self
    }

    pub fn with_propagator(mut self, propagator: Propagator) -> Self {
        self.propagator = propagator;
        self
    }

    /// Provider ids in priority order.
    pub fn source_ids(&self) -> Vec<&str> {
        self.slots.iter().map(|slot| slot.id()).collect()
    }

    pub(crate) fn slots(&self) -> &[Arc<SourceSlot>] {
        &self.slots
    }

    /// Trajectory for `object` sampled from `start_jd` to `end_jd` every `step`.
    pub async fn fetch_trajectory(
        &self,
        object: &str,
        start_jd: f64,
        end_jd: f64,
        step: StepSize,
    ) -> Result<TrajectoryReport, CoordinatorError> {
        let grid = TimeGrid::new(start_jd, end_jd, step)
            .map_err(|err| CoordinatorError::InvalidRequest(err.to_string()))?;
        self.fetch_on_grid(object, &grid).await
    }

    /// Trajectory for `object` on an already validated grid.
    pub async fn fetch_on_grid(
        &self,
        object: &str,
        grid: &TimeGrid,
    ) -> Result<TrajectoryReport, CoordinatorError> {
        let object = object.trim();
        if object.is_empty() {
            return Err(CoordinatorError::InvalidRequest(
                "object designation must not be empty".to_string(),
            ));
        }
        let deadline = Instant::now() + self.request_deadline;
        let mut failures = Vec::new();
        let mut deadline_exceeded = false;

        for slot in &self.slots {
            if deadline_exceeded || Instant::now() >= deadline {
                deadline_exceeded = true;
                failures.push(ProviderOutcome::deadline(slot.id()));
                continue;
            }
            match self.try_slot(slot, object, grid, deadline).await {
                Ok(trajectory) => {
                    tracing::info!(
                        object,
                        source = slot.id(),
                        samples = trajectory.len(),
                        skipped = failures.len(),
                        "trajectory retrieved"
                    );
                    return Ok(TrajectoryReport {
                        object_name: object.to_string(),
                        sources_used: vec![slot.id().to_string()],
                        trajectory,
                        skipped: failures,
                    });
                }
                Err(outcome) => {
                    tracing::warn!(
                        object,
                        source = slot.id(),
                        kind = %outcome.kind,
                        reason = %outcome.reason,
                        "source failed"
                    );
                    if outcome.reason == DEADLINE_REASON {
                        deadline_exceeded = true;
                    }
                    failures.push(outcome);
                }
            }
        }

        Err(CoordinatorError::SourceExhausted(AggregateFailure {
            object: object.to_string(),
            failures,
            deadline_exceeded,
        }))
    }

    async fn try_slot(
        &self,
        slot: &SourceSlot,
        object: &str,
        grid: &TimeGrid,
        deadline: Instant,
    ) -> Result<Trajectory, ProviderOutcome> {
        let id = slot.id();
        match slot.provision() {
            Some(Provision::Ephemeris) => {
                let samples = slot
                    .call(deadline, |source| source.fetch_trajectory(object, grid))
                    .await
                    .map_err(|err| ProviderOutcome::from_call_error(id, &err))?;
                let samples = samples
                    .into_iter()
                    .map(|mut sample| {
                        sample.source = id.to_string();
                        sample
                    })
                    .collect();
                let malformed = |detail: String| {
                    ProviderOutcome::from_source_error(id, &SourceError::Unavailable(detail))
                };
                let trajectory = Trajectory::new(samples).map_err(|err| match err {
                    TrajectoryError::Empty => {
                        let detail = format!("{id} returned no samples for `{object}`");
                        ProviderOutcome::from_source_error(id, &SourceError::NotFound(detail))
                    }
                    other => malformed(format!("malformed ephemeris: {other}")),
                })?;
                let mut samples = trajectory.into_samples();
                snap_to_grid(&mut samples, grid).map_err(malformed)?;
                Trajectory::new(samples)
                    .map_err(|err| malformed(format!("malformed ephemeris: {err}")))
            }
            Some(Provision::Elements) => {
                let elements = slot
                    .call(deadline, |source| source.fetch_elements(object))
                    .await
                    .map_err(|err| ProviderOutcome::from_call_error(id, &err))?;
                tracing::debug!(object, source = id, ?elements, "propagating elements");
                self.propagator
                    .propagate(&elements, grid, id)
                    .map_err(|err| ProviderOutcome::from_propagation_error(id, &err))
            }
            None => Err(ProviderOutcome::disabled(slot)),
        }
    }
}

/// Require one sample per grid epoch and pin each sample to its grid epoch.
fn snap_to_grid(samples: &mut [StateVector], grid: &TimeGrid) -> Result<(), String> {
    let expected = grid.len();
    if samples.len() != expected {
        return Err(format!(
            "ephemeris does not match requested grid: expected {expected} samples, got {}",
            samples.len()
        ));
    }
    for (sample, epoch) in samples.iter_mut().zip(grid.epochs()) {
        let offset = (sample.epoch_jd - epoch).abs();
        if offset.is_nan() || offset > GRID_MATCH_TOLERANCE_DAYS {
            return Err(format!(
                "ephemeris does not match requested grid: \
                 sample at JD {} where JD {epoch} was requested",
                sample.epoch_jd
            ));
        }
        sample.epoch_jd = epoch;
    }
    Ok(())
}
