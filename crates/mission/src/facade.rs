//! Re-exported APIs and configuration-driven constructors.

use std::sync::Arc;

use intercept_config::{AppConfig, ConfigError, SourceConfig, SourceKind};
use intercept_sources::{
    Credentials, EphemerisSource, HorizonsSource, MpcSource, RetryPolicy, SourceError,
    SpaceTrackSource, TokenBucket,
};

pub use crate::coordinator::{
    AggregateFailure, CoordinatorError, DataCoordinator, FailureKind, Health, ObjectInfo,
    ProviderOutcome, SearchResults, SourceSlot, SourcedElements, StatusReport, TrajectoryReport,
};
pub use crate::mission::arc::{ArcPoint, LinearArc, TransferArc};
pub use crate::mission::{
    MissionFailure, MissionPhase, MissionRequest, MissionResult, MissionSimulator,
};
pub use intercept_propulsion::{PropulsionType, RoleSplit};

impl DataCoordinator {
    /// Build the provider chain in `coordinator.priority` order.
    ///
    /// Providers switched off with `enabled = false` are left out. A provider
    /// that cannot be constructed (missing credentials, bad client setup) keeps
    /// its place in the chain and reports the reason whenever it is asked.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let mut slots = Vec::new();
        for kind in config.coordinator.providers()? {
            let source_config = config.sources.get(kind);
            if !source_config.enabled {
                tracing::info!(source = %kind, "provider disabled in configuration");
                continue;
            }
            slots.push(build_slot(kind, source_config));
        }
        Ok(DataCoordinator::new(slots)
            .with_request_deadline(config.coordinator.request_deadline())
            .with_search_parallelism(config.coordinator.search_parallelism)
            .with_search_deadline(config.coordinator.search_deadline()))
    }
}

impl MissionSimulator {
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(MissionSimulator::new(
            DataCoordinator::from_config(config)?,
            &config.mission,
        ))
    }
}

/// One slot wired with the provider's limiter, retry policy, and timeout.
pub fn build_slot(kind: SourceKind, config: &SourceConfig) -> SourceSlot {
    let slot = match build_source(kind, config) {
        Ok(source) => SourceSlot::new(source),
        Err(err) => {
            tracing::warn!(source = %kind, %err, "provider unavailable for this run");
            return SourceSlot::unavailable(kind.as_str(), err);
        }
    };
    let limiter = TokenBucket::new(
        config.rate_limit.capacity,
        config.rate_limit.refill_per_second,
        config.rate_limit.max_wait(),
    );
    slot.with_limiter(Arc::new(limiter))
        .with_retry(RetryPolicy {
            retry_count: config.retry_count,
            base_backoff: config.backoff(),
            max_backoff: config.max_backoff(),
        })
        .with_timeout(config.timeout())
}

fn build_source(
    kind: SourceKind,
    config: &SourceConfig,
) -> Result<Arc<dyn EphemerisSource>, SourceError> {
    let source: Arc<dyn EphemerisSource> = match kind {
        SourceKind::Horizons => Arc::new(HorizonsSource::new(&config.base_url, config.timeout())?),
        SourceKind::Mpc => Arc::new(MpcSource::new(&config.base_url, config.timeout())?),
        SourceKind::SpaceTrack => {
            let credentials = config.credentials().map(|(username, password)| Credentials {
                username: username.to_string(),
                password: password.to_string(),
            });
            Arc::new(SpaceTrackSource::new(
                &config.base_url,
                config.timeout(),
                credentials,
            )?)
        }
    };
    Ok(source)
}
