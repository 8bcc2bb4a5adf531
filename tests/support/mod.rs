//! Scripted in-process providers for coordinator and simulator tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use intercept_planner::common::vector::Vector3;
use intercept_planner::common::{Frame, StateVector, TimeGrid};
use intercept_planner::mission::SourceSlot;
use intercept_planner::orbits::OrbitalElements;
use intercept_planner::sources::{
    CelestialObject, EphemerisSource, ObjectType, Provision, SourceError, SourceFuture,
};

/// What a scripted provider answers once its transient failures are used up.
#[derive(Debug, Clone)]
pub enum Behaviour {
    Fail(SourceError),
    /// Fixed heliocentric position on every grid epoch.
    Fixed(Vector3),
    /// Uniform motion: `position` at `at_jd`, moving `km_per_day` along each axis.
    Linear {
        at_jd: f64,
        position: Vector3,
        km_per_day: Vector3,
    },
    /// Exactly these samples, whatever grid was asked for.
    Samples(Vec<StateVector>),
    Elements(OrbitalElements),
}

pub struct ScriptedSource {
    id: String,
    provision: Provision,
    behaviour: Behaviour,
    hits: Vec<CelestialObject>,
    delay: Duration,
    transient_failures: AtomicUsize,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(id: &str, behaviour: Behaviour) -> Self {
        let provision = match behaviour {
            Behaviour::Elements(_) => Provision::Elements,
            _ => Provision::Ephemeris,
        };
        Self {
            id: id.to_string(),
            provision,
            behaviour,
            hits: Vec::new(),
            delay: Duration::ZERO,
            transient_failures: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(id: &str, err: SourceError) -> Self {
        Self::new(id, Behaviour::Fail(err))
    }

    /// Element provider that fails; exercised through `fetch_elements`.
    pub fn failing_elements(id: &str, err: SourceError) -> Self {
        let mut source = Self::failing(id, err);
        source.provision = Provision::Elements;
        source
    }

    pub fn with_hits(mut self, hits: Vec<CelestialObject>) -> Self {
        self.hits = hits;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Answer `Unavailable` to the first `count` calls.
    pub fn with_transient_failures(self, count: usize) -> Self {
        self.transient_failures.store(count, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn begin(&self) -> Result<(), SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let remaining = self.transient_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.transient_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(SourceError::Unavailable(format!("{} is warming up", self.id)));
        }
        if let Behaviour::Fail(err) = &self.behaviour {
            return Err(err.clone());
        }
        Ok(())
    }
}

impl EphemerisSource for ScriptedSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn provision(&self) -> Provision {
        self.provision
    }

    fn fetch_trajectory<'a>(
        &'a self,
        object: &'a str,
        grid: &'a TimeGrid,
    ) -> SourceFuture<'a, Vec<StateVector>> {
        Box::pin(async move {
            self.begin().await?;
            match &self.behaviour {
                Behaviour::Fixed(position) => Ok(grid
                    .epochs()
                    .map(|epoch_jd| state(epoch_jd, *position, &self.id))
                    .collect()),
                Behaviour::Linear {
                    at_jd,
                    position,
                    km_per_day,
                } => Ok(grid
                    .epochs()
                    .map(|epoch_jd| {
                        let days = epoch_jd - at_jd;
                        let moved = [0, 1, 2].map(|i| position[i] + km_per_day[i] * days);
                        state(epoch_jd, moved, &self.id)
                    })
                    .collect()),
                Behaviour::Samples(samples) => Ok(samples.clone()),
                _ => Err(SourceError::NotFound(format!(
                    "{} has no ephemeris for {object}",
                    self.id
                ))),
            }
        })
    }

    fn fetch_elements<'a>(&'a self, object: &'a str) -> SourceFuture<'a, OrbitalElements> {
        Box::pin(async move {
            self.begin().await?;
            match &self.behaviour {
                Behaviour::Elements(elements) => Ok(*elements),
                _ => Err(SourceError::NotFound(format!(
                    "{} has no elements for {object}",
                    self.id
                ))),
            }
        })
    }

    fn search<'a>(
        &'a self,
        _query: &'a str,
        types: &'a [ObjectType],
    ) -> SourceFuture<'a, Vec<CelestialObject>> {
        Box::pin(async move {
            self.begin().await?;
            Ok(self
                .hits
                .iter()
                .filter(|hit| types.is_empty() || types.contains(&hit.object_type))
                .cloned()
                .collect())
        })
    }

    fn health_check(&self) -> SourceFuture<'_, ()> {
        Box::pin(self.begin())
    }
}

pub fn state(epoch_jd: f64, position_km: Vector3, source: &str) -> StateVector {
    StateVector {
        epoch_jd,
        position_km,
        velocity_km_s: [0.0, 0.0, 0.0],
        frame: Frame::HeliocentricEclipticJ2000,
        source: source.to_string(),
    }
}

pub fn hit(designation: &str, object_type: ObjectType, source: &str) -> CelestialObject {
    CelestialObject {
        designation: designation.to_string(),
        object_type,
        source_hints: vec![source.to_string()],
    }
}

/// Slots in the given order plus handles for inspecting call counts.
pub fn slots(sources: Vec<ScriptedSource>) -> (Vec<SourceSlot>, Vec<Arc<ScriptedSource>>) {
    let handles: Vec<Arc<ScriptedSource>> = sources.into_iter().map(Arc::new).collect();
    let slots = handles
        .iter()
        .map(|source| SourceSlot::new(Arc::clone(source) as Arc<dyn EphemerisSource>))
        .collect();
    (slots, handles)
}

/// Ceres at epoch 2024-01-01 (JD 2460310.5) in AU and degrees.
pub fn ceres_elements() -> OrbitalElements {
    OrbitalElements::from_au_degrees(2.77, 0.0758, 10.6, 80.3, 73.6, 60.0, 2_460_310.5)
}
