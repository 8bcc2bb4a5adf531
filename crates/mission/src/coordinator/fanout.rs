//! Parallel operations across providers or objects: search, batch fetch, status.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use intercept_core::StepSize;
use intercept_sources::{CelestialObject, ObjectType, RetryPolicy, type_matches};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

use super::slot::CallError;
use super::{
    AggregateFailure, CoordinatorError, DataCoordinator, FailureKind, ProviderOutcome,
    TrajectoryReport,
};

/// Merged search hits plus the providers that could not answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResults {
    pub objects: Vec<CelestialObject>,
    pub failures: Vec<ProviderOutcome>,
    pub deadline_exceeded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Up,
    Down,
}

/// Live per-provider health.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub api_version: String,
    pub per_source_health: BTreeMap<String, Health>,
    /// Always `true`: results only ever come from providers.
    pub real_data_only: bool,
}

impl StatusReport {
    pub fn all_up(&self) -> bool {
        self.per_source_health.values().all(|h| *h == Health::Up)
    }
}

impl DataCoordinator {
    /// Query every provider concurrently and merge hits by designation.
    ///
    /// Hits keep the priority order of the first provider that reported them.
    pub async fn search_objects(
        &self,
        query: &str,
        types: &[ObjectType],
    ) -> Result<SearchResults, CoordinatorError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CoordinatorError::InvalidRequest(
                "search query must not be empty".to_string(),
            ));
        }
        let deadline = Instant::now() + self.search_deadline;
        let semaphore = Arc::new(Semaphore::new(self.search_parallelism));
        let mut set = JoinSet::new();
        for (index, slot) in self.slots().iter().enumerate() {
            let slot = Arc::clone(slot);
            let semaphore = Arc::clone(&semaphore);
            let query = query.to_string();
            let types = types.to_vec();
            set.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let result = slot
                    .call(deadline, |source| source.search(&query, &types))
                    .await;
                (index, result)
            });
        }

        let (mut answers, deadline_exceeded) =
            collect_indexed(&mut set, deadline, self.slots().len()).await;

        let mut merged: Vec<CelestialObject> = Vec::new();
        let mut by_designation: HashMap<String, usize> = HashMap::new();
        let mut failures = Vec::new();
        for (slot, answer) in self.slots().iter().zip(answers.iter_mut()) {
            match answer.take() {
                Some(Ok(objects)) => {
                    tracing::debug!(source = slot.id(), hits = objects.len(), "search answered");
                    for object in objects {
                        merge_hit(&mut merged, &mut by_designation, object);
                    }
                }
                Some(Err(err)) => {
                    let outcome = ProviderOutcome::from_call_error(slot.id(), &err);
                    tracing::warn!(source = slot.id(), reason = %outcome.reason, "search failed");
                    failures.push(outcome);
                }
                None => failures.push(missing_outcome(slot.id(), deadline_exceeded)),
            }
        }
        merged.retain(|object| type_matches(types, object.object_type));
        tracing::info!(query, hits = merged.len(), failed = failures.len(), "search complete");
        Ok(SearchResults {
            objects: merged,
            failures,
            deadline_exceeded,
        })
    }

    /// Fetch several objects concurrently; results come back in input order.
    pub async fn fetch_many(
        &self,
        objects: &[String],
        start_jd: f64,
        end_jd: f64,
        step: StepSize,
    ) -> Vec<(String, Result<TrajectoryReport, CoordinatorError>)> {
        let semaphore = Arc::new(Semaphore::new(self.search_parallelism));
        let mut set = JoinSet::new();
        for (index, object) in objects.iter().enumerate() {
            let coordinator = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let object = object.clone();
            set.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let result = coordinator
                    .fetch_trajectory(&object, start_jd, end_jd, step)
                    .await;
                (index, result)
            });
        }

        let mut results: Vec<Option<Result<TrajectoryReport, CoordinatorError>>> =
            vec![None; objects.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = Some(result),
                Err(err) => tracing::warn!(%err, "trajectory task failed"),
            }
        }

        objects
            .iter()
            .zip(results)
            .map(|(object, result)| {
                let result = result.unwrap_or_else(|| {
                    Err(CoordinatorError::SourceExhausted(AggregateFailure {
                        object: object.clone(),
                        failures: self
                            .slots()
                            .iter()
                            .map(|slot| missing_outcome(slot.id(), false))
                            .collect(),
                        deadline_exceeded: false,
                    }))
                });
                (object.clone(), result)
            })
            .collect()
    }

    /// Check every provider once, without retries.
    pub async fn status(&self) -> StatusReport {
        let deadline = Instant::now() + self.search_deadline;
        let semaphore = Arc::new(Semaphore::new(self.search_parallelism));
        let mut set = JoinSet::new();
        for (index, slot) in self.slots().iter().enumerate() {
            let slot = Arc::clone(slot);
            let semaphore = Arc::clone(&semaphore);
            set.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let result = slot
                    .call_with(deadline, RetryPolicy::none(), |source| source.health_check())
                    .await;
                (index, result)
            });
        }

        let (answers, _) = collect_indexed(&mut set, deadline, self.slots().len()).await;
        let per_source_health = self
            .slots()
            .iter()
            .zip(answers)
            .map(|(slot, answer)| {
                let health = match answer {
                    Some(Ok(())) => Health::Up,
                    Some(Err(err)) => {
                        let outcome = ProviderOutcome::from_call_error(slot.id(), &err);
                        tracing::warn!(
                            source = slot.id(),
                            reason = %outcome.reason,
                            "health check failed"
                        );
                        Health::Down
                    }
                    None => Health::Down,
                };
                (slot.id().to_string(), health)
            })
            .collect();

        StatusReport {
            api_version: env!("CARGO_PKG_VERSION").to_string(),
            per_source_health,
            real_data_only: true,
        }
    }
}

type Indexed<T> = (usize, Result<T, CallError>);

/// Drain `set` until it is empty or `deadline` passes; stragglers are aborted.
async fn collect_indexed<T: Send + 'static>(
    set: &mut JoinSet<Indexed<T>>,
    deadline: Instant,
    len: usize,
) -> (Vec<Option<Result<T, CallError>>>, bool) {
    let mut answers: Vec<Option<Result<T, CallError>>> = (0..len).map(|_| None).collect();
    loop {
        match tokio::time::timeout_at(deadline, set.join_next()).await {
            Ok(Some(Ok((index, result)))) => answers[index] = Some(result),
            Ok(Some(Err(err))) => tracing::warn!(%err, "provider task failed"),
            Ok(None) => return (answers, false),
            Err(_) => {
                set.abort_all();
                tracing::warn!(pending = set.len(), "deadline reached, aborting provider tasks");
                return (answers, true);
            }
        }
    }
}

fn missing_outcome(source: &str, deadline_exceeded: bool) -> ProviderOutcome {
    if deadline_exceeded {
        ProviderOutcome::deadline(source)
    } else {
        ProviderOutcome {
            source: source.to_string(),
            kind: FailureKind::Unavailable,
            reason: "provider task did not complete".to_string(),
        }
    }
}

fn merge_hit(
    merged: &mut Vec<CelestialObject>,
    by_designation: &mut HashMap<String, usize>,
    object: CelestialObject,
) {
    let key = object.designation.trim().to_lowercase();
    match by_designation.get(&key) {
        Some(&index) => {
            let existing = &mut merged[index];
            for hint in object.source_hints {
                if !existing.source_hints.contains(&hint) {
                    existing.source_hints.push(hint);
                }
            }
            if existing.object_type == ObjectType::Unknown {
                existing.object_type = object.object_type;
            }
        }
        None => {
            by_designation.insert(key, merged.len());
            merged.push(object);
        }
    }
}
