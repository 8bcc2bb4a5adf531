//! Per-object lookup: catalogue entries and element sets from every provider.

use intercept_orbits::{CentralBody, OrbitalElements};
use intercept_sources::{CelestialObject, ObjectType, Provision, SourceError};
use serde::Serialize;
use tokio::time::Instant;

use super::slot::SourceSlot;
use super::{
    AggregateFailure, CoordinatorError, DEADLINE_REASON, DataCoordinator, ProviderOutcome,
};

/// An element set and the provider that supplied it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourcedElements {
    pub source: String,
    pub elements: OrbitalElements,
}

/// What the configured providers know about one object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectInfo {
    /// Catalogue designation from the first provider that listed the object.
    pub designation: String,
    pub object_type: ObjectType,
    /// Providers that recognised the object, in priority order.
    pub sources: Vec<String>,
    pub elements: Vec<SourcedElements>,
    /// Providers that did not recognise or could not answer.
    pub failures: Vec<ProviderOutcome>,
    pub deadline_exceeded: bool,
}

impl ObjectInfo {
    fn refine_type(&mut self, hint: ObjectType) {
        if self.object_type == ObjectType::Unknown {
            self.object_type = hint;
        }
    }
}

enum Answer {
    Elements(OrbitalElements),
    Catalogued(CelestialObject),
}

impl DataCoordinator {
    /// Ask every provider, in priority order, what it knows about `object`.
    ///
    /// Element providers answer with their latest element set, ephemeris
    /// providers through their catalogue search. Fails with
    /// [`CoordinatorError::SourceExhausted`] when nobody recognises the object.
    pub async fn object_info(&self, object: &str) -> Result<ObjectInfo, CoordinatorError> {
        let object = object.trim();
        if object.is_empty() {
            return Err(CoordinatorError::InvalidRequest(
                "object designation must not be empty".to_string(),
            ));
        }
        let deadline = Instant::now() + self.request_deadline;
        let mut info = ObjectInfo {
            designation: object.to_string(),
            object_type: ObjectType::Unknown,
            sources: Vec::new(),
            elements: Vec::new(),
            failures: Vec::new(),
            deadline_exceeded: false,
        };
        let mut catalogued = false;

        for slot in self.slots() {
            let id = slot.id();
            if info.deadline_exceeded || Instant::now() >= deadline {
                info.deadline_exceeded = true;
                info.failures.push(ProviderOutcome::deadline(id));
                continue;
            }
            match describe(slot, object, deadline).await {
                Ok(Answer::Elements(elements)) => {
                    if elements.central_body == CentralBody::Earth {
                        info.refine_type(ObjectType::Satellite);
                    }
                    info.sources.push(id.to_string());
                    info.elements.push(SourcedElements {
                        source: id.to_string(),
                        elements,
                    });
                }
                Ok(Answer::Catalogued(hit)) => {
                    if !catalogued {
                        info.designation = hit.designation;
                        catalogued = true;
                    }
                    info.refine_type(hit.object_type);
                    info.sources.push(id.to_string());
                }
                Err(outcome) => {
                    tracing::debug!(
                        object,
                        source = id,
                        reason = %outcome.reason,
                        "no object info"
                    );
                    if outcome.reason == DEADLINE_REASON {
                        info.deadline_exceeded = true;
                    }
                    info.failures.push(outcome);
                }
            }
        }

        if info.sources.is_empty() {
            return Err(CoordinatorError::SourceExhausted(AggregateFailure {
                object: object.to_string(),
                failures: info.failures,
                deadline_exceeded: info.deadline_exceeded,
            }));
        }
        tracing::info!(
            object,
            designation = %info.designation,
            object_type = %info.object_type,
            sources = ?info.sources,
            "object info assembled"
        );
        Ok(info)
    }
}

async fn describe(
    slot: &SourceSlot,
    object: &str,
    deadline: Instant,
) -> Result<Answer, ProviderOutcome> {
    let id = slot.id();
    match slot.provision() {
        Some(Provision::Elements) => slot
            .call(deadline, |source| source.fetch_elements(object))
            .await
            .map(Answer::Elements)
            .map_err(|err| ProviderOutcome::from_call_error(id, &err)),
        Some(Provision::Ephemeris) => {
            let hits = slot
                .call(deadline, |source| source.search(object, &[]))
                .await
                .map_err(|err| ProviderOutcome::from_call_error(id, &err))?;
            pick_hit(object, hits).map(Answer::Catalogued).ok_or_else(|| {
                let detail = format!("{id} has no catalogue entry for `{object}`");
                ProviderOutcome::from_source_error(id, &SourceError::NotFound(detail))
            })
        }
        None => Err(ProviderOutcome::disabled(slot)),
    }
}

/// A lone hit, otherwise the one whose designation matches exactly.
fn pick_hit(object: &str, hits: Vec<CelestialObject>) -> Option<CelestialObject> {
    if hits.len() == 1 {
        return hits.into_iter().next();
    }
    hits.into_iter().find(|hit| hit.designation.eq_ignore_ascii_case(object))
}
