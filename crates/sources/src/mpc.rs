//! Minor Planet Center client.
//!
//! Returns heliocentric classical elements (AU, degrees) which the caller
//! propagates. Comets published with perihelion distance and time instead of
//! `a` and `M` are converted here.

use std::time::Duration;

use intercept_core::constants::SECONDS_PER_DAY;
use intercept_core::units::km_to_au;
use intercept_orbits::OrbitalElements;
use serde::Deserialize;

use crate::decode::{lenient_epoch, lenient_f64};
use crate::error::SourceError;
use crate::http::{build_client, check_response};
use crate::{CelestialObject, EphemerisSource, ObjectType, Provision, SourceFuture, type_matches};

pub const DEFAULT_BASE_URL: &str = "https://www.minorplanetcenter.net/web_service";
pub const SOURCE_ID: &str = "mpc";

/// One orbit record; providers mix JSON numbers and numeric strings.
#[derive(Debug, Default, Deserialize)]
struct MpcOrbit {
    #[serde(default, deserialize_with = "lenient_f64")]
    a: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    q: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    e: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    i: Option<f64>,
    #[serde(rename = "Om", alias = "node", default, deserialize_with = "lenient_f64")]
    node: Option<f64>,
    #[serde(rename = "w", alias = "peri", default, deserialize_with = "lenient_f64")]
    peri: Option<f64>,
    #[serde(rename = "M", alias = "mean_anomaly", default, deserialize_with = "lenient_f64")]
    mean_anomaly: Option<f64>,
    #[serde(rename = "Tp", alias = "tp", default, deserialize_with = "lenient_epoch")]
    perihelion_jd: Option<f64>,
    #[serde(alias = "epoch_jd", default, deserialize_with = "lenient_epoch")]
    epoch: Option<f64>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    objects: Vec<SearchEntry>,
}

#[derive(Deserialize)]
struct SearchEntry {
    #[serde(default)]
    designation: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    object_type: Option<String>,
}

/// Adapter for the Minor Planet Center web service.
pub struct MpcSource {
    http: reqwest::Client,
    base_url: String,
}

impl MpcSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        Ok(Self {
            http: build_client(timeout, false)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn orbital_elements(&self, object: &str) -> Result<OrbitalElements, SourceError> {
        let url = format!(
            "{}/orbital_elements?designation={}&format=json",
            self.base_url,
            urlencoding::encode(object)
        );
        tracing::debug!(object, "mpc: orbital elements request");
        let resp = self.http.get(&url).send().await?;
        let resp = check_response(SOURCE_ID, resp).await?;
        let records: Vec<MpcOrbit> = resp.json().await?;
        let record = records
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::NotFound(format!("mpc has no orbit for `{object}`")))?;
        to_elements(record)
    }

    async fn search_objects(
        &self,
        query: &str,
        types: &[ObjectType],
    ) -> Result<Vec<CelestialObject>, SourceError> {
        let url = format!(
            "{}/search_objects?query={}&limit=50&format=json",
            self.base_url,
            urlencoding::encode(query)
        );
        let resp = self.http.get(&url).send().await?;
        let resp = check_response(SOURCE_ID, resp).await?;
        let body: SearchResponse = resp.json().await?;
        Ok(search_to_objects(body, types))
    }

    async fn ping(&self) -> Result<(), SourceError> {
        let url = format!("{}/orbital_elements?designation=1&format=json", self.base_url);
        let resp = self.http.get(&url).send().await?;
        check_response(SOURCE_ID, resp).await.map(|_| ())
    }
}

impl EphemerisSource for MpcSource {
    fn id(&self) -> &str {
        SOURCE_ID
    }

    fn provision(&self) -> Provision {
        Provision::Elements
    }

    fn fetch_elements<'a>(&'a self, object: &'a str) -> SourceFuture<'a, OrbitalElements> {
        Box::pin(self.orbital_elements(object))
    }

    fn search<'a>(
        &'a self,
        query: &'a str,
        types: &'a [ObjectType],
    ) -> SourceFuture<'a, Vec<CelestialObject>> {
        Box::pin(self.search_objects(query, types))
    }

    fn health_check(&self) -> SourceFuture<'_, ()> {
        Box::pin(self.ping())
    }
}

fn to_elements(record: MpcOrbit) -> Result<OrbitalElements, SourceError> {
    let missing = |field: &str| SourceError::malformed(SOURCE_ID, format!("missing `{field}`"));
    let e = record.e.ok_or_else(|| missing("e"))?;
    let epoch = record.epoch.ok_or_else(|| missing("epoch"))?;
    let a_au = match (record.a, record.q) {
        (Some(a), _) => a,
        (None, Some(q)) => q / (1.0 - e),
        (None, None) => return Err(missing("a or q")),
    };
    let mut elements = OrbitalElements::from_au_degrees(
        a_au,
        e,
        record.i.ok_or_else(|| missing("i"))?,
        record.node.ok_or_else(|| missing("Om"))?,
        record.peri.ok_or_else(|| missing("w"))?,
        0.0,
        epoch,
    );
    elements.mean_anomaly_rad = match (record.mean_anomaly, record.perihelion_jd) {
        (Some(m_deg), _) => m_deg.to_radians(),
        (None, Some(tp)) => elements.mean_motion() * (epoch - tp) * SECONDS_PER_DAY,
        (None, None) => return Err(missing("M or Tp")),
    };
    tracing::trace!(a_au = km_to_au(elements.semi_major_axis_km), e, "mpc: elements decoded");
    Ok(elements)
}

fn search_to_objects(body: SearchResponse, types: &[ObjectType]) -> Vec<CelestialObject> {
    body.objects
        .into_iter()
        .filter_map(|entry| {
            let designation = entry.designation.filter(|d| !d.is_empty()).or(entry.name)?;
            let object_type = entry
                .object_type
                .as_deref()
                .and_then(|kind| kind.parse().ok())
                .unwrap_or(ObjectType::Unknown);
            type_matches(types, object_type).then(|| CelestialObject {
                designation,
                object_type,
                source_hints: vec![SOURCE_ID.to_string()],
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use intercept_core::constants::AU_KM;
    use pretty_assertions::assert_eq;

    const CERES: &str = include_str!("../tests/fixtures/mpc_ceres.json");
    const COMET: &str = include_str!("../tests/fixtures/mpc_comet_q_tp.json");
    const SEARCH: &str = include_str!("../tests/fixtures/mpc_search.json");

    #[test]
    fn decode_asteroid_elements() {
        let records: Vec<MpcOrbit> = serde_json::from_str(CERES).unwrap();
        let elements = to_elements(records.into_iter().next().unwrap()).unwrap();
        assert!((elements.semi_major_axis_km / AU_KM - 2.7666).abs() < 1e-9);
        assert_eq!(elements.eccentricity, 0.0789);
        assert!((elements.inclination_rad.to_degrees() - 10.5868).abs() < 1e-9);
        assert!((elements.mean_anomaly_rad.to_degrees() - 145.8927).abs() < 1e-9);
        assert_eq!(elements.epoch_jd, 2_460_600.5);
    }

    #[test]
    fn comet_without_a_derives_it_from_q() {
        let records: Vec<MpcOrbit> = serde_json::from_str(COMET).unwrap();
        let elements = to_elements(records.into_iter().next().unwrap()).unwrap();
        let expected_a_au = 0.5 / (1.0 - 0.8);
        assert!((elements.semi_major_axis_km / AU_KM - expected_a_au).abs() < 1e-9);
        assert!(elements.mean_anomaly_rad > 0.0);
        assert_eq!(elements.epoch_jd, 2_460_310.5);
    }

    #[test]
    fn missing_eccentricity_is_malformed() {
        let err = to_elements(MpcOrbit {
            a: Some(2.0),
            ..MpcOrbit::default()
        })
        .unwrap_err();
        assert!(matches!(err, SourceError::Unavailable(msg) if msg.contains("`e`")));
    }

    #[test]
    fn search_results_keep_designation_and_type() {
        let body: SearchResponse = serde_json::from_str(SEARCH).unwrap();
        let found = search_to_objects(body, &[]);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].designation, "99942");
        assert_eq!(found[0].object_type, ObjectType::Asteroid);
        assert_eq!(found[1].designation, "Apophis-comet-like");
        assert_eq!(found[1].object_type, ObjectType::Unknown);
    }
}
