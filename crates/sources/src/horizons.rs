//! JPL Horizons client.
//!
//! Ephemerides come from the `horizons.api` endpoint as heliocentric
//! (`CENTER='500@10'`), ecliptic J2000 state vectors in km and km/s, with
//! epochs in UT so they line up with the requested grid. Object search goes
//! through `horizons_lookup.api`.
//!
//! Designations are passed through as Horizons `COMMAND` strings, so small
//! bodies may need the Horizons suffix form (`'99942;'`, `'DES=2I;'`).

use std::time::Duration;

use intercept_core::{Frame, StateVector, TimeGrid};
use serde::Deserialize;

use crate::error::SourceError;
use crate::http::{build_client, check_response};
use crate::{CelestialObject, EphemerisSource, ObjectType, Provision, SourceFuture, type_matches};

pub const DEFAULT_BASE_URL: &str = "https://ssd.jpl.nasa.gov/api";
pub const SOURCE_ID: &str = "horizons";

const START_OF_ENTRIES: &str = "$$SOE";
const END_OF_ENTRIES: &str = "$$EOE";

#[derive(Deserialize)]
struct HorizonsResponse {
    result: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    result: Vec<LookupEntry>,
}

#[derive(Deserialize)]
struct LookupEntry {
    name: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    pdes: Option<String>,
}

/// Adapter for the JPL Horizons system.
pub struct HorizonsSource {
    http: reqwest::Client,
    base_url: String,
}

impl HorizonsSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        Ok(Self {
            http: build_client(timeout, false)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn query_vectors(
        &self,
        object: &str,
        grid: &TimeGrid,
    ) -> Result<Vec<StateVector>, SourceError> {
        let url = format!("{}/horizons.api", self.base_url);
        let params = [
            ("format", "json".to_string()),
            ("COMMAND", quoted(object)),
            ("OBJ_DATA", quoted("NO")),
            ("MAKE_EPHEM", quoted("YES")),
            ("EPHEM_TYPE", quoted("VECTORS")),
            ("CENTER", quoted("500@10")),
            ("REF_PLANE", quoted("ECLIPTIC")),
            ("REF_SYSTEM", quoted("J2000")),
            ("TIME_TYPE", quoted("UT")),
            ("OUT_UNITS", quoted("KM-S")),
            ("VEC_TABLE", quoted("2")),
            ("CSV_FORMAT", quoted("YES")),
            ("START_TIME", quoted(&format!("JD{}", grid.start_jd()))),
            ("STOP_TIME", quoted(&format!("JD{}", grid.end_jd()))),
            ("STEP_SIZE", quoted(&grid.step().to_string())),
        ];
        tracing::debug!(
            object,
            start = grid.start_jd(),
            stop = grid.end_jd(),
            "horizons: vectors request"
        );
        let resp = self.http.get(&url).query(&params).send().await?;
        let resp = check_response(SOURCE_ID, resp).await?;
        let body: HorizonsResponse = resp.json().await?;
        if let Some(error) = body.error {
            return Err(classify_error_text(object, &error));
        }
        let result = body
            .result
            .ok_or_else(|| SourceError::malformed(SOURCE_ID, "missing `result` field"))?;
        parse_vectors(object, &result)
    }

    async fn lookup(
        &self,
        query: &str,
        types: &[ObjectType],
    ) -> Result<Vec<CelestialObject>, SourceError> {
        let url = format!(
            "{}/horizons_lookup.api?sstr={}",
            self.base_url,
            urlencoding::encode(query)
        );
        let resp = self.http.get(&url).send().await?;
        let resp = check_response(SOURCE_ID, resp).await?;
        let body: LookupResponse = resp.json().await?;
        Ok(lookup_to_objects(body, types))
    }

    async fn ping(&self) -> Result<(), SourceError> {
        let url = format!("{}/horizons.api", self.base_url);
        let params = [
            ("format", "json".to_string()),
            ("COMMAND", quoted("399")),
            ("OBJ_DATA", quoted("NO")),
            ("MAKE_EPHEM", quoted("NO")),
        ];
        let resp = self.http.get(&url).query(&params).send().await?;
        check_response(SOURCE_ID, resp).await.map(|_| ())
    }
}

impl EphemerisSource for HorizonsSource {
    fn id(&self) -> &str {
        SOURCE_ID
    }

    fn provision(&self) -> Provision {
        Provision::Ephemeris
    }

    fn fetch_trajectory<'a>(
        &'a self,
        object: &'a str,
        grid: &'a TimeGrid,
    ) -> SourceFuture<'a, Vec<StateVector>> {
        Box::pin(self.query_vectors(object, grid))
    }

    fn search<'a>(
        &'a self,
        query: &'a str,
        types: &'a [ObjectType],
    ) -> SourceFuture<'a, Vec<CelestialObject>> {
        Box::pin(self.lookup(query, types))
    }

    fn health_check(&self) -> SourceFuture<'_, ()> {
        Box::pin(self.ping())
    }
}

fn quoted(value: &str) -> String {
    format!("'{value}'")
}

fn classify_error_text(object: &str, text: &str) -> SourceError {
    let lower = text.to_ascii_lowercase();
    if lower.contains("no matches found")
        || lower.contains("multiple major-bodies match")
        || lower.contains("matching small-bodies")
        || lower.contains("no such object")
    {
        SourceError::NotFound(format!("horizons could not resolve `{object}` uniquely"))
    } else {
        SourceError::Unavailable(format!("horizons error: {}", text.trim()))
    }
}

/// Parse the CSV vector table between `$$SOE` and `$$EOE`.
///
/// Each record reads `JDUT, Calendar Date, X, Y, Z, VX, VY, VZ,`.
pub(crate) fn parse_vectors(object: &str, result: &str) -> Result<Vec<StateVector>, SourceError> {
    let Some(start) = result.find(START_OF_ENTRIES) else {
        return Err(classify_error_text(object, result));
    };
    let body = &result[start + START_OF_ENTRIES.len()..];
    let end = body
        .find(END_OF_ENTRIES)
        .ok_or_else(|| SourceError::malformed(SOURCE_ID, "unterminated vector table"))?;

    let mut samples = Vec::new();
    for line in body[..end].lines().map(str::trim).filter(|l| !l.is_empty()) {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() < 8 {
            return Err(SourceError::malformed(
                SOURCE_ID,
                format!("expected 8 columns, got {}: `{line}`", fields.len()),
            ));
        }
        let number = |idx: usize| {
            fields[idx].parse::<f64>().map_err(|_| {
                SourceError::malformed(SOURCE_ID, format!("bad number `{}`", fields[idx]))
            })
        };
        samples.push(StateVector {
            epoch_jd: number(0)?,
            position_km: [number(2)?, number(3)?, number(4)?],
            velocity_km_s: [number(5)?, number(6)?, number(7)?],
            frame: Frame::HeliocentricEclipticJ2000,
            source: SOURCE_ID.to_string(),
        });
    }
    Ok(samples)
}

fn lookup_to_objects(body: LookupResponse, types: &[ObjectType]) -> Vec<CelestialObject> {
    body.result
        .into_iter()
        .filter_map(|entry| {
            let object_type = entry
                .kind
                .as_deref()
                .and_then(|kind| kind.parse().ok())
                .unwrap_or(ObjectType::Unknown);
            if !type_matches(types, object_type) {
                return None;
            }
            Some(CelestialObject {
                designation: entry.pdes.unwrap_or(entry.name),
                object_type,
                source_hints: vec![SOURCE_ID.to_string()],
            })
        })
        .collect()
}
