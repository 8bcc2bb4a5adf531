//! Space-Track client for NORAD-catalogued objects.
//!
//! Requires an account. The adapter logs in on first use and keeps the
//! session cookie; a request rejected with 401/403 renews the session once
//! before the rejection is reported. It reads the newest general-perturbation
//! element set for a catalogue number. Mean motion is converted to an
//! Earth-centred semi-major axis.

use std::f64::consts::TAU;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use intercept_core::constants::{MU_EARTH_KM3_S2, SECONDS_PER_DAY};
use intercept_orbits::{CentralBody, OrbitalElements};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::decode::{lenient_epoch, lenient_f64};
use crate::error::SourceError;
use crate::http::{build_client, check_response};
use crate::{
    CelestialObject, EphemerisSource, ObjectType, Provision, SourceFuture, type_matches,
};

pub const DEFAULT_BASE_URL: &str = "https://www.space-track.org";
pub const SOURCE_ID: &str = "space_track";

/// Highest five-digit NORAD catalogue number.
pub const MAX_NORAD_ID: u32 = 99_999;

/// Account credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct GpRecord {
    #[serde(default, deserialize_with = "lenient_f64")]
    mean_motion: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    eccentricity: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    inclination: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    ra_of_asc_node: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    arg_of_pericenter: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    mean_anomaly: Option<f64>,
    #[serde(default, deserialize_with = "lenient_epoch")]
    epoch: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct SatcatEntry {
    norad_cat_id: serde_json::Value,
    #[serde(default)]
    object_name: Option<String>,
}

/// Login state shared by every request of one adapter.
#[derive(Debug, Default)]
struct Session {
    established: Mutex<bool>,
}

impl Session {
    /// Log in unless a session is held. Concurrent callers wait for the same login.
    async fn ensure<L, Fut>(&self, login: L) -> Result<(), SourceError>
    where
        L: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), SourceError>>,
    {
        let mut established = self.established.lock().await;
        if !*established {
            login().await?;
            *established = true;
        }
        Ok(())
    }

    async fn invalidate(&self) {
        *self.established.lock().await = false;
    }

    /// Run `request` inside a session. A rejected session is renewed and the
    /// request repeated once; a second rejection is returned as is.
    async fn run<T, L, LFut, R, RFut>(&self, login: L, request: R) -> Result<T, SourceError>
    where
        L: Fn() -> LFut,
        LFut: Future<Output = Result<(), SourceError>>,
        R: Fn() -> RFut,
        RFut: Future<Output = Result<T, SourceError>>,
    {
        self.ensure(&login).await?;
        match request().await {
            Err(SourceError::AuthRequired(reason)) => {
                tracing::info!(%reason, "space_track: session rejected, logging in again");
                self.invalidate().await;
                self.ensure(&login).await?;
                request().await
            }
            other => other,
        }
    }
}

/// Adapter for Space-Track.
pub struct SpaceTrackSource {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    session: Session,
}

impl SpaceTrackSource {
    /// Fails with [`SourceError::AuthRequired`] when no credentials are configured.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        credentials: Option<Credentials>,
    ) -> Result<Self, SourceError> {
        let credentials = credentials
            .filter(|c| !c.username.is_empty() && !c.password.is_empty())
            .ok_or_else(|| {
                SourceError::AuthRequired("space_track credentials are not configured".to_string())
            })?;
        Ok(Self {
            http: build_client(timeout, true)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            session: Session::default(),
        })
    }

    async fn login(&self) -> Result<(), SourceError> {
        let url = format!("{}/ajaxauth/login", self.base_url);
        let form = [
            ("identity", self.credentials.username.as_str()),
            ("password", self.credentials.password.as_str()),
        ];
        let resp = self.http.post(&url).form(&form).send().await?;
        let resp = check_response(SOURCE_ID, resp).await?;
        let body = resp.text().await?;
        if body.contains("\"Login\":\"Failed\"") {
            return Err(SourceError::AuthRequired(
                "space_track rejected the configured credentials".to_string(),
            ));
        }
        tracing::info!(user = %self.credentials.username, "space_track: session established");
        Ok(())
    }

    async fn ensure_session(&self) -> Result<(), SourceError> {
        self.session.ensure(move || self.login()).await
    }

    /// GET `url` as JSON within a session.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, SourceError> {
        let request = move || async move {
            let resp = self.http.get(url).send().await?;
            let resp = check_response(SOURCE_ID, resp).await?;
            Ok::<T, SourceError>(resp.json::<T>().await?)
        };
        self.session.run(move || self.login(), request).await
    }

    async fn latest_elements(&self, object: &str) -> Result<OrbitalElements, SourceError> {
        let norad_id = parse_norad_id(object).ok_or_else(|| {
            SourceError::NotFound(format!("`{object}` is not a NORAD catalogue number"))
        })?;
        let url = format!(
            "{}/basicspacedata/query/class/gp/NORAD_CAT_ID/{norad_id}\
             /orderby/EPOCH%20desc/limit/1/format/json",
            self.base_url
        );
        tracing::debug!(norad_id, "space_track: gp request");
        let records: Vec<GpRecord> = self.get_json(&url).await?;
        let record = records.into_iter().next().ok_or_else(|| {
            SourceError::NotFound(format!("space_track has no element set for NORAD {norad_id}"))
        })?;
        gp_to_elements(record)
    }

    async fn search_catalog(
        &self,
        query: &str,
        types: &[ObjectType],
    ) -> Result<Vec<CelestialObject>, SourceError> {
        if !type_matches(types, ObjectType::Satellite) {
            return Ok(Vec::new());
        }
        let url = format!(
            "{}/basicspacedata/query/class/satcat/OBJECT_NAME/~~{}\
             /orderby/OBJECT_NAME/limit/50/format/json",
            self.base_url,
            urlencoding::encode(query)
        );
        let entries: Vec<SatcatEntry> = self.get_json(&url).await?;
        Ok(satcat_to_objects(entries))
    }
}

impl EphemerisSource for SpaceTrackSource {
    fn id(&self) -> &str {
        SOURCE_ID
    }

    fn provision(&self) -> Provision {
        Provision::Elements
    }

    fn fetch_elements<'a>(&'a self, object: &'a str) -> SourceFuture<'a, OrbitalElements> {
        Box::pin(self.latest_elements(object))
    }

    fn search<'a>(
        &'a self,
        query: &'a str,
        types: &'a [ObjectType],
    ) -> SourceFuture<'a, Vec<CelestialObject>> {
        Box::pin(self.search_catalog(query, types))
    }

    fn health_check(&self) -> SourceFuture<'_, ()> {
        Box::pin(self.ensure_session())
    }
}

/// Catalogue numbers are bare integers in `1..=99999`.
pub fn parse_norad_id(designation: &str) -> Option<u32> {
    let trimmed = designation.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed
        .parse::<u32>()
        .ok()
        .filter(|id| (1..=MAX_NORAD_ID).contains(id))
}

fn gp_to_elements(record: GpRecord) -> Result<OrbitalElements, SourceError> {
    let missing = |field: &str| SourceError::malformed(SOURCE_ID, format!("missing `{field}`"));
    let revs_per_day = record.mean_motion.ok_or_else(|| missing("MEAN_MOTION"))?;
    if revs_per_day <= 0.0 {
        return Err(SourceError::malformed(SOURCE_ID, "non-positive MEAN_MOTION"));
    }
    let n_rad_s = revs_per_day * TAU / SECONDS_PER_DAY;
    Ok(OrbitalElements {
        semi_major_axis_km: (MU_EARTH_KM3_S2 / (n_rad_s * n_rad_s)).cbrt(),
        eccentricity: record.eccentricity.ok_or_else(|| missing("ECCENTRICITY"))?,
        inclination_rad: record
            .inclination
            .ok_or_else(|| missing("INCLINATION"))?
            .to_radians(),
        ascending_node_rad: record
            .ra_of_asc_node
            .ok_or_else(|| missing("RA_OF_ASC_NODE"))?
            .to_radians(),
        argument_of_periapsis_rad: record
            .arg_of_pericenter
            .ok_or_else(|| missing("ARG_OF_PERICENTER"))?
            .to_radians(),
        mean_anomaly_rad: record
            .mean_anomaly
            .ok_or_else(|| missing("MEAN_ANOMALY"))?
            .to_radians(),
        epoch_jd: record.epoch.ok_or_else(|| missing("EPOCH"))?,
        central_body: CentralBody::Earth,
    })
}

fn satcat_to_objects(entries: Vec<SatcatEntry>) -> Vec<CelestialObject> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let designation = match entry.norad_cat_id {
                serde_json::Value::String(id) => id,
                serde_json::Value::Number(id) => id.to_string(),
                _ => return None,
            };
            tracing::trace!(
                %designation,
                name = ?entry.object_name,
                "space_track: satcat hit"
            );
            Some(CelestialObject {
                designation,
                object_type: ObjectType::Satellite,
                source_hints: vec![SOURCE_ID.to_string()],
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ISS_GP: &str = include_str!("../tests/fixtures/space_track_gp_25544.json");

    #[test]
    fn norad_ids_are_bounded_integers() {
        assert_eq!(parse_norad_id("25544"), Some(25_544));
        assert_eq!(parse_norad_id(" 1 "), Some(1));
        assert_eq!(parse_norad_id("0"), None);
        assert_eq!(parse_norad_id("100000"), None);
        assert_eq!(parse_norad_id("99942 Apophis"), None);
        assert_eq!(parse_norad_id("+5"), None);
    }

    #[test]
    fn missing_credentials_disable_the_adapter() {
        let err = SpaceTrackSource::new(DEFAULT_BASE_URL, Duration::from_secs(5), None)
            .err()
            .unwrap();
        assert!(matches!(err, SourceError::AuthRequired(_)));

        let blank = Credentials {
            username: "someone".into(),
            password: String::new(),
        };
        let source = SpaceTrackSource::new(DEFAULT_BASE_URL, Duration::from_secs(5), Some(blank));
        assert!(source.is_err());
    }

    #[tokio::test]
    async fn non_norad_designations_fail_without_io() {
        let creds = Credentials {
            username: "someone".into(),
            password: "secret".into(),
        };
        // Unroutable base URL: any request would surface as Unavailable.
        let source =
            SpaceTrackSource::new("http://127.0.0.1:9", Duration::from_millis(50), Some(creds))
                .unwrap();
        let err = source.fetch_elements("Ceres").await.unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
    }

    #[test]
    fn gp_record_maps_to_earth_centred_elements() {
        let records: Vec<GpRecord> = serde_json::from_str(ISS_GP).unwrap();
        let elements = gp_to_elements(records.into_iter().next().unwrap()).unwrap();
        assert_eq!(elements.central_body, CentralBody::Earth);
        // ~15.5 rev/day puts the ISS near 6,790 km from Earth's centre.
        let a = elements.semi_major_axis_km;
        assert!((a - 6_796.0).abs() < 15.0, "a = {a}");
        assert!((elements.inclination_rad.to_degrees() - 51.6416).abs() < 1e-9);
        assert_eq!(elements.eccentricity, 0.000_498_7);
    }

    fn counted_login(
        logins: &AtomicUsize,
    ) -> impl Fn() -> std::future::Ready<Result<(), SourceError>> + '_ {
        move || {
            logins.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(()))
        }
    }

    fn expired(requests: &AtomicUsize, rejections: usize) -> Result<u32, SourceError> {
        if requests.fetch_add(1, Ordering::SeqCst) < rejections {
            Err(SourceError::AuthRequired("space_track rejected the request (401)".into()))
        } else {
            Ok(42)
        }
    }

    #[tokio::test]
    async fn an_expired_session_is_renewed_once() {
        let session = Session::default();
        let (logins, requests) = (AtomicUsize::new(0), AtomicUsize::new(0));
        let request = || std::future::ready(expired(&requests, 1));

        let value = session.run(counted_login(&logins), request).await.unwrap();
        assert_eq!(value, 42);
        assert_eq!(logins.load(Ordering::SeqCst), 2);
        assert_eq!(requests.load(Ordering::SeqCst), 2);

        // The renewed session is reused.
        session.run(counted_login(&logins), request).await.unwrap();
        assert_eq!(logins.load(Ordering::SeqCst), 2);
        assert_eq!(requests.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn a_session_rejected_twice_reports_auth_required() {
        let session = Session::default();
        let (logins, requests) = (AtomicUsize::new(0), AtomicUsize::new(0));
        let request = || std::future::ready(expired(&requests, usize::MAX));

        let err = session.run(counted_login(&logins), request).await.unwrap_err();
        assert!(matches!(err, SourceError::AuthRequired(_)));
        assert_eq!(logins.load(Ordering::SeqCst), 2);
        assert_eq!(requests.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_logins_are_not_remembered() {
        let session = Session::default();
        let requests = AtomicUsize::new(0);
        let rejected = || {
            std::future::ready(Err(SourceError::AuthRequired("bad password".into())))
        };

        let err = session
            .run(rejected, || std::future::ready(expired(&requests, 0)))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::AuthRequired(_)));
        assert_eq!(requests.load(Ordering::SeqCst), 0);

        let logins = AtomicUsize::new(0);
        session.ensure(counted_login(&logins)).await.unwrap();
        assert_eq!(logins.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn credentials_debug_redacts_password() {
        let creds = Credentials {
            username: "someone".into(),
            password: "hunter2".into(),
        };
        assert!(!format!("{creds:?}").contains("hunter2"));
    }
}
