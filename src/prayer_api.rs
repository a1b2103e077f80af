//! # Prayer-Time API Client
//!
//! This module handles network access to an Aladhan-style prayer-time service.
//! Given coordinates it returns the raw `timings` object; turning that into a
//! [`PrayerSchedule`](crate::schedule::PrayerSchedule) is left to
//! [`PrayerSchedule::from_external`](crate::schedule::PrayerSchedule::from_external),
//! which never fails.
//!
//! ## Request
//! ```text
//! GET {base_url}/timings?latitude=..&longitude=..&method=2&school=1
//! ```
//!
//! ## Response Validation
//! A response is accepted only when:
//! 1. the HTTP status is a success
//! 2. the body is JSON with `"code": 200`
//! 3. `data.timings` is present
//!
//! `data.meta.timezone`, when present, is surfaced as a display label.
//!
//! ## Error Handling
//! All failures propagate through [`ApiError`]. The caller keeps whatever
//! schedule it already had and marks the data source as degraded.

use crate::config::ApiConfig;
use crate::location::Coordinates;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while fetching prayer times.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport failure (DNS, TLS, timeout, connection reset)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("request failed: {0}")]
    Status(reqwest::StatusCode),

    /// Body parsed but is not a usable timings payload
    #[error("invalid prayer API response: {0}")]
    InvalidResponse(&'static str),
}

/// Validated slice of an API response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiTimings {
    /// The `data.timings` object, unvalidated field by field
    pub timings: Value,
    /// `data.meta.timezone`, e.g. `"Asia/Karachi"`
    pub timezone: Option<String>,
}

/// Thin async client over a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct PrayerApi {
    client: reqwest::Client,
    base_url: String,
    method: u8,
    school: u8,
}

impl PrayerApi {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            method: config.method,
            school: config.school,
        })
    }

    /// Fetch today's timings for `coords`.
    ///
    /// # Example
    /// ```no_run
    /// use prayer_arc_lib::{config::Config, location::FALLBACK_COORDS, prayer_api::PrayerApi};
    /// use prayer_arc_lib::schedule::PrayerSchedule;
    ///
    /// # async fn run() -> Result<(), prayer_arc_lib::prayer_api::ApiError> {
    /// let api = PrayerApi::new(&Config::default().api)?;
    /// let timings = api.fetch(FALLBACK_COORDS).await?;
    /// let schedule = PrayerSchedule::from_external(&timings.timings);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn fetch(&self, coords: Coordinates) -> Result<ApiTimings, ApiError> {
        let url = timings_url(&self.base_url, coords, self.method, self.school);
        log::debug!("Fetching prayer times from {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status));
        }

        let payload: Value = response.json().await?;
        parse_payload(&payload)
    }
}

/// Anything that answers a timings request for a coordinate.
///
/// The shell spawns these requests, so the returned future must be `Send`.
pub trait TimingsSource: Send + Sync + 'static {
    fn fetch_timings(
        &self,
        coords: Coordinates,
    ) -> impl Future<Output = Result<ApiTimings, ApiError>> + Send;
}

impl TimingsSource for PrayerApi {
    fn fetch_timings(
        &self,
        coords: Coordinates,
    ) -> impl Future<Output = Result<ApiTimings, ApiError>> + Send {
        self.fetch(coords)
    }
}

/// Build the timings request URL.
pub fn timings_url(base_url: &str, coords: Coordinates, method: u8, school: u8) -> String {
    format!(
        "{}/timings?latitude={}&longitude={}&method={}&school={}",
        base_url.trim_end_matches('/'),
        coords.latitude,
        coords.longitude,
        method,
        school
    )
}

/// Validate a decoded response body and extract the timings.
pub fn parse_payload(payload: &Value) -> Result<ApiTimings, ApiError> {
    if payload.get("code").and_then(Value::as_i64) != Some(200) {
        return Err(ApiError::InvalidResponse("code is not 200"));
    }

    let data = payload
        .get("data")
        .filter(|d| !d.is_null())
        .ok_or(ApiError::InvalidResponse("missing data"))?;

    let timings = data
        .get("timings")
        .filter(|t| !t.is_null())
        .ok_or(ApiError::InvalidResponse("missing data.timings"))?;

    let timezone = data
        .pointer("/meta/timezone")
        .and_then(Value::as_str)
        .filter(|tz| !tz.is_empty())
        .map(str::to_string);

    Ok(ApiTimings {
        timings: timings.clone(),
        timezone,
    })
}
