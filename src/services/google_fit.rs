// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google Fit integration.
//!
//! Handles:
//! - The implicit-grant authorization URL and its signed `state`
//! - Storing the access token the browser hands back
//! - Aggregate metric fetches (heart rate, steps, sleep, calories)
//! - Rate limit and rejected-token detection

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use hmac::{Hmac, Mac};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::{BloodPressure, FitToken, HealthMetrics};
use crate::time_utils::{format_utc_rfc3339, parse_utc_rfc3339};

type HmacSha256 = Hmac<Sha256>;

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const FITNESS_API_URL: &str = "https://www.googleapis.com/fitness/v1";

/// Read-only scopes requested on connect.
pub const FITNESS_SCOPES: [&str; 4] = [
    "https://www.googleapis.com/auth/fitness.activity.read",
    "https://www.googleapis.com/auth/fitness.body.read",
    "https://www.googleapis.com/auth/fitness.heart_rate.read",
    "https://www.googleapis.com/auth/fitness.sleep.read",
];

/// How long a signed `state` stays acceptable.
pub const STATE_MAX_AGE_MILLIS: i64 = 15 * 60 * 1000;

/// A token this close to expiry counts as expired.
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

/// Lifetime Google gives implicit-grant tokens when none is reported.
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

/// Sleep stages that do not count as sleep (1 = awake, 3 = out of bed).
const NON_SLEEP_STAGES: [i64; 2] = [1, 3];

/// Hours reported when Google Fit has no sleep data at all.
const DEFAULT_SLEEP_HOURS: f64 = 7.0;

/// Heart rate assumed for derived values when there is no reading.
const FALLBACK_HEART_RATE: f64 = 72.0;

// ─────────────────────────────────────────────────────────────────────────────
// OAuth state
// ─────────────────────────────────────────────────────────────────────────────

/// Sign `uid` and the issue time into an opaque `state` value.
pub fn sign_state(uid: &str, issued_at_millis: i64, secret: &[u8]) -> Result<String, AppError> {
    let payload = format!("{}|{:x}", uid, issued_at_millis);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Ok(URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature)))
}

/// Verify a `state` value and return the uid it was issued to.
///
/// Rejects bad signatures, malformed values and anything older than
/// [`STATE_MAX_AGE_MILLIS`] (or issued in the future).
pub fn verify_state(state: &str, secret: &[u8], now_millis: i64) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    // Format is "uid|timestamp_hex|signature_hex"
    let mut parts = state_str.rsplitn(3, '|');
    let signature_hex = parts.next()?;
    let timestamp_hex = parts.next()?;
    let uid = parts.next()?;

    let payload = format!("{}|{}", uid, timestamp_hex);
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    if !bool::from(expected.as_bytes().ct_eq(signature_hex.as_bytes())) {
        tracing::warn!("Google Fit state signature mismatch");
        return None;
    }

    let issued_at = i64::from_str_radix(timestamp_hex, 16).ok()?;
    let age = now_millis - issued_at;
    if !(0..=STATE_MAX_AGE_MILLIS).contains(&age) {
        tracing::info!(age_ms = age, "Google Fit state expired");
        return None;
    }

    Some(uid.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// GoogleFitClient - raw Fitness REST calls
// ─────────────────────────────────────────────────────────────────────────────

/// Aggregated data types fetched for a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitDataType {
    HeartRate,
    Steps,
    Sleep,
    Calories,
}

impl FitDataType {
    pub fn data_type_name(&self) -> &'static str {
        match self {
            FitDataType::HeartRate => "com.google.heart_rate.bpm",
            FitDataType::Steps => "com.google.step_count.delta",
            FitDataType::Sleep => "com.google.sleep.segment",
            FitDataType::Calories => "com.google.calories.expended",
        }
    }
}

/// Google Fitness API client.
#[derive(Clone)]
pub struct GoogleFitClient {
    http: reqwest::Client,
    base_url: String,
}

impl Default for GoogleFitClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GoogleFitClient {
    pub fn new() -> Self {
        Self::with_base_url(FITNESS_API_URL)
    }

    /// Client against a different API root (tests point this at a mock server).
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Aggregate one data type over `[start, end)` in a single daily bucket.
    pub async fn aggregate(
        &self,
        access_token: &str,
        data_type: FitDataType,
        start_millis: i64,
        end_millis: i64,
    ) -> Result<AggregateResponse, AppError> {
        let url = format!("{}/users/me/dataset:aggregate", self.base_url);

        let body = serde_json::json!({
            "aggregateBy": [{ "dataTypeName": data_type.data_type_name() }],
            "bucketByTime": { "durationMillis": DAY_MILLIS },
            "startTimeMillis": start_millis,
            "endTimeMillis": end_millis,
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::GoogleFitApi(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Fetch the last 24 hours of all four data types concurrently.
    pub async fn fetch_readings(
        &self,
        access_token: &str,
        now: DateTime<Utc>,
    ) -> Result<FitReadings, AppError> {
        let end = now.timestamp_millis();
        let start = end - DAY_MILLIS;

        let (heart_rate, steps, sleep, calories) = tokio::try_join!(
            self.aggregate(access_token, FitDataType::HeartRate, start, end),
            self.aggregate(access_token, FitDataType::Steps, start, end),
            self.aggregate(access_token, FitDataType::Sleep, start, end),
            self.aggregate(access_token, FitDataType::Calories, start, end),
        )?;

        Ok(FitReadings {
            heart_rate: average_fp(&heart_rate),
            steps: sum_int(&steps),
            sleep_hours: sleep_hours(&sleep),
            calories: sum_fp(&calories),
        })
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                tracing::warn!("Google Fit rate limit hit (429)");
                return Err(AppError::GoogleFitApi(
                    AppError::GOOGLE_FIT_RATE_LIMIT.to_string(),
                ));
            }

            if status.as_u16() == 401 {
                return Err(AppError::GoogleFitApi(
                    AppError::GOOGLE_FIT_TOKEN_ERROR.to_string(),
                ));
            }

            return Err(AppError::GoogleFitApi(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::GoogleFitApi(format!("JSON parse error: {}", e)))
    }
}

/// `dataset:aggregate` response (only the parts we read).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AggregateResponse {
    #[serde(default)]
    pub bucket: Vec<AggregateBucket>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AggregateBucket {
    #[serde(default)]
    pub dataset: Vec<Dataset>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub point: Vec<DataPoint>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    /// Nanoseconds since the epoch, as a decimal string
    #[serde(default)]
    pub start_time_nanos: Option<String>,
    #[serde(default)]
    pub end_time_nanos: Option<String>,
    #[serde(default)]
    pub value: Vec<DataValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataValue {
    #[serde(default)]
    pub fp_val: Option<f64>,
    #[serde(default)]
    pub int_val: Option<i64>,
}

impl AggregateResponse {
    fn points(&self) -> impl Iterator<Item = &DataPoint> {
        self.bucket
            .iter()
            .flat_map(|b| b.dataset.iter())
            .flat_map(|d| d.point.iter())
    }
}

fn first_fp(point: &DataPoint) -> Option<f64> {
    point.value.first().and_then(|v| v.fp_val)
}

/// Mean of the first `fpVal` of each point, 0 when there are none.
pub fn average_fp(response: &AggregateResponse) -> f64 {
    let values: Vec<f64> = response.points().filter_map(first_fp).collect();
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn sum_fp(response: &AggregateResponse) -> f64 {
    response.points().filter_map(first_fp).sum()
}

pub fn sum_int(response: &AggregateResponse) -> f64 {
    response
        .points()
        .filter_map(|p| p.value.first().and_then(|v| v.int_val))
        .sum::<i64>() as f64
}

/// Total hours of sleep segments, skipping awake / out-of-bed stages.
/// Returns the default when there are no segments at all.
pub fn sleep_hours(response: &AggregateResponse) -> f64 {
    let mut seen_any = false;
    let mut total_nanos: i128 = 0;

    for point in response.points() {
        seen_any = true;
        let stage = point.value.first().and_then(|v| v.int_val);
        if stage.is_some_and(|s| NON_SLEEP_STAGES.contains(&s)) {
            continue;
        }

        let parse = |raw: &Option<String>| raw.as_deref().and_then(|s| s.parse::<i128>().ok());
        if let (Some(start), Some(end)) = (parse(&point.start_time_nanos), parse(&point.end_time_nanos)) {
            if end > start {
                total_nanos += end - start;
            }
        }
    }

    if !seen_any {
        return DEFAULT_SLEEP_HOURS;
    }
    total_nanos as f64 / 3.6e12
}

/// Values read from Google Fit before the derived metrics are filled in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitReadings {
    pub heart_rate: f64,
    pub steps: f64,
    pub sleep_hours: f64,
    pub calories: f64,
}

impl FitReadings {
    /// Complete a metrics snapshot. Google Fit has no HRV, respiration,
    /// SpO2, temperature or blood pressure for most users, so those are
    /// estimated from heart rate or filled with typical values.
    pub fn into_metrics<R: Rng>(self, rng: &mut R) -> HealthMetrics {
        let hr_basis = if self.heart_rate > 0.0 {
            self.heart_rate
        } else {
            FALLBACK_HEART_RATE
        };

        HealthMetrics {
            heart_rate: self.heart_rate,
            hrv: 60.0 - hr_basis / 2.0,
            resp_rate: hr_basis / 4.0 + rng.gen_range(-2.0..2.0),
            spo2: 97.0,
            sleep_hours: self.sleep_hours,
            step_count: self.steps,
            caloric_burn: self.calories,
            body_temp: 98.0,
            blood_pressure: BloodPressure {
                systolic: 120.0,
                diastolic: 80.0,
            },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// GoogleFitService - token lifecycle around the client
// ─────────────────────────────────────────────────────────────────────────────

/// Cached access token with expiry information.
#[derive(Clone)]
pub struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Shared token cache type for use in AppState.
pub type TokenCache = Arc<DashMap<String, CachedToken>>;

/// Connection status reported to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FitStatus {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

/// High-level Google Fit service: connect, token storage, fetch.
#[derive(Clone)]
pub struct GoogleFitService {
    client: GoogleFitClient,
    db: FirestoreDb,
    token_cache: TokenCache,
    client_id: String,
    redirect_uri: String,
    state_key: Vec<u8>,
}

impl GoogleFitService {
    pub fn new(
        client: GoogleFitClient,
        db: FirestoreDb,
        token_cache: TokenCache,
        client_id: String,
        redirect_uri: String,
        state_key: Vec<u8>,
    ) -> Self {
        Self {
            client,
            db,
            token_cache,
            client_id,
            redirect_uri,
            state_key,
        }
    }

    /// Consent URL for the implicit grant. The token comes back in the
    /// redirect fragment together with `state`.
    pub fn authorization_url(&self, uid: &str, now: DateTime<Utc>) -> Result<String, AppError> {
        let state = sign_state(uid, now.timestamp_millis(), &self.state_key)?;

        Ok(format!(
            "{}?client_id={}&redirect_uri={}&response_type=token&scope={}&prompt=consent&state={}",
            AUTH_ENDPOINT,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&FITNESS_SCOPES.join(" ")),
            state
        ))
    }

    /// Accept a token handed back by the browser after consent.
    pub async fn store_token(
        &self,
        uid: &str,
        access_token: &str,
        expires_in_secs: Option<i64>,
        state: &str,
        now: DateTime<Utc>,
    ) -> Result<FitToken, AppError> {
        match verify_state(state, &self.state_key, now.timestamp_millis()) {
            Some(state_uid) if state_uid == uid => {}
            Some(_) => {
                tracing::warn!(user_id = uid, "Google Fit state issued to another user");
                return Err(AppError::BadRequest("Invalid state".to_string()));
            }
            None => return Err(AppError::BadRequest("Invalid or expired state".to_string())),
        }

        if access_token.trim().is_empty() {
            return Err(AppError::BadRequest("Missing access token".to_string()));
        }

        let lifetime = expires_in_secs
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        let expires_at = now + Duration::seconds(lifetime);

        let token = FitToken {
            access_token: access_token.to_string(),
            expires_at: format_utc_rfc3339(expires_at),
            scopes: FITNESS_SCOPES.iter().map(|s| s.to_string()).collect(),
        };

        self.db.set_fit_token(uid, &token).await?;
        self.token_cache.insert(
            uid.to_string(),
            CachedToken {
                access_token: token.access_token.clone(),
                expires_at,
            },
        );

        tracing::info!(user_id = uid, expires_at = %token.expires_at, "Google Fit token stored");
        Ok(token)
    }

    /// A usable access token, or `None` if the user is not connected.
    pub async fn access_token(
        &self,
        uid: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<(String, DateTime<Utc>)>, AppError> {
        let margin = Duration::seconds(TOKEN_EXPIRY_MARGIN_SECS);

        if let Some(cached) = self.token_cache.get(uid) {
            if now + margin < cached.expires_at {
                return Ok(Some((cached.access_token.clone(), cached.expires_at)));
            }
        }

        let Some(token) = self.db.get_fit_token(uid).await? else {
            self.token_cache.remove(uid);
            return Ok(None);
        };

        let Some(expires_at) = parse_utc_rfc3339(&token.expires_at) else {
            tracing::warn!(user_id = uid, "Stored Google Fit token has unreadable expiry");
            return Ok(None);
        };

        if now + margin >= expires_at {
            self.token_cache.remove(uid);
            return Ok(None);
        }

        self.token_cache.insert(
            uid.to_string(),
            CachedToken {
                access_token: token.access_token.clone(),
                expires_at,
            },
        );
        Ok(Some((token.access_token, expires_at)))
    }

    pub async fn status(&self, uid: &str, now: DateTime<Utc>) -> Result<FitStatus, AppError> {
        Ok(match self.access_token(uid, now).await? {
            Some((_, expires_at)) => FitStatus {
                connected: true,
                expires_at: Some(format_utc_rfc3339(expires_at)),
            },
            None => FitStatus {
                connected: false,
                expires_at: None,
            },
        })
    }

    pub async fn disconnect(&self, uid: &str) -> Result<(), AppError> {
        self.token_cache.remove(uid);
        self.db.delete_fit_token(uid).await?;
        tracing::info!(user_id = uid, "Google Fit disconnected");
        Ok(())
    }

    /// Fetch the last day's readings for a connected user.
    ///
    /// A token Google rejects is dropped so the user is shown as disconnected.
    pub async fn fetch_readings(
        &self,
        uid: &str,
        now: DateTime<Utc>,
    ) -> Result<FitReadings, AppError> {
        let (access_token, _) = self
            .access_token(uid, now)
            .await?
            .ok_or_else(|| AppError::GoogleFitApi("Google Fit not connected".to_string()))?;

        match self.client.fetch_readings(&access_token, now).await {
            Ok(readings) => Ok(readings),
            Err(e) if e.is_google_fit_token_error() => {
                tracing::info!(user_id = uid, "Google Fit token rejected, removing");
                self.token_cache.remove(uid);
                if let Err(db_err) = self.db.delete_fit_token(uid).await {
                    tracing::warn!(user_id = uid, error = %db_err, "Failed to delete rejected token");
                }
                Err(e)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    const SECRET: &[u8] = b"state_secret";
    const NOW: i64 = 1_700_000_000_000;

    fn response(points: Vec<DataPoint>) -> AggregateResponse {
        AggregateResponse {
            bucket: vec![AggregateBucket {
                dataset: vec![Dataset { point: points }],
            }],
        }
    }

    fn fp_point(v: f64) -> DataPoint {
        DataPoint {
            value: vec![DataValue {
                fp_val: Some(v),
                int_val: None,
            }],
            ..DataPoint::default()
        }
    }

    fn sleep_point(stage: i64, start_h: i128, end_h: i128) -> DataPoint {
        let hour = 3_600_000_000_000i128;
        DataPoint {
            start_time_nanos: Some((start_h * hour).to_string()),
            end_time_nanos: Some((end_h * hour).to_string()),
            value: vec![DataValue {
                fp_val: None,
                int_val: Some(stage),
            }],
        }
    }

    #[test]
    fn test_state_round_trip() {
        let state = sign_state("user-1", NOW, SECRET).unwrap();
        assert_eq!(
            verify_state(&state, SECRET, NOW + 60_000),
            Some("user-1".to_string())
        );
    }

    #[test]
    fn test_state_rejects_wrong_secret_and_tampering() {
        let state = sign_state("user-1", NOW, SECRET).unwrap();
        assert_eq!(verify_state(&state, b"other", NOW), None);

        let decoded = String::from_utf8(URL_SAFE_NO_PAD.decode(&state).unwrap()).unwrap();
        let forged = URL_SAFE_NO_PAD.encode(decoded.replacen("user-1", "user-2", 1));
        assert_eq!(verify_state(&forged, SECRET, NOW), None);

        assert_eq!(verify_state("not base64!", SECRET, NOW), None);
        assert_eq!(verify_state(&URL_SAFE_NO_PAD.encode("a|b"), SECRET, NOW), None);
    }

    #[test]
    fn test_state_expires() {
        let state = sign_state("user-1", NOW, SECRET).unwrap();
        assert!(verify_state(&state, SECRET, NOW + STATE_MAX_AGE_MILLIS).is_some());
        assert_eq!(verify_state(&state, SECRET, NOW + STATE_MAX_AGE_MILLIS + 1), None);
        // Issued in the future
        assert_eq!(verify_state(&state, SECRET, NOW - 1), None);
    }

    #[test]
    fn test_average_and_sums() {
        let hr = response(vec![fp_point(60.0), fp_point(80.0)]);
        assert_eq!(average_fp(&hr), 70.0);
        assert_eq!(average_fp(&AggregateResponse::default()), 0.0);

        let cal = response(vec![fp_point(1000.5), fp_point(500.0)]);
        assert_eq!(sum_fp(&cal), 1500.5);

        let steps = response(vec![DataPoint {
            value: vec![DataValue {
                fp_val: None,
                int_val: Some(4321),
            }],
            ..DataPoint::default()
        }]);
        assert_eq!(sum_int(&steps), 4321.0);
    }

    #[test]
    fn test_sleep_hours_skip_awake() {
        let sleep = response(vec![
            sleep_point(4, 0, 3), // light
            sleep_point(1, 3, 4), // awake
            sleep_point(5, 4, 6), // deep
        ]);
        assert_eq!(sleep_hours(&sleep), 5.0);
        assert_eq!(sleep_hours(&AggregateResponse::default()), DEFAULT_SLEEP_HOURS);
    }

    #[test]
    fn test_derived_metrics() {
        let mut rng = StdRng::seed_from_u64(7);
        let metrics = FitReadings {
            heart_rate: 80.0,
            steps: 1000.0,
            sleep_hours: 6.0,
            calories: 1800.0,
        }
        .into_metrics(&mut rng);

        assert_eq!(metrics.hrv, 20.0);
        assert!(metrics.resp_rate >= 18.0 && metrics.resp_rate < 22.0);
        assert_eq!(metrics.spo2, 97.0);
        assert_eq!(metrics.body_temp, 98.0);
        assert_eq!(metrics.blood_pressure.systolic, 120.0);

        // No heart rate: derived values use 72 bpm
        let metrics = FitReadings {
            heart_rate: 0.0,
            steps: 0.0,
            sleep_hours: 7.0,
            calories: 0.0,
        }
        .into_metrics(&mut rng);
        assert_eq!(metrics.heart_rate, 0.0);
        assert_eq!(metrics.hrv, 24.0);
        assert!(metrics.resp_rate >= 16.0 && metrics.resp_rate < 20.0);
    }
}
