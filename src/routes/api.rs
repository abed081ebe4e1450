// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::{header, HeaderMap},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::cycle::{adjusted_blood_sugar, profile_phase};
use crate::models::{
    CyclePhase, DoctorReport, HormonalSymptoms, MetricPoint, NutritionRecord, PredictionRecord,
    ProfilePatch, RiskLevel, Role, UserProfile,
};
use crate::services::chat::validate_message;
use crate::services::google_fit::{FitStatus, DEFAULT_TOKEN_LIFETIME_SECS};
use crate::services::pipeline::{AnalysisOutcome, FetchOutcome};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;

/// PDFs are forwarded as-is, so allow more than the default 2 MB.
const MAX_REPORT_BYTES: usize = 10 * 1024 * 1024;
const MAX_REPORT_TEXT_CHARS: usize = 100_000;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/profile", get(get_profile).put(update_profile))
        .route("/api/google-fit/connect", get(google_fit_connect))
        .route(
            "/api/google-fit/token",
            post(google_fit_store_token).delete(google_fit_disconnect),
        )
        .route("/api/google-fit/status", get(google_fit_status))
        .route("/api/metrics", get(list_metrics))
        .route("/api/metrics/fetch", post(fetch_metrics))
        .route("/api/metrics/mock", post(generate_mock_metrics))
        .route(
            "/api/reports",
            post(upload_report).layer(DefaultBodyLimit::max(MAX_REPORT_BYTES)),
        )
        .route("/api/reports/latest", get(latest_report))
        .route("/api/analysis", post(run_analysis))
        .route("/api/predictions/latest", get(latest_prediction))
        .route("/api/nutrition", post(generate_nutrition))
        .route("/api/nutrition/latest", get(latest_nutrition))
        .route("/api/chat", post(chat))
}

// ─── Current User ────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MeResponse {
    pub uid: String,
    pub role: Role,
    pub email: Option<String>,
}

async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<MeResponse>> {
    let profile = state.db.get_user(&user.uid).await?;

    Ok(Json(MeResponse {
        uid: user.uid,
        role: user.role,
        email: profile.and_then(|p| p.email),
    }))
}

// ─── Profile ─────────────────────────────────────────────────

/// Profile plus everything the dashboard derives from it.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub cycle_phase: Option<CyclePhase>,
    pub adjusted_blood_sugar: f64,
    pub risk_advice: &'static str,
    pub health_insight: &'static str,
    pub has_data: bool,
    pub fit_connected: bool,
}

async fn profile_response(state: &AppState, uid: &str, profile: UserProfile) -> Result<ProfileResponse> {
    let now = Utc::now();
    let today = now.date_naive();

    let has_data = state.db.has_smartwatch_data(uid).await?;
    let fit_connected = match state.google_fit.status(uid, now).await {
        Ok(status) => status.connected,
        Err(e) => {
            tracing::warn!(user_id = uid, error = %e, "Google Fit status unavailable");
            false
        }
    };

    Ok(ProfileResponse {
        cycle_phase: profile_phase(&profile, today),
        adjusted_blood_sugar: adjusted_blood_sugar(&profile, today),
        risk_advice: RiskLevel::advice(profile.risk_level),
        health_insight: RiskLevel::insight(profile.risk_level),
        has_data,
        fit_connected,
        profile,
    })
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ProfileResponse>> {
    let profile = state.db.get_user(&user.uid).await?.unwrap_or_default();
    Ok(Json(profile_response(&state, &user.uid, profile).await?))
}

/// Partial profile update. Absent fields are left unchanged.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProfileUpdate {
    #[validate(range(min = 12, max = 60))]
    pub age: Option<u32>,
    #[serde(rename = "systolicBP")]
    #[validate(range(min = 70, max = 200))]
    pub systolic_bp: Option<u32>,
    #[serde(rename = "diastolicBP")]
    #[validate(range(min = 40, max = 130))]
    pub diastolic_bp: Option<u32>,
    #[validate(range(min = 95.0, max = 105.0))]
    pub body_temp: Option<f64>,
    #[validate(range(min = 20, max = 45))]
    pub cycle_length: Option<u32>,
    /// `YYYY-MM-DD`, not in the future
    pub last_period_date: Option<String>,
    pub hormonal_symptoms: Option<HormonalSymptoms>,
    #[validate(range(min = 2.0, max = 20.0))]
    pub bs_baseline: Option<f64>,
    #[validate(length(max = 100))]
    pub pregnancy_status: Option<String>,
}

impl ProfileUpdate {
    /// Range and date checks. `lastPeriodDate` must not be after `today`.
    pub fn check(&self, today: chrono::NaiveDate) -> std::result::Result<(), AppError> {
        self.validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        if let Some(raw) = &self.last_period_date {
            let date = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                AppError::BadRequest("lastPeriodDate must be YYYY-MM-DD".to_string())
            })?;
            if date > today {
                return Err(AppError::BadRequest(
                    "lastPeriodDate cannot be in the future".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Field-masked write for the supplied fields plus `lastUpdated`.
    /// Call [`ProfileUpdate::check`] first.
    pub fn into_patch(self, last_updated: String) -> ProfilePatch {
        ProfilePatch {
            age: self.age,
            systolic_bp: self.systolic_bp,
            diastolic_bp: self.diastolic_bp,
            body_temp: self.body_temp,
            cycle_length: self.cycle_length,
            last_period_date: self.last_period_date,
            hormonal_symptoms: self.hormonal_symptoms,
            bs_baseline: self.bs_baseline,
            pregnancy_status: self.pregnancy_status,
            last_updated: Some(last_updated),
        }
    }
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<ProfileResponse>> {
    let now = Utc::now();
    update.check(now.date_naive())?;

    let patch = update.into_patch(format_utc_rfc3339(now));
    state.db.update_user_fields(&user.uid, &patch).await?;
    tracing::info!(user_id = %user.uid, fields = ?patch.field_paths(), "Profile updated");

    let profile = state.db.get_user(&user.uid).await?.unwrap_or_default();

    Ok(Json(profile_response(&state, &user.uid, profile).await?))
}

// ─── Google Fit ──────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ConnectResponse {
    pub url: String,
}

async fn google_fit_connect(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ConnectResponse>> {
    let url = state.google_fit.authorization_url(&user.uid, Utc::now())?;
    Ok(Json(ConnectResponse { url }))
}

/// Token read by the client from the OAuth redirect fragment.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenHandoff {
    #[serde(alias = "access_token")]
    pub access_token: String,
    #[serde(default, alias = "expires_in")]
    pub expires_in: Option<i64>,
    pub state: String,
}

async fn google_fit_store_token(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<TokenHandoff>,
) -> Result<Json<FitStatus>> {
    let token = state
        .google_fit
        .store_token(
            &user.uid,
            &body.access_token,
            Some(body.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS)),
            &body.state,
            Utc::now(),
        )
        .await?;

    Ok(Json(FitStatus {
        connected: true,
        expires_at: Some(token.expires_at),
    }))
}

async fn google_fit_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<FitStatus>> {
    Ok(Json(state.google_fit.status(&user.uid, Utc::now()).await?))
}

async fn google_fit_disconnect(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<FitStatus>> {
    state.google_fit.disconnect(&user.uid).await?;
    Ok(Json(FitStatus {
        connected: false,
        expires_at: None,
    }))
}

// ─── Health Metrics ──────────────────────────────────────────

async fn fetch_metrics(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<FetchOutcome>> {
    Ok(Json(state.pipeline.fetch_health_data(&user.uid).await?))
}

#[derive(Deserialize)]
struct MockQuery {
    /// Only generate when the user has no data yet
    #[serde(default)]
    if_missing: bool,
}

#[derive(Serialize)]
pub struct MockResponse {
    pub generated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<FetchOutcome>,
}

async fn generate_mock_metrics(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<MockQuery>,
) -> Result<Json<MockResponse>> {
    let data = if params.if_missing {
        state.pipeline.ensure_data(&user.uid).await?
    } else {
        Some(state.pipeline.generate_mock_data(&user.uid).await?)
    };

    Ok(Json(MockResponse {
        generated: data.is_some(),
        data,
    }))
}

#[derive(Deserialize)]
struct MetricsQuery {
    #[serde(default = "default_metrics_limit")]
    limit: u32,
}

fn default_metrics_limit() -> u32 {
    50
}

const MAX_METRICS_LIMIT: u32 = 200;

/// Recent readings, oldest first (chart order).
async fn list_metrics(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<MetricsQuery>,
) -> Result<Json<Vec<MetricPoint>>> {
    let limit = params.limit.clamp(1, MAX_METRICS_LIMIT);
    let records = state
        .db
        .recent_smartwatch_records(&user.uid, limit)
        .await?;

    Ok(Json(records.iter().rev().map(MetricPoint::from).collect()))
}

// ─── Doctor's Reports ────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportUpload {
    #[serde(default)]
    file_name: String,
    text: String,
}

#[derive(Deserialize)]
struct ReportQuery {
    #[serde(default)]
    file_name: Option<String>,
}

/// Store a report, either as JSON text or as a PDF whose text the ML
/// service extracts.
async fn upload_report(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<ReportQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<DoctorReport>> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let (file_name, text) = if content_type.starts_with("application/pdf") {
        if body.is_empty() {
            return Err(AppError::BadRequest("Empty PDF upload".to_string()));
        }
        let file_name = params.file_name.unwrap_or_else(|| "report.pdf".to_string());
        let text = state.ml.extract_report(&file_name, body.to_vec()).await?;
        (file_name, text)
    } else {
        let upload: ReportUpload = serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid report body: {}", e)))?;
        (upload.file_name, upload.text)
    };

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(AppError::BadRequest("Report contains no text".to_string()));
    }
    if text.chars().count() > MAX_REPORT_TEXT_CHARS {
        return Err(AppError::BadRequest("Report text is too long".to_string()));
    }

    let now = Utc::now();
    let report = DoctorReport {
        file_name,
        text,
        uploaded_at: format_utc_rfc3339(now),
    };
    state
        .db
        .add_report(&user.uid, &now.timestamp_millis().to_string(), &report)
        .await?;

    tracing::info!(user_id = %user.uid, file_name = %report.file_name, "Doctor's report stored");
    Ok(Json(report))
}

async fn latest_report(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<DoctorReport>> {
    state
        .db
        .latest_report(&user.uid)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No report uploaded".to_string()))
}

// ─── Analysis & Nutrition ────────────────────────────────────

async fn run_analysis(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<AnalysisOutcome>> {
    Ok(Json(state.pipeline.analyze(&user.uid).await?))
}

async fn latest_prediction(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<PredictionRecord>> {
    state
        .db
        .latest_prediction(&user.uid)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No prediction yet".to_string()))
}

async fn generate_nutrition(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<NutritionRecord>> {
    Ok(Json(state.pipeline.generate_nutrition(&user.uid).await?))
}

async fn latest_nutrition(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<NutritionRecord>> {
    state
        .db
        .latest_nutrition_plan(&user.uid)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No nutrition plan yet".to_string()))
}

// ─── Chat ────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ChatResponse {
    pub reply: String,
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    validate_message(&body.message)?;
    tracing::debug!(user_id = %user.uid, chars = body.message.len(), "Chat message");

    let reply = state.chat.reply(body.message.trim()).await;
    Ok(Json(ChatResponse { reply }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn update(json: &str) -> ProfileUpdate {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_update_writes_only_given_fields() {
        let body =
            update(r#"{"systolicBP":118,"lastPeriodDate":"2025-05-20","hormonalSymptoms":"Mild"}"#);
        body.check(today()).unwrap();
        let patch = body.into_patch("2025-06-01T09:00:00.000Z".to_string());

        let mut fields = patch.field_paths();
        fields.sort_unstable();
        assert_eq!(
            fields,
            ["hormonalSymptoms", "lastPeriodDate", "lastUpdated", "systolicBP"]
        );

        // Fields outside the mask, riskLevel and role included, are never sent
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 4);
        assert_eq!(json["systolicBP"], 118);
        assert_eq!(json["hormonalSymptoms"], "Mild");
        assert!(json.get("riskLevel").is_none());
        assert!(json.get("age").is_none());
    }

    #[test]
    fn test_empty_update_still_touches_last_updated() {
        let patch = update("{}").into_patch("2025-06-01T09:00:00.000Z".to_string());
        assert_eq!(patch.field_paths(), ["lastUpdated"]);
    }

    #[test]
    fn test_update_rejects_out_of_range() {
        for body in [
            r#"{"age":11}"#,
            r#"{"age":61}"#,
            r#"{"systolicBP":201}"#,
            r#"{"diastolicBP":39}"#,
            r#"{"cycleLength":19}"#,
            r#"{"bsBaseline":25.0}"#,
        ] {
            let result = update(body).check(today());
            assert!(matches!(result, Err(AppError::BadRequest(_))), "{}", body);
        }
    }

    #[test]
    fn test_update_accepts_bounds() {
        let patch = update(
            r#"{"age":12,"systolicBP":200,"diastolicBP":40,"cycleLength":45,"bsBaseline":2.0}"#,
        );
        assert!(patch.check(today()).is_ok());
    }

    #[test]
    fn test_update_rejects_bad_dates() {
        assert!(update(r#"{"lastPeriodDate":"2025-06-02"}"#)
            .check(today())
            .is_err());
        assert!(update(r#"{"lastPeriodDate":"06/01/2025"}"#)
            .check(today())
            .is_err());
        assert!(update(r#"{"lastPeriodDate":"2025-06-01"}"#)
            .check(today())
            .is_ok());
    }

    #[test]
    fn test_update_cannot_change_role() {
        assert!(serde_json::from_str::<ProfileUpdate>(r#"{"role":"admin"}"#).is_err());
    }
}
