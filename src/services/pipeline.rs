// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Health data ingestion and risk analysis.
//!
//! Ties the metric sources (Google Fit, mock generator) to storage and the
//! ML service:
//! 1. Fetch or generate a reading and store it in `smartwatchData`
//! 2. Build the model's feature vector from the reading plus the profile
//! 3. Predict risk, record it, update the user document
//! 4. Generate and store a nutrition plan for the new risk level

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::Serialize;

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::cycle::adjusted_blood_sugar;
use crate::models::{
    HealthMetrics, MetricsSource, MlInput, NutritionPlan, NutritionRecord, PredictionErrorRecord,
    PredictionRecord, RiskLevel, SmartwatchRecord, UserProfile,
};
use crate::services::google_fit::FitReadings;
use crate::services::{GoogleFitService, MlClient, MockMetricsGenerator};
use crate::time_utils::format_utc_rfc3339;

/// Risk level used for nutrition plans before any prediction exists.
const DEFAULT_NUTRITION_RISK: RiskLevel = RiskLevel::Medium;

/// Result of storing a new reading.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOutcome {
    pub id: String,
    pub source: MetricsSource,
    /// Google Fit was connected but the fetch failed
    pub fallback: bool,
    pub metrics: HealthMetrics,
    pub timestamp: String,
}

/// Result of a full analysis run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutcome {
    pub risk_level: RiskLevel,
    pub prediction_id: String,
    pub watch_data_id: String,
    pub input_features: MlInput,
    pub nutrition: Option<NutritionRecord>,
    /// Why no nutrition plan was produced, if one was not
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nutrition_error: Option<String>,
}

/// Pick the metrics to store given what Google Fit returned.
///
/// `fit` is `None` when the user is not connected. Returns the metrics,
/// their source, and whether a failed fetch was replaced by mock data.
pub fn resolve_metrics<R: Rng>(
    fit: Option<Result<FitReadings, AppError>>,
    generator: &MockMetricsGenerator,
    rng: &mut R,
) -> (HealthMetrics, MetricsSource, bool) {
    match fit {
        Some(Ok(readings)) => (readings.into_metrics(rng), MetricsSource::GoogleFit, false),
        Some(Err(e)) => {
            tracing::warn!(error = %e, "Google Fit fetch failed, using mock data");
            (generator.generate(rng), MetricsSource::Mock, true)
        }
        None => (generator.generate(rng), MetricsSource::Mock, false),
    }
}

/// Feature vector for `/predict-risk`.
///
/// Blood pressure comes from the reading unless it is zero (most sources do
/// not measure it), in which case the profile value is used.
pub fn prepare_ml_input(profile: &UserProfile, metrics: &HealthMetrics, today: NaiveDate) -> MlInput {
    let or_profile = |reading: f64, fallback: u32| {
        if reading != 0.0 {
            reading
        } else {
            f64::from(fallback)
        }
    };

    MlInput {
        age: f64::from(profile.age),
        systolic_bp: or_profile(metrics.blood_pressure.systolic, profile.systolic_bp),
        diastolic_bp: or_profile(metrics.blood_pressure.diastolic, profile.diastolic_bp),
        body_temp: metrics.body_temp,
        heart_rate: metrics.heart_rate,
        hrv: metrics.hrv,
        resp_rate: metrics.resp_rate,
        spo2: metrics.spo2,
        sleep_hours: metrics.sleep_hours,
        step_count: metrics.step_count,
        caloric_burn: metrics.caloric_burn,
        cycle_length: f64::from(profile.cycle_length),
        hormonal_symptoms: profile.hormonal_symptoms.as_str().to_string(),
        bs: adjusted_blood_sugar(profile, today),
    }
}

/// Ingestion and analysis pipeline.
#[derive(Clone)]
pub struct HealthPipeline {
    db: FirestoreDb,
    google_fit: GoogleFitService,
    ml: MlClient,
    generator: MockMetricsGenerator,
}

impl HealthPipeline {
    pub fn new(db: FirestoreDb, google_fit: GoogleFitService, ml: MlClient) -> Self {
        Self {
            db,
            google_fit,
            ml,
            generator: MockMetricsGenerator,
        }
    }

    /// Fetch from Google Fit when connected, otherwise (or on failure) store
    /// generated data instead.
    pub async fn fetch_health_data(&self, uid: &str) -> Result<FetchOutcome, AppError> {
        let now = Utc::now();

        let fit = match self.google_fit.access_token(uid, now).await {
            Ok(Some(_)) => Some(self.google_fit.fetch_readings(uid, now).await),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        };

        let (metrics, source, fallback) =
            resolve_metrics(fit, &self.generator, &mut rand::thread_rng());

        let outcome = self.store(uid, metrics, source, fallback, now).await?;
        tracing::info!(
            user_id = uid,
            source = source.as_str(),
            fallback,
            "Health data stored"
        );
        Ok(outcome)
    }

    /// Generate and store a mock reading.
    pub async fn generate_mock_data(&self, uid: &str) -> Result<FetchOutcome, AppError> {
        let metrics = self.generator.generate(&mut rand::thread_rng());
        let outcome = self
            .store(uid, metrics, MetricsSource::Mock, false, Utc::now())
            .await?;
        tracing::info!(user_id = uid, source = "mock", "Mock health data stored");
        Ok(outcome)
    }

    /// Generate mock data only for a user with no readings at all.
    pub async fn ensure_data(&self, uid: &str) -> Result<Option<FetchOutcome>, AppError> {
        if self.db.has_smartwatch_data(uid).await? {
            return Ok(None);
        }
        self.generate_mock_data(uid).await.map(Some)
    }

    async fn store(
        &self,
        uid: &str,
        metrics: HealthMetrics,
        source: MetricsSource,
        fallback: bool,
        now: DateTime<Utc>,
    ) -> Result<FetchOutcome, AppError> {
        let timestamp = format_utc_rfc3339(now);
        let record = SmartwatchRecord::new(uid, metrics.clone(), source, &timestamp);
        let id = self
            .db
            .add_smartwatch_record(&record, now.timestamp_millis())
            .await?;

        Ok(FetchOutcome {
            id,
            source,
            fallback,
            metrics,
            timestamp,
        })
    }

    /// Run a prediction on the latest reading, then refresh the nutrition plan.
    pub async fn analyze(&self, uid: &str) -> Result<AnalysisOutcome, AppError> {
        let latest = self
            .db
            .latest_smartwatch_record(uid)
            .await?
            .ok_or_else(|| {
                AppError::NotFound("No health data found. Fetch or generate data first.".to_string())
            })?;

        let profile = self.db.get_user(uid).await?.unwrap_or_default();
        let now = Utc::now();
        let timestamp = format_utc_rfc3339(now);
        let doc_id = now.timestamp_millis().to_string();

        let input = prepare_ml_input(&profile, &latest.record.metrics(), now.date_naive());

        let risk_level = match self.ml.predict_risk(&input).await {
            Ok(level) => level,
            Err(e) => {
                tracing::error!(user_id = uid, error = %e, "Risk prediction failed");
                let error_record = PredictionErrorRecord {
                    error: e.to_string(),
                    input,
                    timestamp,
                };
                if let Err(db_err) = self.db.add_prediction_error(uid, &doc_id, &error_record).await {
                    tracing::warn!(user_id = uid, error = %db_err, "Failed to record prediction error");
                }
                return Err(e);
            }
        };

        let prediction = PredictionRecord {
            risk_level,
            input_features: input.clone(),
            watch_data_id: Some(latest.id.clone()),
            timestamp: timestamp.clone(),
        };
        self.db.add_prediction(uid, &doc_id, &prediction).await?;
        self.db.mark_processed(&latest.id).await?;
        self.db
            .set_user_risk_level(uid, risk_level, &timestamp)
            .await?;

        tracing::info!(
            user_id = uid,
            risk_level = risk_level.as_str(),
            watch_data_id = %latest.id,
            "Risk prediction stored"
        );

        let (nutrition, nutrition_error) = match self.build_nutrition(uid, risk_level).await {
            Ok(record) => (Some(record), None),
            Err(e) => {
                tracing::warn!(user_id = uid, error = %e, "Nutrition plan generation failed after analysis");
                (None, Some(e.to_string()))
            }
        };

        Ok(AnalysisOutcome {
            risk_level,
            prediction_id: doc_id,
            watch_data_id: latest.id,
            input_features: input,
            nutrition,
            nutrition_error,
        })
    }

    /// Nutrition plan for the user's most recent risk level.
    pub async fn generate_nutrition(&self, uid: &str) -> Result<NutritionRecord, AppError> {
        let risk_level = self
            .db
            .latest_prediction(uid)
            .await?
            .map(|p| p.risk_level)
            .unwrap_or(DEFAULT_NUTRITION_RISK);

        self.build_nutrition(uid, risk_level).await
    }

    async fn build_nutrition(
        &self,
        uid: &str,
        risk_level: RiskLevel,
    ) -> Result<NutritionRecord, AppError> {
        let doctor_notes = self
            .db
            .latest_report(uid)
            .await?
            .map(|r| r.text)
            .unwrap_or_default();

        let generated = self
            .ml
            .generate_nutrition_plan(risk_level, &doctor_notes)
            .await?;
        // The service's own label wins when it sends one we understand
        let risk_level = generated.risk_level.unwrap_or(risk_level);

        let now = Utc::now();
        let timestamp = format_utc_rfc3339(now);
        let record = NutritionRecord {
            risk_level,
            plan: NutritionPlan::parse(&generated.plan),
            generated_at: timestamp.clone(),
            timestamp,
        };

        self.db
            .add_nutrition_plan(uid, &now.timestamp_millis().to_string(), &record)
            .await?;

        tracing::info!(
            user_id = uid,
            risk_level = risk_level.as_str(),
            with_report = !doctor_notes.is_empty(),
            "Nutrition plan stored"
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BloodPressure;
    use rand::{rngs::StdRng, SeedableRng};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    fn metrics() -> HealthMetrics {
        HealthMetrics {
            heart_rate: 88.0,
            hrv: 45.5,
            resp_rate: 16.0,
            spo2: 98.0,
            sleep_hours: 6.5,
            step_count: 4000.0,
            caloric_burn: 1900.0,
            body_temp: 98.2,
            blood_pressure: BloodPressure {
                systolic: 125.0,
                diastolic: 82.0,
            },
        }
    }

    #[test]
    fn test_ml_input_maps_reading_and_profile() {
        let profile = UserProfile {
            age: 31,
            cycle_length: 30,
            hormonal_symptoms: crate::models::HormonalSymptoms::Severe,
            bs_baseline: 6.0,
            last_period_date: Some("2025-02-08".to_string()), // day 21: luteal
            ..UserProfile::default()
        };

        let input = prepare_ml_input(&profile, &metrics(), today());

        assert_eq!(input.age, 31.0);
        assert_eq!(input.systolic_bp, 125.0);
        assert_eq!(input.diastolic_bp, 82.0);
        assert_eq!(input.heart_rate, 88.0);
        assert_eq!(input.hrv, 45.5);
        assert_eq!(input.step_count, 4000.0);
        assert_eq!(input.cycle_length, 30.0);
        assert_eq!(input.hormonal_symptoms, "Severe");
        assert_eq!(input.bs, 8.0);
    }

    #[test]
    fn test_ml_input_uses_profile_bp_when_reading_is_zero() {
        let profile = UserProfile {
            systolic_bp: 132,
            diastolic_bp: 88,
            ..UserProfile::default()
        };
        let mut reading = metrics();
        reading.blood_pressure = BloodPressure::default();

        let input = prepare_ml_input(&profile, &reading, today());

        assert_eq!(input.systolic_bp, 132.0);
        assert_eq!(input.diastolic_bp, 88.0);
        // Defaults when the profile is empty
        assert_eq!(input.age, 25.0);
        assert_eq!(input.bs, 5.0);
        assert_eq!(input.hormonal_symptoms, "Moderate");
    }

    #[test]
    fn test_resolve_metrics_sources() {
        let mut rng = StdRng::seed_from_u64(3);
        let generator = MockMetricsGenerator;
        let readings = FitReadings {
            heart_rate: 76.0,
            steps: 5000.0,
            sleep_hours: 7.5,
            calories: 2100.0,
        };

        let (m, source, fallback) = resolve_metrics(Some(Ok(readings)), &generator, &mut rng);
        assert_eq!(source, MetricsSource::GoogleFit);
        assert!(!fallback);
        assert_eq!(m.step_count, 5000.0);

        let (m, source, fallback) = resolve_metrics(
            Some(Err(AppError::GoogleFitApi("HTTP 500".to_string()))),
            &generator,
            &mut rng,
        );
        assert_eq!(source, MetricsSource::Mock);
        assert!(fallback);
        assert!((70.0..100.0).contains(&m.heart_rate));

        let (_, source, fallback) = resolve_metrics(None, &generator, &mut rng);
        assert_eq!(source, MetricsSource::Mock);
        assert!(!fallback);
    }
}
