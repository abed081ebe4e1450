// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Wearable health metrics and the `smartwatchData` documents they are stored in.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Blood pressure reading (mmHg).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct BloodPressure {
    #[serde(default)]
    pub systolic: f64,
    #[serde(default)]
    pub diastolic: f64,
}

/// Where a set of metrics came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum MetricsSource {
    GoogleFit,
    Mock,
}

impl MetricsSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricsSource::GoogleFit => "google_fit",
            MetricsSource::Mock => "mock",
        }
    }
}

/// One snapshot of health metrics, independent of where it came from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct HealthMetrics {
    /// Beats per minute
    #[serde(default)]
    pub heart_rate: f64,
    /// Heart-rate variability (ms)
    #[serde(default)]
    pub hrv: f64,
    /// Breaths per minute
    #[serde(default, alias = "respirationRate")]
    pub resp_rate: f64,
    /// Oxygen saturation (%)
    #[serde(default)]
    pub spo2: f64,
    #[serde(default)]
    pub sleep_hours: f64,
    #[serde(default)]
    pub step_count: f64,
    /// kcal
    #[serde(default)]
    pub caloric_burn: f64,
    /// °F
    #[serde(default)]
    pub body_temp: f64,
    #[serde(default)]
    pub blood_pressure: BloodPressure,
}

/// Document stored in the top-level `smartwatchData` collection.
///
/// The metric fields are stored inline (not nested) so the documents line up
/// with what the web client has always written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartwatchRecord {
    pub user_id: String,
    #[serde(default)]
    pub heart_rate: f64,
    #[serde(default)]
    pub hrv: f64,
    #[serde(default, alias = "respirationRate")]
    pub resp_rate: f64,
    #[serde(default)]
    pub spo2: f64,
    #[serde(default)]
    pub sleep_hours: f64,
    #[serde(default)]
    pub step_count: f64,
    #[serde(default)]
    pub caloric_burn: f64,
    #[serde(default)]
    pub body_temp: f64,
    #[serde(default)]
    pub blood_pressure: BloodPressure,
    #[serde(default = "legacy_source")]
    pub source: MetricsSource,
    /// Set once a prediction has been made from this record
    #[serde(default)]
    pub processed: bool,
    /// RFC3339 (millisecond precision)
    #[serde(default)]
    pub timestamp: String,
    /// Legacy field names written by older clients
    #[serde(default, skip_serializing)]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing)]
    pub steps: Option<f64>,
}

// Records written before the source was tracked were all generated.
fn legacy_source() -> MetricsSource {
    MetricsSource::Mock
}

impl SmartwatchRecord {
    pub fn new(user_id: &str, metrics: HealthMetrics, source: MetricsSource, now: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            heart_rate: metrics.heart_rate,
            hrv: metrics.hrv,
            resp_rate: metrics.resp_rate,
            spo2: metrics.spo2,
            sleep_hours: metrics.sleep_hours,
            step_count: metrics.step_count,
            caloric_burn: metrics.caloric_burn,
            body_temp: metrics.body_temp,
            blood_pressure: metrics.blood_pressure,
            source,
            processed: false,
            timestamp: now.to_string(),
            temperature: None,
            steps: None,
        }
    }

    /// Document ID: one record per user per millisecond.
    pub fn document_id(&self, unix_millis: i64) -> String {
        format!("{}_{}", self.user_id, unix_millis)
    }

    /// Metrics with legacy field names resolved.
    pub fn metrics(&self) -> HealthMetrics {
        HealthMetrics {
            heart_rate: self.heart_rate,
            hrv: self.hrv,
            resp_rate: self.resp_rate,
            spo2: self.spo2,
            sleep_hours: self.sleep_hours,
            step_count: self.resolved_step_count(),
            caloric_burn: self.caloric_burn,
            body_temp: self.resolved_body_temp(),
            blood_pressure: self.blood_pressure,
        }
    }

    /// Body temperature, falling back to the legacy `temperature` field.
    pub fn resolved_body_temp(&self) -> f64 {
        non_zero(self.body_temp).or(self.temperature).unwrap_or(0.0)
    }

    /// Step count, falling back to the legacy `steps` field.
    pub fn resolved_step_count(&self) -> f64 {
        non_zero(self.step_count).or(self.steps).unwrap_or(0.0)
    }
}

/// Stored record paired with its document ID.
#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub id: String,
    pub record: SmartwatchRecord,
}

/// Chart-ready projection of a stored record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct MetricPoint {
    pub id: String,
    /// `HH:MM` (UTC), or `--:--` if the timestamp is unreadable
    pub time: String,
    pub timestamp: String,
    pub heart_rate: f64,
    #[serde(rename = "systolicBP")]
    pub systolic_bp: f64,
    #[serde(rename = "diastolicBP")]
    pub diastolic_bp: f64,
    pub spo2: f64,
    pub temperature: f64,
    pub steps: f64,
}

impl From<&StoredRecord> for MetricPoint {
    fn from(stored: &StoredRecord) -> Self {
        let record = &stored.record;
        let time = crate::time_utils::parse_utc_rfc3339(&record.timestamp)
            .map(|dt| dt.format("%H:%M").to_string())
            .unwrap_or_else(|| "--:--".to_string());

        Self {
            id: stored.id.clone(),
            time,
            timestamp: record.timestamp.clone(),
            heart_rate: record.heart_rate,
            systolic_bp: record.blood_pressure.systolic,
            diastolic_bp: record.blood_pressure.diastolic,
            spo2: record.spo2,
            temperature: record.resolved_body_temp(),
            steps: record.resolved_step_count(),
        }
    }
}

fn non_zero(value: f64) -> Option<f64> {
    (value != 0.0).then_some(value)
}
