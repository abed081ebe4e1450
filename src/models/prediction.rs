// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Risk prediction model: the feature vector sent to the ML service and the
//! records stored under `users/{uid}/predictions`.

use serde::{Deserialize, Deserializer, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Pregnancy risk level as returned by the prediction service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Match a model label case-insensitively. The training data labels the
    /// middle class "Moderate" in places, so that is accepted too. Every
    /// label may carry a trailing " risk".
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().to_ascii_lowercase();
        let base = label.strip_suffix(" risk").unwrap_or(&label).trim_end();
        match base {
            "low" => Some(RiskLevel::Low),
            "medium" | "moderate" | "mid" => Some(RiskLevel::Medium),
            "high" => Some(RiskLevel::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    /// Numeric level used for the admin trend chart.
    pub fn trend_score(level: Option<RiskLevel>) -> u8 {
        match level {
            Some(RiskLevel::High) => 3,
            Some(RiskLevel::Medium) => 2,
            _ => 1,
        }
    }

    /// Advice shown next to a user's current risk level.
    pub fn advice(level: Option<RiskLevel>) -> &'static str {
        match level {
            Some(RiskLevel::High) => {
                "Please consult your doctor immediately and follow the recommended precautions."
            }
            Some(RiskLevel::Medium) => {
                "Monitor your health regularly and follow the suggested nutrition plan."
            }
            Some(RiskLevel::Low) => "Your risk factors are minimal. Maintain your healthy habits.",
            None => "Risk assessment not available. Please complete health analysis.",
        }
    }

    /// One-line health insight for the overview panel.
    pub fn insight(level: Option<RiskLevel>) -> &'static str {
        match level {
            Some(RiskLevel::High) => {
                "Your recent health metrics indicate elevated risk factors that require attention."
            }
            Some(RiskLevel::Medium) => {
                "Your health metrics show some areas that could benefit from improvement."
            }
            _ => "Your health metrics are within normal ranges. Keep up the good work!",
        }
    }
}

impl TryFrom<String> for RiskLevel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        RiskLevel::from_label(&value).ok_or_else(|| format!("unknown risk level: {}", value))
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deserialize an optional risk level, treating unknown or malformed values as
/// absent. Documents written by other clients are not always clean.
pub fn lenient_risk_level<'de, D>(deserializer: D) -> Result<Option<RiskLevel>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(|v| v.as_str())
        .and_then(RiskLevel::from_label))
}

/// Feature vector accepted by `POST /predict-risk`.
///
/// Field names are fixed by the model's training columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlInput {
    #[serde(rename = "Age")]
    pub age: f64,
    #[serde(rename = "SystolicBP")]
    pub systolic_bp: f64,
    #[serde(rename = "DiastolicBP")]
    pub diastolic_bp: f64,
    #[serde(rename = "BodyTemp")]
    pub body_temp: f64,
    #[serde(rename = "HeartRate")]
    pub heart_rate: f64,
    #[serde(rename = "HRV")]
    pub hrv: f64,
    #[serde(rename = "Resp_Rate")]
    pub resp_rate: f64,
    #[serde(rename = "SpO2")]
    pub spo2: f64,
    #[serde(rename = "Sleep_Hours")]
    pub sleep_hours: f64,
    #[serde(rename = "Step_Count")]
    pub step_count: f64,
    #[serde(rename = "Caloric_Burn")]
    pub caloric_burn: f64,
    #[serde(rename = "Cycle_Length")]
    pub cycle_length: f64,
    #[serde(rename = "Hormonal_Symptoms")]
    pub hormonal_symptoms: String,
    #[serde(rename = "BS")]
    pub bs: f64,
}

/// Prediction stored at `users/{uid}/predictions/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRecord {
    pub risk_level: RiskLevel,
    pub input_features: MlInput,
    /// Smartwatch document the features were built from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watch_data_id: Option<String>,
    /// RFC3339
    pub timestamp: String,
}

/// Failed prediction attempt stored at `users/{uid}/predictionErrors/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionErrorRecord {
    pub error: String,
    pub input: MlInput,
    pub timestamp: String,
}
