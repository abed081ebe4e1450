// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client for the ML service: risk prediction, nutrition plans and report
//! text extraction.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::AppError;
use crate::models::{MlInput, RiskLevel};

/// Nutrition generation calls out to an LLM and can be slow.
const NUTRITION_TIMEOUT: Duration = Duration::from_secs(10);

/// ML service API client.
#[derive(Clone)]
pub struct MlClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PredictResponse {
    #[serde(default)]
    risk_level: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct NutritionRequest<'a> {
    risk_level: &'a str,
    doctor_notes: &'a str,
}

#[derive(Deserialize)]
struct NutritionResponse {
    #[serde(default)]
    plan: serde_json::Value,
    #[serde(default)]
    risk_level: Option<serde_json::Value>,
}

/// Result of `POST /generate-nutrition-plan`.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedPlan {
    /// Free text or an already structured object.
    pub plan: serde_json::Value,
    /// Level the service says it planned for, when it echoes a recognizable one.
    pub risk_level: Option<RiskLevel>,
}

#[derive(Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    text: String,
}

/// FastAPI-style error body.
#[derive(Deserialize)]
struct ErrorDetail {
    detail: serde_json::Value,
}

impl MlClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `POST /predict-risk`. A missing or unrecognized label is an error.
    pub async fn predict_risk(&self, input: &MlInput) -> Result<RiskLevel, AppError> {
        let url = format!("{}/predict-risk", self.base_url);

        let response = self
            .http
            .post(&url)
            .json(input)
            .send()
            .await
            .map_err(|e| AppError::MlService(format!("Prediction request failed: {}", e)))?;

        let body: PredictResponse = self.check_response_json(response).await?;

        let label = body
            .risk_level
            .as_ref()
            .and_then(|v| v.as_str())
            .ok_or_else(|| AppError::MlService("Prediction response has no risk level".to_string()))?;

        RiskLevel::from_label(label)
            .ok_or_else(|| AppError::MlService(format!("Unrecognized risk level: {}", label)))
    }

    /// `POST /generate-nutrition-plan`. Returns the raw `plan` value and the
    /// echoed risk level, if any.
    pub async fn generate_nutrition_plan(
        &self,
        risk_level: RiskLevel,
        doctor_notes: &str,
    ) -> Result<GeneratedPlan, AppError> {
        let url = format!("{}/generate-nutrition-plan", self.base_url);

        let response = self
            .http
            .post(&url)
            .timeout(NUTRITION_TIMEOUT)
            .json(&NutritionRequest {
                risk_level: risk_level.as_str(),
                doctor_notes,
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::MlService("Nutrition plan generation timed out".to_string())
                } else {
                    AppError::MlService(format!("Nutrition request failed: {}", e))
                }
            })?;

        let body: NutritionResponse = self.check_response_json(response).await?;
        if body.plan.is_null() {
            return Err(AppError::MlService(
                "Nutrition response has no plan".to_string(),
            ));
        }

        let echoed = body
            .risk_level
            .as_ref()
            .and_then(|v| v.as_str())
            .and_then(RiskLevel::from_label);
        Ok(GeneratedPlan {
            plan: body.plan,
            risk_level: echoed,
        })
    }

    /// `POST /extract-report` with the PDF as multipart `file`.
    pub async fn extract_report(&self, file_name: &str, pdf: Vec<u8>) -> Result<String, AppError> {
        let url = format!("{}/extract-report", self.base_url);

        let part = reqwest::multipart::Part::bytes(pdf)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid MIME type: {}", e)))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::MlService(format!("Report upload failed: {}", e)))?;

        let body: ExtractResponse = self.check_response_json(response).await?;
        Ok(body.text)
    }

    /// Check response and parse JSON body, surfacing `detail` on failure.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            let message = serde_json::from_str::<ErrorDetail>(&body)
                .ok()
                .map(|e| match e.detail {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .unwrap_or(body);

            tracing::warn!(status = %status, error = %message, "ML service returned an error");
            return Err(AppError::MlService(format!("HTTP {}: {}", status, message)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::MlService(format!("JSON parse error: {}", e)))
    }
}
