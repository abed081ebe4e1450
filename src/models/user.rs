// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User profile model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::RiskLevel;

/// Account role, stored on the user document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    /// Route the client should open after login.
    pub fn home_route(&self) -> &'static str {
        match self {
            Role::Admin => "/admin",
            Role::User => "/user",
        }
    }
}

/// Self-reported hormonal symptom severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum HormonalSymptoms {
    Mild,
    #[default]
    Moderate,
    Severe,
}

impl HormonalSymptoms {
    pub fn as_str(&self) -> &'static str {
        match self {
            HormonalSymptoms::Mild => "Mild",
            HormonalSymptoms::Moderate => "Moderate",
            HormonalSymptoms::Severe => "Severe",
        }
    }
}

fn default_age() -> u32 {
    25
}
fn default_systolic() -> u32 {
    120
}
fn default_diastolic() -> u32 {
    80
}
fn default_body_temp() -> f64 {
    98.0
}
fn default_cycle_length() -> u32 {
    28
}
fn default_bs_baseline() -> f64 {
    5.0
}

/// User document stored in Firestore at `users/{uid}`.
///
/// Every health field has a default so that a partially filled (or missing)
/// document still yields a usable profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default = "default_age")]
    pub age: u32,
    #[serde(default = "default_systolic", rename = "systolicBP")]
    pub systolic_bp: u32,
    #[serde(default = "default_diastolic", rename = "diastolicBP")]
    pub diastolic_bp: u32,
    #[serde(default = "default_body_temp")]
    pub body_temp: f64,
    #[serde(default = "default_cycle_length")]
    pub cycle_length: u32,
    /// `YYYY-MM-DD`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_period_date: Option<String>,
    #[serde(default)]
    pub hormonal_symptoms: HormonalSymptoms,
    #[serde(default = "default_bs_baseline")]
    pub bs_baseline: f64,
    #[serde(
        default,
        deserialize_with = "crate::models::prediction::lenient_risk_level",
        skip_serializing_if = "Option::is_none"
    )]
    pub risk_level: Option<RiskLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pregnancy_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            email: None,
            role: Role::User,
            age: default_age(),
            systolic_bp: default_systolic(),
            diastolic_bp: default_diastolic(),
            body_temp: default_body_temp(),
            cycle_length: default_cycle_length(),
            last_period_date: None,
            hormonal_symptoms: HormonalSymptoms::Moderate,
            bs_baseline: default_bs_baseline(),
            risk_level: None,
            pregnancy_status: None,
            created_at: None,
            last_updated: None,
        }
    }
}

impl UserProfile {
    /// Fresh document for a user signing in for the first time.
    pub fn new_account(email: Option<String>, now: &str) -> Self {
        Self {
            email,
            created_at: Some(now.to_string()),
            last_updated: Some(now.to_string()),
            ..Self::default()
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Partial write to `users/{uid}`. Only the fields that are set are sent,
/// under a field mask, so everything else on the document is left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, rename = "systolicBP", skip_serializing_if = "Option::is_none")]
    pub systolic_bp: Option<u32>,
    #[serde(default, rename = "diastolicBP", skip_serializing_if = "Option::is_none")]
    pub diastolic_bp: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_temp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_period_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hormonal_symptoms: Option<HormonalSymptoms>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bs_baseline: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pregnancy_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

impl ProfilePatch {
    /// Document field paths for the update mask, one per set field.
    pub fn field_paths(&self) -> Vec<&'static str> {
        let mut paths = Vec::new();
        let mut push = |set: bool, path: &'static str| {
            if set {
                paths.push(path);
            }
        };

        push(self.age.is_some(), "age");
        push(self.systolic_bp.is_some(), "systolicBP");
        push(self.diastolic_bp.is_some(), "diastolicBP");
        push(self.body_temp.is_some(), "bodyTemp");
        push(self.cycle_length.is_some(), "cycleLength");
        push(self.last_period_date.is_some(), "lastPeriodDate");
        push(self.hormonal_symptoms.is_some(), "hormonalSymptoms");
        push(self.bs_baseline.is_some(), "bsBaseline");
        push(self.pregnancy_status.is_some(), "pregnancyStatus");
        push(self.last_updated.is_some(), "lastUpdated");
        paths
    }
}

/// Google Fit access token held on behalf of a user.
///
/// Stored at `fitTokens/{uid}`. Implicit-grant tokens cannot be refreshed,
/// so once `expires_at` passes the user has to reconnect.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FitToken {
    pub access_token: String,
    /// RFC3339
    pub expires_at: String,
    #[serde(default)]
    pub scopes: Vec<String>,
}
