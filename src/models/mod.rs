// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod analytics;
pub mod cycle;
pub mod metrics;
pub mod nutrition;
pub mod prediction;
pub mod report;
pub mod user;

pub use analytics::{RiskAnalytics, TrendPoint, UserSummary};
pub use cycle::CyclePhase;
pub use metrics::{BloodPressure, HealthMetrics, MetricPoint, MetricsSource, SmartwatchRecord, StoredRecord};
pub use nutrition::{NutritionPlan, NutritionRecord};
pub use prediction::{MlInput, PredictionErrorRecord, PredictionRecord, RiskLevel};
pub use report::DoctorReport;
pub use user::{FitToken, HormonalSymptoms, ProfilePatch, Role, UserProfile};
