// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running
//! (`FIRESTORE_EMULATOR_HOST`); they skip themselves otherwise.

use chrono::{Duration, TimeZone, Utc};
use pregnancy_support::models::{
    DoctorReport, FitToken, HealthMetrics, MetricsSource, MlInput, NutritionPlan,
    NutritionRecord, PredictionRecord, ProfilePatch, RiskLevel, Role, SmartwatchRecord,
    UserProfile,
};
use pregnancy_support::services::MockMetricsGenerator;
use pregnancy_support::time_utils::format_utc_rfc3339;
use rand::{rngs::StdRng, SeedableRng};

mod common;
use common::test_db;

/// Unique uid per test run.
fn unique_uid(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}-{}", prefix, nanos)
}

fn metrics(seed: u64) -> HealthMetrics {
    MockMetricsGenerator.generate(&mut StdRng::seed_from_u64(seed))
}

fn features() -> MlInput {
    MlInput {
        age: 30.0,
        systolic_bp: 118.0,
        diastolic_bp: 76.0,
        body_temp: 98.4,
        heart_rate: 82.0,
        hrv: 50.0,
        resp_rate: 17.0,
        spo2: 98.0,
        sleep_hours: 7.0,
        step_count: 5000.0,
        caloric_burn: 2000.0,
        cycle_length: 28.0,
        hormonal_symptoms: "Mild".to_string(),
        bs: 5.1,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// USER TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_user_profile_roundtrip() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("user");

    assert!(db.get_user(&uid).await.unwrap().is_none());

    let profile = UserProfile {
        age: 33,
        last_period_date: Some("2025-02-01".to_string()),
        ..UserProfile::new_account(Some("mom@example.com".to_string()), "2025-02-10T00:00:00.000Z")
    };
    db.upsert_user(&uid, &profile).await.unwrap();

    let stored = db.get_user(&uid).await.unwrap().unwrap();
    assert_eq!(stored, profile);
    assert_eq!(stored.role, Role::User);
}

#[tokio::test]
async fn test_set_risk_level_keeps_profile() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("risk");

    let profile = UserProfile {
        age: 27,
        ..UserProfile::default()
    };
    db.upsert_user(&uid, &profile).await.unwrap();
    db.set_user_risk_level(&uid, RiskLevel::High, "2025-03-01T10:00:00.000Z")
        .await
        .unwrap();

    let stored = db.get_user(&uid).await.unwrap().unwrap();
    assert_eq!(stored.age, 27);
    assert_eq!(stored.risk_level, Some(RiskLevel::High));
    assert_eq!(stored.last_updated.as_deref(), Some("2025-03-01T10:00:00.000Z"));

    let listed = db.list_users().await.unwrap();
    assert!(listed.iter().any(|(id, _)| id == &uid));
}

#[tokio::test]
async fn test_fit_token_lifecycle() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("fit");

    let token = FitToken {
        access_token: "ya29.test".to_string(),
        expires_at: format_utc_rfc3339(Utc::now() + Duration::hours(1)),
        scopes: vec!["fitness.activity.read".to_string()],
    };
    db.set_fit_token(&uid, &token).await.unwrap();

    let stored = db.get_fit_token(&uid).await.unwrap().unwrap();
    assert_eq!(stored.access_token, "ya29.test");

    db.delete_fit_token(&uid).await.unwrap();
    assert!(db.get_fit_token(&uid).await.unwrap().is_none());
}

// ═══════════════════════════════════════════════════════════════════════════
// SMARTWATCH DATA TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_smartwatch_records_newest_first() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("watch");
    assert!(!db.has_smartwatch_data(&uid).await.unwrap());

    let base = Utc.with_ymd_and_hms(2025, 4, 1, 8, 0, 0).unwrap();
    let mut ids = Vec::new();
    for i in 0..3 {
        let at = base + Duration::minutes(i);
        let record = SmartwatchRecord::new(
            &uid,
            metrics(i as u64),
            MetricsSource::Mock,
            &format_utc_rfc3339(at),
        );
        ids.push(
            db.add_smartwatch_record(&record, at.timestamp_millis())
                .await
                .unwrap(),
        );
    }

    assert!(db.has_smartwatch_data(&uid).await.unwrap());

    let recent = db.recent_smartwatch_records(&uid, 2).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].id, ids[2]);
    assert_eq!(recent[1].id, ids[1]);

    let latest = db.latest_smartwatch_record(&uid).await.unwrap().unwrap();
    assert_eq!(latest.id, ids[2]);
    assert!(!latest.record.processed);

    db.mark_processed(&latest.id).await.unwrap();
    let latest = db.latest_smartwatch_record(&uid).await.unwrap().unwrap();
    assert!(latest.record.processed);
    assert_eq!(latest.record.source, MetricsSource::Mock);
}

// ═══════════════════════════════════════════════════════════════════════════
// SUBCOLLECTION TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_latest_prediction() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("pred");

    assert!(db.latest_prediction(&uid).await.unwrap().is_none());

    for (id, level, ts) in [
        ("1", RiskLevel::Low, "2025-05-01T00:00:00.000Z"),
        ("2", RiskLevel::High, "2025-05-02T00:00:00.000Z"),
    ] {
        let record = PredictionRecord {
            risk_level: level,
            input_features: features(),
            watch_data_id: None,
            timestamp: ts.to_string(),
        };
        db.add_prediction(&uid, id, &record).await.unwrap();
    }

    let latest = db.latest_prediction(&uid).await.unwrap().unwrap();
    assert_eq!(latest.risk_level, RiskLevel::High);
    assert_eq!(latest.input_features, features());
}

#[tokio::test]
async fn test_latest_report_and_nutrition() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("care");

    for (id, text, at) in [
        ("1", "old notes", "2025-01-01T00:00:00.000Z"),
        ("2", "gestational diabetes watch", "2025-02-01T00:00:00.000Z"),
    ] {
        let report = DoctorReport {
            file_name: format!("{}.pdf", id),
            text: text.to_string(),
            uploaded_at: at.to_string(),
        };
        db.add_report(&uid, id, &report).await.unwrap();
    }
    let report = db.latest_report(&uid).await.unwrap().unwrap();
    assert_eq!(report.text, "gestational diabetes watch");

    let record = NutritionRecord {
        risk_level: RiskLevel::Medium,
        plan: NutritionPlan::parse_text("Breakfast: Oats\nLunch: Lentils"),
        generated_at: "2025-02-02T00:00:00.000Z".to_string(),
        timestamp: "2025-02-02T00:00:00.000Z".to_string(),
    };
    db.add_nutrition_plan(&uid, "1", &record).await.unwrap();

    let stored = db.latest_nutrition_plan(&uid).await.unwrap().unwrap();
    assert_eq!(stored.risk_level, RiskLevel::Medium);
    assert_eq!(stored.plan.breakfast, "Oats");
}

#[tokio::test]
async fn test_profile_patch_keeps_other_fields() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("patch");

    let profile = UserProfile {
        age: 31,
        ..UserProfile::new_account(Some("mom@example.com".to_string()), "2025-06-01T00:00:00.000Z")
    };
    db.upsert_user(&uid, &profile).await.unwrap();
    db.set_user_risk_level(&uid, RiskLevel::High, "2025-06-01T01:00:00.000Z")
        .await
        .unwrap();

    let patch = ProfilePatch {
        systolic_bp: Some(124),
        last_updated: Some("2025-06-01T02:00:00.000Z".to_string()),
        ..ProfilePatch::default()
    };
    db.update_user_fields(&uid, &patch).await.unwrap();

    let stored = db.get_user(&uid).await.unwrap().unwrap();
    assert_eq!(stored.systolic_bp, 124);
    assert_eq!(stored.age, 31);
    assert_eq!(stored.risk_level, Some(RiskLevel::High));
    assert_eq!(stored.email.as_deref(), Some("mom@example.com"));
    assert_eq!(stored.last_updated.as_deref(), Some("2025-06-01T02:00:00.000Z"));
}

#[tokio::test]
async fn test_profile_patch_creates_missing_user() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("patch-new");

    let patch = ProfilePatch {
        age: Some(26),
        last_updated: Some("2025-06-01T00:00:00.000Z".to_string()),
        ..ProfilePatch::default()
    };
    db.update_user_fields(&uid, &patch).await.unwrap();

    let stored = db.get_user(&uid).await.unwrap().unwrap();
    assert_eq!(stored.age, 26);
    assert_eq!(stored.role, Role::User);
}
