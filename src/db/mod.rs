// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Top-level, one document per reading (`{uid}_{unix_millis}`)
    pub const SMARTWATCH_DATA: &str = "smartwatchData";
    /// Google Fit access tokens (keyed by uid)
    pub const FIT_TOKENS: &str = "fitTokens";

    // Subcollections under `users/{uid}`
    pub const PREDICTIONS: &str = "predictions";
    pub const PREDICTION_ERRORS: &str = "predictionErrors";
    pub const REPORTS: &str = "reports";
    pub const NUTRITION_PLANS: &str = "nutritionPlans";
}
