// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use pregnancy_support::config::Config;
use pregnancy_support::db::FirestoreDb;
use pregnancy_support::middleware::auth::create_jwt;
use pregnancy_support::models::Role;
use pregnancy_support::routes::create_router;
use pregnancy_support::services::{
    ChatService, GoogleFitClient, GoogleFitService, HealthPipeline, IdentityClient, MlClient,
};
use pregnancy_support::AppState;
use std::sync::Arc;

/// Nothing listens here, so outbound calls fail fast.
#[allow(dead_code)]
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:9";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Where the outbound clients of a test app point.
#[allow(dead_code)]
pub struct TestEndpoints {
    pub ml: String,
    pub chat: String,
    pub identity: String,
    pub google_fit: String,
}

impl Default for TestEndpoints {
    fn default() -> Self {
        Self {
            ml: UNREACHABLE_URL.to_string(),
            chat: UNREACHABLE_URL.to_string(),
            identity: UNREACHABLE_URL.to_string(),
            google_fit: UNREACHABLE_URL.to_string(),
        }
    }
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with(TestEndpoints::default())
}

/// Test app whose HTTP clients talk to the given (usually wiremock) URLs.
#[allow(dead_code)]
pub fn create_test_app_with(endpoints: TestEndpoints) -> (axum::Router, Arc<AppState>) {
    build_app(endpoints, test_db_offline())
}

/// Test app backed by the Firestore emulator.
#[allow(dead_code)]
pub async fn create_emulator_app_with(endpoints: TestEndpoints) -> (axum::Router, Arc<AppState>) {
    build_app(endpoints, test_db().await)
}

fn build_app(endpoints: TestEndpoints, db: FirestoreDb) -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();

    let google_fit = GoogleFitService::new(
        GoogleFitClient::with_base_url(&endpoints.google_fit),
        db.clone(),
        Arc::new(dashmap::DashMap::new()),
        config.google_fit_client_id.clone(),
        config.google_fit_redirect_uri.clone(),
        config.oauth_state_key.clone(),
    );
    let ml = MlClient::new(&endpoints.ml);
    let chat = ChatService::new(&endpoints.chat, &config.chat_api_key, &config.chat_model);
    let identity = IdentityClient::with_base_url(&endpoints.identity, &config.firebase_api_key);
    let pipeline = HealthPipeline::new(db.clone(), google_fit.clone(), ml.clone());

    let state = Arc::new(AppState {
        config,
        db,
        google_fit,
        ml,
        chat,
        identity,
        pipeline,
    });

    (create_router(state.clone()), state)
}

/// Session token for `uid` with the given role.
#[allow(dead_code)]
pub fn create_test_jwt(uid: &str, role: Role, signing_key: &[u8]) -> String {
    create_jwt(uid, role, signing_key).expect("JWT creation failed")
}
