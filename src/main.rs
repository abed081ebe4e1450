// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pregnancy Support API Server
//!
//! Health monitoring backend: Google Fit ingestion, risk prediction,
//! nutrition plans and the support chat.

use pregnancy_support::{
    config::Config,
    db::FirestoreDb,
    services::{
        ChatService, GoogleFitClient, GoogleFitService, HealthPipeline, IdentityClient, MlClient,
        TokenCache,
    },
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Pregnancy Support API");

    let db = FirestoreDb::new(&config.gcp_project_id).await?;

    // Access tokens are cached per Cloud Run instance
    let token_cache: TokenCache = Arc::new(dashmap::DashMap::new());

    let google_fit = GoogleFitService::new(
        GoogleFitClient::new(),
        db.clone(),
        token_cache,
        config.google_fit_client_id.clone(),
        config.google_fit_redirect_uri.clone(),
        config.oauth_state_key.clone(),
    );

    let ml = MlClient::new(&config.ml_api_url);
    tracing::info!(url = %config.ml_api_url, "ML service configured");

    let chat = ChatService::new(&config.chat_api_url, &config.chat_api_key, &config.chat_model);
    let identity = IdentityClient::new(&config.firebase_api_key);
    let pipeline = HealthPipeline::new(db.clone(), google_fit.clone(), ml.clone());

    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        google_fit,
        ml,
        chat,
        identity,
        pipeline,
    });

    let app = pregnancy_support::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pregnancy_support=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
