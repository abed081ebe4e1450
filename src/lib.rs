// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pregnancy Support: health monitoring backend for expectant mothers
//!
//! Collects smartwatch readings (Google Fit or generated), runs them through
//! an external risk model together with the user's profile, and serves
//! nutrition plans, a chat assistant and an admin risk overview.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{ChatService, GoogleFitService, HealthPipeline, IdentityClient, MlClient};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub google_fit: GoogleFitService,
    pub ml: MlClient,
    pub chat: ChatService,
    pub identity: IdentityClient,
    pub pipeline: HealthPipeline,
}
