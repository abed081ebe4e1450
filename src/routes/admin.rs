// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin dashboard routes. Mounted behind `require_auth` + `require_admin`.

use axum::{extract::State, routing::get, Extension, Json, Router};
use std::sync::Arc;

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::{RiskAnalytics, UserSummary};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/analytics", get(analytics))
        .route("/api/admin/users", get(list_users))
}

/// Risk counts and trend across all non-admin users.
async fn analytics(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
) -> Result<Json<RiskAnalytics>> {
    let users = state.db.list_users().await?;
    tracing::info!(admin_id = %admin.uid, users = users.len(), "Admin analytics");

    Ok(Json(RiskAnalytics::from_users(
        users.iter().map(|(id, profile)| (id.as_str(), profile)),
    )))
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(_admin): Extension<AuthUser>,
) -> Result<Json<Vec<UserSummary>>> {
    let users = state.db.list_users().await?;

    Ok(Json(UserSummary::list(
        users.iter().map(|(id, profile)| (id.as_str(), profile)),
    )))
}
