// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session routes: email/password login, Google sign-in and logout.

use axum::{
    extract::State,
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, SESSION_COOKIE};
use crate::models::{Role, UserProfile};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/google", post(google_login))
        .route("/auth/logout", get(logout))
}

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GoogleLoginRequest {
    /// Google ID token from the browser's sign-in popup
    #[validate(length(min = 1, max = 8192))]
    pub id_token: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LoginResponse {
    pub token: String,
    pub role: Role,
    /// Client route to open next
    pub redirect: String,
}

/// Verify credentials, make sure a user document exists, start a session.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    // Malformed input gets the same answer as bad credentials
    if body.validate().is_err() {
        return Err(AppError::InvalidCredentials);
    }

    let user = state
        .identity
        .sign_in_with_password(&body.email, &body.password)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let email = user.email.or(Some(body.email));
    start_session(&state, jar, user.local_id, email, "password").await
}

/// Google sign-in: the browser obtains a Google ID token, the Identity
/// Toolkit maps it to a Firebase account, and a session starts as for
/// password login.
async fn google_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<GoogleLoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    if body.validate().is_err() {
        return Err(AppError::InvalidCredentials);
    }

    let user = state
        .identity
        .sign_in_with_google(&body.id_token, &state.config.frontend_url)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    start_session(&state, jar, user.local_id, user.email, "google").await
}

/// Resolve the role, issue the JWT and set the session cookie.
async fn start_session(
    state: &AppState,
    jar: CookieJar,
    uid: String,
    email: Option<String>,
    method: &str,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    let role = resolve_role(state, &uid, email).await;

    let jwt = create_jwt(&uid, role, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    tracing::info!(user_id = %uid, role = role.as_str(), method, "User logged in");

    let cookie = Cookie::build((SESSION_COOKIE, jwt.clone()))
        .path("/")
        .http_only(true)
        .secure(state.config.frontend_url.starts_with("https://"))
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(30));

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            token: jwt,
            role,
            redirect: role.home_route().to_string(),
        }),
    ))
}

/// Role from the user document. First logins get a new `user` document;
/// lookup failures fall back to `user` rather than blocking sign-in.
async fn resolve_role(state: &AppState, uid: &str, email: Option<String>) -> Role {
    match state.db.get_user(uid).await {
        Ok(Some(profile)) => profile.role,
        Ok(None) => {
            let now = format_utc_rfc3339(chrono::Utc::now());
            let profile = UserProfile::new_account(email, &now);
            if let Err(e) = state.db.upsert_user(uid, &profile).await {
                tracing::warn!(user_id = uid, error = %e, "Failed to create user document");
            } else {
                tracing::info!(user_id = uid, "Created user document");
            }
            Role::User
        }
        Err(e) => {
            tracing::warn!(user_id = uid, error = %e, "Role lookup failed, defaulting to user");
            Role::User
        }
    }
}

/// Logout - clear the session cookie and send the browser home.
async fn logout(jar: CookieJar) -> (CookieJar, Redirect) {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Redirect::temporary("/"))
}
