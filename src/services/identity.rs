// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sign-in against the Firebase Identity Toolkit REST API: email/password,
//! and Google via a Google ID token obtained by the browser.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com";

/// Account that signed in successfully.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedInUser {
    /// Firebase uid
    pub local_id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

/// `signInWithIdp` body. `post_body` carries the provider credential in
/// form encoding.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpSignInRequest<'a> {
    post_body: String,
    request_uri: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorInfo,
}

#[derive(Deserialize)]
struct ErrorInfo {
    #[serde(default)]
    message: String,
}

/// Identity Toolkit client.
#[derive(Clone)]
pub struct IdentityClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl IdentityClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(IDENTITY_TOOLKIT_URL, api_key)
    }

    pub fn with_base_url(base_url: &str, api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Verify a password.
    ///
    /// Returns `Ok(None)` when the provider rejects the credentials (unknown
    /// email, wrong password, disabled account); errors are reserved for the
    /// provider itself failing.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<SignedInUser>, AppError> {
        self.sign_in(
            "signInWithPassword",
            &SignInRequest {
                email,
                password,
                return_secure_token: true,
            },
        )
        .await
    }

    /// Exchange a Google ID token for the matching Firebase account, creating
    /// it on first use. `request_uri` is the origin the token was issued to.
    ///
    /// Returns `Ok(None)` when the token is rejected.
    pub async fn sign_in_with_google(
        &self,
        id_token: &str,
        request_uri: &str,
    ) -> Result<Option<SignedInUser>, AppError> {
        if !is_token_safe(id_token) {
            tracing::info!("Google ID token has unexpected characters");
            return Ok(None);
        }

        self.sign_in(
            "signInWithIdp",
            &IdpSignInRequest {
                post_body: format!("id_token={}&providerId=google.com", id_token),
                request_uri,
                return_secure_token: true,
            },
        )
        .await
    }

    async fn sign_in<B: Serialize>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<Option<SignedInUser>, AppError> {
        let url = format!("{}/v1/accounts:{}", self.base_url, method);

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Identity(format!("Sign-in request failed: {}", e)))?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or_default();
            tracing::info!(method, status = %status, reason = %reason, "Sign-in rejected");
            return Ok(None);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Identity(format!("HTTP {}: {}", status, body)));
        }

        let user = response
            .json()
            .await
            .map_err(|e| AppError::Identity(format!("JSON parse error: {}", e)))?;
        Ok(Some(user))
    }
}

/// A JWT is base64url segments joined by dots, so it can go into the form
/// body unescaped. Anything else is refused outright.
fn is_token_safe(token: &str) -> bool {
    !token.is_empty()
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_charset() {
        assert!(is_token_safe("eyJhbGciOiJSUzI1NiJ9.eyJzdWIiOiIxIn0.c2ln-_"));
        assert!(!is_token_safe(""));
        assert!(!is_token_safe("abc&providerId=evil"));
        assert!(!is_token_safe("abc def"));
    }
}
