// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup. For local development a `.env` file
//! is honored.

use std::env;

const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";
const DEFAULT_ML_API_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_CHAT_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_CHAT_MODEL: &str = "mistralai/mistral-7b-instruct";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL (CORS origin and OAuth redirect base)
    pub frontend_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Base URL of the prediction / nutrition service
    pub ml_api_url: String,
    /// Chat-completions endpoint for the support bot
    pub chat_api_url: String,
    /// Model identifier sent to the chat endpoint
    pub chat_model: String,
    /// Google OAuth client ID for the Fitness API (public)
    pub google_fit_client_id: String,
    /// Where Google sends the browser after consent
    pub google_fit_redirect_uri: String,

    // --- Secrets ---
    /// Bearer key for the chat endpoint
    pub chat_api_key: String,
    /// Firebase Web API key (Identity Toolkit password sign-in)
    pub firebase_api_key: String,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// HMAC key for the Google Fit OAuth `state` parameter
    pub oauth_state_key: Vec<u8>,
}

impl Config {
    /// Config for tests only. Never reads the environment.
    pub fn test_default() -> Self {
        Self {
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            ml_api_url: DEFAULT_ML_API_URL.to_string(),
            chat_api_url: DEFAULT_CHAT_API_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            google_fit_client_id: "test-client-id.apps.googleusercontent.com".to_string(),
            google_fit_redirect_uri: format!("{}/oauth2callback", DEFAULT_FRONTEND_URL),
            chat_api_key: "test_chat_key".to_string(),
            firebase_api_key: "test_firebase_key".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            oauth_state_key: b"test_state_key_32_bytes_minimum!".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let frontend_url = env::var("FRONTEND_URL")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_FRONTEND_URL.to_string());

        let jwt_signing_key = env::var("JWT_SIGNING_KEY")
            .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
            .into_bytes();

        // The state key may be shared with the JWT key for local setups.
        let oauth_state_key = env::var("OAUTH_STATE_KEY")
            .map(|v| v.into_bytes())
            .unwrap_or_else(|_| jwt_signing_key.clone());

        Ok(Self {
            google_fit_redirect_uri: env::var("GOOGLE_FIT_REDIRECT_URI")
                .unwrap_or_else(|_| format!("{}/oauth2callback", frontend_url)),
            frontend_url,
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            ml_api_url: env::var("ML_API_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_ML_API_URL.to_string()),
            chat_api_url: env::var("CHAT_API_URL")
                .unwrap_or_else(|_| DEFAULT_CHAT_API_URL.to_string()),
            chat_model: env::var("CHAT_MODEL").unwrap_or_else(|_| DEFAULT_CHAT_MODEL.to_string()),
            google_fit_client_id: env::var("GOOGLE_FIT_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("GOOGLE_FIT_CLIENT_ID"))?,

            chat_api_key: env::var("CHAT_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("CHAT_API_KEY"))?,
            firebase_api_key: env::var("FIREBASE_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("FIREBASE_API_KEY"))?,
            jwt_signing_key,
            oauth_state_key,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("GOOGLE_FIT_CLIENT_ID", "test_id");
        env::set_var("CHAT_API_KEY", " chat_key \n");
        env::set_var("FIREBASE_API_KEY", "firebase_key");
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");
        env::remove_var("OAUTH_STATE_KEY");
        env::remove_var("ML_API_URL");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.google_fit_client_id, "test_id");
        assert_eq!(config.chat_api_key, "chat_key");
        assert_eq!(config.ml_api_url, "http://127.0.0.1:8000");
        assert_eq!(config.oauth_state_key, config.jwt_signing_key);
        assert!(config.google_fit_redirect_uri.ends_with("/oauth2callback"));
    }
}
