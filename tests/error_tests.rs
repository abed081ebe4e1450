// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use pregnancy_support::error::AppError;

#[test]
fn test_is_google_fit_token_error_matches() {
    let err = AppError::GoogleFitApi(AppError::GOOGLE_FIT_TOKEN_ERROR.to_string());
    assert!(err.is_google_fit_token_error());

    let err = AppError::GoogleFitApi("HTTP 401: invalid_token".to_string());
    assert!(err.is_google_fit_token_error());

    let err = AppError::GoogleFitApi("status UNAUTHENTICATED".to_string());
    assert!(err.is_google_fit_token_error());
}

#[test]
fn test_is_google_fit_token_error_no_match() {
    let err = AppError::GoogleFitApi(AppError::GOOGLE_FIT_RATE_LIMIT.to_string());
    assert!(!err.is_google_fit_token_error());

    let err = AppError::GoogleFitApi("HTTP 500: backend error".to_string());
    assert!(!err.is_google_fit_token_error());

    let err = AppError::MlService(AppError::GOOGLE_FIT_TOKEN_ERROR.to_string());
    assert!(!err.is_google_fit_token_error());
}

async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_status_codes() {
    let cases = [
        (AppError::Unauthorized, StatusCode::UNAUTHORIZED),
        (AppError::InvalidCredentials, StatusCode::UNAUTHORIZED),
        (AppError::Forbidden("x".into()), StatusCode::FORBIDDEN),
        (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
        (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
        (AppError::GoogleFitApi("x".into()), StatusCode::BAD_GATEWAY),
        (AppError::MlService("x".into()), StatusCode::BAD_GATEWAY),
        (AppError::Identity("x".into()), StatusCode::BAD_GATEWAY),
        (AppError::Database("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
    ];

    for (err, expected) in cases {
        let label = err.to_string();
        let (status, _) = body_json(err).await;
        assert_eq!(status, expected, "{}", label);
    }
}

#[tokio::test]
async fn test_internal_details_not_leaked() {
    let (_, body) = body_json(AppError::Database("projects/x/databases/(default)".into())).await;
    assert_eq!(body["error"], "database_error");
    assert!(body.get("details").is_none());

    let (_, body) = body_json(AppError::Identity("API key not valid".into())).await;
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn test_client_errors_carry_details() {
    let (_, body) = body_json(AppError::BadRequest("age out of range".into())).await;
    assert_eq!(body["error"], "bad_request");
    assert_eq!(body["details"], "age out of range");

    let (_, body) = body_json(AppError::InvalidCredentials).await;
    assert_eq!(body["details"], "Invalid email or password");
}
