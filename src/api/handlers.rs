//! Route handlers. Authentication and rate limiting happen in the route layers.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::{Value, json};

use crate::{
    BucketStatus,
    api::{ApiError, ApiKey, AppState},
};

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// `POST /v1/keys`
pub async fn create_key(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let key = state.keys.create()?;
    tracing::info!("api key issued");

    Ok((StatusCode::CREATED, Json(json!({ "api_key": key }))))
}

/// `DELETE /v1/keys/{key}`
pub async fn revoke_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if !state.keys.revoke(&key) {
        return Err(ApiError::KeyNotFound);
    }

    tracing::info!("api key revoked");
    Ok(Json(json!({ "revoked": true })))
}

/// `GET /v1/ping`, behind the rate limit.
pub async fn ping() -> Json<Value> {
    Json(json!({ "message": "pong" }))
}

/// `GET /v1/limit`: the caller's current quota, without spending a token.
pub async fn limit_status(
    State(state): State<AppState>,
    Extension(ApiKey(key)): Extension<ApiKey>,
) -> Result<Json<BucketStatus>, ApiError> {
    state
        .limiter
        .status(&key)
        .map(Json)
        .ok_or(ApiError::BucketNotInitialized)
}
