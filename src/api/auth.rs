use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::api::{ApiError, AppState};

/// Header carrying the caller identity.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Authenticated caller, inserted into request extensions by the auth middlewares.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiKey(pub String);

/// Reject requests without a valid key. Does not touch the caller's quota.
pub async fn auth_only(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = authenticate(&state, &request)?;
    request.extensions_mut().insert(ApiKey(key));

    Ok(next.run(request).await)
}

/// Authenticate, then spend one token from the caller's bucket.
pub async fn auth_and_limit(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = authenticate(&state, &request)?;

    if !state.limiter.allow(&key) {
        return Err(ApiError::RateLimited);
    }

    request.extensions_mut().insert(ApiKey(key));

    Ok(next.run(request).await)
}

fn authenticate(state: &AppState, request: &Request) -> Result<String, ApiError> {
    let key = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .ok_or(ApiError::MissingApiKey)?;

    if !state.keys.exists(key) {
        return Err(ApiError::InvalidApiKey);
    }

    Ok(key.to_owned())
}
