//! HTTP boundary in front of the limiter.
//!
//! Callers identify themselves with an `X-API-Key` header. Keys are issued and revoked
//! through `/v1/keys`; `/v1/ping` is the rate-limited resource and `/v1/limit` reports the
//! caller's quota without spending it.
//!
//! | Method   | Path             | Guard            | Success                          |
//! |----------|------------------|------------------|----------------------------------|
//! | `GET`    | `/health`        | none             | `200 {"ok": true}`               |
//! | `POST`   | `/v1/keys`       | none             | `201 {"api_key": "..."}`         |
//! | `DELETE` | `/v1/keys/{key}` | none             | `200 {"revoked": true}`          |
//! | `GET`    | `/v1/limit`      | [`auth_only`]    | `200` [`BucketStatus`](crate::BucketStatus) |
//! | `GET`    | `/v1/ping`       | [`auth_and_limit`] | `200 {"message": "pong"}`      |

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

use crate::RateLimiter;

mod auth;
pub use auth::*;

mod error;
pub use error::*;

pub mod handlers;

mod key_store;
pub use key_store::*;

mod logging;
pub use logging::*;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Issued API keys.
    pub keys: Arc<ApiKeyStore>,
    /// Per-key admission control.
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Bundle a key store and a limiter.
    pub fn new(keys: Arc<ApiKeyStore>, limiter: Arc<RateLimiter>) -> Self {
        Self { keys, limiter }
    }
}

/// Build the service router.
pub fn router(state: AppState) -> Router {
    let limited: Router<AppState> = Router::new()
        .route("/v1/ping", get(handlers::ping))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_and_limit));

    let authenticated: Router<AppState> = Router::new()
        .route("/v1/limit", get(handlers::limit_status))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_only));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/v1/keys", post(handlers::create_key))
        .route("/v1/keys/{key}", delete(handlers::revoke_key))
        .merge(limited)
        .merge(authenticated)
        .layer(middleware::from_fn(request_logging))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
