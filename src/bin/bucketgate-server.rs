//! HTTP server: issues API keys and rate limits `/v1/ping` per key.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use bucketgate::{
    BucketgateError, RateLimiter,
    api::{self, ApiKeyStore, AppState},
    config::{self, ServerConfig},
};
use clap::Parser;
use tokio::{net::TcpListener, signal, sync::Notify};

#[tokio::main]
async fn main() -> Result<(), BucketgateError> {
    let config = ServerConfig::parse();
    config::init_tracing(config.log_format)?;

    let limiter = Arc::new(RateLimiter::new(config.rate_limiter_options()?));
    if config.cleanup_enabled() {
        limiter.run_cleanup_loop_with_config(config.cleanup_stale_ms, config.cleanup_interval_ms);
    }

    tracing::info!(
        capacity = config.capacity,
        refill_per_minute = config.refill_per_minute,
        cleanup_stale_ms = config.cleanup_stale_ms,
        "rate limiter configured"
    );

    let state = AppState::new(Arc::new(ApiKeyStore::new()), limiter.clone());
    let app = api::router(state);

    let listener = TcpListener::bind(config.bind_address()).await?;
    tracing::info!(address = %config.bind_address(), "server listening");

    let shutdown = Arc::new(Notify::new());
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown({
        let shutdown = shutdown.clone();
        async move { shutdown.notified().await }
    });
    let mut server = tokio::spawn(server.into_future());

    tokio::select! {
        result = &mut server => {
            // The server only returns on its own when accepting fails.
            return flatten(result);
        }
        _ = shutdown_signal() => {}
    }

    shutdown.notify_one();
    limiter.stop_cleanup_loop();

    let timeout = Duration::from_secs(config.shutdown_timeout_s);
    match tokio::time::timeout(timeout, server).await {
        Ok(result) => {
            flatten(result)?;
            tracing::info!("server stopped gracefully");
        }
        Err(_) => {
            tracing::warn!(
                timeout_s = config.shutdown_timeout_s,
                "graceful shutdown timed out, dropping in-flight requests"
            );
        }
    }

    Ok(())
}

fn flatten(
    result: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), BucketgateError> {
    result.map_err(std::io::Error::other)??;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
