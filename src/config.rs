//! Server configuration, read from command-line flags or the environment.

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::{
    BucketgateError, Capacity, LocalRateLimiterOptions, RateLimiterOptions, RefillPerMinute,
};

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Settings for `bucketgate-server`.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "bucketgate-server",
    about = "HTTP API with per-key token bucket admission control"
)]
pub struct ServerConfig {
    /// Interface to bind.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Maximum tokens per API key.
    #[arg(long, env = "BUCKETGATE_CAPACITY", default_value_t = 60)]
    pub capacity: u64,

    /// Tokens restored per minute, accrued continuously.
    #[arg(long, env = "BUCKETGATE_REFILL_PER_MINUTE", default_value_t = 60)]
    pub refill_per_minute: u64,

    /// Evict buckets idle for this long. 0 disables eviction.
    #[arg(long, env = "BUCKETGATE_CLEANUP_STALE_MS", default_value_t = 0)]
    pub cleanup_stale_ms: u64,

    /// How often the eviction pass runs.
    #[arg(long, env = "BUCKETGATE_CLEANUP_INTERVAL_MS", default_value_t = 60_000)]
    pub cleanup_interval_ms: u64,

    /// Grace period for in-flight requests after a shutdown signal.
    #[arg(long, env = "BUCKETGATE_SHUTDOWN_TIMEOUT_S", default_value_t = 10)]
    pub shutdown_timeout_s: u64,

    /// Log output format. Levels come from `RUST_LOG`.
    #[arg(long, env = "BUCKETGATE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl ServerConfig {
    /// Validate the limiter settings.
    pub fn rate_limiter_options(&self) -> Result<RateLimiterOptions, BucketgateError> {
        let capacity = Capacity::try_from(self.capacity).map_err(BucketgateError::InvalidConfig)?;

        Ok(RateLimiterOptions {
            local: LocalRateLimiterOptions {
                capacity,
                refill_per_minute: RefillPerMinute::from(self.refill_per_minute),
            },
        })
    }

    /// `host:port` to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether the eviction loop should run.
    pub fn cleanup_enabled(&self) -> bool {
        self.cleanup_stale_ms > 0
    }
}

/// Install the global tracing subscriber. Filter comes from `RUST_LOG`, default `info`.
pub fn init_tracing(format: LogFormat) -> Result<(), BucketgateError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match format {
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init(),
    };

    result.map_err(|err| BucketgateError::Io(std::io::Error::other(err)))
}
