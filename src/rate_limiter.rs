//! Top-level entrypoint that wires the local provider and its cleanup loop.

use std::{
    sync::{Arc, Weak, mpsc},
    thread,
    time::Duration,
};

use parking_lot::Mutex;

use crate::{BucketStatus, Clock, LocalRateLimiter, LocalRateLimiterOptions, SystemClock};

const DEFAULT_STALE_AFTER_MS: u64 = 10 * 60 * 1000;
const DEFAULT_CLEANUP_INTERVAL_MS: u64 = 60 * 1000;

/// Top-level configuration for [`RateLimiter`].
#[derive(Clone, Copy, Debug, Default)]
pub struct RateLimiterOptions {
    /// Options for the local provider.
    pub local: LocalRateLimiterOptions,
}

/// Rate limiter entrypoint.
///
/// Owns the [`LocalRateLimiter`] and, optionally, a background thread that evicts idle
/// buckets. Share it behind an [`Arc`]; the cleanup loop needs one to hold a weak
/// reference.
pub struct RateLimiter<C: Clock = SystemClock> {
    local: LocalRateLimiter<C>,
    cleanup_stop: Mutex<Option<mpsc::Sender<()>>>,
}

impl RateLimiter<SystemClock> {
    /// Create a new [`RateLimiter`] driven by the system clock.
    pub fn new(options: RateLimiterOptions) -> Self {
        Self::with_clock(options, SystemClock)
    }
}

impl<C: Clock> RateLimiter<C> {
    /// Create a new [`RateLimiter`] that reads time from `clock`.
    pub fn with_clock(options: RateLimiterOptions, clock: C) -> Self {
        Self {
            local: LocalRateLimiter::with_clock(options.local, clock),
            cleanup_stop: Mutex::new(None),
        }
    }

    /// Access the local provider.
    pub fn local(&self) -> &LocalRateLimiter<C> {
        &self.local
    }

    /// Shorthand for [`LocalRateLimiter::allow`].
    pub fn allow(&self, key: &str) -> bool {
        self.local.allow(key)
    }

    /// Shorthand for [`LocalRateLimiter::status`].
    pub fn status(&self, key: &str) -> Option<BucketStatus> {
        self.local.status(key)
    }

    /// Stop the cleanup loop if one is running. Safe to call repeatedly.
    pub fn stop_cleanup_loop(&self) {
        if self.cleanup_stop.lock().take().is_some() {
            tracing::trace!("bucket cleanup loop stop requested");
        }
    }
}

impl<C: Clock + 'static> RateLimiter<C> {
    /// Start evicting buckets idle for 10 minutes, checking once a minute.
    ///
    /// See [`run_cleanup_loop_with_config`](Self::run_cleanup_loop_with_config).
    pub fn run_cleanup_loop(self: &Arc<Self>) {
        self.run_cleanup_loop_with_config(DEFAULT_STALE_AFTER_MS, DEFAULT_CLEANUP_INTERVAL_MS);
    }

    /// Start a background thread that calls [`LocalRateLimiter::cleanup`] every
    /// `interval_ms`, evicting buckets idle for more than `stale_after_ms`.
    ///
    /// The first pass runs immediately. Calling this while a loop is already running does
    /// nothing. The thread exits on [`stop_cleanup_loop`](Self::stop_cleanup_loop) or once
    /// the last `Arc` to the limiter is dropped.
    pub fn run_cleanup_loop_with_config(self: &Arc<Self>, stale_after_ms: u64, interval_ms: u64) {
        let mut cleanup_stop = self.cleanup_stop.lock();
        if cleanup_stop.is_some() {
            return;
        }

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        *cleanup_stop = Some(stop_tx);
        drop(cleanup_stop);

        let limiter: Weak<Self> = Arc::downgrade(self);
        let stale_after = Duration::from_millis(stale_after_ms);
        let interval = Duration::from_millis(interval_ms);

        tracing::trace!(stale_after_ms, interval_ms, "bucket cleanup loop started");

        thread::spawn(move || {
            loop {
                match limiter.upgrade() {
                    Some(limiter) => {
                        limiter.local.cleanup(stale_after);
                    }
                    None => break,
                }

                match stop_rx.recv_timeout(interval) {
                    Err(mpsc::RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                }
            }

            tracing::trace!("bucket cleanup loop stopped");
        });
    } // end method run_cleanup_loop_with_config
}
