use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::{
    BucketStatus, Capacity, Clock, RefillPerMinute, SystemClock, local::TokenBucket,
};

/// Configuration for [`LocalRateLimiter`].
///
/// Applied to every bucket the limiter creates. Fixed for the lifetime of the limiter.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalRateLimiterOptions {
    /// Maximum tokens per identity.
    pub capacity: Capacity,
    /// Continuous refill rate per identity.
    pub refill_per_minute: RefillPerMinute,
}

/// Identity-keyed registry of token buckets.
///
/// Each identity gets its own [`TokenBucket`], created full on its first
/// [`allow`](Self::allow) call.
///
/// # Locking
///
/// Two levels:
///
/// - The [`DashMap`] shard lock guards only lookup and insert-if-absent. It is released
///   before any token arithmetic happens.
/// - Each bucket sits behind its own [`Mutex`]. Refill and decide run under that lock, so
///   concurrent callers on one identity can never spend the same token twice.
///
/// Distinct identities only meet on the shard lock during the brief lookup step.
///
/// # Memory
///
/// Buckets live until [`cleanup`](Self::cleanup) removes them. Nothing is evicted unless
/// cleanup runs, either directly or through
/// [`RateLimiter::run_cleanup_loop`](crate::RateLimiter::run_cleanup_loop).
///
/// # Examples
///
/// ```
/// use bucketgate::{Capacity, LocalRateLimiter, LocalRateLimiterOptions, RefillPerMinute};
///
/// let limiter = LocalRateLimiter::new(LocalRateLimiterOptions {
///     capacity: Capacity::try_from(2).unwrap(),
///     refill_per_minute: RefillPerMinute::from(0),
/// });
///
/// assert!(limiter.status("user_123").is_none());
///
/// assert!(limiter.allow("user_123"));
/// assert!(limiter.allow("user_123"));
/// assert!(!limiter.allow("user_123"));
///
/// let status = limiter.status("user_123").unwrap();
/// assert_eq!(status.capacity, 2);
/// assert_eq!(status.remaining, 0.0);
/// ```
pub struct LocalRateLimiter<C: Clock = SystemClock> {
    capacity: Capacity,
    refill_per_minute: RefillPerMinute,
    clock: C,
    buckets: DashMap<String, Arc<Mutex<TokenBucket>>>,
}

impl LocalRateLimiter<SystemClock> {
    /// Create a limiter driven by the system clock.
    pub fn new(options: LocalRateLimiterOptions) -> Self {
        Self::with_clock(options, SystemClock)
    }
}

impl<C: Clock> LocalRateLimiter<C> {
    /// Create a limiter that reads time from `clock`.
    pub fn with_clock(options: LocalRateLimiterOptions, clock: C) -> Self {
        Self {
            capacity: options.capacity,
            refill_per_minute: options.refill_per_minute,
            clock,
            buckets: DashMap::new(),
        }
    } // end constructor

    /// Consume one token for `key`, creating its bucket on first contact.
    ///
    /// Returns `true` to admit the request and `false` when the quota is exhausted.
    /// Identities are not validated here; callers reject absent or unknown keys first.
    pub fn allow(&self, key: &str) -> bool {
        let bucket = self.bucket_or_insert(key);
        let mut bucket = bucket.lock();

        let now = self.clock.now();
        bucket.try_consume(1.0, now)
    } // end method allow

    /// Current quota for `key`, or `None` if it has no bucket.
    ///
    /// Applies the pending refill but never consumes and never creates a bucket.
    pub fn status(&self, key: &str) -> Option<BucketStatus> {
        let bucket = self.buckets.get(key).map(|entry| Arc::clone(entry.value()))?;
        let mut bucket = bucket.lock();

        let (capacity, remaining, _) = bucket.inspect(self.clock.now());

        Some(BucketStatus {
            capacity,
            remaining,
            refill_per_minute: *self.refill_per_minute,
        })
    } // end method status

    /// Remove buckets that have been idle longer than `stale_after` and have refilled to
    /// capacity.
    ///
    /// A bucket that is still refilling, or that another thread is currently using, is
    /// kept. Evicting a full bucket never changes the outcome of a later
    /// [`allow`](Self::allow): the replacement starts full too. Only
    /// [`status`](Self::status) notices, reporting `None` again.
    ///
    /// Returns the number of buckets removed.
    pub fn cleanup(&self, stale_after: Duration) -> usize {
        let now = self.clock.now();
        let before = self.buckets.len();

        self.buckets.retain(|_, bucket| {
            // Clones only happen under the shard lock `retain` is holding.
            if Arc::strong_count(bucket) > 1 {
                return true;
            }

            let mut bucket = bucket.lock();
            let idle = now.saturating_duration_since(bucket.last_update());

            !(idle > stale_after && bucket.is_full_at(now))
        });

        let evicted = before.saturating_sub(self.buckets.len());
        tracing::debug!(evicted, remaining = self.buckets.len(), "bucket cleanup pass");

        evicted
    } // end method cleanup

    /// Number of identities with a bucket.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// `true` when no identity has a bucket yet.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn bucket(&self, key: &str) -> Option<Arc<Mutex<TokenBucket>>> {
        self.buckets.get(key).map(|entry| Arc::clone(entry.value()))
    }

    fn bucket_or_insert(&self, key: &str) -> Arc<Mutex<TokenBucket>> {
        if let Some(bucket) = self.buckets.get(key) {
            return Arc::clone(bucket.value());
        }

        let entry = self.buckets.entry(key.to_string()).or_insert_with(|| {
            tracing::debug!(capacity = *self.capacity, "creating bucket for new identity");

            Arc::new(Mutex::new(TokenBucket::new(
                *self.capacity,
                self.refill_per_minute.per_second(),
                self.clock.now(),
            )))
        });

        Arc::clone(entry.value())
    }
} // end of impl
