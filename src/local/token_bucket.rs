use std::time::Instant;

/// Token-bucket counter for a single identity.
///
/// Holds fractional tokens that refill continuously at `refill_per_second` and are
/// clamped to `capacity` after every refill.
///
/// # Invariants
///
/// - `0 <= tokens <= capacity`
/// - `last_update` never moves backwards: an instant earlier than the stored one counts
///   as zero elapsed time
///
/// The bucket does not synchronize itself. [`LocalRateLimiter`](crate::LocalRateLimiter)
/// keeps each one behind its own mutex and passes in the instant it read under that lock.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: u64,
    tokens: f64,
    refill_per_second: f64,
    last_update: Instant,
}

impl TokenBucket {
    /// Create a full bucket.
    pub fn new(capacity: u64, refill_per_second: f64, now: Instant) -> Self {
        Self {
            capacity,
            tokens: capacity as f64,
            refill_per_second,
            last_update: now,
        }
    }

    /// Refill up to `now`, then take `n` tokens if that many are available.
    ///
    /// Returns `false` without subtracting when fewer than `n` tokens remain; the refill
    /// is kept either way.
    pub fn try_consume(&mut self, n: f64, now: Instant) -> bool {
        self.refill(now);

        if self.tokens >= n {
            self.tokens -= n;
            return true;
        }

        false
    } // end method try_consume

    /// Refill up to `now` and return `(capacity, tokens, refill_per_second)`.
    ///
    /// Never subtracts, so repeated calls at the same instant report the same tokens.
    pub fn inspect(&mut self, now: Instant) -> (u64, f64, f64) {
        self.refill(now);

        (self.capacity, self.tokens, self.refill_per_second)
    }

    /// Tokens currently stored, without refilling.
    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    /// Instant of the last refill.
    pub fn last_update(&self) -> Instant {
        self.last_update
    }

    /// Refill up to `now` and report whether the bucket is full.
    pub(crate) fn is_full_at(&mut self, now: Instant) -> bool {
        self.refill(now);

        self.tokens >= self.capacity as f64
    }

    #[cfg(test)]
    pub(crate) fn set_tokens(&mut self, tokens: f64) {
        self.tokens = tokens.clamp(0.0, self.capacity as f64);
    }

    fn refill(&mut self, now: Instant) {
        let Some(elapsed) = now.checked_duration_since(self.last_update) else {
            return;
        };

        self.last_update = now;
        self.tokens += elapsed.as_secs_f64() * self.refill_per_second;

        let capacity = self.capacity as f64;
        if self.tokens > capacity {
            self.tokens = capacity;
        }
    }
}
