use std::ops::Deref;

use serde::Serialize;

/// Maximum number of tokens a bucket can hold.
///
/// Every new bucket starts full, so this is also the burst size a fresh identity gets.
///
/// # Validation
///
/// Must be greater than 0.
///
/// # Examples
///
/// ```
/// use bucketgate::Capacity;
///
/// let capacity = Capacity::try_from(60).unwrap();
/// assert_eq!(*capacity, 60);
///
/// assert!(Capacity::try_from(0).is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capacity(u64);

impl Default for Capacity {
    fn default() -> Self {
        Self(60)
    }
}

impl Deref for Capacity {
    type Target = u64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<u64> for Capacity {
    type Error = &'static str;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value == 0 {
            return Err("Capacity must be greater than 0");
        }

        Ok(Self(value))
    }
}

/// Tokens added to a bucket per minute.
///
/// Applied continuously: a bucket accrues fractional tokens between calls instead of
/// receiving whole tokens on a fixed tick. Zero is valid and disables refill.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefillPerMinute(u64);

impl RefillPerMinute {
    /// Refill rate in tokens per second.
    pub fn per_second(&self) -> f64 {
        self.0 as f64 / 60.0
    }
}

impl Default for RefillPerMinute {
    fn default() -> Self {
        Self(60)
    }
}

impl Deref for RefillPerMinute {
    type Target = u64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<u64> for RefillPerMinute {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Point-in-time view of one identity's bucket.
///
/// Serializes as `{"capacity": 60, "remaining": 59.5, "refill_per_minute": 60}`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BucketStatus {
    /// Configured maximum tokens.
    pub capacity: u64,
    /// Tokens available right now, after refill.
    pub remaining: f64,
    /// Configured refill rate.
    pub refill_per_minute: u64,
}
