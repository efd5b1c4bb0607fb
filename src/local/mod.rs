//! In-process token bucket rate limiting.
//!
//! The local provider keeps one [`TokenBucket`] per identity inside the current process,
//! behind a [`DashMap`](dashmap::DashMap) registry and a per-bucket mutex.
//!
//! # Key Characteristics
//!
//! - **Thread-safe:** Safe for concurrent use across multiple threads
//! - **Strict:** Refill and consume are atomic per identity, so there is no overshoot
//! - **Continuous refill:** Fractional tokens accrue between calls, no refill job
//! - **Process-scoped:** State is not shared across processes
//!
//! # Examples
//!
//! ```
//! use bucketgate::{Capacity, RefillPerMinute, RateLimiter, RateLimiterOptions};
//! use bucketgate::local::LocalRateLimiterOptions;
//!
//! let rl = RateLimiter::new(RateLimiterOptions {
//!     local: LocalRateLimiterOptions {
//!         capacity: Capacity::try_from(60).unwrap(),
//!         refill_per_minute: RefillPerMinute::from(60),
//!     },
//! });
//!
//! assert!(rl.local().allow("user_123"));
//! assert!(rl.local().status("user_123").is_some());
//! assert!(rl.local().status("user_456").is_none());
//! ```

mod token_bucket;
pub use token_bucket::*;

mod local_rate_limiter;
pub use local_rate_limiter::*;
