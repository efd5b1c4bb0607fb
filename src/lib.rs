#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod rate_limiter;
pub use rate_limiter::*;

pub mod local;
pub use local::*;

mod clock;
pub use clock::*;

mod error;
pub use error::*;

mod common;
pub use common::{BucketStatus, Capacity, RefillPerMinute};

#[cfg(feature = "server")]
#[cfg_attr(docsrs, doc(cfg(feature = "server")))]
pub mod api;

#[cfg(feature = "server")]
#[cfg_attr(docsrs, doc(cfg(feature = "server")))]
pub mod config;

#[cfg(test)]
mod tests;
