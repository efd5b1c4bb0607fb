/// Error type for this crate.
///
/// Admission and status checks never fail; these variants cover configuration and the
/// server-side plumbing around the limiter.
#[derive(Debug, thiserror::Error)]
pub enum BucketgateError {
    /// A configuration value was rejected during validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// The OS random source could not produce key material.
    #[cfg(feature = "server")]
    #[error("failed to generate api key: {0}")]
    KeyGeneration(#[from] rand::Error),
    /// I/O error while running the server.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
