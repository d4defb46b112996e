//! Crate error types
//!
//! Errors surfaced to callers of the hub registry. Per-subscriber and
//! transient read failures are handled (and logged) where they occur and
//! never escalate past the task that observed them.

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for hub creation
#[derive(Debug)]
pub enum Error {
    /// The source address could not be resolved to a UDP endpoint
    AddressResolution {
        /// The address as given by the caller
        addr: String,
        /// Underlying resolver error
        source: std::io::Error,
    },
    /// Every multicast join and the plain-UDP fallback failed
    Bind {
        /// The address as given by the caller
        addr: String,
        /// Error from the final bind attempt
        source: std::io::Error,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::AddressResolution { addr, source } => {
                write!(f, "Failed to resolve source address {}: {}", addr, source)
            }
            Error::Bind { addr, source } => {
                write!(f, "Failed to bind UDP source {}: {}", addr, source)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::AddressResolution { source, .. } | Error::Bind { source, .. } => Some(source),
        }
    }
}
