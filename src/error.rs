use std::sync::Arc;

use thiserror::Error;

/// A result type for fallible messaging operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced at the edges of the messaging core.
///
/// A failed refresh is not an error: it is reported as `false` to every waiter of the cycle. These
/// errors cover configuration, waiting on a refresh handle, and decoding event payloads.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// A configured surface is not a valid URI.
    #[error("invalid surface configuration")]
    InvalidSurface(#[source] url::ParseError),

    /// The extension was configured without any surface to request propositions for.
    #[error("no surfaces configured")]
    NoSurfaces,

    /// The coalescer was dropped before the refresh cycle completed.
    #[error("refresh was abandoned before completion")]
    RefreshAbandoned,

    /// The refresh did not complete within the requested time.
    #[error("timed out waiting for refresh")]
    RefreshTimedOut,

    /// An event payload could not be decoded.
    // serde_json::Error is not clonable, so we're wrapping it in an Arc.
    #[error("invalid event payload")]
    InvalidPayload(#[source] Arc<serde_json::Error>),
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidPayload(Arc::new(value))
    }
}
