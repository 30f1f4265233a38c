//! Error types for md-block.

use md_cache::AcquireError;

/// Error ending a render pipeline.
///
/// Never surfaced through the completion event or the rendered status; the
/// pipeline's join handle carries it and it is logged at `warn`.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// A capability could not be acquired.
    #[error(transparent)]
    Acquire(#[from] AcquireError),
    /// Remote content could not be fetched.
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Error fetching remote content.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The server answered with a non-success status.
    #[error("HTTP status {status}")]
    Http {
        /// Response status code.
        status: u16,
    },
    /// Connection, timeout or filesystem failure.
    #[error("transport error: {0}")]
    Transport(String),
    /// The response body could not be read as text.
    #[error("failed to read body: {0}")]
    Body(String),
    /// The URL scheme has no fetch support.
    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
    /// The blocking fetch task panicked or was cancelled.
    #[error("fetch task failed: {0}")]
    Join(String),
}
