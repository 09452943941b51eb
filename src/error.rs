use thiserror::Error;

/// Failure of a single backend call. Every variant is terminal for the
/// operation that produced it; nothing here is retried.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-success status.
    #[error("server returned HTTP {0}")]
    Status(u16),

    /// The request never completed (DNS, connection, CORS, ...).
    #[error("network request failed: {0}")]
    Transport(String),

    /// The server answered 2xx but the body did not match the wire format.
    #[error("unexpected response body: {0}")]
    Decode(String),
}
