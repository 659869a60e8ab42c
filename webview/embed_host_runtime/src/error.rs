use thiserror::Error;

/// Errors raised on the host side of the embed.
///
/// Inbound frame traffic never produces one of these; malformed messages are
/// dropped at decode time instead.
#[derive(Error, Debug)]
pub enum EmbedError {
    /// The caller supplied props the embed cannot work with.
    #[error("invalid embed props: {0}")]
    InvalidProps(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport-level HTTP failure during priming.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The priming endpoint answered with something other than a snapshot.
    #[error("priming failed: {0}")]
    Priming(String),

    /// The content frame adapter refused an operation.
    #[error("frame error: {0}")]
    Frame(String),

    #[error("logging setup failed: {0}")]
    Logging(String),
}

/// Result type for embed host operations.
pub type Result<T> = std::result::Result<T, EmbedError>;
