//! Error types for the glasschat dialogue core.

/// Top-level error type for the dialogue system.
#[derive(Debug, thiserror::Error)]
pub enum DialogueError {
    /// No backend credential configured; raised on any send attempt.
    #[error("completion backend unavailable: no credential configured")]
    BackendUnavailable,

    /// Transport, timeout, or malformed response from the completion backend.
    #[error("completion request failed: {0}")]
    Request(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, DialogueError>;
