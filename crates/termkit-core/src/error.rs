//! Error types for termkit.

use thiserror::Error;

/// Main error type for termkit operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A recording was started while another one is attached
    #[error("Terminal is already recording")]
    AlreadyRecording,

    /// Color system name that matches no known level
    #[error("Unknown color system: {0}")]
    UnknownColorSystem(String),

    /// Recording entries that violate the recorder invariants
    #[error("Invalid recording: {0}")]
    InvalidRecording(String),

    /// Highlighter style pattern or name that cannot be compiled
    #[error("Invalid pattern: {0}")]
    Pattern(String),

    /// Event listener failure, propagated from dispatch
    #[error("Listener failed: {0}")]
    Listener(#[source] anyhow::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
