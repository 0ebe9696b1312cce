//! Error types for session registry operations.
//!
//! Lookups never produce these: a missing session or key is reported as
//! `None`. Only operations with a real failure mode return a [`Result`].

/// Error type for session registry operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A live session already holds the requested identifier.
    #[error("Session id already in use: {0}")]
    DuplicateId(String),

    /// The supplied identifier cannot name a session.
    #[error("Invalid session id: {0:?}")]
    InvalidId(String),

    /// A typed value could not be converted into a payload value.
    #[error("Failed to encode value for key '{key}': {source}")]
    Encode {
        key: String,
        source: serde_json::Error,
    },

    /// A stored payload value does not match the requested type.
    #[error("Failed to decode value for key '{key}': {source}")]
    Decode {
        key: String,
        source: serde_json::Error,
    },
}

/// Result type for session registry operations.
pub type Result<T> = std::result::Result<T, Error>;
