//! Error types for Lunaria.

use thiserror::Error;

/// Errors that can occur during index generation.
#[derive(Error, Debug)]
pub enum LunariaError {
    /// I/O error on an input or output channel. Always fatal: partial output
    /// for a partition must be discarded by the caller's retry mechanism.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the resource hash table.
    #[error("resource hash error: {0}")]
    Hash(String),

    /// A required resource could not be resolved to an id. Indicates an
    /// upstream hash/input mismatch that would silently corrupt the index.
    #[error("unresolved resource: {0}")]
    Resolution(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Index write/read protocol violation or corrupt index data.
    #[error("index error: {0}")]
    Index(String),

    /// Run metadata could not be serialized.
    #[error("metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
}

impl LunariaError {
    /// Create a resource hash error.
    pub fn hash<S: Into<String>>(message: S) -> Self {
        LunariaError::Hash(message.into())
    }

    /// Create a resolution error.
    pub fn resolution<S: Into<String>>(message: S) -> Self {
        LunariaError::Resolution(message.into())
    }

    /// Create a configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        LunariaError::Config(message.into())
    }

    /// Create an index error.
    pub fn index<S: Into<String>>(message: S) -> Self {
        LunariaError::Index(message.into())
    }
}

impl From<fst::Error> for LunariaError {
    fn from(err: fst::Error) -> Self {
        LunariaError::Hash(err.to_string())
    }
}

/// Result type alias for Lunaria operations.
pub type Result<T> = std::result::Result<T, LunariaError>;
