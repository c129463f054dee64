//! Core error types for ANVIL.

/// Core result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// Rule data could not be parsed
    #[error("Parse error: {message}")]
    Parse {
        /// Parser message
        message: String,
    },

    /// Rule file could not be read
    #[error("Cannot read {path}: {message}")]
    Io {
        /// Path that was read
        path: String,
        /// Underlying I/O message
        message: String,
    },
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse {
            message: err.to_string(),
        }
    }
}
