//! Error types for logbridge

use thiserror::Error;

/// Result type alias for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Error type for bridge operations
#[derive(Error, Debug)]
pub enum BridgeError {
    /// A boundary argument was null or out of range
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The async queue rejected a message under the configured overflow policy
    #[error("async queue full (capacity {capacity})")]
    QueueFull { capacity: usize },

    /// The async dispatch path has been shut down
    #[error("async dispatch stopped")]
    Stopped,

    /// Explicit initialization was requested while a bridge already exists
    #[error("bridge already initialized")]
    AlreadyInitialized,

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// The consumer thread did not finish within the shutdown timeout
    #[error("shutdown timed out after {timeout_ms}ms")]
    ShutdownTimeout { timeout_ms: u64 },

    /// Internal error (including panics caught at the boundary)
    #[error("internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Returns the nonzero error code written into the boundary error payload
    pub fn error_code(&self) -> i32 {
        match self {
            BridgeError::InvalidArgument(_) => 1,
            BridgeError::QueueFull { .. } => 2,
            BridgeError::Stopped => 3,
            BridgeError::AlreadyInitialized => 4,
            BridgeError::ConfigError(_) => 5,
            BridgeError::ShutdownTimeout { .. } => 6,
            BridgeError::Internal(_) => 7,
        }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::ConfigError(err.to_string())
    }
}
