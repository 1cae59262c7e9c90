//! logbridge-core - Core types, errors, and configuration
//!
//! This crate provides the foundational types shared by the logbridge crates:
//! - [`LogLevel`] severity ordering used for filtering
//! - [`BridgeError`] for error handling and boundary error codes
//! - [`BridgeConfig`] for bridge configuration
//! - [`LifecycleState`] for the bridge start/stop lifecycle

mod config;
mod error;
mod lifecycle;

pub use config::{AsyncOwnership, BridgeConfig, OverflowPolicy};
pub use error::{BridgeError, BridgeResult};
pub use lifecycle::LifecycleState;

/// Log severity levels carried across the boundary
///
/// The numeric values are part of the C ABI (0=Debug, 1=Info, 2=Warn, 3=Error).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl LogLevel {
    /// All levels in ascending severity
    pub const ALL: [LogLevel; 4] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
    ];

    /// Decode a level stored with `as u8`
    ///
    /// Values above 3 saturate to `Error`; only values written by this crate
    /// are expected here.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => LogLevel::Debug,
            1 => LogLevel::Info,
            2 => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }

    /// Parse a level name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

impl TryFrom<i32> for LogLevel {
    type Error = BridgeError;

    fn try_from(value: i32) -> Result<Self, BridgeError> {
        match value {
            0 => Ok(LogLevel::Debug),
            1 => Ok(LogLevel::Info),
            2 => Ok(LogLevel::Warn),
            3 => Ok(LogLevel::Error),
            other => Err(BridgeError::InvalidArgument(format!(
                "log level {other} is out of range (expected 0..=3)"
            ))),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        AsyncOwnership, BridgeConfig, BridgeError, BridgeResult, LifecycleState, LogLevel,
        OverflowPolicy,
    };
}
