//! Process-wide minimum severity

use logbridge_core::LogLevel;
use std::sync::atomic::{AtomicU8, Ordering};

/// Minimum level applied before a message reaches either dispatch path
///
/// Reads are a single atomic load. A change is visible to emits evaluated
/// after it; emits already past the check are not recalled.
#[derive(Debug)]
pub struct LevelFilter {
    minimum: AtomicU8,
}

impl LevelFilter {
    /// Create a filter with the given minimum
    pub fn new(minimum: LogLevel) -> Self {
        Self {
            minimum: AtomicU8::new(minimum as u8),
        }
    }

    /// Set the minimum level
    pub fn set_minimum(&self, level: LogLevel) {
        self.minimum.store(level as u8, Ordering::Release);
    }

    /// Get the minimum level
    pub fn minimum(&self) -> LogLevel {
        LogLevel::from_u8(self.minimum.load(Ordering::Acquire))
    }

    /// Check if a message of this level passes the filter
    pub fn should_emit(&self, level: LogLevel) -> bool {
        level >= self.minimum()
    }
}

impl Default for LevelFilter {
    fn default() -> Self {
        Self::new(LogLevel::Debug)
    }
}
