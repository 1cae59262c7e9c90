//! Bridge configuration types

use crate::error::{BridgeError, BridgeResult};
use crate::LogLevel;
use serde::{Deserialize, Serialize};

/// What happens when a message is enqueued while the async queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Block the producer until the consumer frees a slot
    #[default]
    Block,
    /// Block for at most the given number of milliseconds, then drop
    BlockWithTimeout(u64),
    /// Reject the new message and count the drop
    DropNewest,
    /// Evict the oldest queued message to make room
    DropOldest,
}

impl std::fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverflowPolicy::Block => write!(f, "block"),
            OverflowPolicy::BlockWithTimeout(ms) => write!(f, "block_with_timeout({ms}ms)"),
            OverflowPolicy::DropNewest => write!(f, "drop_newest"),
            OverflowPolicy::DropOldest => write!(f, "drop_oldest"),
        }
    }
}

/// Who releases an async message buffer after delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AsyncOwnership {
    /// The buffer is valid only during the callback; the bridge frees it
    #[default]
    Borrowed,
    /// The callback receives the buffer and must call `free_log_memory`
    Transferred,
}

/// Bridge configuration passed during initialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Process-wide minimum level applied before either dispatch path
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Bound of the async FIFO
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Backpressure policy when the async FIFO is full
    #[serde(default)]
    pub overflow_policy: OverflowPolicy,

    /// Ownership of buffers handed to the async callback
    #[serde(default)]
    pub async_ownership: AsyncOwnership,

    /// Deliver queued messages during shutdown instead of discarding them
    #[serde(default = "default_drain_on_shutdown")]
    pub drain_on_shutdown: bool,

    /// Shutdown timeout in milliseconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_ms: u64,

    /// Route the library's own `tracing` events and panics to the callbacks
    #[serde(default = "default_forward_tracing")]
    pub forward_tracing: bool,
}

fn default_log_level() -> String {
    "debug".to_string()
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_drain_on_shutdown() -> bool {
    true
}

fn default_shutdown_timeout() -> u64 {
    5000
}

fn default_forward_tracing() -> bool {
    true
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            queue_capacity: default_queue_capacity(),
            overflow_policy: OverflowPolicy::default(),
            async_ownership: AsyncOwnership::default(),
            drain_on_shutdown: default_drain_on_shutdown(),
            shutdown_timeout_ms: default_shutdown_timeout(),
            forward_tracing: default_forward_tracing(),
        }
    }
}

impl BridgeConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create configuration from JSON bytes
    ///
    /// Empty input yields the defaults. The parsed configuration is validated.
    pub fn from_json(bytes: &[u8]) -> BridgeResult<Self> {
        if bytes.is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_json::from_slice(bytes)?;
        config.validate()?;
        Ok(config)
    }

    /// Check field values that serde cannot express
    pub fn validate(&self) -> BridgeResult<()> {
        if self.queue_capacity == 0 {
            return Err(BridgeError::ConfigError(
                "queue_capacity must be greater than zero".to_string(),
            ));
        }
        self.min_level().map(|_| ())
    }

    /// The configured global minimum level
    pub fn min_level(&self) -> BridgeResult<LogLevel> {
        LogLevel::from_name(&self.log_level).ok_or_else(|| {
            BridgeError::ConfigError(format!("unknown log level '{}'", self.log_level))
        })
    }

    /// Builder-style capacity override
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Builder-style overflow policy override
    pub fn with_overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    /// Builder-style async ownership override
    pub fn with_async_ownership(mut self, ownership: AsyncOwnership) -> Self {
        self.async_ownership = ownership;
        self
    }
}
