//! # logbridge
//!
//! Deliver log messages produced inside a native library to callbacks
//! registered by a host runtime.
//!
//! logbridge uses the C ABI under the hood and provides:
//! - One synchronous slot, invoked inline on the emitting thread
//! - One asynchronous slot, fed by a bounded FIFO and a dedicated consumer thread
//! - Per-slot minimum levels plus a process-wide level filter
//! - Explicit ownership rules for every buffer crossing the boundary
//! - A `tracing` layer so native `tracing` events reach the host
//!
//! ## Quick Start
//!
//! Add to your `Cargo.toml`:
//!
//! ```toml
//! [lib]
//! crate-type = ["cdylib"]
//!
//! [dependencies]
//! logbridge = "0.1"
//! ```
//!
//! ## Logging from Rust
//!
//! ```ignore
//! use logbridge::prelude::*;
//! use std::sync::Arc;
//!
//! let bridge = LogBridge::global()?;
//! bridge.register(
//!     DeliveryKind::Async,
//!     Arc::new(|msg: &std::ffi::CStr| println!("{}", msg.to_string_lossy())),
//!     LogLevel::Warn,
//! );
//!
//! // Either emit directly...
//! bridge.emit(LogLevel::Error, "disk full")?;
//!
//! // ...or route `tracing` through the bridge
//! logbridge::init_logging();
//! tracing::warn!("retrying");
//!
//! // Re-export FFI functions for the shared library
//! pub use logbridge::ffi_exports::*;
//! ```
//!
//! ## Crate Structure
//!
//! This is a facade crate that re-exports from:
//! - [`logbridge_core`] - Levels, errors, configuration, and lifecycle
//! - [`logbridge_logging`] - Registry, dispatch paths, and the tracing layer
//! - [`logbridge_ffi`] - C ABI exports, result envelope, and ownership ledger

// Re-export core types
pub use logbridge_core::{
    AsyncOwnership, BridgeConfig, BridgeError, BridgeResult, LifecycleState, LogLevel,
    OverflowPolicy,
};

// Re-export dispatch engine
pub use logbridge_logging::{
    BridgeLayer, CallbackSlot, DeliveryKind, EmitOutcome, LogBridge, LogSink, StatsSnapshot,
    init_logging,
};

// Re-export FFI types
pub use logbridge_ffi::{FfiError, FfiResult, ForeignCallback, LogBridgeStats, LogCallback};

// Re-export common dependencies that embedders need
pub use serde_json;
pub use tracing;

/// FFI function exports for the shared library.
///
/// Add `pub use logbridge::ffi_exports::*;` to your library's lib.rs to
/// expose the C ABI declared in `logbridge.h`.
pub mod ffi_exports {
    pub use logbridge_ffi::{
        free_log_memory, free_log_memory_batch, free_result, logbridge_emit, logbridge_get_level,
        logbridge_init, logbridge_set_level, logbridge_shutdown, logbridge_stats,
        register_async_callback, register_async_callback_with_level, register_sync_callback,
        register_sync_callback_with_level, unregister_async_callback, unregister_sync_callback,
    };
}

/// Prelude module for convenient imports.
///
/// Use `use logbridge::prelude::*;` to import commonly used types.
pub mod prelude {
    pub use crate::{
        BridgeConfig, BridgeError, BridgeResult, DeliveryKind, EmitOutcome, LifecycleState,
        LogBridge, LogLevel, LogSink, OverflowPolicy,
    };
}
