//! logbridge-ffi - C ABI exports and boundary memory management
//!
//! This crate provides the FFI boundary layer:
//! - [`FfiResult`] tagged result envelope for fallible exports
//! - [`ForeignCallback`] adapting host function pointers to log sinks
//! - [`ledger`] tracking every allocation handed to the host
//! - C ABI exported functions (see `include/logbridge.h`)
//!
//! # FFI Functions
//!
//! The following functions are exported with C linkage:
//!
//! - `register_sync_callback` / `register_async_callback` - Install with a Debug threshold
//! - `register_*_callback_with_level` - Install a callback with a threshold
//! - `unregister_sync_callback` / `unregister_async_callback` - Remove a callback
//! - `free_log_memory` / `free_log_memory_batch` - Release transferred message buffers
//! - `free_result` - Release a result envelope
//! - `logbridge_init` / `logbridge_shutdown` - Explicit lifecycle
//! - `logbridge_emit` - Emit a message from the host
//! - `logbridge_set_level` / `logbridge_get_level` - Process-wide minimum level
//! - `logbridge_stats` - Dispatch counters

mod callback;
mod exports;
pub mod ledger;
mod panic_guard;
mod result;

pub use callback::{ForeignCallback, LogCallback};
pub use panic_guard::{catch_panic, install_panic_hook};
pub use result::{FfiError, FfiResult, ResultPayload, ResultType};

pub use exports::{
    LogBridgeStats, free_log_memory, free_log_memory_batch, free_result, logbridge_emit,
    logbridge_get_level, logbridge_init, logbridge_set_level, logbridge_shutdown,
    logbridge_stats, register_async_callback, register_async_callback_with_level,
    register_sync_callback, register_sync_callback_with_level, unregister_async_callback,
    unregister_sync_callback,
};

pub use logbridge_core::{BridgeConfig, BridgeError, LogLevel};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{FfiResult, ForeignCallback, LogBridgeStats, LogCallback};
    pub use logbridge_core::prelude::*;
    pub use logbridge_logging::prelude::*;
}
