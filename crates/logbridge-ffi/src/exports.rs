//! C ABI exported functions
//!
//! These functions are the entry points called by the host. Fallible ones
//! return an [`FfiResult`] that the host must pass to [`free_result`].

use crate::callback::{ForeignCallback, LogCallback};
use crate::ledger;
use crate::panic_guard::{catch_panic, install_panic_hook};
use crate::result::FfiResult;
use logbridge_core::{BridgeConfig, BridgeError, BridgeResult, LogLevel};
use logbridge_logging::{DeliveryKind, LogBridge, StatsSnapshot, init_logging};
use std::ffi::{CStr, c_char, c_void};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Counters reported by [`logbridge_stats`]
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogBridgeStats {
    pub emitted: u64,
    pub filtered: u64,
    pub sync_delivered: u64,
    pub async_enqueued: u64,
    pub async_delivered: u64,
    pub overflow_dropped: u64,
    pub unregistered_dropped: u64,
    pub stopped_dropped: u64,
    pub ledger_violations: u64,
}

impl LogBridgeStats {
    fn from_snapshot(snapshot: StatsSnapshot, ledger_violations: u64) -> Self {
        Self {
            emitted: snapshot.emitted,
            filtered: snapshot.filtered,
            sync_delivered: snapshot.sync_delivered,
            async_enqueued: snapshot.async_enqueued,
            async_delivered: snapshot.async_delivered,
            overflow_dropped: snapshot.overflow_dropped,
            unregistered_dropped: snapshot.unregistered_dropped,
            stopped_dropped: snapshot.stopped_dropped,
            ledger_violations,
        }
    }
}

/// Run an export body behind the panic guard and encode its outcome
fn guarded<F>(f: F) -> FfiResult
where
    F: FnOnce() -> BridgeResult<FfiResult>,
{
    match catch_panic(AssertUnwindSafe(f)) {
        Ok(Ok(result)) => result,
        Ok(Err(e)) | Err(e) => FfiResult::error(&e),
    }
}

fn register_impl(
    kind: DeliveryKind,
    callback: Option<LogCallback>,
    level: i32,
) -> BridgeResult<FfiResult> {
    // Validate everything before touching the registry so a failure leaves
    // the previous slot in place.
    let level = LogLevel::try_from(level)?;
    let sink = ForeignCallback::new(callback)?;
    LogBridge::global()?.register(kind, Arc::new(sink), level);
    Ok(FfiResult::ok())
}

fn unregister_impl(kind: DeliveryKind) -> BridgeResult<FfiResult> {
    if let Some(bridge) = LogBridge::try_global() {
        bridge.unregister(kind);
    }
    Ok(FfiResult::ok())
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// Register the sync callback with a Debug threshold
///
/// The callback runs on the emitting thread before `logbridge_emit` returns.
/// The message pointer is valid only for the duration of the call.
#[unsafe(no_mangle)]
pub extern "C" fn register_sync_callback(callback: Option<LogCallback>) -> FfiResult {
    guarded(|| register_impl(DeliveryKind::Sync, callback, LogLevel::Debug as i32))
}

/// Register the async callback with a Debug threshold
///
/// The callback runs on the library's consumer thread.
#[unsafe(no_mangle)]
pub extern "C" fn register_async_callback(callback: Option<LogCallback>) -> FfiResult {
    guarded(|| register_impl(DeliveryKind::Async, callback, LogLevel::Debug as i32))
}

/// Register the sync callback with a minimum level (0=Debug .. 3=Error)
#[unsafe(no_mangle)]
pub extern "C" fn register_sync_callback_with_level(
    callback: Option<LogCallback>,
    level: i32,
) -> FfiResult {
    guarded(|| register_impl(DeliveryKind::Sync, callback, level))
}

/// Register the async callback with a minimum level (0=Debug .. 3=Error)
#[unsafe(no_mangle)]
pub extern "C" fn register_async_callback_with_level(
    callback: Option<LogCallback>,
    level: i32,
) -> FfiResult {
    guarded(|| register_impl(DeliveryKind::Async, callback, level))
}

/// Remove the sync callback; a no-op when none is registered
#[unsafe(no_mangle)]
pub extern "C" fn unregister_sync_callback() -> FfiResult {
    guarded(|| unregister_impl(DeliveryKind::Sync))
}

/// Remove the async callback; a no-op when none is registered
#[unsafe(no_mangle)]
pub extern "C" fn unregister_async_callback() -> FfiResult {
    guarded(|| unregister_impl(DeliveryKind::Async))
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

/// Release one message buffer handed to an async callback
///
/// Only buffers delivered in `transferred` ownership mode are released this
/// way. Null is a no-op.
///
/// # Safety
/// - `ptr` must be null or a buffer the library handed to a callback
/// - Must only be called once per buffer
#[unsafe(no_mangle)]
pub unsafe extern "C" fn free_log_memory(ptr: *mut c_void) {
    let _ = catch_panic(AssertUnwindSafe(|| unsafe {
        ledger::release_message(ptr as *mut c_char)
    }));
}

/// Release `count` message buffers
///
/// A null array or non-positive count is a no-op; null entries are skipped.
///
/// # Safety
/// - `ptrs` must be null or valid for `count` reads
/// - Every non-null entry must satisfy the contract of [`free_log_memory`]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn free_log_memory_batch(ptrs: *mut *mut c_void, count: i32) {
    if ptrs.is_null() || count <= 0 {
        return;
    }
    let _ = catch_panic(AssertUnwindSafe(|| {
        // SAFETY: caller guarantees ptrs is valid for count entries
        let entries = unsafe { std::slice::from_raw_parts(ptrs, count as usize) };
        for &ptr in entries.iter().filter(|ptr| !ptr.is_null()) {
            unsafe { ledger::release_message(ptr as *mut c_char) };
        }
    }));
}

/// Release everything owned by a result envelope
///
/// # Safety
/// - `result` must come from a logbridge export
/// - Must only be called once per envelope
#[unsafe(no_mangle)]
pub unsafe extern "C" fn free_result(result: FfiResult) {
    let _ = catch_panic(AssertUnwindSafe(|| unsafe { result.free() }));
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Explicitly initialize the bridge from JSON configuration
///
/// Null or empty configuration uses the defaults. Fails with
/// `AlreadyInitialized` if a running bridge exists, including one created
/// implicitly by an earlier registration or emit.
///
/// # Safety
/// - `config_json` must be null or valid for `config_len` bytes
#[unsafe(no_mangle)]
pub unsafe extern "C" fn logbridge_init(config_json: *const u8, config_len: usize) -> FfiResult {
    guarded(|| {
        let config = if config_json.is_null() || config_len == 0 {
            BridgeConfig::default()
        } else {
            // SAFETY: caller guarantees config_json is valid for config_len bytes
            let bytes = unsafe { std::slice::from_raw_parts(config_json, config_len) };
            BridgeConfig::from_json(bytes)?
        };

        let forward_tracing = config.forward_tracing;
        LogBridge::init_global(config)?;

        if forward_tracing {
            init_logging();
            install_panic_hook();
        }
        Ok(FfiResult::ok())
    })
}

/// Stop the async path of the bridge
///
/// Queued messages are drained or discarded per configuration and the
/// consumer thread is joined. Registrations survive: sync delivery keeps
/// working, async emits fail with `Stopped`. A no-op when the bridge was
/// never created or is already stopped.
#[unsafe(no_mangle)]
pub extern "C" fn logbridge_shutdown() -> FfiResult {
    guarded(|| {
        LogBridge::shutdown_global()?;
        Ok(FfiResult::ok())
    })
}

// ---------------------------------------------------------------------------
// Emit and filtering
// ---------------------------------------------------------------------------

/// Emit a message at `level` (0=Debug .. 3=Error)
///
/// Sync delivery (if any) completes before this returns. An Error result
/// means the async copy could not be queued (`QueueFull` or `Stopped`) or an
/// argument was invalid.
///
/// # Safety
/// - `message` must be null or a valid null-terminated C string
#[unsafe(no_mangle)]
pub unsafe extern "C" fn logbridge_emit(level: i32, message: *const c_char) -> FfiResult {
    guarded(|| {
        let level = LogLevel::try_from(level)?;
        if message.is_null() {
            return Err(BridgeError::InvalidArgument("message must not be null".to_string()));
        }
        // SAFETY: caller guarantees message is a valid C string
        let message = unsafe { CStr::from_ptr(message) };
        LogBridge::global()?.emit_c(level, message)?;
        Ok(FfiResult::ok())
    })
}

/// Set the process-wide minimum level (0=Debug .. 3=Error)
#[unsafe(no_mangle)]
pub extern "C" fn logbridge_set_level(level: i32) -> FfiResult {
    guarded(|| {
        let level = LogLevel::try_from(level)?;
        LogBridge::global()?.set_level(level);
        Ok(FfiResult::ok())
    })
}

/// Get the process-wide minimum level
///
/// Returns -1 if the bridge could not be created.
#[unsafe(no_mangle)]
pub extern "C" fn logbridge_get_level() -> i32 {
    catch_panic(|| LogBridge::global().map(|bridge| bridge.level() as i32))
        .ok()
        .and_then(Result::ok)
        .unwrap_or(-1)
}

/// Snapshot of the dispatch counters
///
/// The Ok payload is a `LogBridgeStats*` released by [`free_result`].
#[unsafe(no_mangle)]
pub extern "C" fn logbridge_stats() -> FfiResult {
    guarded(|| {
        let snapshot = LogBridge::global()?.stats();
        Ok(FfiResult::ok_with(LogBridgeStats::from_snapshot(
            snapshot,
            ledger::violations(),
        )))
    })
}
