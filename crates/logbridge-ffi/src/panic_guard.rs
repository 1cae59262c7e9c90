//! Panic handling for FFI boundaries
//!
//! Panics must never unwind into the host. Every export runs its body
//! through [`catch_panic`], which turns a panic into `BridgeError::Internal`.

use logbridge_core::BridgeError;
use std::any::Any;
use std::panic;
use std::sync::Once;

static PANIC_HOOK: Once = Once::new();

/// Run `f`, converting a panic into `BridgeError::Internal`
pub fn catch_panic<F, R>(f: F) -> Result<R, BridgeError>
where
    F: FnOnce() -> R + panic::UnwindSafe,
{
    panic::catch_unwind(f).map_err(|panic_info| {
        let panic_msg = panic_to_string(&panic_info);
        tracing::error!("FFI panic caught: {}", panic_msg);
        BridgeError::Internal(panic_msg)
    })
}

/// Convert a panic payload to a human-readable string
fn panic_to_string(panic_info: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        format!("logbridge panicked: {}", s)
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        format!("logbridge panicked: {}", s)
    } else {
        "logbridge panicked with unknown payload".to_string()
    }
}

/// Install a panic hook that reports panics through `tracing`
///
/// With the bridge layer installed the report reaches the host's log
/// callbacks. The hook is process-wide and replaces any existing one; only
/// the first call has an effect.
pub fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        panic::set_hook(Box::new(|panic_info| {
            let payload = panic_info
                .payload()
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| {
                    panic_info
                        .payload()
                        .downcast_ref::<String>()
                        .map(|s| s.as_str())
                })
                .unwrap_or("Box<dyn Any>");

            let msg = match panic_info.location() {
                Some(location) => format!(
                    "Panic at {}:{}:{}: {}",
                    location.file(),
                    location.line(),
                    location.column(),
                    payload
                ),
                None => format!("Panic at unknown location: {}", payload),
            };

            tracing::error!("PANIC: {}", msg);
        }));
    });
}
