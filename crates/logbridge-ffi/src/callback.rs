//! Foreign function pointers as log sinks

use crate::ledger;
use logbridge_core::{BridgeError, BridgeResult};
use logbridge_logging::LogSink;
use std::ffi::{CStr, CString, c_char};

/// Host log callback: `void (*LogCallback)(const char *msg)`
pub type LogCallback = extern "C" fn(msg: *const c_char);

/// A host callback wrapped as a [`LogSink`]
///
/// Sync and borrowed-async delivery pass a pointer that is valid only for
/// the duration of the call. Owned delivery passes a buffer issued through
/// the ledger, which the host must release with `free_log_memory`.
#[derive(Debug, Clone, Copy)]
pub struct ForeignCallback {
    callback: LogCallback,
}

impl ForeignCallback {
    /// Wrap a nullable function pointer; null is `InvalidArgument`
    pub fn new(callback: Option<LogCallback>) -> BridgeResult<Self> {
        match callback {
            Some(callback) => Ok(Self { callback }),
            None => Err(BridgeError::InvalidArgument("log callback must not be null".to_string())),
        }
    }
}

impl LogSink for ForeignCallback {
    fn deliver(&self, message: &CStr) {
        (self.callback)(message.as_ptr());
    }

    fn deliver_owned(&self, message: CString) {
        let ptr = ledger::issue_message(message);
        (self.callback)(ptr);
    }
}
