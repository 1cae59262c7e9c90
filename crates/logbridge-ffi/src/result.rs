//! Tagged result envelope returned by fallible exports

use crate::ledger::{self, AllocationKind, Release};
use logbridge_core::{BridgeError, BridgeResult};
use std::ffi::{CStr, CString, c_char, c_void};
use std::ptr;

/// Which branch of [`ResultPayload`] is populated
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultType {
    Ok = 0,
    Error = 1,
}

/// Error branch: message text plus a stable nonzero code
///
/// Both the struct and `error_message` are owned by the library and released
/// together by `free_result`.
#[repr(C)]
#[derive(Debug)]
pub struct FfiError {
    pub error_message: *mut c_char,
    pub error_code: i32,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union ResultPayload {
    pub data: *mut c_void,
    pub err: *mut FfiError,
}

/// Result envelope
///
/// The tag always matches the populated branch. Every envelope must be
/// passed to `free_result` exactly once.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct FfiResult {
    pub result_type: ResultType,
    pub payload: ResultPayload,
}

impl FfiResult {
    /// Ok with no payload
    pub fn ok() -> Self {
        Self {
            result_type: ResultType::Ok,
            payload: ResultPayload {
                data: ptr::null_mut(),
            },
        }
    }

    /// Ok carrying a boxed `value`, released by `free_result`
    pub fn ok_with<T: Send + 'static>(value: T) -> Self {
        Self {
            result_type: ResultType::Ok,
            payload: ResultPayload {
                data: ledger::register_payload(value),
            },
        }
    }

    /// Error carrying `error`'s message and code
    pub fn error(error: &BridgeError) -> Self {
        let text = error.to_string().replace('\0', "\u{FFFD}");
        // NULs were replaced above, so this cannot fail.
        let message = CString::new(text).unwrap_or_default();
        let ffi_error = FfiError {
            error_message: ledger::issue_string(AllocationKind::ErrorMessage, message),
            error_code: error.error_code(),
        };
        Self {
            result_type: ResultType::Error,
            payload: ResultPayload {
                err: ledger::issue_boxed(AllocationKind::ErrorPayload, ffi_error),
            },
        }
    }

    pub fn from_result(result: BridgeResult<()>) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(e) => Self::error(&e),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.result_type == ResultType::Ok
    }

    pub fn is_error(&self) -> bool {
        self.result_type == ResultType::Error
    }

    /// Ok payload pointer, or null for an error
    pub fn data(&self) -> *mut c_void {
        match self.result_type {
            // SAFETY: the tag says `data` is the populated branch
            ResultType::Ok => unsafe { self.payload.data },
            ResultType::Error => ptr::null_mut(),
        }
    }

    /// Error code, or `None` for Ok
    ///
    /// # Safety
    ///
    /// The envelope must not have been freed.
    pub unsafe fn error_code(&self) -> Option<i32> {
        unsafe { self.error_ref() }.map(|e| e.error_code)
    }

    /// Copy of the error message, or `None` for Ok
    ///
    /// # Safety
    ///
    /// The envelope must not have been freed.
    pub unsafe fn error_message(&self) -> Option<String> {
        let err = unsafe { self.error_ref() }?;
        if err.error_message.is_null() {
            return None;
        }
        // SAFETY: issued by this module and still outstanding
        let text = unsafe { CStr::from_ptr(err.error_message) };
        Some(text.to_string_lossy().into_owned())
    }

    unsafe fn error_ref(&self) -> Option<&FfiError> {
        match self.result_type {
            // SAFETY: the tag says `err` is the populated branch
            ResultType::Error => unsafe { self.payload.err.as_ref() },
            ResultType::Ok => None,
        }
    }

    /// Release everything this envelope owns
    ///
    /// Error: the [`FfiError`] struct and its message text. Ok: the payload
    /// through the release function registered by [`FfiResult::ok_with`].
    ///
    /// # Safety
    ///
    /// The envelope (or a copy of it) must not have been freed already.
    pub unsafe fn free(self) -> Release {
        match self.result_type {
            ResultType::Ok => unsafe { ledger::release_payload(self.payload.data) },
            ResultType::Error => {
                let err = unsafe { self.payload.err };
                if err.is_null() {
                    return Release::Ignored;
                }
                let boxed = unsafe { ledger::release_boxed(AllocationKind::ErrorPayload, err) };
                let message = match boxed {
                    Some(ffi_error) => ffi_error.error_message,
                    None => return Release::Violation,
                };
                unsafe { ledger::release_string(AllocationKind::ErrorMessage, message) }
            }
        }
    }
}

impl From<BridgeResult<()>> for FfiResult {
    fn from(result: BridgeResult<()>) -> Self {
        Self::from_result(result)
    }
}
