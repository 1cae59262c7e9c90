//! Ownership ledger for allocations handed across the boundary
//!
//! Every pointer the library gives to the host has exactly one release entry
//! point. Releasing twice, or releasing a pointer the library never issued,
//! is undefined behavior by contract. Debug builds track outstanding
//! allocations so such misuse is logged, counted, and refused instead of
//! corrupting the heap; release builds compile that tracking out.
//!
//! Ok-branch payloads of [`FfiResult`](crate::FfiResult) are always tracked,
//! since the release function for a type-erased payload has to be looked up.

use dashmap::DashMap;
use logbridge_logging::INTERNAL_TARGET;
use once_cell::sync::Lazy;
use std::ffi::{CString, c_char, c_void};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// What a boundary allocation holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationKind {
    /// Log message text owned by an async callback
    Message,
    /// `error_message` of an [`FfiError`](crate::FfiError)
    ErrorMessage,
    /// The [`FfiError`](crate::FfiError) struct itself
    ErrorPayload,
    /// Ok-branch payload of a result
    Payload,
}

impl fmt::Display for AllocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationKind::Message => write!(f, "log message"),
            AllocationKind::ErrorMessage => write!(f, "error message"),
            AllocationKind::ErrorPayload => write!(f, "error payload"),
            AllocationKind::Payload => write!(f, "result payload"),
        }
    }
}

/// Outcome of a release request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// The allocation was freed
    Released,
    /// Null pointer; nothing to do
    Ignored,
    /// The pointer is not an outstanding allocation of that kind; not freed
    Violation,
}

type DropFn = unsafe fn(*mut c_void);

/// Release functions for outstanding Ok payloads, keyed by address
static PAYLOADS: Lazy<DashMap<usize, DropFn>> = Lazy::new(DashMap::new);

/// Outstanding strings and error structs, keyed by address
#[cfg(debug_assertions)]
static OUTSTANDING: Lazy<DashMap<usize, AllocationKind>> = Lazy::new(DashMap::new);

static VIOLATIONS: AtomicU64 = AtomicU64::new(0);

/// Number of contract violations detected so far
pub fn violations() -> u64 {
    VIOLATIONS.load(Ordering::Relaxed)
}

fn violation(kind: AllocationKind, address: usize) -> Release {
    VIOLATIONS.fetch_add(1, Ordering::Relaxed);
    tracing::error!(
        target: INTERNAL_TARGET,
        kind = %kind,
        address = format_args!("{:#x}", address),
        "release of a pointer that is not outstanding (double release or foreign pointer)"
    );
    Release::Violation
}

#[cfg(debug_assertions)]
fn track(address: usize, kind: AllocationKind) {
    OUTSTANDING.insert(address, kind);
}

#[cfg(not(debug_assertions))]
fn track(_address: usize, _kind: AllocationKind) {}

/// Remove `address` from the ledger if it is outstanding as `kind`
#[cfg(debug_assertions)]
fn untrack(address: usize, kind: AllocationKind) -> bool {
    OUTSTANDING
        .remove_if(&address, |_, tracked| *tracked == kind)
        .is_some()
}

#[cfg(not(debug_assertions))]
fn untrack(_address: usize, _kind: AllocationKind) -> bool {
    true
}

/// Check whether `ptr` is an outstanding allocation
///
/// Strings and error structs are only visible in debug builds; payloads are
/// visible in every build.
pub fn is_outstanding(ptr: *const c_void) -> bool {
    let address = ptr as usize;
    if PAYLOADS.contains_key(&address) {
        return true;
    }
    #[cfg(debug_assertions)]
    {
        OUTSTANDING.contains_key(&address)
    }
    #[cfg(not(debug_assertions))]
    {
        false
    }
}

// ---------------------------------------------------------------------------
// Strings
// ---------------------------------------------------------------------------

/// Hand `text` to the host; it must come back through [`release_string`]
pub fn issue_string(kind: AllocationKind, text: CString) -> *mut c_char {
    let ptr = text.into_raw();
    track(ptr as usize, kind);
    ptr
}

/// Free a string issued with [`issue_string`] under the same `kind`
///
/// # Safety
///
/// `ptr` must be null or a pointer returned by [`issue_string`]. In release
/// builds a pointer released twice is undefined behavior.
pub unsafe fn release_string(kind: AllocationKind, ptr: *mut c_char) -> Release {
    if ptr.is_null() {
        return Release::Ignored;
    }
    if !untrack(ptr as usize, kind) {
        return violation(kind, ptr as usize);
    }
    // SAFETY: the ledger (or the caller's contract) says this came from into_raw
    drop(unsafe { CString::from_raw(ptr) });
    Release::Released
}

/// Hand a log message to an async callback that owns it afterwards
pub fn issue_message(text: CString) -> *mut c_char {
    issue_string(AllocationKind::Message, text)
}

/// Free a message issued with [`issue_message`]
///
/// # Safety
///
/// See [`release_string`].
pub unsafe fn release_message(ptr: *mut c_char) -> Release {
    unsafe { release_string(AllocationKind::Message, ptr) }
}

// ---------------------------------------------------------------------------
// Boxed values
// ---------------------------------------------------------------------------

/// Box `value` for the host; it must come back through [`release_boxed`]
pub fn issue_boxed<T>(kind: AllocationKind, value: T) -> *mut T {
    let ptr = Box::into_raw(Box::new(value));
    track(ptr as usize, kind);
    ptr
}

/// Reclaim a value issued with [`issue_boxed`] under the same `kind`
///
/// Returns `None` for null or for a pointer the debug ledger does not know.
///
/// # Safety
///
/// `ptr` must be null or a pointer returned by `issue_boxed::<T>`.
pub unsafe fn release_boxed<T>(kind: AllocationKind, ptr: *mut T) -> Option<Box<T>> {
    if ptr.is_null() {
        return None;
    }
    if !untrack(ptr as usize, kind) {
        violation(kind, ptr as usize);
        return None;
    }
    // SAFETY: the ledger (or the caller's contract) says this came from into_raw
    Some(unsafe { Box::from_raw(ptr) })
}

// ---------------------------------------------------------------------------
// Type-erased payloads
// ---------------------------------------------------------------------------

unsafe fn drop_boxed<T>(ptr: *mut c_void) {
    // SAFETY: registered alongside a Box<T> of exactly this type
    drop(unsafe { Box::from_raw(ptr as *mut T) });
}

/// Box `value` as an Ok payload and remember how to free it
pub fn register_payload<T: Send + 'static>(value: T) -> *mut c_void {
    let ptr = Box::into_raw(Box::new(value)) as *mut c_void;
    PAYLOADS.insert(ptr as usize, drop_boxed::<T> as DropFn);
    ptr
}

/// Free a payload registered with [`register_payload`]
///
/// # Safety
///
/// `ptr` must be null or a payload pointer that is not in use.
pub unsafe fn release_payload(ptr: *mut c_void) -> Release {
    if ptr.is_null() {
        return Release::Ignored;
    }
    match PAYLOADS.remove(&(ptr as usize)) {
        Some((_, drop_fn)) => {
            // SAFETY: drop_fn was registered for this exact allocation
            unsafe { drop_fn(ptr) };
            Release::Released
        }
        None => violation(AllocationKind::Payload, ptr as usize),
    }
}
