//! Callback slot registry
//!
//! Holds at most one active slot per [`DeliveryKind`]. Replacing a slot
//! retires the previous one: its liveness flag is cleared before the new slot
//! becomes visible, so a reader holding the old snapshot will not start a new
//! invocation against it.

use logbridge_core::LogLevel;
use parking_lot::RwLock;
use std::ffi::{CStr, CString};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Which dispatch path a slot serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryKind {
    /// Invoked inline on the producer thread
    Sync,
    /// Invoked on the bridge's consumer thread
    Async,
}

impl std::fmt::Display for DeliveryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryKind::Sync => write!(f, "sync"),
            DeliveryKind::Async => write!(f, "async"),
        }
    }
}

/// Receiver of delivered log messages
///
/// Implementations must be callable from any thread: sync slots run on the
/// producer's thread, async slots on the consumer thread.
pub trait LogSink: Send + Sync {
    /// Deliver a message that stays owned by the bridge.
    ///
    /// The reference is only valid for the duration of the call.
    fn deliver(&self, message: &CStr);

    /// Deliver a message whose buffer the receiver takes over.
    ///
    /// The default borrows the message and then drops it, which is what a
    /// sink without its own release protocol wants.
    fn deliver_owned(&self, message: CString) {
        self.deliver(&message);
    }
}

impl<F> LogSink for F
where
    F: Fn(&CStr) + Send + Sync,
{
    fn deliver(&self, message: &CStr) {
        self(message)
    }
}

/// A registered (sink, threshold) pair for one delivery kind
pub struct CallbackSlot {
    sink: Arc<dyn LogSink>,
    min_level: LogLevel,
    kind: DeliveryKind,
    live: AtomicBool,
}

impl CallbackSlot {
    /// Create a live slot
    pub fn new(kind: DeliveryKind, sink: Arc<dyn LogSink>, min_level: LogLevel) -> Self {
        Self {
            sink,
            min_level,
            kind,
            live: AtomicBool::new(true),
        }
    }

    pub fn min_level(&self) -> LogLevel {
        self.min_level
    }

    /// False once the slot has been replaced or unregistered
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Check if this slot should receive a message of `level`
    pub fn accepts(&self, level: LogLevel) -> bool {
        self.is_live() && level >= self.min_level
    }

    /// Invoke the sink with a borrowed message
    ///
    /// Returns false without invoking when the slot has been retired.
    pub fn deliver(&self, message: &CStr) -> bool {
        if !self.is_live() {
            return false;
        }
        self.sink.deliver(message);
        true
    }

    /// Invoke the sink with an owned message
    ///
    /// A retired slot drops the message and returns false.
    pub fn deliver_owned(&self, message: CString) -> bool {
        if !self.is_live() {
            return false;
        }
        self.sink.deliver_owned(message);
        true
    }

    fn retire(&self) {
        self.live.store(false, Ordering::Release);
    }
}

impl std::fmt::Debug for CallbackSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackSlot")
            .field("kind", &self.kind)
            .field("min_level", &self.min_level)
            .field("live", &self.is_live())
            .finish()
    }
}

/// Registry of the active sync and async slots
#[derive(Default)]
pub struct CallbackRegistry {
    sync_slot: RwLock<Option<Arc<CallbackSlot>>>,
    async_slot: RwLock<Option<Arc<CallbackSlot>>>,
}

impl CallbackRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, kind: DeliveryKind) -> &RwLock<Option<Arc<CallbackSlot>>> {
        match kind {
            DeliveryKind::Sync => &self.sync_slot,
            DeliveryKind::Async => &self.async_slot,
        }
    }

    /// Install a sink for `kind`, retiring any previous slot of that kind
    ///
    /// Returns the retired slot, if there was one.
    pub fn register(
        &self,
        kind: DeliveryKind,
        sink: Arc<dyn LogSink>,
        min_level: LogLevel,
    ) -> Option<Arc<CallbackSlot>> {
        let slot = Arc::new(CallbackSlot::new(kind, sink, min_level));
        let mut guard = self.slot(kind).write();
        if let Some(previous) = guard.as_ref() {
            previous.retire();
        }
        guard.replace(slot)
    }

    /// Remove the slot for `kind`
    ///
    /// Returns true if a slot was retired; calling with nothing registered is
    /// a no-op.
    pub fn unregister(&self, kind: DeliveryKind) -> bool {
        let mut guard = self.slot(kind).write();
        match guard.take() {
            Some(previous) => {
                previous.retire();
                true
            }
            None => false,
        }
    }

    /// Snapshot of the active slot for `kind`
    ///
    /// The lock is released before returning, so callers may invoke the slot
    /// without blocking registration.
    pub fn current(&self, kind: DeliveryKind) -> Option<Arc<CallbackSlot>> {
        self.slot(kind).read().clone()
    }

    /// Retire every slot
    pub fn clear(&self) {
        self.unregister(DeliveryKind::Sync);
        self.unregister(DeliveryKind::Async);
    }
}
