//! Process-scoped bridge state and lifecycle

use crate::INTERNAL_TARGET;
use crate::dispatch::SyncDispatcher;
use crate::filter::LevelFilter;
use crate::queue::AsyncDispatchQueue;
use crate::registry::{CallbackRegistry, CallbackSlot, DeliveryKind, LogSink};
use crate::stats::{DispatchStats, StatsSnapshot};
use logbridge_core::{BridgeConfig, BridgeError, BridgeResult, LifecycleState, LogLevel};
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use std::ffi::{CStr, CString};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

/// Global bridge instance
static GLOBAL_BRIDGE: Lazy<RwLock<Option<Arc<LogBridge>>>> = Lazy::new(|| RwLock::new(None));

/// What happened to a single emitted message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitOutcome {
    /// The sync slot was invoked before `emit` returned
    pub sync_delivered: bool,
    /// An owned copy was pushed onto the async queue
    pub async_queued: bool,
}

/// The logging bridge: filter, registry, and both dispatch paths
///
/// One instance normally lives for the whole process behind
/// [`LogBridge::global`], but instances are independent so tests can build
/// their own.
pub struct LogBridge {
    config: BridgeConfig,
    filter: Arc<LevelFilter>,
    registry: Arc<CallbackRegistry>,
    stats: Arc<DispatchStats>,
    sync: SyncDispatcher,
    queue: AsyncDispatchQueue,
    state: AtomicU8,
    // Serializes shutdown so the state machine is walked once.
    shutdown_lock: Mutex<()>,
}

impl LogBridge {
    /// Create a bridge and start its consumer thread
    pub fn new(config: BridgeConfig) -> BridgeResult<Self> {
        config.validate()?;

        let filter = Arc::new(LevelFilter::new(config.min_level()?));
        let registry = Arc::new(CallbackRegistry::new());
        let stats = Arc::new(DispatchStats::new());
        let sync = SyncDispatcher::new(registry.clone(), filter.clone(), stats.clone());
        let queue = AsyncDispatchQueue::start(&config, registry.clone(), stats.clone())?;

        Ok(Self {
            config,
            filter,
            registry,
            stats,
            sync,
            queue,
            state: AtomicU8::new(LifecycleState::Active.as_u8()),
            shutdown_lock: Mutex::new(()),
        })
    }

    /// Create a bridge with default configuration
    pub fn with_defaults() -> BridgeResult<Self> {
        Self::new(BridgeConfig::default())
    }

    // ---------------------------------------------------------------------
    // Process-scoped instance
    // ---------------------------------------------------------------------

    /// Install a bridge built from `config` as the process-wide instance
    ///
    /// Fails with `AlreadyInitialized` if a running instance exists, including
    /// one created implicitly by [`LogBridge::global`]. A stopped instance is
    /// replaced.
    pub fn init_global(config: BridgeConfig) -> BridgeResult<Arc<LogBridge>> {
        let mut guard = GLOBAL_BRIDGE.write();
        if let Some(existing) = guard.as_ref()
            && !existing.state().is_terminal()
        {
            return Err(BridgeError::AlreadyInitialized);
        }
        let bridge = Arc::new(LogBridge::new(config)?);
        *guard = Some(bridge.clone());
        tracing::debug!(target: INTERNAL_TARGET, "global log bridge initialized");
        Ok(bridge)
    }

    /// Get the process-wide instance, creating a default one on first use
    pub fn global() -> BridgeResult<Arc<LogBridge>> {
        if let Some(bridge) = Self::try_global() {
            return Ok(bridge);
        }

        let mut guard = GLOBAL_BRIDGE.write();
        // Another thread may have won the race while we waited for the lock.
        if let Some(bridge) = guard.as_ref() {
            return Ok(bridge.clone());
        }
        let bridge = Arc::new(LogBridge::with_defaults()?);
        *guard = Some(bridge.clone());
        Ok(bridge)
    }

    /// Get the process-wide instance without creating one
    pub fn try_global() -> Option<Arc<LogBridge>> {
        GLOBAL_BRIDGE.read().clone()
    }

    /// Shut down the process-wide instance, if any
    ///
    /// The instance stays installed: registrations survive and synchronous
    /// delivery keeps working, while async emits fail with `Stopped`.
    pub fn shutdown_global() -> BridgeResult<()> {
        match Self::try_global() {
            Some(bridge) => bridge.shutdown(),
            None => Ok(()),
        }
    }

    /// Detach the process-wide instance and shut it down
    ///
    /// The next [`LogBridge::global`] or [`LogBridge::init_global`] starts
    /// from a fresh instance with no registrations.
    pub fn reset_global() -> BridgeResult<()> {
        let bridge = GLOBAL_BRIDGE.write().take();
        match bridge {
            Some(bridge) => bridge.shutdown(),
            None => Ok(()),
        }
    }

    // ---------------------------------------------------------------------
    // Registration
    // ---------------------------------------------------------------------

    /// Install a sink for `kind`, retiring the previous one
    pub fn register(&self, kind: DeliveryKind, sink: Arc<dyn LogSink>, min_level: LogLevel) {
        self.registry.register(kind, sink, min_level);
        tracing::debug!(
            target: INTERNAL_TARGET,
            kind = %kind,
            min_level = %min_level,
            "log callback registered"
        );
    }

    /// Remove the sink for `kind`; returns true if one was registered
    pub fn unregister(&self, kind: DeliveryKind) -> bool {
        self.registry.unregister(kind)
    }

    /// Snapshot of the active slot for `kind`
    pub fn current(&self, kind: DeliveryKind) -> Option<Arc<CallbackSlot>> {
        self.registry.current(kind)
    }

    // ---------------------------------------------------------------------
    // Filtering
    // ---------------------------------------------------------------------

    /// Set the process-wide minimum level
    pub fn set_level(&self, level: LogLevel) {
        self.filter.set_minimum(level);
    }

    /// Get the process-wide minimum level
    pub fn level(&self) -> LogLevel {
        self.filter.minimum()
    }

    /// Check if a message of `level` would reach any registered slot
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        if !self.filter.should_emit(level) {
            return false;
        }
        [DeliveryKind::Sync, DeliveryKind::Async]
            .into_iter()
            .filter_map(|kind| self.registry.current(kind))
            .any(|slot| slot.accepts(level))
    }

    // ---------------------------------------------------------------------
    // Emit
    // ---------------------------------------------------------------------

    /// Emit a message from Rust code
    ///
    /// Fails with `InvalidArgument` if the text contains a NUL byte, which
    /// cannot cross the boundary as a C string.
    pub fn emit(&self, level: LogLevel, message: &str) -> BridgeResult<EmitOutcome> {
        if !self.filter.should_emit(level) {
            self.stats.record_emitted();
            self.stats.record_filtered();
            return Ok(EmitOutcome::default());
        }
        let text = CString::new(message).map_err(|e| {
            BridgeError::InvalidArgument(format!(
                "message contains a NUL byte at position {}",
                e.nul_position()
            ))
        })?;
        self.emit_c(level, &text)
    }

    /// Emit a message that is already a C string
    ///
    /// The sync slot (if any) runs first, inline, with a borrowed view of
    /// `message`. The async slot (if any) then gets an owned copy queued.
    /// Returns `QueueFull` or `Stopped` if the async copy could not be queued;
    /// sync delivery has already happened in that case.
    pub fn emit_c(&self, level: LogLevel, message: &CStr) -> BridgeResult<EmitOutcome> {
        self.stats.record_emitted();

        if !self.filter.should_emit(level) {
            self.stats.record_filtered();
            return Ok(EmitOutcome::default());
        }

        let sync_delivered = self.sync.dispatch(message, level);

        let async_queued = match self.registry.current(DeliveryKind::Async) {
            Some(slot) if slot.accepts(level) => {
                if !self.state().accepts_async() {
                    self.stats.record_stopped_dropped();
                    return Err(BridgeError::Stopped);
                }
                self.queue.enqueue(message.to_owned(), level)?;
                true
            }
            _ => false,
        };

        if !sync_delivered && !async_queued {
            self.stats.record_filtered();
        }

        Ok(EmitOutcome {
            sync_delivered,
            async_queued,
        })
    }

    // ---------------------------------------------------------------------
    // Introspection
    // ---------------------------------------------------------------------

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    // ---------------------------------------------------------------------
    // Shutdown
    // ---------------------------------------------------------------------

    /// Stop the async path using the configured timeout
    pub fn shutdown(&self) -> BridgeResult<()> {
        self.shutdown_with_timeout(Duration::from_millis(self.config.shutdown_timeout_ms))
    }

    /// Stop the async path: close the queue, drain or discard, join
    ///
    /// Slots stay registered, so synchronous delivery keeps working. A second
    /// call is a no-op. On `ShutdownTimeout` the bridge stays `Stopping` and a
    /// later call waits for the consumer again.
    pub fn shutdown_with_timeout(&self, timeout: Duration) -> BridgeResult<()> {
        let _guard = self.shutdown_lock.lock();

        let current = self.state();
        if current.is_terminal() {
            return Ok(());
        }
        if current.can_transition_to(LifecycleState::Stopping) {
            self.set_state(LifecycleState::Stopping);
        }

        let result = self.queue.shutdown(timeout);
        if result.is_ok() {
            self.set_state(LifecycleState::Stopped);
            tracing::debug!(target: INTERNAL_TARGET, "log bridge stopped");
        }
        result
    }

    fn set_state(&self, state: LifecycleState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }
}

impl Drop for LogBridge {
    fn drop(&mut self) {
        if !self.state().is_terminal() {
            let _ = self.shutdown();
        }
    }
}

#[cfg(test)]
#[path = "bridge/bridge_tests.rs"]
mod bridge_tests;
