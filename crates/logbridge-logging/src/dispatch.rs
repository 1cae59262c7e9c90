//! Inline delivery to the sync slot

use crate::filter::LevelFilter;
use crate::registry::{CallbackRegistry, DeliveryKind};
use crate::stats::DispatchStats;
use logbridge_core::LogLevel;
use std::ffi::CStr;
use std::sync::Arc;

/// Delivers messages to the sync slot on the caller's thread
///
/// The caller blocks until the sink returns. The sink sees a borrowed view
/// of the message that is valid only for the duration of the call. Faults
/// raised inside a foreign sink are not translated.
pub struct SyncDispatcher {
    registry: Arc<CallbackRegistry>,
    filter: Arc<LevelFilter>,
    stats: Arc<DispatchStats>,
}

impl SyncDispatcher {
    pub fn new(
        registry: Arc<CallbackRegistry>,
        filter: Arc<LevelFilter>,
        stats: Arc<DispatchStats>,
    ) -> Self {
        Self {
            registry,
            filter,
            stats,
        }
    }

    /// Deliver `message` if a sync slot is registered and admits `level`
    ///
    /// Returns true if the sink was invoked.
    pub fn dispatch(&self, message: &CStr, level: LogLevel) -> bool {
        if !self.filter.should_emit(level) {
            return false;
        }

        // The registry lock is released here; the sink may log re-entrantly.
        let slot = match self.registry.current(DeliveryKind::Sync) {
            Some(slot) => slot,
            None => return false,
        };

        if !slot.accepts(level) {
            return false;
        }

        let delivered = slot.deliver(message);
        if delivered {
            self.stats.record_sync_delivered();
        }
        delivered
    }
}
