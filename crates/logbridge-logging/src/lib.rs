//! logbridge-logging - Sync/async log callback dispatch
//!
//! This crate provides:
//! - [`LevelFilter`] process-wide minimum severity
//! - [`CallbackRegistry`] holding one sync and one async [`CallbackSlot`]
//! - [`SyncDispatcher`] for inline delivery on the producer thread
//! - [`AsyncDispatchQueue`] for delivery on a dedicated consumer thread
//! - [`LogBridge`] tying them together with an init/shutdown lifecycle
//! - [`BridgeLayer`] tracing layer that feeds native `tracing` events into the bridge

mod bridge;
mod dispatch;
mod filter;
mod layer;
mod queue;
mod registry;
mod stats;

pub use bridge::{EmitOutcome, LogBridge};
pub use dispatch::SyncDispatcher;
pub use filter::LevelFilter;
pub use layer::{BridgeLayer, init_logging};
pub use logbridge_core::LogLevel;
pub use queue::AsyncDispatchQueue;
pub use registry::{CallbackRegistry, CallbackSlot, DeliveryKind, LogSink};
pub use stats::{DispatchStats, StatsSnapshot};

/// Target used by the dispatch path's own diagnostics
///
/// [`BridgeLayer`] ignores events with this target so they never loop back
/// into the bridge.
pub const INTERNAL_TARGET: &str = "logbridge::internal";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        BridgeLayer, CallbackSlot, DeliveryKind, EmitOutcome, LevelFilter, LogBridge, LogLevel,
        LogSink, init_logging,
    };
}
