//! Tracing layer that forwards events into the bridge

use crate::INTERNAL_TARGET;
use crate::bridge::LogBridge;
use chrono::{DateTime, Local};
use logbridge_core::LogLevel;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::subscriber::Interest;
use tracing::{Event, Level, Metadata, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

/// Tracing layer that turns `tracing` events into bridge emits
///
/// Events with the [`INTERNAL_TARGET`] target are the bridge's own
/// diagnostics and are never forwarded.
pub struct BridgeLayer {
    bridge: Option<Arc<LogBridge>>,
}

impl BridgeLayer {
    /// Create a layer that forwards to the process-wide bridge
    pub fn new() -> Self {
        Self { bridge: None }
    }

    /// Create a layer bound to a specific bridge
    pub fn with_bridge(bridge: Arc<LogBridge>) -> Self {
        Self {
            bridge: Some(bridge),
        }
    }

    fn target_bridge(&self) -> Option<Arc<LogBridge>> {
        match &self.bridge {
            Some(bridge) => Some(bridge.clone()),
            None => LogBridge::try_global(),
        }
    }

    /// Convert tracing Level to our LogLevel
    fn convert_level(level: &Level) -> LogLevel {
        match *level {
            Level::TRACE | Level::DEBUG => LogLevel::Debug,
            Level::INFO => LogLevel::Info,
            Level::WARN => LogLevel::Warn,
            Level::ERROR => LogLevel::Error,
        }
    }

    fn is_internal(metadata: &Metadata<'_>) -> bool {
        metadata.target().starts_with(INTERNAL_TARGET)
    }
}

impl Default for BridgeLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Layer<S> for BridgeLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if Self::is_internal(metadata) {
            return;
        }

        let bridge = match self.target_bridge() {
            Some(bridge) => bridge,
            None => return,
        };

        let level = Self::convert_level(metadata.level());
        if !bridge.is_enabled(level) {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let line = format_line(
            Local::now(),
            level,
            metadata.target(),
            metadata.file(),
            metadata.line(),
            &visitor.message.unwrap_or_default(),
        );

        // A full or stopped queue is already counted; tracing has no error path.
        let _ = bridge.emit(level, &line);
    }

    fn register_callsite(&self, metadata: &'static Metadata<'static>) -> Interest {
        if Self::is_internal(metadata) {
            return Interest::never();
        }
        // Slots and levels change at runtime, so never cache a verdict.
        Interest::sometimes()
    }

    fn enabled(&self, metadata: &Metadata<'_>, _ctx: Context<'_, S>) -> bool {
        if Self::is_internal(metadata) {
            return false;
        }
        match self.target_bridge() {
            Some(bridge) => bridge.is_enabled(Self::convert_level(metadata.level())),
            None => false,
        }
    }
}

/// Fixed-width tag for a level
pub(crate) fn level_tag(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Debug => "[DEBG]",
        LogLevel::Info => "[INFO]",
        LogLevel::Warn => "[WARN]",
        LogLevel::Error => "[ERR ]",
    }
}

/// Render `HH:MM:SS.mmm [TARGET] [TAG ] file@line: message`
pub(crate) fn format_line(
    timestamp: DateTime<Local>,
    level: LogLevel,
    target: &str,
    file: Option<&str>,
    line: Option<u32>,
    message: &str,
) -> String {
    let file = file.unwrap_or("<unknown>");
    // Interior NULs cannot cross as a C string.
    let message = message.replace('\0', "\u{FFFD}");
    match line {
        Some(line) => format!(
            "{} [{}] {} {}@{}: {}",
            timestamp.format("%H:%M:%S%.3f"),
            target,
            level_tag(level),
            file,
            line,
            message
        ),
        None => format!(
            "{} [{}] {} {}: {}",
            timestamp.format("%H:%M:%S%.3f"),
            target,
            level_tag(level),
            file,
            message
        ),
    }
}

/// Visitor to extract the message field from tracing events
#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" || self.message.is_none() {
            self.message = Some(format!("{:?}", value));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" || self.message.is_none() {
            self.message = Some(value.to_string());
        }
    }
}

/// Install [`BridgeLayer`] as the global `tracing` subscriber
///
/// Events go to the process-wide bridge, so create it first with
/// [`LogBridge::init_global`] or [`LogBridge::global`]. Does nothing if a
/// global subscriber is already set.
pub fn init_logging() {
    use tracing_subscriber::prelude::*;

    let subscriber = tracing_subscriber::registry().with(BridgeLayer::new());

    // Try to set as global default (ignore error if already set)
    let _ = tracing::subscriber::set_global_default(subscriber);
}
