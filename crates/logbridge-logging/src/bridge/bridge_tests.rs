#![allow(non_snake_case)]

use super::*;
use crossbeam_channel::{Receiver, unbounded};
use std::thread;
use logbridge_core::OverflowPolicy;

const WAIT: Duration = Duration::from_secs(5);

fn recording_sink() -> (Arc<dyn LogSink>, Arc<parking_lot::Mutex<Vec<String>>>) {
    let messages = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let captured = messages.clone();
    let sink: Arc<dyn LogSink> = Arc::new(move |msg: &CStr| {
        captured.lock().push(msg.to_string_lossy().into_owned());
    });
    (sink, messages)
}

fn channel_sink() -> (Arc<dyn LogSink>, Receiver<String>) {
    let (tx, rx) = unbounded();
    let sink: Arc<dyn LogSink> = Arc::new(move |msg: &CStr| {
        let _ = tx.send(msg.to_string_lossy().into_owned());
    });
    (sink, rx)
}

fn collect(rx: &Receiver<String>, count: usize) -> Vec<String> {
    (0..count).map(|_| rx.recv_timeout(WAIT).unwrap()).collect()
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

#[test]
fn LogBridge___new___starts_active() {
    let bridge = LogBridge::with_defaults().unwrap();

    assert_eq!(bridge.state(), LifecycleState::Active);
    assert_eq!(bridge.level(), LogLevel::Debug);
}

#[test]
fn LogBridge___new_with_config_level___sets_global_filter() {
    let config = BridgeConfig {
        log_level: "warn".to_string(),
        ..BridgeConfig::default()
    };

    let bridge = LogBridge::new(config).unwrap();

    assert_eq!(bridge.level(), LogLevel::Warn);
}

#[test]
fn LogBridge___new_with_zero_capacity___fails() {
    let config = BridgeConfig::default().with_queue_capacity(0);

    let result = LogBridge::new(config);

    assert!(matches!(result, Err(BridgeError::ConfigError(_))));
}

// ---------------------------------------------------------------------------
// Emit
// ---------------------------------------------------------------------------

#[test]
fn LogBridge___emit_with_sync_slot___delivers_inline_and_queues_nothing() {
    let bridge = LogBridge::with_defaults().unwrap();
    let (sink, messages) = recording_sink();
    bridge.register(DeliveryKind::Sync, sink, LogLevel::Debug);

    let outcome = bridge.emit(LogLevel::Error, "boom").unwrap();

    assert_eq!(
        outcome,
        EmitOutcome {
            sync_delivered: true,
            async_queued: false,
        }
    );
    assert_eq!(*messages.lock(), vec!["boom".to_string()]);
    assert_eq!(bridge.stats().async_enqueued, 0);
}

#[test]
fn LogBridge___emit_with_async_threshold___delivers_only_admitted_in_order() {
    let bridge = LogBridge::with_defaults().unwrap();
    let (sink, rx) = channel_sink();
    bridge.register(DeliveryKind::Async, sink, LogLevel::Warn);

    bridge.emit(LogLevel::Info, "x").unwrap();
    bridge.emit(LogLevel::Debug, "y").unwrap();
    bridge.emit(LogLevel::Error, "z").unwrap();
    bridge.emit(LogLevel::Warn, "w").unwrap();

    assert_eq!(collect(&rx, 2), vec!["z".to_string(), "w".to_string()]);
    bridge.shutdown().unwrap();
    assert!(rx.try_recv().is_err());
    assert_eq!(bridge.stats().filtered, 2);
}

#[test]
fn LogBridge___emit_with_both_slots___reaches_each_once() {
    let bridge = LogBridge::with_defaults().unwrap();
    let (sync_sink, sync_messages) = recording_sink();
    let (async_sink, rx) = channel_sink();
    bridge.register(DeliveryKind::Sync, sync_sink, LogLevel::Debug);
    bridge.register(DeliveryKind::Async, async_sink, LogLevel::Debug);

    let outcome = bridge.emit(LogLevel::Info, "both").unwrap();

    assert!(outcome.sync_delivered);
    assert!(outcome.async_queued);
    assert_eq!(*sync_messages.lock(), vec!["both".to_string()]);
    assert_eq!(collect(&rx, 1), vec!["both".to_string()]);
}

#[test]
fn LogBridge___emit_without_slots___counts_as_filtered() {
    let bridge = LogBridge::with_defaults().unwrap();

    let outcome = bridge.emit(LogLevel::Error, "nobody listening").unwrap();

    assert_eq!(outcome, EmitOutcome::default());
    let stats = bridge.stats();
    assert_eq!(stats.emitted, 1);
    assert_eq!(stats.filtered, 1);
}

#[test]
fn LogBridge___emit_below_global_level___reaches_no_slot() {
    let bridge = LogBridge::with_defaults().unwrap();
    let (sink, messages) = recording_sink();
    bridge.register(DeliveryKind::Sync, sink, LogLevel::Debug);
    bridge.set_level(LogLevel::Error);

    let outcome = bridge.emit(LogLevel::Warn, "quiet").unwrap();

    assert_eq!(outcome, EmitOutcome::default());
    assert!(messages.lock().is_empty());
}

#[test]
fn LogBridge___emit_with_interior_nul___is_invalid_argument() {
    let bridge = LogBridge::with_defaults().unwrap();

    let result = bridge.emit(LogLevel::Info, "bad\0text");

    assert!(matches!(result, Err(BridgeError::InvalidArgument(_))));
}

#[test]
fn LogBridge___emit_c___copies_message_for_async_delivery() {
    let bridge = LogBridge::with_defaults().unwrap();
    let (sink, rx) = channel_sink();
    bridge.register(DeliveryKind::Async, sink, LogLevel::Debug);

    {
        let transient = CString::new("short lived").unwrap();
        bridge.emit_c(LogLevel::Info, &transient).unwrap();
    }

    assert_eq!(collect(&rx, 1), vec!["short lived".to_string()]);
}

#[test]
fn LogBridge___emit_with_full_drop_newest_queue___reports_queue_full() {
    let config = BridgeConfig::default()
        .with_queue_capacity(1)
        .with_overflow_policy(OverflowPolicy::DropNewest);
    let bridge = LogBridge::new(config).unwrap();
    let (started_tx, started_rx) = unbounded::<()>();
    let (gate_tx, gate_rx) = unbounded::<()>();
    let sink: Arc<dyn LogSink> = Arc::new(move |_: &CStr| {
        let _ = started_tx.send(());
        let _ = gate_rx.recv();
    });
    bridge.register(DeliveryKind::Async, sink, LogLevel::Debug);

    bridge.emit(LogLevel::Info, "in flight").unwrap();
    started_rx.recv_timeout(WAIT).unwrap();
    bridge.emit(LogLevel::Info, "queued").unwrap();
    let result = bridge.emit(LogLevel::Info, "overflow");

    assert!(matches!(result, Err(BridgeError::QueueFull { capacity: 1 })));
    drop(gate_tx);
    bridge.shutdown().unwrap();
    assert_eq!(bridge.stats().overflow_dropped, 1);
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

#[test]
fn LogBridge___replace_async_slot___new_slot_gets_later_messages_only() {
    let bridge = LogBridge::with_defaults().unwrap();
    let (first, first_rx) = channel_sink();
    let (second, second_rx) = channel_sink();
    bridge.register(DeliveryKind::Async, first, LogLevel::Debug);
    bridge.emit(LogLevel::Info, "one").unwrap();
    assert_eq!(collect(&first_rx, 1), vec!["one".to_string()]);

    bridge.register(DeliveryKind::Async, second, LogLevel::Debug);
    bridge.emit(LogLevel::Info, "two").unwrap();
    bridge.shutdown().unwrap();

    assert_eq!(second_rx.try_iter().collect::<Vec<_>>(), vec!["two".to_string()]);
    assert!(first_rx.try_recv().is_err());
}

#[test]
fn LogBridge___unregister___stops_delivery() {
    let bridge = LogBridge::with_defaults().unwrap();
    let (sink, messages) = recording_sink();
    bridge.register(DeliveryKind::Sync, sink, LogLevel::Debug);

    assert!(bridge.unregister(DeliveryKind::Sync));
    bridge.emit(LogLevel::Error, "gone").unwrap();

    assert!(messages.lock().is_empty());
    assert!(!bridge.unregister(DeliveryKind::Sync));
}

#[test]
fn LogBridge___is_enabled___respects_filter_and_slot_thresholds() {
    let bridge = LogBridge::with_defaults().unwrap();
    assert!(!bridge.is_enabled(LogLevel::Error));

    let (sink, _) = recording_sink();
    bridge.register(DeliveryKind::Async, sink, LogLevel::Warn);

    assert!(!bridge.is_enabled(LogLevel::Info));
    assert!(bridge.is_enabled(LogLevel::Warn));

    bridge.set_level(LogLevel::Error);
    assert!(!bridge.is_enabled(LogLevel::Warn));
}

// ---------------------------------------------------------------------------
// Shutdown
// ---------------------------------------------------------------------------

#[test]
fn LogBridge___shutdown___reaches_stopped_and_is_idempotent() {
    let bridge = LogBridge::with_defaults().unwrap();

    bridge.shutdown().unwrap();
    assert_eq!(bridge.state(), LifecycleState::Stopped);

    bridge.shutdown().unwrap();
    assert_eq!(bridge.state(), LifecycleState::Stopped);
}

#[test]
fn LogBridge___after_shutdown___async_stops_but_sync_keeps_working() {
    let bridge = LogBridge::with_defaults().unwrap();
    let (sync_sink, sync_messages) = recording_sink();
    let (async_sink, rx) = channel_sink();
    bridge.register(DeliveryKind::Sync, sync_sink, LogLevel::Debug);
    bridge.register(DeliveryKind::Async, async_sink, LogLevel::Debug);
    bridge.shutdown().unwrap();

    let result = bridge.emit(LogLevel::Info, "late");

    assert!(matches!(result, Err(BridgeError::Stopped)));
    assert_eq!(*sync_messages.lock(), vec!["late".to_string()]);
    assert!(rx.try_recv().is_err());
    assert_eq!(bridge.stats().stopped_dropped, 1);
}

#[test]
fn LogBridge___shutdown_timeout___stays_stopping_until_retry_joins() {
    let bridge = LogBridge::with_defaults().unwrap();
    let (sink, messages) = recording_sink();
    let slow: Arc<dyn LogSink> = Arc::new(move |msg: &CStr| {
        thread::sleep(Duration::from_millis(300));
        sink.deliver(msg);
    });
    bridge.register(DeliveryKind::Async, slow, LogLevel::Debug);
    bridge.emit(LogLevel::Info, "slow").unwrap();

    let first = bridge.shutdown_with_timeout(Duration::from_millis(10));

    assert!(matches!(first, Err(BridgeError::ShutdownTimeout { .. })));
    assert_eq!(bridge.state(), LifecycleState::Stopping);
    assert!(matches!(bridge.emit(LogLevel::Info, "refused"), Err(BridgeError::Stopped)));

    bridge.shutdown_with_timeout(WAIT).unwrap();

    assert_eq!(bridge.state(), LifecycleState::Stopped);
    assert_eq!(*messages.lock(), vec!["slow".to_string()]);
}

#[test]
fn LogBridge___shutdown_with_drain___delivers_queued_messages() {
    let bridge = LogBridge::with_defaults().unwrap();
    let (sink, messages) = recording_sink();
    bridge.register(DeliveryKind::Async, sink, LogLevel::Debug);

    for i in 0..50 {
        bridge.emit(LogLevel::Info, &format!("m{i}")).unwrap();
    }
    bridge.shutdown().unwrap();

    let expected: Vec<String> = (0..50).map(|i| format!("m{i}")).collect();
    assert_eq!(*messages.lock(), expected);
}

// ---------------------------------------------------------------------------
// Global instance
// ---------------------------------------------------------------------------

// The global slot is process-wide, so every global scenario lives in one test.
#[test]
fn LogBridge___global_lifecycle() {
    LogBridge::reset_global().unwrap();
    assert!(LogBridge::try_global().is_none());

    let config = BridgeConfig {
        log_level: "info".to_string(),
        ..BridgeConfig::default()
    };
    let installed = LogBridge::init_global(config).unwrap();
    assert_eq!(installed.level(), LogLevel::Info);

    let again = LogBridge::init_global(BridgeConfig::default());
    assert!(matches!(again, Err(BridgeError::AlreadyInitialized)));

    let fetched = LogBridge::global().unwrap();
    assert!(Arc::ptr_eq(&installed, &fetched));

    // Shutdown keeps the instance installed
    LogBridge::shutdown_global().unwrap();
    assert_eq!(installed.state(), LifecycleState::Stopped);
    let still_there = LogBridge::try_global().unwrap();
    assert!(Arc::ptr_eq(&installed, &still_there));

    // A stopped instance can be replaced
    let replaced = LogBridge::init_global(BridgeConfig::default()).unwrap();
    assert!(!Arc::ptr_eq(&installed, &replaced));
    assert_eq!(replaced.state(), LifecycleState::Active);

    // Reset detaches; the next global() builds a default instance
    LogBridge::reset_global().unwrap();
    assert!(LogBridge::try_global().is_none());
    assert_eq!(replaced.state(), LifecycleState::Stopped);

    let implicit = LogBridge::global().unwrap();
    assert_eq!(implicit.level(), LogLevel::Debug);
    assert!(!Arc::ptr_eq(&replaced, &implicit));

    LogBridge::reset_global().unwrap();
    LogBridge::reset_global().unwrap();
}
