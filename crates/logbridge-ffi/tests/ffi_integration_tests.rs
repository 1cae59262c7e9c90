//! FFI Integration Tests
//!
//! These tests drive the exported C ABI the way a host would:
//! - explicit init, registration, emit, shutdown
//! - threshold filtering on both delivery paths
//! - result envelopes released on both branches

#![allow(non_snake_case)]

use logbridge_ffi::{
    FfiResult, LogBridgeStats, LogLevel, ResultType, free_log_memory_batch, free_result,
    logbridge_emit, logbridge_init, logbridge_shutdown, logbridge_stats,
    register_async_callback, register_async_callback_with_level, register_sync_callback,
    register_sync_callback_with_level, unregister_async_callback,
};
use logbridge_logging::LogBridge;
use parking_lot::{Mutex, MutexGuard};
use std::ffi::{CStr, c_char, c_void};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

static LOCK: Mutex<()> = Mutex::new(());
static SYNC_SEEN: Mutex<Vec<(String, ThreadId)>> = Mutex::new(Vec::new());
static ASYNC_SEEN: Mutex<Vec<(String, ThreadId)>> = Mutex::new(Vec::new());
static OWNED: Mutex<Vec<usize>> = Mutex::new(Vec::new());

extern "C" fn on_sync(msg: *const c_char) {
    let text = unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned();
    SYNC_SEEN.lock().push((text, thread::current().id()));
}

extern "C" fn on_async(msg: *const c_char) {
    let text = unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned();
    ASYNC_SEEN.lock().push((text, thread::current().id()));
}

extern "C" fn on_async_owned(msg: *const c_char) {
    on_async(msg);
    OWNED.lock().push(msg as usize);
}

fn setup(config: &str) -> MutexGuard<'static, ()> {
    let guard = LOCK.lock();
    LogBridge::reset_global().unwrap();
    SYNC_SEEN.lock().clear();
    ASYNC_SEEN.lock().clear();
    OWNED.lock().clear();
    check(unsafe { logbridge_init(config.as_ptr(), config.len()) });
    guard
}

fn check(result: FfiResult) {
    let message = unsafe { result.error_message() };
    assert_eq!(result.result_type, ResultType::Ok, "export failed: {:?}", message);
    unsafe { free_result(result) };
}

fn emit(level: LogLevel, message: &CStr) {
    check(unsafe { logbridge_emit(level as i32, message.as_ptr()) });
}

fn texts(seen: &[(String, ThreadId)]) -> Vec<&str> {
    seen.iter().map(|(text, _)| text.as_str()).collect()
}

fn wait_for_async(count: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while ASYNC_SEEN.lock().len() < count {
        assert!(Instant::now() < deadline, "async delivery timed out");
        thread::sleep(Duration::from_millis(1));
    }
}

const QUIET: &str = r#"{"forward_tracing": false}"#;

#[test]
fn async_callback___runs_on_consumer_thread_in_fifo_order() {
    let _guard = setup(QUIET);
    check(register_async_callback(Some(on_async)));

    emit(LogLevel::Info, c"A");
    emit(LogLevel::Info, c"B");
    emit(LogLevel::Info, c"C");
    check(logbridge_shutdown());

    let seen = ASYNC_SEEN.lock();
    assert_eq!(texts(&seen), vec!["A", "B", "C"]);
    let caller = thread::current().id();
    assert!(seen.iter().all(|(_, id)| *id != caller));
}

#[test]
fn sync_callback___runs_on_caller_thread() {
    let _guard = setup(QUIET);
    check(register_sync_callback(Some(on_sync)));

    emit(LogLevel::Warn, c"here");

    let seen = SYNC_SEEN.lock();
    assert_eq!(texts(&seen), vec!["here"]);
    assert_eq!(seen[0].1, thread::current().id());
}

#[test]
fn both_paths___each_applies_its_own_threshold() {
    let _guard = setup(QUIET);
    check(register_sync_callback_with_level(Some(on_sync), LogLevel::Error as i32));
    check(register_async_callback_with_level(Some(on_async), LogLevel::Info as i32));

    emit(LogLevel::Debug, c"d");
    emit(LogLevel::Info, c"i");
    emit(LogLevel::Error, c"e");
    check(logbridge_shutdown());

    assert_eq!(texts(&SYNC_SEEN.lock()), vec!["e"]);
    assert_eq!(texts(&ASYNC_SEEN.lock()), vec!["i", "e"]);
}

#[test]
fn unregister_async___later_messages_are_not_delivered() {
    let _guard = setup(QUIET);
    check(register_async_callback(Some(on_async)));
    emit(LogLevel::Info, c"before");
    wait_for_async(1);

    check(unregister_async_callback());
    emit(LogLevel::Info, c"after");
    check(logbridge_shutdown());

    assert_eq!(texts(&ASYNC_SEEN.lock()), vec!["before"]);
}

#[test]
fn transferred_ownership___host_releases_every_buffer_once() {
    let _guard = setup(r#"{"async_ownership": "transferred", "forward_tracing": false}"#);
    check(register_async_callback(Some(on_async_owned)));

    for message in [c"m1", c"m2", c"m3", c"m4"] {
        emit(LogLevel::Info, message);
    }
    check(logbridge_shutdown());

    let mut owned: Vec<*mut c_void> = OWNED
        .lock()
        .iter()
        .map(|&address| address as *mut c_void)
        .collect();
    assert_eq!(owned.len(), 4);
    unsafe { free_log_memory_batch(owned.as_mut_ptr(), owned.len() as i32) };
    assert!(owned.iter().all(|&ptr| !logbridge_ffi::ledger::is_outstanding(ptr)));
}

#[test]
fn stats___reflect_delivery_and_drops() {
    let _guard = setup(QUIET);
    check(register_async_callback_with_level(Some(on_async), LogLevel::Warn as i32));
    emit(LogLevel::Debug, c"filtered");
    emit(LogLevel::Warn, c"kept");
    check(logbridge_shutdown());

    let result = logbridge_stats();
    assert_eq!(result.result_type, ResultType::Ok);
    let stats = unsafe { *(result.data() as *const LogBridgeStats) };
    unsafe { free_result(result) };

    assert_eq!(stats.emitted, 2);
    assert_eq!(stats.filtered, 1);
    assert_eq!(stats.async_enqueued, 1);
    assert_eq!(stats.async_delivered, 1);
    assert_eq!(stats.overflow_dropped, 0);
}
