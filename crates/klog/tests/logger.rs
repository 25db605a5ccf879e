//! Integration tests for the global `log` backend.

use std::sync::{Mutex, MutexGuard, OnceLock};

use klog::LogOutput;
use log::LevelFilter;

static OUTPUT_BUF: OnceLock<Mutex<String>> = OnceLock::new();
static SERIAL: Mutex<()> = Mutex::new(());

struct TestOutput;

impl LogOutput for TestOutput {
    fn write_str(&self, s: &str) {
        let buf = OUTPUT_BUF.get_or_init(|| Mutex::new(String::new()));
        buf.lock().unwrap().push_str(s);
    }
}

static TEST_OUTPUT: TestOutput = TestOutput;

/// Tests share the global logger, so they run one at a time from a clean buffer.
fn setup() -> MutexGuard<'static, ()> {
    let guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    klog::register_log_output(&TEST_OUTPUT);
    klog::init();
    klog::set_global_level(LevelFilter::Info);
    klog::set_console_level(LevelFilter::Warn);
    while klog::read_log().is_some() {}
    take_output();
    guard
}

fn take_output() -> String {
    let buf = OUTPUT_BUF.get_or_init(|| Mutex::new(String::new()));
    let mut g = buf.lock().unwrap();
    let out = g.clone();
    g.clear();
    out
}

#[test]
fn test_info_buffered_not_printed() {
    let _guard = setup();

    log::info!("registered, dev={}", "net0");

    assert_eq!(klog::log_len(), 1);
    let entry = klog::read_log().unwrap();
    assert_eq!(entry.level(), log::Level::Info);
    assert_eq!(entry.message(), "registered, dev=net0");
    assert!(take_output().is_empty());
}

#[test]
fn test_error_printed_to_console() {
    let _guard = setup();

    log::error!("checksum error");

    let out = take_output();
    assert!(out.contains("checksum error"));
    assert!(out.ends_with('\n'));
    assert_eq!(klog::read_log().unwrap().message(), "checksum error");
}

#[test]
fn test_debug_filtered_until_enabled() {
    let _guard = setup();

    log::debug!("hidden");
    assert_eq!(klog::log_len(), 0);

    klog::set_global_level(LevelFilter::Debug);
    assert_eq!(log::max_level(), LevelFilter::Debug);
    log::debug!("visible");
    assert_eq!(klog::read_log().unwrap().message(), "visible");
}

#[test]
fn test_init_is_idempotent() {
    let _guard = setup();
    klog::init();
    klog::init();
    log::warn!("still works");
    assert!(take_output().contains("still works"));
}
