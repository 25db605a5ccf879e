// Unit tests for LogCore filtering, overflow and formatting.
//
// Each test drives a local `LogCore`, so they do not interfere with the global logger.

use crate::log_core::LogCore;
use log::{Level, LevelFilter};

/// Test-only logging helper (mirrors the `log` macros, but targets a local `LogCore`).
macro_rules! test_log {
    ($logger:expr, $level:expr, $($arg:tt)*) => {
        $logger._log($level, "test", format_args!($($arg)*))
    };
}

mod filter;
