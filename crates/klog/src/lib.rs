//! 协议栈日志子系统
//!
//! 该 crate 为 `log` 门面提供后端实现，协议栈的其它 crate 只使用
//! `log::{error, warn, info, debug, trace}` 宏记录日志。
//!
//! # 组件
//!
//! - [`config`] - 配置常量（缓冲区容量、默认级别）
//! - [`LogCore`] - 核心日志实现
//! - [`LogEntry`] - 日志条目
//! - [`hexdump`] - 帧数据转储
//!
//! # 双输出策略
//!
//! 1. **即时控制台输出**：达到控制台级别阈值（默认：Warn 及以上）的日志会直接写入
//!    已注册的 [`LogOutput`]（默认是标准错误）。
//! 2. **缓冲区存储**：达到全局级别阈值（默认：Info 及以上）的日志写入有界缓冲区，
//!    用于事后读取或测试断言。

pub mod config;
mod entry;
mod hexdump;
mod log_core;

#[cfg(test)]
mod tests;

pub use config::{
    DEFAULT_CONSOLE_LEVEL, DEFAULT_LOG_LEVEL, LOG_BUFFER_CAPACITY, MAX_LOG_MESSAGE_LENGTH,
};
pub use entry::{LogEntry, format_log_entry};
pub use hexdump::hexdump;
pub use log_core::LogCore;

use std::io::Write;
use std::sync::Once;

use lazy_static::lazy_static;

use log::{LevelFilter, Log, Metadata, Record};
use sync::RwLock;

// ========== Trait 定义 ==========

/// 日志输出 trait
///
/// 实现此 trait 以接管控制台输出，使用方通过 [`register_log_output`] 注册。
pub trait LogOutput: Send + Sync {
    /// 输出字符串到控制台
    fn write_str(&self, s: &str);
}

/// 默认输出：标准错误
struct StderrOutput;

impl LogOutput for StderrOutput {
    fn write_str(&self, s: &str) {
        let _ = std::io::stderr().lock().write_all(s.as_bytes());
    }
}

static STDERR_OUTPUT: StderrOutput = StderrOutput;

static LOG_OUTPUT: RwLock<Option<&'static dyn LogOutput>> = RwLock::new(None);

/// 注册日志输出，替换默认的标准错误输出
pub fn register_log_output(output: &'static dyn LogOutput) {
    *LOG_OUTPUT.write() = Some(output);
}

pub(crate) fn log_output() -> &'static dyn LogOutput {
    (*LOG_OUTPUT.read()).unwrap_or(&STDERR_OUTPUT)
}

// ========== 全局单例 ==========

lazy_static! {
    /// 全局日志系统实例
    static ref GLOBAL_LOG: LogCore = LogCore::default();
}

/// `log` 门面的后端
struct KLogger;

impl Log for KLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        GLOBAL_LOG._log(record.level(), record.target(), *record.args());
    }

    fn flush(&self) {}
}

static LOGGER: KLogger = KLogger;
static INIT: Once = Once::new();

/// 安装全局 logger
///
/// 可重复调用；若进程中已有其它 logger，则保持原状。
pub fn init() {
    INIT.call_once(|| {
        if log::set_logger(&LOGGER).is_ok() {
            sync_max_level();
        }
    });
}

/// `log` 的静态过滤级别取两个阈值中较宽的一个
fn sync_max_level() {
    let global = GLOBAL_LOG._get_global_level();
    let console = GLOBAL_LOG._get_console_level();
    log::set_max_level(global.max(console));
}

// ========== 公共 API (精简封装) ==========

/// 从缓冲区读取下一个日志条目
pub fn read_log() -> Option<LogEntry> {
    GLOBAL_LOG._read_log()
}

/// 非破坏性读取：按位置查看日志条目
pub fn peek_log(index: usize) -> Option<LogEntry> {
    GLOBAL_LOG._peek_log(index)
}

/// 返回未读日志条目的数量
pub fn log_len() -> usize {
    GLOBAL_LOG._log_len()
}

/// 返回已丢弃日志的计数
pub fn log_dropped_count() -> usize {
    GLOBAL_LOG._log_dropped_count()
}

/// 设置全局日志级别阈值
pub fn set_global_level(level: LevelFilter) {
    GLOBAL_LOG._set_global_level(level);
    sync_max_level();
}

/// 获取当前全局日志级别
pub fn get_global_level() -> LevelFilter {
    GLOBAL_LOG._get_global_level()
}

/// 设置控制台输出级别阈值
pub fn set_console_level(level: LevelFilter) {
    GLOBAL_LOG._set_console_level(level);
    sync_max_level();
}

/// 获取当前控制台输出级别
pub fn get_console_level() -> LevelFilter {
    GLOBAL_LOG._get_console_level()
}
