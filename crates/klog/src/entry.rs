//! 日志条目

use log::Level;

use crate::config::MAX_LOG_MESSAGE_LENGTH;

/// 一条已记录的日志
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    seq: usize,
    level: Level,
    timestamp_us: u64,
    thread: String,
    target: String,
    message: String,
}

impl LogEntry {
    pub(crate) fn new(
        seq: usize,
        level: Level,
        timestamp_us: u64,
        target: &str,
        args: core::fmt::Arguments,
    ) -> Self {
        let mut message = args.to_string();
        if message.len() > MAX_LOG_MESSAGE_LENGTH {
            let mut end = MAX_LOG_MESSAGE_LENGTH;
            while !message.is_char_boundary(end) {
                end -= 1;
            }
            message.truncate(end);
        }
        let thread = std::thread::current()
            .name()
            .unwrap_or("<unnamed>")
            .to_string();
        Self {
            seq,
            level,
            timestamp_us,
            thread,
            target: target.to_string(),
            message,
        }
    }

    /// 全局递增的序号
    pub fn seq(&self) -> usize {
        self.seq
    }

    /// 日志级别
    pub fn level(&self) -> Level {
        self.level
    }

    /// 自日志系统创建以来经过的微秒数
    pub fn timestamp_us(&self) -> u64 {
        self.timestamp_us
    }

    /// 记录日志的线程名
    ///
    /// 中断投递线程上的记录可以据此与调用者线程区分开。
    pub fn thread(&self) -> &str {
        &self.thread
    }

    /// 日志目标（通常是模块路径）
    pub fn target(&self) -> &str {
        &self.target
    }

    /// 日志消息
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// 格式化日志条目为单行字符串
///
/// # 格式
/// ```text
/// [LEVEL] [seconds.micros] [thread] target: message
/// ```
pub fn format_log_entry(entry: &LogEntry) -> String {
    format!(
        "[{:5}] [{:>6}.{:06}] [{}] {}: {}",
        entry.level.as_str(),
        entry.timestamp_us / 1_000_000,
        entry.timestamp_us % 1_000_000,
        entry.thread,
        entry.target,
        entry.message
    )
}
