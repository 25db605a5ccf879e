//! 日志系统核心实现
//!
//! 该模块将所有日志状态和逻辑封装到一个单独的 `LogCore` 结构体中，
//! 既可以作为全局单例，也可以独立实例化用于测试。

use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::collections::VecDeque;
use std::time::Instant;

use log::{Level, LevelFilter};
use sync::SpinLock;

use crate::config::{DEFAULT_CONSOLE_LEVEL, DEFAULT_LOG_LEVEL, LOG_BUFFER_CAPACITY};
use crate::entry::{LogEntry, format_log_entry};

/// 核心日志系统
///
/// 封装了有界缓冲区和过滤状态。
///
/// # 双输出策略
///
/// 1. 达到全局级别的记录写入缓冲区；缓冲区满时淘汰最旧的条目并计入丢弃数。
/// 2. 达到控制台级别的记录立即交给已注册的 [`LogOutput`](crate::LogOutput)。
pub struct LogCore {
    buffer: SpinLock<VecDeque<LogEntry>>,
    capacity: usize,
    global_level: AtomicUsize,
    console_level: AtomicUsize,
    next_seq: AtomicUsize,
    dropped: AtomicUsize,
    epoch: Instant,
}

impl Default for LogCore {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_LEVEL, DEFAULT_CONSOLE_LEVEL, LOG_BUFFER_CAPACITY)
    }
}

impl LogCore {
    /// 使用自定义级别和容量创建新的 LogCore 实例
    ///
    /// # 参数
    ///
    /// * `global_level` - 日志被缓冲的最低级别
    /// * `console_level` - 日志被打印到控制台的最低级别
    /// * `capacity` - 缓冲区可容纳的条目数
    pub fn new(global_level: LevelFilter, console_level: LevelFilter, capacity: usize) -> Self {
        Self {
            buffer: SpinLock::new(VecDeque::with_capacity(capacity)),
            capacity,
            global_level: AtomicUsize::new(global_level as usize),
            console_level: AtomicUsize::new(console_level as usize),
            next_seq: AtomicUsize::new(0),
            dropped: AtomicUsize::new(0),
            epoch: Instant::now(),
        }
    }

    /// 核心日志记录实现
    pub fn _log(&self, level: Level, target: &str, args: fmt::Arguments) {
        let buffered = self._is_level_enabled(level);
        let console = level as usize <= self.console_level.load(Ordering::Acquire);
        if !buffered && !console {
            return;
        }

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let elapsed = self.epoch.elapsed().as_micros() as u64;
        let entry = LogEntry::new(seq, level, elapsed, target, args);

        if console {
            let mut line = format_log_entry(&entry);
            line.push('\n');
            crate::log_output().write_str(&line);
        }

        if buffered {
            let mut buffer = self.buffer.lock();
            if buffer.len() >= self.capacity {
                buffer.pop_front();
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            if self.capacity > 0 {
                buffer.push_back(entry);
            }
        }
    }

    /// 检查日志级别是否会进入缓冲区
    #[inline]
    pub fn _is_level_enabled(&self, level: Level) -> bool {
        level as usize <= self.global_level.load(Ordering::Acquire)
    }

    /// 从缓冲区读取下一个日志条目
    pub fn _read_log(&self) -> Option<LogEntry> {
        self.buffer.lock().pop_front()
    }

    /// 非破坏性读取：按位置查看未读条目
    pub fn _peek_log(&self, index: usize) -> Option<LogEntry> {
        self.buffer.lock().get(index).cloned()
    }

    /// 返回未读日志条目的数量
    pub fn _log_len(&self) -> usize {
        self.buffer.lock().len()
    }

    /// 返回由于缓冲区溢出而丢弃的日志计数
    pub fn _log_dropped_count(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    /// 设置全局日志级别阈值
    pub fn _set_global_level(&self, level: LevelFilter) {
        self.global_level.store(level as usize, Ordering::Release);
    }

    /// 获取当前全局日志级别
    pub fn _get_global_level(&self) -> LevelFilter {
        level_from_usize(self.global_level.load(Ordering::Acquire))
    }

    /// 设置控制台输出级别阈值
    pub fn _set_console_level(&self, level: LevelFilter) {
        self.console_level.store(level as usize, Ordering::Release);
    }

    /// 获取当前控制台输出级别
    pub fn _get_console_level(&self) -> LevelFilter {
        level_from_usize(self.console_level.load(Ordering::Acquire))
    }
}

fn level_from_usize(v: usize) -> LevelFilter {
    match v {
        0 => LevelFilter::Off,
        1 => LevelFilter::Error,
        2 => LevelFilter::Warn,
        3 => LevelFilter::Info,
        4 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}
