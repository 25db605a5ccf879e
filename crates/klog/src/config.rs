//! 日志系统配置常量

use log::LevelFilter;

/// 默认全局日志级别：达到此级别的记录写入缓冲区
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// 默认控制台级别：达到此级别的记录立即输出
pub const DEFAULT_CONSOLE_LEVEL: LevelFilter = LevelFilter::Warn;

/// 全局日志缓冲区容量（条目数）
pub const LOG_BUFFER_CAPACITY: usize = 256;

/// 单条日志消息的最大长度（字节），超出部分被截断
pub const MAX_LOG_MESSAGE_LENGTH: usize = 512;
