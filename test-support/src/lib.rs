//! 测试支持 crate
//!
//! 提供 Mock 实现和测试工具

use std::thread;
use std::time::{Duration, Instant};

pub mod mock;

/// 轮询间隔
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// 轮询等待条件成立
///
/// 中断处理函数运行在投递线程上，测试线程只能等待其副作用出现。
/// 超时前条件成立返回 `true`，否则返回 `false`。
pub fn wait_until(timeout: Duration, cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if cond() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_wait_until() {
        let calls = AtomicUsize::new(0);
        assert!(wait_until(Duration::from_secs(1), || {
            calls.fetch_add(1, Ordering::SeqCst) >= 2
        }));
        assert!(!wait_until(Duration::from_millis(5), || false));
    }
}
