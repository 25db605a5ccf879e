//! 原始自旋锁
//!
//! 基于原子操作实现自旋锁机制，并实现 `lock_api::RawMutex`。

use core::sync::atomic::{AtomicBool, Ordering};

use crate::relax;

/// 原始自旋锁，提供互斥访问临界区的能力。
///
/// 不可重入 (即不能在持锁时再次调用 `lock()`)。
///
/// # 示例
/// ```
/// use lock_api::RawMutex;
/// use sync::RawSpinLock;
///
/// let lock = RawSpinLock::INIT;
/// lock.lock();
/// assert!(!lock.try_lock());
/// // SAFETY: 锁由当前上下文持有
/// unsafe { lock.unlock() };
/// ```
#[derive(Debug)]
pub struct RawSpinLock {
    lock: AtomicBool,
}

impl RawSpinLock {
    /// 创建一个新的 RawSpinLock 实例。
    pub const fn new() -> Self {
        RawSpinLock {
            lock: AtomicBool::new(false),
        }
    }
}

impl Default for RawSpinLock {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: 通过 Acquire/Release 语义的 CAS 保证同一时刻只有一个持有者。
unsafe impl lock_api::RawMutex for RawSpinLock {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = RawSpinLock::new();

    type GuardMarker = lock_api::GuardSend;

    fn lock(&self) {
        let mut spins = 0;
        while self
            .lock
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            // 只读等待，避免在争用时反复写缓存行
            while self.lock.load(Ordering::Relaxed) {
                relax(&mut spins);
            }
        }
    }

    fn try_lock(&self) -> bool {
        self.lock
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    unsafe fn unlock(&self) {
        self.lock.store(false, Ordering::Release);
    }

    fn is_locked(&self) -> bool {
        self.lock.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lock_api::RawMutex;

    #[test]
    fn test_lock_unlock() {
        let lock = RawSpinLock::new();
        assert!(!lock.is_locked());
        lock.lock();
        assert!(lock.is_locked());
        unsafe { lock.unlock() };
        assert!(!lock.is_locked());
    }

    #[test]
    fn test_try_lock_contended() {
        let lock = RawSpinLock::new();
        assert!(lock.try_lock());
        assert!(!lock.try_lock());
        unsafe { lock.unlock() };
        assert!(lock.try_lock());
        unsafe { lock.unlock() };
    }
}
