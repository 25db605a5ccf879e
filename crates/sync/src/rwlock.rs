//! 自旋读写锁
//!
//! 适用于“初始化阶段写、运行阶段只读”的注册表：
//! 读者之间互不阻塞，写者独占。

use core::sync::atomic::{AtomicUsize, Ordering};

use crate::relax;

/// 写者位
const WRITER: usize = 1;
/// 每个读者占用的计数单位
const READER: usize = 2;

/// 原始自旋读写锁，实现 `lock_api::RawRwLock`。
///
/// 状态字最低位表示写者，其余位为读者计数。不保证写者优先。
#[derive(Debug)]
pub struct RawSpinRwLock {
    state: AtomicUsize,
}

impl RawSpinRwLock {
    /// 创建一个未加锁的读写锁
    pub const fn new() -> Self {
        Self {
            state: AtomicUsize::new(0),
        }
    }
}

impl Default for RawSpinRwLock {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: 读者只在写者位清零时进入，写者只在状态字为 0 时进入。
unsafe impl lock_api::RawRwLock for RawSpinRwLock {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = RawSpinRwLock::new();

    type GuardMarker = lock_api::GuardSend;

    fn lock_shared(&self) {
        let mut spins = 0;
        while !self.try_lock_shared() {
            relax(&mut spins);
        }
    }

    fn try_lock_shared(&self) -> bool {
        let state = self.state.load(Ordering::Relaxed);
        state & WRITER == 0
            && self
                .state
                .compare_exchange(state, state + READER, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
    }

    unsafe fn unlock_shared(&self) {
        self.state.fetch_sub(READER, Ordering::Release);
    }

    fn lock_exclusive(&self) {
        let mut spins = 0;
        while !self.try_lock_exclusive() {
            relax(&mut spins);
        }
    }

    fn try_lock_exclusive(&self) -> bool {
        self.state
            .compare_exchange(0, WRITER, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    unsafe fn unlock_exclusive(&self) {
        self.state.fetch_and(!WRITER, Ordering::Release);
    }

    fn is_locked(&self) -> bool {
        self.state.load(Ordering::Relaxed) != 0
    }
}

/// 带数据的自旋读写锁
pub type RwLock<T> = lock_api::RwLock<RawSpinRwLock, T>;

/// 读保护器
pub type RwLockReadGuard<'a, T> = lock_api::RwLockReadGuard<'a, RawSpinRwLock, T>;

/// 写保护器
pub type RwLockWriteGuard<'a, T> = lock_api::RwLockWriteGuard<'a, RawSpinRwLock, T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiple_readers() {
        let lock = RwLock::new(7);
        let r1 = lock.read();
        let r2 = lock.read();
        assert_eq!(*r1 + *r2, 14);
        assert!(lock.try_write().is_none());
    }

    #[test]
    fn test_writer_excludes_readers() {
        let lock = RwLock::new(Vec::new());
        {
            let mut w = lock.write();
            w.push(1);
            assert!(lock.try_read().is_none());
        }
        assert_eq!(lock.read().as_slice(), &[1]);
    }

    #[test]
    fn test_state_cleared_after_release() {
        let lock = RwLock::new(());
        drop(lock.read());
        drop(lock.write());
        assert!(!lock.is_locked());
    }
}
