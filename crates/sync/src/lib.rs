//! 同步原语
//!
//! 向协议栈的其它模块提供基本的锁原语，包括自旋锁和读写锁。
//!
//! 两种锁都只实现 `lock_api` 的原始锁 trait（[`RawSpinLock`]、[`RawSpinRwLock`]），
//! 带数据的封装直接复用 `lock_api::Mutex` / `lock_api::RwLock`。
//!
//! # 与中断模拟的关系
//!
//! 协议栈中的“中断”运行在单独的投递线程上，而不是打断当前线程，
//! 因此加锁时无需屏蔽本地中断；临界区只需保证足够短即可。

mod raw_spin_lock;
mod rwlock;
mod spin_lock;

pub use raw_spin_lock::RawSpinLock;
pub use rwlock::{RawSpinRwLock, RwLock, RwLockReadGuard, RwLockWriteGuard};
pub use spin_lock::{SpinLock, SpinLockGuard};

/// 自旋多少次后主动让出 CPU
///
/// 用户态线程可能在持锁期间被抢占，单纯忙等会白白消耗时间片。
pub(crate) const SPIN_LIMIT: u32 = 64;

/// 忙等一轮；超过 [`SPIN_LIMIT`] 后改为让出线程。
#[inline]
pub(crate) fn relax(spins: &mut u32) {
    if *spins < SPIN_LIMIT {
        *spins += 1;
        core::hint::spin_loop();
    } else {
        std::thread::yield_now();
    }
}
