//! 自旋锁封装
//!
//! 提供对数据的互斥访问的自旋锁类型。

use crate::raw_spin_lock::RawSpinLock;

/// 提供对数据的互斥访问的自旋锁。
///
/// # 示例
/// ```
/// use sync::SpinLock;
///
/// let lock = SpinLock::new(0);
/// {
///     let mut guard = lock.lock(); // 获取锁
///     *guard += 1; // 访问和修改数据
/// } // 离开作用域，自动释放锁
/// assert_eq!(*lock.lock(), 1);
/// ```
///
/// # 注意
/// SpinLock 不是可重入的。当持有锁时，尝试再次获取锁将导致死锁。
/// 持锁期间应避免长时间运行的操作，尤其是在中断投递线程上。
pub type SpinLock<T> = lock_api::Mutex<RawSpinLock, T>;

/// SpinLock 的 RAII 保护器，离开作用域时自动释放锁。
pub type SpinLockGuard<'a, T> = lock_api::MutexGuard<'a, RawSpinLock, T>;
