//! 中断控制器
//!
//! 用单消费者事件通道模拟硬件中断：任意线程都可以 [`IrqManager::raise`]
//! 一个中断号（非阻塞发送），唯一的投递线程阻塞等待事件，
//! 找到匹配的处理函数后按注册顺序串行调用。
//!
//! # 状态机
//!
//! ```text
//! Initialized --run()--> Running --shutdown()--> Stopping --> Terminated
//! ```
//!
//! - 注册只允许发生在 `Initialized` 状态。
//! - `run()` 启动投递线程，并通过两方屏障等待其就绪后才返回。
//! - 在 `run()` 之前发出的中断会暂存在通道中，投递线程启动后依次处理。
//! - `shutdown()` 发送终止事件并等待投递线程退出；之后的 `raise` 一律失败。
//!
//! # 处理函数约定
//!
//! 处理函数运行在投递线程上，**不得阻塞**：整个接收路径都经过这一个线程，
//! 一个阻塞的处理函数会拖住其它所有中断和协议队列的排空。

use core::fmt;
use core::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Barrier};
use std::thread::{self, JoinHandle};

use bitflags::bitflags;
use log::{debug, error};
use sync::SpinLock;

/// 中断号
pub type IrqNumber = u32;

/// 中断号空间大小：合法中断号为 `0..IRQ_LIMIT`
pub const IRQ_LIMIT: IrqNumber = 64;

/// 中断处理函数
///
/// 参数为触发的中断号。处理函数需要的上下文（设备、协议栈等）由闭包捕获。
pub type IrqHandler = Box<dyn Fn(IrqNumber) + Send + Sync>;

bitflags! {
    /// 中断源注册标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IrqFlags: u32 {
        /// 允许与其它同样标记为共享的中断源使用同一中断号
        const SHARED = 0x0001;
    }
}

/// 中断控制器错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqError {
    /// 中断号已被非共享的中断源占用
    Conflict,
    /// 中断号超出 [`IRQ_LIMIT`]
    InvalidIrq,
    /// 当前状态不允许此操作
    InvalidState,
    /// 中断号未注册
    NotRegistered,
    /// 投递线程已终止
    Terminated,
    /// 无法创建投递线程
    SpawnFailed,
}

impl IrqError {
    /// 获取错误的简短描述
    pub fn as_str(&self) -> &'static str {
        match self {
            IrqError::Conflict => "conflicts with already registered IRQs",
            IrqError::InvalidIrq => "IRQ number out of range",
            IrqError::InvalidState => "operation not allowed in current state",
            IrqError::NotRegistered => "IRQ not registered",
            IrqError::Terminated => "delivery context terminated",
            IrqError::SpawnFailed => "failed to start delivery context",
        }
    }
}

impl fmt::Display for IrqError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for IrqError {}

/// 中断控制器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum IrqState {
    /// 可以注册中断源，投递线程尚未启动
    Initialized = 0,
    /// 投递线程正在运行
    Running = 1,
    /// 已发送终止事件，等待投递线程退出
    Stopping = 2,
    /// 投递线程已退出
    Terminated = 3,
}

impl IrqState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => IrqState::Initialized,
            1 => IrqState::Running,
            2 => IrqState::Stopping,
            _ => IrqState::Terminated,
        }
    }
}

/// 投递线程收到的事件
enum IrqEvent {
    Raise(IrqNumber),
    Terminate,
}

/// 已注册的中断源
struct IrqEntry {
    irq: IrqNumber,
    handler: IrqHandler,
    flags: IrqFlags,
    name: String,
}

struct Inner {
    entries: Vec<IrqEntry>,
    receiver: Option<Receiver<IrqEvent>>,
    thread: Option<JoinHandle<()>>,
}

/// 中断控制器
///
/// 每个协议栈实例拥有一个，持有中断源注册表和唯一的投递线程。
pub struct IrqManager {
    inner: SpinLock<Inner>,
    sender: Sender<IrqEvent>,
    /// 已占用的中断号集合（位图）
    reserved: AtomicU64,
    state: AtomicU8,
}

impl Default for IrqManager {
    fn default() -> Self {
        Self::new()
    }
}

impl IrqManager {
    /// 创建处于 `Initialized` 状态的中断控制器
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            inner: SpinLock::new(Inner {
                entries: Vec::new(),
                receiver: Some(receiver),
                thread: None,
            }),
            sender,
            reserved: AtomicU64::new(0),
            state: AtomicU8::new(IrqState::Initialized as u8),
        }
    }

    /// 当前状态
    pub fn state(&self) -> IrqState {
        IrqState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// 中断号是否已被注册
    pub fn is_reserved(&self, irq: IrqNumber) -> bool {
        irq < IRQ_LIMIT && self.reserved.load(Ordering::Acquire) & (1 << irq) != 0
    }

    /// 注册中断源
    ///
    /// 同一中断号只有在已有注册和本次注册都带 [`IrqFlags::SHARED`] 时才能共用。
    /// 失败时注册表保持不变。
    pub fn request_irq<F>(
        &self,
        irq: IrqNumber,
        handler: F,
        flags: IrqFlags,
        name: &str,
    ) -> Result<(), IrqError>
    where
        F: Fn(IrqNumber) + Send + Sync + 'static,
    {
        debug!("irq={}, flags={:?}, name={}", irq, flags, name);
        if irq >= IRQ_LIMIT {
            error!("invalid irq={}", irq);
            return Err(IrqError::InvalidIrq);
        }

        let mut inner = self.inner.lock();
        // run() 取走接收端后注册表已提交，即使状态尚未切换
        if self.state() != IrqState::Initialized || inner.receiver.is_none() {
            error!("already running, irq={}, name={}", irq, name);
            return Err(IrqError::InvalidState);
        }
        let conflict = inner.entries.iter().any(|entry| {
            entry.irq == irq
                && !(entry.flags.contains(IrqFlags::SHARED) && flags.contains(IrqFlags::SHARED))
        });
        if conflict {
            error!("conflicts with already registered IRQs, irq={}", irq);
            return Err(IrqError::Conflict);
        }

        inner.entries.push(IrqEntry {
            irq,
            handler: Box::new(handler),
            flags,
            name: name.to_string(),
        });
        self.reserved.fetch_or(1 << irq, Ordering::AcqRel);
        debug!("registered: irq={}, name={}", irq, name);
        Ok(())
    }

    /// 通知投递线程中断 `irq` 发生
    ///
    /// 从不阻塞调用者。投递线程启动前发出的中断会被暂存；
    /// 投递线程终止后调用返回 [`IrqError::Terminated`]。
    pub fn raise(&self, irq: IrqNumber) -> Result<(), IrqError> {
        match self.state() {
            IrqState::Stopping | IrqState::Terminated => return Err(IrqError::Terminated),
            IrqState::Initialized | IrqState::Running => {}
        }
        if !self.is_reserved(irq) {
            error!("not registered, irq={}", irq);
            return Err(IrqError::NotRegistered);
        }
        self.sender
            .send(IrqEvent::Raise(irq))
            .map_err(|_| IrqError::Terminated)
    }

    /// 启动投递线程
    ///
    /// 提交当前注册表，启动投递线程并等待其就绪后返回。
    /// 线程句柄保存之后才进入 `Running`，此前的 `shutdown()` 直接返回。
    pub fn run(&self) -> Result<(), IrqError> {
        let (entries, receiver) = {
            let mut inner = self.inner.lock();
            if self.state() != IrqState::Initialized {
                error!("not in initialized state");
                return Err(IrqError::InvalidState);
            }
            let receiver = inner.receiver.take().ok_or(IrqError::InvalidState)?;
            let entries = Arc::new(core::mem::take(&mut inner.entries));
            (entries, receiver)
        };

        let barrier = Arc::new(Barrier::new(2));
        let thread_barrier = Arc::clone(&barrier);
        let spawned = thread::Builder::new()
            .name("irq".into())
            .spawn(move || dispatch_loop(entries, receiver, thread_barrier));
        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                error!("spawn() failure: {}", e);
                self.state
                    .store(IrqState::Terminated as u8, Ordering::Release);
                return Err(IrqError::SpawnFailed);
            }
        };

        // 等待投递线程就绪
        barrier.wait();
        let mut inner = self.inner.lock();
        inner.thread = Some(handle);
        self.state
            .store(IrqState::Running as u8, Ordering::Release);
        Ok(())
    }

    /// 停止投递线程
    ///
    /// 发送终止事件并等待投递线程退出，没有超时。
    /// 从未启动或已停止时直接返回。
    pub fn shutdown(&self) {
        if self
            .state
            .compare_exchange(
                IrqState::Running as u8,
                IrqState::Stopping as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return;
        }

        let _ = self.sender.send(IrqEvent::Terminate);
        let handle = self.inner.lock().thread.take();
        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                error!("shutdown() called from the delivery context");
            } else if handle.join().is_err() {
                error!("delivery context panicked");
            }
        }
        self.state
            .store(IrqState::Terminated as u8, Ordering::Release);
    }
}

impl Drop for IrqManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// 投递线程主循环
///
/// 等待事件：终止事件则退出；否则按注册顺序调用所有匹配的处理函数。
/// 等待失败视为致命错误，记录日志后退出，不会重启。
fn dispatch_loop(entries: Arc<Vec<IrqEntry>>, receiver: Receiver<IrqEvent>, barrier: Arc<Barrier>) {
    debug!("start...");
    barrier.wait();

    loop {
        let event = match receiver.recv() {
            Ok(event) => event,
            Err(e) => {
                error!("recv() failure: {}", e);
                break;
            }
        };
        match event {
            IrqEvent::Terminate => break,
            IrqEvent::Raise(irq) => {
                for entry in entries.iter().filter(|entry| entry.irq == irq) {
                    debug!("irq={}, name={}", entry.irq, entry.name);
                    (entry.handler)(entry.irq);
                }
            }
        }
    }

    debug!("terminated");
}
