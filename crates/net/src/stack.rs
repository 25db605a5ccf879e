//! 协议栈核心
//!
//! [`NetStack`] 持有设备、接口和协议三张注册表，以及本实例的中断控制器。
//!
//! # 接收路径
//!
//! 接收分为两段，都运行在中断控制器的投递线程上：
//!
//! 1. 顶半部 [`NetStack::input_handler`]：驱动的中断处理函数调用它，
//!    按类型找到协议后复制帧、入队并触发一次软中断，不做其它处理。
//! 2. 底半部（软中断处理函数）：依次排空每个协议的队列，
//!    对每个条目调用协议处理函数。同一协议内严格按到达顺序处理。
//!
//! # 生命周期
//!
//! ```text
//! init() --> 注册设备/接口/协议 --> run() --> shutdown()
//! ```
//!
//! `run()` 之后不再接受任何注册。

use core::sync::atomic::{AtomicBool, Ordering};
use std::collections::VecDeque;
use std::sync::Arc;

use device::{IrqFlags, IrqManager, NetDevice, NetDeviceIndex, format_link_addr};
use log::{debug, error, info, trace};
use sync::{RwLock, SpinLock};

use crate::config::IRQ_SOFTIRQ;
use crate::error::NetError;
use crate::iface::{IfaceFamily, NetIface};
use crate::ip::IpLayer;

/// 协议处理函数
///
/// 参数为协议栈、帧数据和接收设备，在软中断中调用，不得阻塞。
pub type ProtocolHandler = Box<dyn Fn(&NetStack, &[u8], &Arc<NetDevice>) + Send + Sync>;

/// 协议队列中的一帧
struct QueueEntry {
    dev: Arc<NetDevice>,
    data: Vec<u8>,
}

/// 已注册的协议
struct NetProtocol {
    ty: u16,
    queue: SpinLock<VecDeque<QueueEntry>>,
    handler: ProtocolHandler,
}

/// 设备及挂在其上的接口
struct DeviceSlot {
    dev: Arc<NetDevice>,
    ifaces: Vec<NetIface>,
}

/// 协议栈实例
pub struct NetStack {
    irq: Arc<IrqManager>,
    devices: RwLock<Vec<DeviceSlot>>,
    protocols: RwLock<Vec<Arc<NetProtocol>>>,
    running: AtomicBool,
    pub(crate) ip: IpLayer,
}

impl NetStack {
    /// 创建协议栈
    ///
    /// 创建中断控制器，注册软中断处理函数和内置的 IP 协议。
    pub fn init() -> Result<Arc<Self>, NetError> {
        info!("initialize...");
        let stack = Arc::new(Self {
            irq: Arc::new(IrqManager::new()),
            devices: RwLock::new(Vec::new()),
            protocols: RwLock::new(Vec::new()),
            running: AtomicBool::new(false),
            ip: IpLayer::new(),
        });

        let weak = Arc::downgrade(&stack);
        stack.irq.request_irq(
            IRQ_SOFTIRQ,
            move |_irq| {
                if let Some(stack) = weak.upgrade() {
                    stack.softirq_handler();
                }
            },
            IrqFlags::empty(),
            "softirq",
        )?;
        stack.ip_init().inspect_err(|e| {
            error!("ip_init() failure: {}", e);
        })?;

        info!("success");
        Ok(stack)
    }

    /// 启动协议栈
    ///
    /// 启动中断投递线程，然后打开所有已注册设备。
    /// 单个设备打开失败只记录日志，不影响其它设备。
    /// 中断控制器启动失败时协议栈保持未运行状态。
    pub fn run(&self) -> Result<(), NetError> {
        if self.is_running() {
            error!("already running");
            return Err(NetError::AlreadyRunning);
        }
        // 并发的第二次调用会在 irq.run() 处得到 InvalidState
        self.irq.run().inspect_err(|e| {
            error!("irq run() failure: {}", e);
        })?;
        self.running.store(true, Ordering::Release);

        debug!("open all devices...");
        for dev in self.devices() {
            // 失败已由 open() 记录
            let _ = dev.open();
        }
        debug!("running...");
        Ok(())
    }

    /// 停止协议栈
    ///
    /// 关闭所有已打开的设备，然后停止中断投递线程并等待其退出。
    pub fn shutdown(&self) {
        debug!("close all devices...");
        for dev in self.devices() {
            if dev.is_up() {
                let _ = dev.close();
            }
        }
        self.irq.shutdown();
        debug!("shutting down");
    }

    /// 是否已调用过 [`NetStack::run`]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// 本实例的中断控制器，驱动用它注册自己的中断源
    pub fn irq(&self) -> &Arc<IrqManager> {
        &self.irq
    }

    pub(crate) fn ensure_not_running(&self) -> Result<(), NetError> {
        if self.is_running() {
            error!("registration after run() is not allowed");
            return Err(NetError::AlreadyRunning);
        }
        Ok(())
    }

    /// 注册设备
    ///
    /// 分配索引和名称并追加到设备表。同一设备只能注册一次。
    pub fn device_register(&self, dev: Arc<NetDevice>) -> Result<NetDeviceIndex, NetError> {
        self.ensure_not_running()?;
        let index = dev.assign_index().map_err(|e| {
            error!("assign_index() failure: {}", e);
            NetError::Conflict
        })?;
        info!(
            "registered, dev={}, type={:?}, addr={}",
            dev.name(),
            dev.device_type(),
            format_link_addr(dev.hw_addr())
        );
        self.devices.write().push(DeviceSlot {
            dev,
            ifaces: Vec::new(),
        });
        Ok(index)
    }

    /// 所有已注册设备，按注册顺序
    pub fn devices(&self) -> Vec<Arc<NetDevice>> {
        self.devices
            .read()
            .iter()
            .map(|slot| Arc::clone(&slot.dev))
            .collect()
    }

    /// 按索引查找设备
    pub fn device_by_index(&self, index: NetDeviceIndex) -> Option<Arc<NetDevice>> {
        self.devices
            .read()
            .iter()
            .find(|slot| slot.dev.index() == Some(index))
            .map(|slot| Arc::clone(&slot.dev))
    }

    /// 把接口挂到设备上
    ///
    /// 同一设备上每个协议族只能有一个接口；一个接口只能挂到一个设备。
    pub fn iface_attach(&self, dev: &NetDevice, iface: NetIface) -> Result<(), NetError> {
        self.ensure_not_running()?;
        let index = dev.index().ok_or_else(|| {
            error!("device not registered, dev={}", dev.name());
            NetError::NotFound
        })?;
        let mut devices = self.devices.write();
        let slot = devices
            .iter_mut()
            .find(|slot| slot.dev.index() == Some(index))
            .ok_or(NetError::NotFound)?;
        if slot.ifaces.iter().any(|i| i.family() == iface.family()) {
            error!(
                "already exists, dev={}, family={:?}",
                dev.name(),
                iface.family()
            );
            return Err(NetError::Conflict);
        }
        iface.bind(dev).inspect_err(|_| {
            error!("iface already bound to another device, dev={}", dev.name());
        })?;
        debug!("attached, dev={}, family={:?}", dev.name(), iface.family());
        slot.ifaces.push(iface);
        Ok(())
    }

    /// 查找设备上指定协议族的接口
    pub fn iface_lookup(&self, dev: &NetDevice, family: IfaceFamily) -> Option<NetIface> {
        let index = dev.index()?;
        self.devices
            .read()
            .iter()
            .find(|slot| slot.dev.index() == Some(index))?
            .ifaces
            .iter()
            .find(|iface| iface.family() == family)
            .cloned()
    }

    /// 注册协议
    ///
    /// `ty` 与以太网帧类型取值相同，不允许重复。
    pub fn protocol_register<F>(&self, ty: u16, handler: F) -> Result<(), NetError>
    where
        F: Fn(&NetStack, &[u8], &Arc<NetDevice>) + Send + Sync + 'static,
    {
        self.ensure_not_running()?;
        let mut protocols = self.protocols.write();
        if protocols.iter().any(|proto| proto.ty == ty) {
            error!("already registered, type=0x{:04x}", ty);
            return Err(NetError::Conflict);
        }
        protocols.push(Arc::new(NetProtocol {
            ty,
            queue: SpinLock::new(VecDeque::new()),
            handler: Box::new(handler),
        }));
        info!("registered, type=0x{:04x}", ty);
        Ok(())
    }

    /// 接收顶半部
    ///
    /// 由驱动的中断处理函数调用。找不到协议时静默丢弃并返回成功；
    /// 否则复制帧入队，并为本次调用触发一次软中断。
    pub fn input_handler(&self, ty: u16, data: &[u8], dev: &Arc<NetDevice>) -> Result<(), NetError> {
        let proto = self
            .protocols
            .read()
            .iter()
            .find(|proto| proto.ty == ty)
            .cloned();
        let Some(proto) = proto else {
            // 不支持的协议
            return Ok(());
        };

        let mut copy = Vec::new();
        copy.try_reserve_exact(data.len()).map_err(|_| {
            error!("allocation failure, dev={}, len={}", dev.name(), data.len());
            NetError::AllocationFailure
        })?;
        copy.extend_from_slice(data);

        let num = {
            let mut queue = proto.queue.lock();
            queue.push_back(QueueEntry {
                dev: Arc::clone(dev),
                data: copy,
            });
            queue.len()
        };
        debug!(
            "queue pushed (num:{}), dev={}, type=0x{:04x}, len={}",
            num,
            dev.name(),
            ty,
            data.len()
        );
        trace!("\n{}", klog::hexdump(data));

        self.irq.raise(IRQ_SOFTIRQ).inspect_err(|e| {
            error!("raise softirq failure: {}", e);
        })?;
        Ok(())
    }

    /// 接收底半部：排空所有协议队列
    fn softirq_handler(&self) {
        let protocols: Vec<Arc<NetProtocol>> = self.protocols.read().iter().cloned().collect();
        for proto in &protocols {
            loop {
                // 出队后立即释放队列锁，处理函数执行期间顶半部仍可入队
                let next = proto.queue.lock().pop_front();
                let Some(entry) = next else {
                    break;
                };
                debug!(
                    "queue popped, dev={}, type=0x{:04x}, len={}",
                    entry.dev.name(),
                    proto.ty,
                    entry.data.len()
                );
                trace!("\n{}", klog::hexdump(&entry.data));
                (proto.handler)(self, &entry.data, &entry.dev);
            }
        }
    }

    /// 通过设备发送一帧
    ///
    /// 设备未打开或数据超过 MTU 时失败，不调用驱动；驱动错误原样返回，不重试。
    pub fn device_output(
        &self,
        dev: &NetDevice,
        ty: u16,
        data: &[u8],
        dst: &[u8],
    ) -> Result<(), NetError> {
        if !dev.is_up() {
            error!("not opened, dev={}", dev.name());
            return Err(NetError::DeviceDown);
        }
        if data.len() > dev.mtu() as usize {
            error!(
                "too long, dev={}, mtu={}, len={}",
                dev.name(),
                dev.mtu(),
                data.len()
            );
            return Err(NetError::TooLong);
        }
        debug!("dev={}, type=0x{:04x}, len={}", dev.name(), ty, data.len());
        trace!("\n{}", klog::hexdump(data));
        dev.transmit(ty, data, dst).map_err(|e| {
            error!("device transmit failure, dev={}, err={}", dev.name(), e);
            NetError::Transmit(e)
        })
    }
}
