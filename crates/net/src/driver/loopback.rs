//! loopback 设备：发送的帧在中断中重新送回接收路径

use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use device::{
    IrqFlags, IrqManager, IrqNumber, NetDevice, NetDeviceError, NetDeviceFlags, NetDeviceOps,
    NetDeviceType,
};
use log::{debug, error, trace};
use sync::SpinLock;

use crate::config::{LOOPBACK_IRQ, LOOPBACK_MTU, LOOPBACK_QUEUE_LIMIT};
use crate::error::NetError;
use crate::stack::NetStack;

/// 等待回送的帧
struct LoopbackFrame {
    ty: u16,
    data: Vec<u8>,
}

type LoopbackQueue = Arc<SpinLock<VecDeque<LoopbackFrame>>>;

struct LoopbackOps {
    queue: LoopbackQueue,
    irq: Weak<IrqManager>,
}

impl NetDeviceOps for LoopbackOps {
    fn transmit(
        &self,
        dev: &NetDevice,
        ty: u16,
        data: &[u8],
        _dst: &[u8],
    ) -> Result<(), NetDeviceError> {
        let num = {
            let mut queue = self.queue.lock();
            if queue.len() >= LOOPBACK_QUEUE_LIMIT {
                error!("queue is full, dev={}", dev.name());
                return Err(NetDeviceError::QueueFull);
            }
            let mut copy = Vec::new();
            copy.try_reserve_exact(data.len())
                .map_err(|_| NetDeviceError::AllocationFailed)?;
            copy.extend_from_slice(data);
            queue.push_back(LoopbackFrame { ty, data: copy });
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

        let irq = self.irq.upgrade().ok_or(NetDeviceError::DeviceNotReady)?;
        if let Err(e) = irq.raise(LOOPBACK_IRQ) {
            error!("raise failure, dev={}, err={}", dev.name(), e);
        }
        Ok(())
    }
}

/// 创建并注册一个 loopback 设备
///
/// 中断处理函数把队列中的帧逐个交给协议栈的接收顶半部。
/// 先申请中断再注册设备，中断申请失败时设备表不变。
pub fn loopback_init(stack: &Arc<NetStack>) -> Result<Arc<NetDevice>, NetError> {
    stack.ensure_not_running()?;
    let queue: LoopbackQueue = Arc::new(SpinLock::new(VecDeque::new()));
    let ops = LoopbackOps {
        queue: Arc::clone(&queue),
        irq: Arc::downgrade(stack.irq()),
    };
    let dev = Arc::new(NetDevice::new(
        NetDeviceType::Loopback,
        LOOPBACK_MTU,
        NetDeviceFlags::LOOPBACK,
        Box::new(ops),
    ));

    let isr_dev = Arc::clone(&dev);
    let weak_stack = Arc::downgrade(stack);
    stack.irq().request_irq(
        LOOPBACK_IRQ,
        move |irq| loopback_isr(irq, &queue, &isr_dev, &weak_stack),
        IrqFlags::SHARED,
        "loopback",
    )?;
    stack.device_register(Arc::clone(&dev))?;
    debug!("initialized, dev={}", dev.name());
    Ok(dev)
}

fn loopback_isr(irq: IrqNumber, queue: &LoopbackQueue, dev: &Arc<NetDevice>, stack: &Weak<NetStack>) {
    let Some(stack) = stack.upgrade() else {
        return;
    };
    loop {
        let next = {
            let mut queue = queue.lock();
            queue.pop_front().map(|frame| (frame, queue.len()))
        };
        let Some((frame, num)) = next else {
            break;
        };
        debug!(
            "queue popped (num:{}), irq={}, dev={}, type=0x{:04x}, len={}",
            num,
            irq,
            dev.name(),
            frame.ty,
            frame.data.len()
        );
        trace!("\n{}", klog::hexdump(&frame.data));
        // 失败已由 input_handler() 记录
        let _ = stack.input_handler(frame.ty, &frame.data, dev);
    }
}
