//! dummy 设备：丢弃所有发送的帧

use std::sync::{Arc, Weak};

use device::{
    IrqFlags, IrqManager, NetDevice, NetDeviceError, NetDeviceFlags, NetDeviceOps, NetDeviceType,
};
use log::{debug, error, trace};

use crate::config::{DUMMY_IRQ, DUMMY_MTU};
use crate::error::NetError;
use crate::stack::NetStack;

struct DummyOps {
    irq: Weak<IrqManager>,
}

impl NetDeviceOps for DummyOps {
    fn transmit(
        &self,
        dev: &NetDevice,
        ty: u16,
        data: &[u8],
        _dst: &[u8],
    ) -> Result<(), NetDeviceError> {
        debug!("dev={}, type=0x{:04x}, len={}", dev.name(), ty, data.len());
        trace!("\n{}", klog::hexdump(data));
        // 丢弃，只模拟发送完成中断
        if let Some(irq) = self.irq.upgrade() {
            if let Err(e) = irq.raise(DUMMY_IRQ) {
                error!("raise failure, dev={}, err={}", dev.name(), e);
            }
        }
        Ok(())
    }
}

/// 创建并注册一个 dummy 设备
///
/// 中断申请失败时不注册设备。
pub fn dummy_init(stack: &Arc<NetStack>) -> Result<Arc<NetDevice>, NetError> {
    stack.ensure_not_running()?;
    let ops = DummyOps {
        irq: Arc::downgrade(stack.irq()),
    };
    let dev = Arc::new(NetDevice::new(
        NetDeviceType::Dummy,
        DUMMY_MTU,
        NetDeviceFlags::empty(),
        Box::new(ops),
    ));

    let isr_dev = Arc::clone(&dev);
    stack.irq().request_irq(
        DUMMY_IRQ,
        move |irq| debug!("irq={}, dev={}", irq, isr_dev.name()),
        IrqFlags::SHARED,
        "dummy",
    )?;
    stack.device_register(Arc::clone(&dev))?;
    debug!("initialized, dev={}", dev.name());
    Ok(dev)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dummy_discards() {
        let stack = NetStack::init().unwrap();
        let dev = dummy_init(&stack).unwrap();
        assert_eq!(dev.device_type(), NetDeviceType::Dummy);
        assert_eq!(dev.mtu(), DUMMY_MTU);
        assert!(stack.irq().is_reserved(DUMMY_IRQ));

        stack.run().unwrap();
        assert!(dev.is_up());
        stack.device_output(&dev, 0x0800, &[0u8; 64], &[]).unwrap();
        stack.shutdown();
        assert!(!dev.is_up());
    }

    #[test]
    fn test_irq_conflict_leaves_no_device() {
        let stack = NetStack::init().unwrap();
        stack
            .irq()
            .request_irq(DUMMY_IRQ, |_| {}, IrqFlags::empty(), "busy")
            .unwrap();

        assert_eq!(
            dummy_init(&stack).err(),
            Some(NetError::Irq(device::IrqError::Conflict))
        );
        assert!(stack.devices().is_empty());
        assert!(dummy_init(&stack).is_err());
        assert!(stack.devices().is_empty());
    }
}
