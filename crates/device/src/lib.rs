//! 链路设备与中断模拟框架
//!
//! 此 crate 提供协议栈底层的两块基础设施：
//!
//! - [`NetDevice`] / [`NetDeviceOps`] - 链路设备模型与驱动能力接口
//! - [`IrqManager`] - 中断控制器：把任意线程发出的“硬件中断”
//!   串行投递到唯一的中断投递线程上执行
//!
//! # 使用约定
//!
//! 所有注册（设备、中断源）必须在 [`IrqManager::run`] 之前完成；
//! 中断处理函数在投递线程上同步执行，不得阻塞。

pub mod irq;
pub mod net;

// Re-export irq
pub use irq::{IRQ_LIMIT, IrqError, IrqFlags, IrqHandler, IrqManager, IrqNumber, IrqState};

// Re-export net
pub use net::{
    NET_DEVICE_ADDR_LEN, NetDevice, NetDeviceError, NetDeviceFlags, NetDeviceIndex, NetDeviceOps,
    NetDeviceType, format_link_addr,
};
