//! 协议栈配置常量

use device::IrqNumber;

/// 软中断号：顶半部入队后触发，底半部在其处理函数中排空协议队列
pub const IRQ_SOFTIRQ: IrqNumber = 1;

/// 驱动中断号的起始值
pub const IRQ_BASE: IrqNumber = 32;

/// dummy 设备的中断号
pub const DUMMY_IRQ: IrqNumber = IRQ_BASE;

/// loopback 设备的中断号
pub const LOOPBACK_IRQ: IrqNumber = IRQ_BASE + 1;

/// dummy 设备的 MTU
pub const DUMMY_MTU: u16 = u16::MAX;

/// loopback 设备的 MTU
pub const LOOPBACK_MTU: u16 = u16::MAX;

/// loopback 设备发送队列的最大长度
pub const LOOPBACK_QUEUE_LIMIT: usize = 16;

/// IP 标识字段的初始值
pub const IP_ID_INITIAL: u16 = 128;

/// 发送数据报的 TTL
pub const IP_DEFAULT_TTL: u8 = 0xff;
