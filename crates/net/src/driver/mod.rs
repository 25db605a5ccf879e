//! 内置驱动
//!
//! 两个驱动都只通过公开的注册接口接入协议栈，可作为编写其它驱动的参考：
//! 创建 [`NetDevice`](device::NetDevice)、注册设备，再向
//! [`NetStack::irq`](crate::NetStack::irq) 注册中断处理函数。

mod dummy;
mod loopback;

pub use dummy::dummy_init;
pub use loopback::loopback_init;
