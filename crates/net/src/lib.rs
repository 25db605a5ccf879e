//! 用户态网络协议栈核心
//!
//! 此 crate 提供协议栈的核心与 IPv4 层，包括：
//!
//! - [`NetStack`] - 设备、接口、协议注册表，接收顶半部/底半部，设备发送
//! - [`ip`] - IPv4 地址、接口、首部校验与收发
//! - [`driver`] - dummy 与 loopback 两个内置驱动
//!
//! # 示例
//!
//! ```no_run
//! use net::{NetStack, driver, ip::{IpAddr, IpIface, IP_PROTOCOL_ICMP}};
//! use std::sync::Arc;
//!
//! let stack = NetStack::init()?;
//! let lo = driver::loopback_init(&stack)?;
//! stack.ip_iface_register(&lo, Arc::new(IpIface::new("127.0.0.1", "255.0.0.0")?))?;
//! stack.run()?;
//! let src: IpAddr = "127.0.0.1".parse()?;
//! stack.ip_output(IP_PROTOCOL_ICMP, b"hello", src, src)?;
//! stack.shutdown();
//! # Ok::<(), net::NetError>(())
//! ```

pub mod config;
pub mod driver;
mod error;
mod iface;
pub mod ip;
mod stack;
pub mod util;

pub use error::NetError;
pub use iface::{IfaceFamily, NetIface};
pub use ip::{IpAddr, IpIface};
pub use stack::{NetStack, ProtocolHandler};

/// 帧类型：IPv4
pub const NET_PROTOCOL_TYPE_IP: u16 = 0x0800;
