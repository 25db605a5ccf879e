//! IP 接口

use std::sync::OnceLock;

use device::{NetDevice, NetDeviceIndex};
use log::error;

use super::addr::IpAddr;
use crate::error::NetError;

/// IP 接口：设备上的一个单播地址及其子网
///
/// 接口通过设备索引引用所属设备，不持有设备本身；
/// 绑定发生在注册时且只能发生一次。
#[derive(Debug)]
pub struct IpIface {
    unicast: IpAddr,
    netmask: IpAddr,
    broadcast: IpAddr,
    device: OnceLock<NetDeviceIndex>,
}

impl IpIface {
    /// 由单播地址和子网掩码的文本创建接口
    ///
    /// 广播地址按 `(unicast & netmask) | !netmask` 推导。
    pub fn new(unicast: &str, netmask: &str) -> Result<Self, NetError> {
        let unicast = IpAddr::parse(unicast).inspect_err(|_| {
            error!("invalid unicast address, addr={}", unicast);
        })?;
        let netmask = IpAddr::parse(netmask).inspect_err(|_| {
            error!("invalid netmask, addr={}", netmask);
        })?;
        Ok(Self::from_addrs(unicast, netmask))
    }

    /// 由已解析的地址创建接口
    pub fn from_addrs(unicast: IpAddr, netmask: IpAddr) -> Self {
        Self {
            unicast,
            netmask,
            broadcast: (unicast & netmask) | !netmask,
            device: OnceLock::new(),
        }
    }

    /// 单播地址
    pub fn unicast(&self) -> IpAddr {
        self.unicast
    }

    /// 子网掩码
    pub fn netmask(&self) -> IpAddr {
        self.netmask
    }

    /// 子网广播地址
    pub fn broadcast(&self) -> IpAddr {
        self.broadcast
    }

    /// 所属设备的索引，未绑定时为 `None`
    pub fn device_index(&self) -> Option<NetDeviceIndex> {
        self.device.get().copied()
    }

    /// 目的地址是否由此接口接收
    pub fn accepts(&self, dst: IpAddr) -> bool {
        dst == self.unicast || dst == self.broadcast || dst.is_broadcast()
    }

    pub(crate) fn bind(&self, dev: &NetDevice) -> Result<(), NetError> {
        let index = dev.index().ok_or(NetError::NotFound)?;
        self.device.set(index).map_err(|_| NetError::Conflict)
    }
}
