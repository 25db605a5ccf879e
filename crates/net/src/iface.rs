//! 设备上的协议接口

use std::sync::Arc;

use device::NetDevice;

use crate::error::NetError;
use crate::ip::IpIface;

/// 接口协议族
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum IfaceFamily {
    /// IPv4
    Ip = 1,
    /// IPv6（仅保留族号，没有实现）
    Ipv6 = 2,
}

/// 挂在设备上的接口，按协议族区分
///
/// 每个设备上每个协议族最多一个接口。
#[derive(Debug, Clone)]
pub enum NetIface {
    /// IPv4 接口
    Ip(Arc<IpIface>),
}

impl NetIface {
    /// 接口的协议族
    pub fn family(&self) -> IfaceFamily {
        match self {
            NetIface::Ip(_) => IfaceFamily::Ip,
        }
    }

    /// 作为 IPv4 接口访问
    pub fn as_ip(&self) -> Option<&Arc<IpIface>> {
        match self {
            NetIface::Ip(iface) => Some(iface),
        }
    }

    pub(crate) fn bind(&self, dev: &NetDevice) -> Result<(), NetError> {
        match self {
            NetIface::Ip(iface) => iface.bind(dev),
        }
    }
}

impl From<Arc<IpIface>> for NetIface {
    fn from(iface: Arc<IpIface>) -> Self {
        NetIface::Ip(iface)
    }
}
