//! IPv4 层
//!
//! 在协议栈上注册帧类型 [`NET_PROTOCOL_TYPE_IP`](crate::NET_PROTOCOL_TYPE_IP)，
//! 负责：
//!
//! - 接收：校验首部，按目的地址过滤，把载荷交给上层协议；
//! - 发送：按源地址选择接口，构造首部并交给设备发送。
//!
//! 不支持路由、分片重组和地址解析。

mod addr;
mod header;
mod iface;

use std::sync::Arc;

use device::{NET_DEVICE_ADDR_LEN, NetDevice, NetDeviceFlags};
use lazy_static::lazy_static;
use log::{debug, error};
use sync::{RwLock, SpinLock};

pub use addr::{IP_ADDR_ANY, IP_ADDR_BROADCAST, IpAddr};
pub use header::{
    IP_FLAG_DF, IP_FLAG_MF, IP_HDR_SIZE_MIN, IP_OFFSET_MASK, IP_PAYLOAD_SIZE_MAX, IP_VERSION_IPV4,
    IpHdr, dump,
};
pub use iface::IpIface;

use crate::config::{IP_DEFAULT_TTL, IP_ID_INITIAL};
use crate::error::NetError;
use crate::iface::{IfaceFamily, NetIface};
use crate::stack::NetStack;
use crate::util::cksum16;
use crate::NET_PROTOCOL_TYPE_IP;

/// 上层协议号：ICMP
pub const IP_PROTOCOL_ICMP: u8 = 1;
/// 上层协议号：TCP
pub const IP_PROTOCOL_TCP: u8 = 6;
/// 上层协议号：UDP
pub const IP_PROTOCOL_UDP: u8 = 17;

/// 上层协议处理函数
///
/// 参数依次为协议栈、载荷、源地址、目的地址和接收接口。
/// 在软中断中调用，不得阻塞。
pub type IpProtocolHandler =
    Box<dyn Fn(&NetStack, &[u8], IpAddr, IpAddr, &Arc<IpIface>) + Send + Sync>;

struct IpProtocol {
    number: u8,
    handler: IpProtocolHandler,
}

/// IP 层状态：接口表和上层协议表
pub(crate) struct IpLayer {
    ifaces: RwLock<Vec<Arc<IpIface>>>,
    protocols: RwLock<Vec<Arc<IpProtocol>>>,
}

impl IpLayer {
    pub(crate) fn new() -> Self {
        Self {
            ifaces: RwLock::new(Vec::new()),
            protocols: RwLock::new(Vec::new()),
        }
    }
}

lazy_static! {
    /// 下一个标识值，进程内所有协议栈实例共享
    static ref IP_ID: SpinLock<u16> = SpinLock::new(IP_ID_INITIAL);
}

/// 生成 IP 标识
///
/// 从 [`IP_ID_INITIAL`] 开始每次加一，16 位自然回绕。
pub fn generate_id() -> u16 {
    let mut id = IP_ID.lock();
    let ret = *id;
    *id = id.wrapping_add(1);
    ret
}

impl NetStack {
    pub(crate) fn ip_init(&self) -> Result<(), NetError> {
        self.protocol_register(NET_PROTOCOL_TYPE_IP, |stack, data, dev| {
            stack.ip_input(data, dev)
        })
    }

    /// 把 IP 接口注册到设备上，并加入源地址选择用的接口表
    pub fn ip_iface_register(&self, dev: &NetDevice, iface: Arc<IpIface>) -> Result<(), NetError> {
        self.iface_attach(dev, NetIface::Ip(Arc::clone(&iface)))
            .inspect_err(|e| {
                error!("iface_attach() failure: {}", e);
            })?;
        self.ip.ifaces.write().push(Arc::clone(&iface));
        debug!(
            "registered: dev={}, unicast={}, netmask={}, broadcast={}",
            dev.name(),
            iface.unicast(),
            iface.netmask(),
            iface.broadcast()
        );
        Ok(())
    }

    /// 选择单播地址等于 `addr` 的第一个接口
    pub fn ip_iface_select(&self, addr: IpAddr) -> Option<Arc<IpIface>> {
        self.ip
            .ifaces
            .read()
            .iter()
            .find(|iface| iface.unicast() == addr)
            .cloned()
    }

    /// 注册上层协议
    pub fn ip_protocol_register<F>(&self, number: u8, handler: F) -> Result<(), NetError>
    where
        F: Fn(&NetStack, &[u8], IpAddr, IpAddr, &Arc<IpIface>) + Send + Sync + 'static,
    {
        self.ensure_not_running()?;
        let mut protocols = self.ip.protocols.write();
        if protocols.iter().any(|proto| proto.number == number) {
            error!("already registered, protocol={}", number);
            return Err(NetError::Conflict);
        }
        protocols.push(Arc::new(IpProtocol {
            number,
            handler: Box::new(handler),
        }));
        debug!("registered, protocol={}", number);
        Ok(())
    }

    /// 接收一个 IP 数据报
    ///
    /// 逐项校验，任何一项失败都记录日志后丢弃；通过后把载荷交给上层协议。
    fn ip_input(&self, data: &[u8], dev: &Arc<NetDevice>) {
        let hdr = match IpHdr::decode(data) {
            Ok(hdr) => hdr,
            Err(_) => {
                error!("too short, len={}", data.len());
                return;
            }
        };
        if hdr.version() != IP_VERSION_IPV4 {
            error!("invalid version, v={}", hdr.version());
            return;
        }
        let hlen = hdr.header_len();
        if hlen < IP_HDR_SIZE_MIN {
            error!("invalid header length, hlen={}", hlen);
            return;
        }
        if data.len() < hlen {
            error!("shorter than IHL, len={}, hlen={}", data.len(), hlen);
            return;
        }
        let total = hdr.total as usize;
        if data.len() < total {
            error!("shorter than total length, len={}, total={}", data.len(), total);
            return;
        }
        if total < hlen {
            error!("total length shorter than IHL, total={}, hlen={}", total, hlen);
            return;
        }
        if cksum16(&data[..hlen], 0) != 0 {
            error!("checksum error, sum=0x{:04x}", hdr.sum);
            return;
        }
        if hdr.is_fragment() {
            error!("fragments does not support");
            return;
        }

        let Some(iface) = self
            .iface_lookup(dev, IfaceFamily::Ip)
            .and_then(|iface| iface.as_ip().cloned())
        else {
            // 设备上没有 IP 接口
            return;
        };
        if !iface.accepts(hdr.dst) {
            // 不是发给本机的
            return;
        }

        debug!(
            "dev={}, iface={}, protocol={}, total={}",
            dev.name(),
            iface.unicast(),
            hdr.protocol,
            total
        );
        dump(&data[..total]);

        let proto = self
            .ip
            .protocols
            .read()
            .iter()
            .find(|proto| proto.number == hdr.protocol)
            .cloned();
        match proto {
            Some(proto) => (proto.handler)(self, &data[hlen..total], hdr.src, hdr.dst, &iface),
            None => debug!("unsupported protocol, protocol={}", hdr.protocol),
        }
    }

    /// 发送一个 IP 数据报，返回发送的载荷长度
    ///
    /// 源地址不能是未指定地址（没有路由表）；按源地址选择接口，
    /// 首部加载荷不能超过设备 MTU。标识由 [`generate_id`] 生成，从不分片。
    pub fn ip_output(
        &self,
        protocol: u8,
        data: &[u8],
        src: IpAddr,
        dst: IpAddr,
    ) -> Result<usize, NetError> {
        if src.is_unspecified() {
            error!("ip routing does not implement");
            return Err(NetError::NoRoute);
        }
        let iface = self.ip_iface_select(src).ok_or_else(|| {
            error!("cannot find IP interface, src={}", src);
            NetError::NotFound
        })?;
        if iface.unicast() != src && !src.is_broadcast() {
            error!("source does not match interface, src={}", src);
            return Err(NetError::NoRoute);
        }
        let dev = iface
            .device_index()
            .and_then(|index| self.device_by_index(index))
            .ok_or_else(|| {
                error!("device not found, iface={}", iface.unicast());
                NetError::NotFound
            })?;
        if IP_HDR_SIZE_MIN + data.len() > dev.mtu() as usize {
            error!(
                "too long, dev={}, mtu={} < {}",
                dev.name(),
                dev.mtu(),
                IP_HDR_SIZE_MIN + data.len()
            );
            return Err(NetError::TooLong);
        }

        let id = generate_id();
        self.ip_output_core(&iface, &dev, protocol, data, iface.unicast(), dst, id, 0)
            .inspect_err(|e| {
                error!("ip_output_core() failure: {}", e);
            })?;
        Ok(data.len())
    }

    #[allow(clippy::too_many_arguments)]
    fn ip_output_core(
        &self,
        iface: &IpIface,
        dev: &NetDevice,
        protocol: u8,
        data: &[u8],
        src: IpAddr,
        dst: IpAddr,
        id: u16,
        offset: u16,
    ) -> Result<(), NetError> {
        if data.len() > IP_PAYLOAD_SIZE_MAX {
            error!("too long, len={}", data.len());
            return Err(NetError::TooLong);
        }
        let total = IP_HDR_SIZE_MIN + data.len();
        let mut hdr = IpHdr {
            vhl: (IP_VERSION_IPV4 << 4) | (IP_HDR_SIZE_MIN >> 2) as u8,
            tos: 0,
            total: total as u16,
            id,
            offset,
            ttl: IP_DEFAULT_TTL,
            protocol,
            sum: 0,
            src,
            dst,
        };
        hdr.fill_checksum();

        let mut buf = Vec::new();
        buf.try_reserve_exact(total).map_err(|_| {
            error!("allocation failure, len={}", total);
            NetError::AllocationFailure
        })?;
        buf.resize(IP_HDR_SIZE_MIN, 0);
        hdr.encode(&mut buf)?;
        buf.extend_from_slice(data);

        debug!(
            "dev={}, dst={}, protocol={}, len={}",
            dev.name(),
            dst,
            protocol,
            total
        );
        dump(&buf);
        self.ip_output_device(iface, dev, &buf, dst)
    }

    fn ip_output_device(
        &self,
        iface: &IpIface,
        dev: &NetDevice,
        data: &[u8],
        dst: IpAddr,
    ) -> Result<(), NetError> {
        let mut hwaddr = [0u8; NET_DEVICE_ADDR_LEN];
        if dev.flags().contains(NetDeviceFlags::NEED_ARP) {
            if dst == iface.broadcast() || dst.is_broadcast() {
                let broadcast = dev.broadcast().unwrap_or(&[]);
                hwaddr[..broadcast.len()].copy_from_slice(broadcast);
            } else {
                error!("arp does not implement");
                return Err(NetError::Unsupported);
            }
        }
        self.device_output(dev, NET_PROTOCOL_TYPE_IP, data, &hwaddr)
    }
}
