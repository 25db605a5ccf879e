//! IPv4 首部编解码

use core::fmt::Write;

use log::{debug, log_enabled, trace, Level};

use super::addr::IpAddr;
use crate::error::NetError;
use crate::util::cksum16;

/// IP 版本号
pub const IP_VERSION_IPV4: u8 = 4;

/// 首部最小长度（无选项）
pub const IP_HDR_SIZE_MIN: usize = 20;

/// 数据报最大总长度
pub const IP_TOTAL_SIZE_MAX: usize = u16::MAX as usize;

/// 最大载荷长度
pub const IP_PAYLOAD_SIZE_MAX: usize = IP_TOTAL_SIZE_MAX - IP_HDR_SIZE_MIN;

/// 标志位：不分片
pub const IP_FLAG_DF: u16 = 0x4000;
/// 标志位：更多分片
pub const IP_FLAG_MF: u16 = 0x2000;
/// 片偏移掩码
pub const IP_OFFSET_MASK: u16 = 0x1fff;

/// IPv4 首部固定部分
///
/// 多字节字段以主机序保存，编解码时按网络字节序读写；
/// 选项只通过 IHL 跳过，不解析也不生成。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpHdr {
    /// 版本（高 4 位）与首部长度（低 4 位，单位 32 位字）
    pub vhl: u8,
    /// 服务类型
    pub tos: u8,
    /// 数据报总长度
    pub total: u16,
    /// 标识
    pub id: u16,
    /// 标志（高 3 位）与片偏移（低 13 位）
    pub offset: u16,
    /// 生存时间
    pub ttl: u8,
    /// 上层协议号
    pub protocol: u8,
    /// 首部校验和
    pub sum: u16,
    /// 源地址
    pub src: IpAddr,
    /// 目的地址
    pub dst: IpAddr,
}

impl IpHdr {
    /// 版本号
    pub fn version(&self) -> u8 {
        self.vhl >> 4
    }

    /// 首部长度（字节）
    pub fn header_len(&self) -> usize {
        ((self.vhl & 0x0f) as usize) << 2
    }

    /// 3 位标志
    pub fn flags(&self) -> u16 {
        (self.offset & 0xe000) >> 13
    }

    /// 片偏移（8 字节为单位）
    pub fn fragment_offset(&self) -> u16 {
        self.offset & IP_OFFSET_MASK
    }

    /// 是否为分片：MF 置位或片偏移非零
    pub fn is_fragment(&self) -> bool {
        self.offset & IP_FLAG_MF != 0 || self.fragment_offset() != 0
    }

    /// 从缓冲区解析首部固定部分
    ///
    /// 只检查长度，不做语义校验。
    pub fn decode(data: &[u8]) -> Result<Self, NetError> {
        if data.len() < IP_HDR_SIZE_MIN {
            return Err(NetError::Truncated);
        }
        let be16 = |at: usize| u16::from_be_bytes([data[at], data[at + 1]]);
        let addr = |at: usize| IpAddr::from_octets([data[at], data[at + 1], data[at + 2], data[at + 3]]);
        Ok(IpHdr {
            vhl: data[0],
            tos: data[1],
            total: be16(2),
            id: be16(4),
            offset: be16(6),
            ttl: data[8],
            protocol: data[9],
            sum: be16(10),
            src: addr(12),
            dst: addr(16),
        })
    }

    /// 把首部固定部分写入 `buf` 的前 [`IP_HDR_SIZE_MIN`] 字节
    ///
    /// 原样写入 `sum` 字段，需要时先调用 [`IpHdr::fill_checksum`]。
    pub fn encode(&self, buf: &mut [u8]) -> Result<(), NetError> {
        if buf.len() < IP_HDR_SIZE_MIN {
            return Err(NetError::Truncated);
        }
        buf[0] = self.vhl;
        buf[1] = self.tos;
        buf[2..4].copy_from_slice(&self.total.to_be_bytes());
        buf[4..6].copy_from_slice(&self.id.to_be_bytes());
        buf[6..8].copy_from_slice(&self.offset.to_be_bytes());
        buf[8] = self.ttl;
        buf[9] = self.protocol;
        buf[10..12].copy_from_slice(&self.sum.to_be_bytes());
        buf[12..16].copy_from_slice(&self.src.octets());
        buf[16..20].copy_from_slice(&self.dst.octets());
        Ok(())
    }

    /// 以 `sum = 0` 编码后计算校验和并写回 `sum`
    pub fn fill_checksum(&mut self) {
        let mut buf = [0u8; IP_HDR_SIZE_MIN];
        self.sum = 0;
        // 缓冲区长度固定为最小首部长度，编码不会失败
        let _ = self.encode(&mut buf);
        self.sum = cksum16(&buf, 0);
    }
}

/// 把数据报首部逐字段记录到 debug 日志，trace 级别追加十六进制转储
pub fn dump(data: &[u8]) {
    if !log_enabled!(Level::Debug) {
        return;
    }
    let hdr = match IpHdr::decode(data) {
        Ok(hdr) => hdr,
        Err(_) => {
            debug!("too short to dump, len={}", data.len());
            return;
        }
    };
    let hlen = hdr.header_len();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "     vhl: 0x{:02x} [v: {}, hl: {} ({})]",
        hdr.vhl,
        hdr.version(),
        hdr.vhl & 0x0f,
        hlen
    );
    let _ = writeln!(out, "     tos: 0x{:02x}", hdr.tos);
    let _ = writeln!(
        out,
        "   total: {} (payload: {})",
        hdr.total,
        (hdr.total as usize).saturating_sub(hlen)
    );
    let _ = writeln!(out, "      id: {}", hdr.id);
    let _ = writeln!(
        out,
        "  offset: 0x{:04x} [flags={:x}, offset={}]",
        hdr.offset,
        hdr.flags(),
        hdr.fragment_offset()
    );
    let _ = writeln!(out, "     ttl: {}", hdr.ttl);
    let _ = writeln!(out, "protocol: {}", hdr.protocol);
    let _ = writeln!(out, "     sum: 0x{:04x}", hdr.sum);
    let _ = writeln!(out, "     src: {}", hdr.src);
    let _ = write!(out, "     dst: {}", hdr.dst);
    debug!("\n{}", out);
    trace!("\n{}", klog::hexdump(data));
}
