//! IPv4 地址

use core::fmt;
use core::ops::{BitAnd, BitOr, Not};
use core::str::FromStr;

use crate::error::NetError;

/// IPv4 地址
///
/// 按线上字节序保存四个字节，比较和拷贝都不做字节序转换，
/// 可以直接写入首部字段。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IpAddr([u8; 4]);

/// 未指定地址 0.0.0.0
pub const IP_ADDR_ANY: IpAddr = IpAddr([0, 0, 0, 0]);

/// 受限广播地址 255.255.255.255
pub const IP_ADDR_BROADCAST: IpAddr = IpAddr([0xff, 0xff, 0xff, 0xff]);

impl IpAddr {
    /// 由四个八位组构造
    pub const fn new(a: u8, b: u8, c: u8, d: u8) -> Self {
        IpAddr([a, b, c, d])
    }

    /// 由线上字节构造
    pub const fn from_octets(octets: [u8; 4]) -> Self {
        IpAddr(octets)
    }

    /// 线上字节
    pub const fn octets(&self) -> [u8; 4] {
        self.0
    }

    /// 解析点分十进制文本
    ///
    /// 必须恰好四组十进制数字，每组 0–255、只含数字；
    /// 前三组后紧跟 `.`，最后一组后紧跟输入结尾。
    pub fn parse(text: &str) -> Result<Self, NetError> {
        let mut octets = [0u8; 4];
        let mut rest = text.as_bytes();
        for (idx, octet) in octets.iter_mut().enumerate() {
            let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
            if digits == 0 {
                return Err(NetError::InvalidAddress);
            }
            let mut value: u32 = 0;
            for &b in &rest[..digits] {
                value = value * 10 + (b - b'0') as u32;
                if value > 255 {
                    return Err(NetError::InvalidAddress);
                }
            }
            *octet = value as u8;
            rest = &rest[digits..];

            match (idx, rest.split_first()) {
                (3, None) => {}
                (0..=2, Some((&b'.', tail))) => rest = tail,
                _ => return Err(NetError::InvalidAddress),
            }
        }
        Ok(IpAddr(octets))
    }

    /// 是否为未指定地址
    pub fn is_unspecified(&self) -> bool {
        *self == IP_ADDR_ANY
    }

    /// 是否为受限广播地址
    pub fn is_broadcast(&self) -> bool {
        *self == IP_ADDR_BROADCAST
    }
}

impl FromStr for IpAddr {
    type Err = NetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IpAddr::parse(s)
    }
}

impl fmt::Display for IpAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{}.{}.{}.{}", a, b, c, d)
    }
}

impl BitAnd for IpAddr {
    type Output = IpAddr;

    fn bitand(self, rhs: IpAddr) -> IpAddr {
        IpAddr(core::array::from_fn(|i| self.0[i] & rhs.0[i]))
    }
}

impl BitOr for IpAddr {
    type Output = IpAddr;

    fn bitor(self, rhs: IpAddr) -> IpAddr {
        IpAddr(core::array::from_fn(|i| self.0[i] | rhs.0[i]))
    }
}

impl Not for IpAddr {
    type Output = IpAddr;

    fn not(self) -> IpAddr {
        IpAddr(self.0.map(|b| !b))
    }
}
