//! 链路设备模块
//!
//! 定义链路设备的数据模型和驱动需要实现的能力接口。
//! 具体驱动（dummy、loopback 等）由上层 crate 基于这些接口构建。

mod net_device;

pub use net_device::{
    NET_DEVICE_ADDR_LEN, NetDevice, NetDeviceError, NetDeviceFlags, NetDeviceIndex, NetDeviceOps,
    NetDeviceType,
};

/// 格式化链路地址为可读字符串
///
/// 以冒号分隔的两位十六进制形式输出，空地址输出 `-`。
pub fn format_link_addr(addr: &[u8]) -> String {
    if addr.is_empty() {
        return String::from("-");
    }
    addr.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_link_addr() {
        assert_eq!(
            format_link_addr(&[0x00, 0x00, 0x5e, 0x00, 0x53, 0x01]),
            "00:00:5e:00:53:01"
        );
        assert_eq!(format_link_addr(&[]), "-");
    }
}
