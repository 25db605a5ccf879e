//! 协议栈错误类型

use core::fmt;

use device::{IrqError, NetDeviceError};

/// 协议栈错误
///
/// 接收路径上的校验失败不会以错误返回（没有同步调用者），只记录日志后丢弃；
/// 这里的错误都返回给注册或发送的调用者。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetError {
    /// 重复注册：协议类型、接口族或中断源已存在
    Conflict,
    /// 地址文本无法解析
    InvalidAddress,
    /// 缓冲区短于要求的最小长度
    Truncated,
    /// 没有路由表，无法为未指定的源地址选路
    NoRoute,
    /// 找不到对应的接口或设备
    NotFound,
    /// 数据超过设备 MTU
    TooLong,
    /// 不支持的操作（例如需要地址解析的单播发送）
    Unsupported,
    /// 设备未打开
    DeviceDown,
    /// 驱动发送失败
    Transmit(NetDeviceError),
    /// 协议栈已运行，不允许再注册
    AlreadyRunning,
    /// 中断控制器错误
    Irq(IrqError),
    /// 内存分配失败
    AllocationFailure,
}

impl NetError {
    /// 获取错误的简短描述
    pub fn as_str(&self) -> &'static str {
        match self {
            NetError::Conflict => "already registered",
            NetError::InvalidAddress => "invalid address",
            NetError::Truncated => "buffer too short",
            NetError::NoRoute => "ip routing does not implement",
            NetError::NotFound => "not found",
            NetError::TooLong => "too long",
            NetError::Unsupported => "not supported",
            NetError::DeviceDown => "device not opened",
            NetError::Transmit(_) => "device transmit failure",
            NetError::AlreadyRunning => "stack already running",
            NetError::Irq(_) => "interrupt error",
            NetError::AllocationFailure => "allocation failure",
        }
    }
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetError::Transmit(e) => write!(f, "{}: {}", self.as_str(), e),
            NetError::Irq(e) => write!(f, "{}: {}", self.as_str(), e),
            _ => f.write_str(self.as_str()),
        }
    }
}

impl std::error::Error for NetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NetError::Transmit(e) => Some(e),
            NetError::Irq(e) => Some(e),
            _ => None,
        }
    }
}

impl From<IrqError> for NetError {
    fn from(e: IrqError) -> Self {
        NetError::Irq(e)
    }
}

impl From<NetDeviceError> for NetError {
    fn from(e: NetDeviceError) -> Self {
        NetError::Transmit(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_wraps_source() {
        let err = NetError::from(NetDeviceError::QueueFull);
        assert_eq!(err.to_string(), "device transmit failure: queue full");
        assert!(std::error::Error::source(&err).is_some());

        let err: NetError = IrqError::Terminated.into();
        assert_eq!(err, NetError::Irq(IrqError::Terminated));
    }

    #[test]
    fn test_display_plain() {
        assert_eq!(NetError::NoRoute.to_string(), "ip routing does not implement");
        assert!(std::error::Error::source(&NetError::TooLong).is_none());
    }
}
