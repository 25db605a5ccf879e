//! 链路设备接口定义

use core::fmt;
use core::sync::atomic::{AtomicU16, AtomicU32, Ordering};
use std::sync::OnceLock;

use bitflags::bitflags;
use log::{error, info};

/// 链路地址的最大长度（字节）
pub const NET_DEVICE_ADDR_LEN: usize = 16;

/// 设备索引，进程内唯一且严格递增
pub type NetDeviceIndex = u32;

/// 下一个可分配的设备索引
static NEXT_INDEX: AtomicU32 = AtomicU32::new(0);

/// 链路设备错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetDeviceError {
    /// IO 错误
    IoError,
    /// 设备未就绪（未打开）
    DeviceNotReady,
    /// 设备已打开
    AlreadyOpened,
    /// 设备已注册
    AlreadyRegistered,
    /// 队列已满
    QueueFull,
    /// 分配失败
    AllocationFailed,
}

impl NetDeviceError {
    /// 获取错误的简短描述
    pub fn as_str(&self) -> &'static str {
        match self {
            NetDeviceError::IoError => "I/O error",
            NetDeviceError::DeviceNotReady => "device not ready",
            NetDeviceError::AlreadyOpened => "device already opened",
            NetDeviceError::AlreadyRegistered => "device already registered",
            NetDeviceError::QueueFull => "queue full",
            NetDeviceError::AllocationFailed => "allocation failed",
        }
    }
}

impl fmt::Display for NetDeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for NetDeviceError {}

bitflags! {
    /// 设备状态标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct NetDeviceFlags: u16 {
        /// 设备已打开
        const UP = 0x0001;
        /// 回环设备
        const LOOPBACK = 0x0010;
        /// 支持广播
        const BROADCAST = 0x0020;
        /// 点对点链路
        const P2P = 0x0040;
        /// 发送前需要地址解析
        const NEED_ARP = 0x0100;
    }
}

/// 设备类型（取值与以太网帧类型无关，仅用于标识）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum NetDeviceType {
    /// 丢弃所有帧的占位设备
    Dummy = 0x0000,
    /// 回环设备
    Loopback = 0x0001,
    /// 以太网设备
    Ethernet = 0x0002,
}

/// 驱动能力接口
///
/// 协议栈只通过这三个入口与驱动交互，调用时不持有任何协议栈的锁。
/// 驱动私有数据直接保存在实现此 trait 的类型中。
pub trait NetDeviceOps: Send + Sync {
    /// 打开设备，默认无操作
    fn open(&self, _dev: &NetDevice) -> Result<(), NetDeviceError> {
        Ok(())
    }

    /// 关闭设备，默认无操作
    fn close(&self, _dev: &NetDevice) -> Result<(), NetDeviceError> {
        Ok(())
    }

    /// 发送一帧
    ///
    /// `ty` 是上层协议类型（与以太网类型取值相同），`dst` 是目的链路地址。
    fn transmit(
        &self,
        dev: &NetDevice,
        ty: u16,
        data: &[u8],
        dst: &[u8],
    ) -> Result<(), NetDeviceError>;
}

/// 链路设备
///
/// 由驱动创建（相当于分配），注册时获得索引和名称（`net0`、`net1`…），
/// 协议栈运行时打开、关闭时关闭，永不注销。
pub struct NetDevice {
    ident: OnceLock<(NetDeviceIndex, String)>,
    ty: NetDeviceType,
    mtu: u16,
    flags: AtomicU16,
    alen: u16,
    addr: [u8; NET_DEVICE_ADDR_LEN],
    /// 广播地址或对端地址，二者互斥，由 P2P 标志区分
    peer_or_broadcast: [u8; NET_DEVICE_ADDR_LEN],
    ops: Box<dyn NetDeviceOps>,
}

impl NetDevice {
    /// 创建一个尚未注册的设备
    pub fn new(
        ty: NetDeviceType,
        mtu: u16,
        flags: NetDeviceFlags,
        ops: Box<dyn NetDeviceOps>,
    ) -> Self {
        Self {
            ident: OnceLock::new(),
            ty,
            mtu,
            flags: AtomicU16::new((flags - NetDeviceFlags::UP).bits()),
            alen: 0,
            addr: [0; NET_DEVICE_ADDR_LEN],
            peer_or_broadcast: [0; NET_DEVICE_ADDR_LEN],
            ops,
        }
    }

    /// 设置硬件地址，地址长度取 `addr.len()`（最多 [`NET_DEVICE_ADDR_LEN`]）
    pub fn with_hw_addr(mut self, addr: &[u8]) -> Self {
        let len = addr.len().min(NET_DEVICE_ADDR_LEN);
        self.alen = len as u16;
        self.addr = [0; NET_DEVICE_ADDR_LEN];
        self.addr[..len].copy_from_slice(&addr[..len]);
        self
    }

    /// 设置广播地址，长度与硬件地址一致
    pub fn with_broadcast(mut self, broadcast: &[u8]) -> Self {
        self.set_peer_or_broadcast(broadcast);
        self
    }

    /// 设置对端地址（点对点链路），长度与硬件地址一致
    pub fn with_peer(mut self, peer: &[u8]) -> Self {
        self.set_peer_or_broadcast(peer);
        self
    }

    fn set_peer_or_broadcast(&mut self, addr: &[u8]) {
        let len = addr.len().min(NET_DEVICE_ADDR_LEN);
        self.peer_or_broadcast = [0; NET_DEVICE_ADDR_LEN];
        self.peer_or_broadcast[..len].copy_from_slice(&addr[..len]);
    }

    /// 为设备分配索引和名称
    ///
    /// 每个设备只能分配一次。
    pub fn assign_index(&self) -> Result<NetDeviceIndex, NetDeviceError> {
        if self.ident.get().is_some() {
            return Err(NetDeviceError::AlreadyRegistered);
        }
        let index = NEXT_INDEX.fetch_add(1, Ordering::Relaxed);
        self.ident
            .set((index, format!("net{}", index)))
            .map_err(|_| NetDeviceError::AlreadyRegistered)?;
        Ok(index)
    }

    /// 设备索引，未注册时为 `None`
    pub fn index(&self) -> Option<NetDeviceIndex> {
        self.ident.get().map(|(index, _)| *index)
    }

    /// 设备名称，未注册时为 `"(unregistered)"`
    pub fn name(&self) -> &str {
        self.ident
            .get()
            .map(|(_, name)| name.as_str())
            .unwrap_or("(unregistered)")
    }

    /// 设备类型
    pub fn device_type(&self) -> NetDeviceType {
        self.ty
    }

    /// 最大传输单元
    pub fn mtu(&self) -> u16 {
        self.mtu
    }

    /// 当前状态标志
    pub fn flags(&self) -> NetDeviceFlags {
        NetDeviceFlags::from_bits_truncate(self.flags.load(Ordering::Acquire))
    }

    /// 设备是否已打开
    pub fn is_up(&self) -> bool {
        self.flags().contains(NetDeviceFlags::UP)
    }

    /// 状态字符串，用于日志
    pub fn state(&self) -> &'static str {
        if self.is_up() { "up" } else { "down" }
    }

    /// 硬件地址
    pub fn hw_addr(&self) -> &[u8] {
        &self.addr[..self.alen as usize]
    }

    /// 广播地址；点对点链路上没有广播地址
    pub fn broadcast(&self) -> Option<&[u8]> {
        if self.flags().contains(NetDeviceFlags::P2P) {
            None
        } else {
            Some(&self.peer_or_broadcast[..self.alen as usize])
        }
    }

    /// 对端地址；仅点对点链路有效
    pub fn peer(&self) -> Option<&[u8]> {
        if self.flags().contains(NetDeviceFlags::P2P) {
            Some(&self.peer_or_broadcast[..self.alen as usize])
        } else {
            None
        }
    }

    /// 打开设备并置位 UP
    pub fn open(&self) -> Result<(), NetDeviceError> {
        if self.is_up() {
            error!("already opened, dev={}", self.name());
            return Err(NetDeviceError::AlreadyOpened);
        }
        if let Err(e) = self.ops.open(self) {
            error!("failure, dev={}, err={}", self.name(), e);
            return Err(e);
        }
        self.flags
            .fetch_or(NetDeviceFlags::UP.bits(), Ordering::AcqRel);
        info!("dev={}, state={}", self.name(), self.state());
        Ok(())
    }

    /// 关闭设备并清除 UP
    pub fn close(&self) -> Result<(), NetDeviceError> {
        if !self.is_up() {
            error!("not opened, dev={}", self.name());
            return Err(NetDeviceError::DeviceNotReady);
        }
        if let Err(e) = self.ops.close(self) {
            error!("failure, dev={}, err={}", self.name(), e);
            return Err(e);
        }
        self.flags
            .fetch_and(!NetDeviceFlags::UP.bits(), Ordering::AcqRel);
        info!("dev={}, state={}", self.name(), self.state());
        Ok(())
    }

    /// 直接调用驱动的发送能力
    ///
    /// 不做任何检查；状态与 MTU 检查由协议栈的输出路径负责。
    pub fn transmit(&self, ty: u16, data: &[u8], dst: &[u8]) -> Result<(), NetDeviceError> {
        self.ops.transmit(self, ty, data, dst)
    }
}

impl fmt::Debug for NetDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetDevice")
            .field("name", &self.name())
            .field("type", &self.ty)
            .field("mtu", &self.mtu)
            .field("flags", &self.flags())
            .finish()
    }
}
