//! Shared fixtures for the stack integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use device::{NetDevice, NetDeviceError, NetDeviceFlags, NetDeviceOps, NetDeviceType};
use net::ip::{IP_HDR_SIZE_MIN, IP_VERSION_IPV4, IpAddr, IpHdr};
use net::{IpIface, NetStack};
use test_support::mock::net::FrameRecorder;

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Driver that hands every transmitted frame to a [`FrameRecorder`].
pub struct RecorderOps {
    recorder: Arc<FrameRecorder>,
}

impl NetDeviceOps for RecorderOps {
    fn transmit(
        &self,
        _dev: &NetDevice,
        ty: u16,
        data: &[u8],
        dst: &[u8],
    ) -> Result<(), NetDeviceError> {
        if self.recorder.should_fail() {
            return Err(NetDeviceError::IoError);
        }
        self.recorder.record(ty, data, dst);
        Ok(())
    }
}

pub fn init_logging() {
    klog::init();
}

pub fn recorder_device(mtu: u16, flags: NetDeviceFlags) -> (Arc<NetDevice>, Arc<FrameRecorder>) {
    recorder_device_with(mtu, flags, |dev| dev)
}

pub fn recorder_device_with(
    mtu: u16,
    flags: NetDeviceFlags,
    configure: impl FnOnce(NetDevice) -> NetDevice,
) -> (Arc<NetDevice>, Arc<FrameRecorder>) {
    let recorder = Arc::new(FrameRecorder::new());
    let ops = RecorderOps {
        recorder: Arc::clone(&recorder),
    };
    let dev = NetDevice::new(NetDeviceType::Ethernet, mtu, flags, Box::new(ops));
    (Arc::new(configure(dev)), recorder)
}

/// Stack with one registered recorder device carrying `192.0.2.1/24`.
pub fn stack_with_device(mtu: u16) -> (Arc<NetStack>, Arc<NetDevice>, Arc<FrameRecorder>) {
    init_logging();
    let stack = NetStack::init().unwrap();
    let (dev, recorder) = recorder_device(mtu, NetDeviceFlags::BROADCAST);
    stack.device_register(Arc::clone(&dev)).unwrap();
    let iface = IpIface::new("192.0.2.1", "255.255.255.0").unwrap();
    stack.ip_iface_register(&dev, Arc::new(iface)).unwrap();
    (stack, dev, recorder)
}

pub fn addr(text: &str) -> IpAddr {
    text.parse().unwrap()
}

/// Builds a checksummed IPv4 datagram with a minimal header.
pub fn datagram(protocol: u8, src: IpAddr, dst: IpAddr, payload: &[u8]) -> Vec<u8> {
    datagram_with(protocol, src, dst, payload, |_| {})
}

/// Like [`datagram`], with a hook to adjust header fields before the checksum is filled.
pub fn datagram_with(
    protocol: u8,
    src: IpAddr,
    dst: IpAddr,
    payload: &[u8],
    tweak: impl FnOnce(&mut IpHdr),
) -> Vec<u8> {
    let mut hdr = IpHdr {
        vhl: (IP_VERSION_IPV4 << 4) | (IP_HDR_SIZE_MIN >> 2) as u8,
        tos: 0,
        total: (IP_HDR_SIZE_MIN + payload.len()) as u16,
        id: 1,
        offset: 0,
        ttl: 64,
        protocol,
        sum: 0,
        src,
        dst,
    };
    tweak(&mut hdr);
    hdr.fill_checksum();
    let mut buf = vec![0u8; IP_HDR_SIZE_MIN];
    hdr.encode(&mut buf).unwrap();
    buf.extend_from_slice(payload);
    buf
}

/// Collected `(payload, src, dst)` deliveries from an upper-layer handler.
pub type Deliveries = Arc<Mutex<Vec<(Vec<u8>, IpAddr, IpAddr)>>>;

pub fn register_collector(stack: &NetStack, protocol: u8) -> Deliveries {
    let seen: Deliveries = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    stack
        .ip_protocol_register(protocol, move |_stack, payload, src, dst, _iface| {
            sink.lock().unwrap().push((payload.to_vec(), src, dst));
        })
        .unwrap();
    seen
}
