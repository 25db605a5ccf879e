//! Registries, top/bottom-half delivery and device output.

mod common;

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use common::{TIMEOUT, addr, init_logging, recorder_device, stack_with_device};
use device::{IrqError, NetDeviceError, NetDeviceFlags};
use net::{IfaceFamily, IpIface, NET_PROTOCOL_TYPE_IP, NetError, NetIface, NetStack};
use test_support::wait_until;

const TEST_TYPE: u16 = 0x88b5;

fn collecting_protocol(stack: &NetStack, ty: u16) -> Arc<Mutex<Vec<Vec<u8>>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    stack
        .protocol_register(ty, move |_stack, data, _dev| {
            sink.lock().unwrap().push(data.to_vec());
        })
        .unwrap();
    seen
}

#[test]
fn test_frames_delivered_in_arrival_order() {
    let (stack, dev, _) = stack_with_device(1500);
    let seen = collecting_protocol(&stack, TEST_TYPE);
    stack.run().unwrap();

    for frame in [b"A", b"B", b"C"] {
        stack.input_handler(TEST_TYPE, frame, &dev).unwrap();
    }
    assert!(wait_until(TIMEOUT, || seen.lock().unwrap().len() == 3));
    assert_eq!(
        *seen.lock().unwrap(),
        vec![b"A".to_vec(), b"B".to_vec(), b"C".to_vec()]
    );
    stack.shutdown();
}

#[test]
fn test_unknown_type_is_silently_dropped() {
    let (stack, dev, _) = stack_with_device(1500);
    let seen = collecting_protocol(&stack, TEST_TYPE);
    stack.run().unwrap();

    assert_eq!(stack.input_handler(0x1234, b"nobody", &dev), Ok(()));
    stack.input_handler(TEST_TYPE, b"marker", &dev).unwrap();
    assert!(wait_until(TIMEOUT, || !seen.lock().unwrap().is_empty()));
    assert_eq!(*seen.lock().unwrap(), vec![b"marker".to_vec()]);
    stack.shutdown();
}

#[test]
fn test_every_protocol_drained() {
    let (stack, dev, _) = stack_with_device(1500);
    let first = collecting_protocol(&stack, TEST_TYPE);
    let second = collecting_protocol(&stack, TEST_TYPE + 1);
    stack.run().unwrap();

    stack.input_handler(TEST_TYPE + 1, b"x", &dev).unwrap();
    stack.input_handler(TEST_TYPE, b"y", &dev).unwrap();
    stack.input_handler(TEST_TYPE + 1, b"z", &dev).unwrap();
    assert!(wait_until(TIMEOUT, || {
        first.lock().unwrap().len() == 1 && second.lock().unwrap().len() == 2
    }));
    assert_eq!(*second.lock().unwrap(), vec![b"x".to_vec(), b"z".to_vec()]);
    stack.shutdown();
}

#[test]
fn test_duplicate_protocol_rejected() {
    init_logging();
    let stack = NetStack::init().unwrap();
    stack.protocol_register(TEST_TYPE, |_, _, _| {}).unwrap();
    assert_eq!(
        stack.protocol_register(TEST_TYPE, |_, _, _| {}),
        Err(NetError::Conflict)
    );
    // IP is registered by init()
    assert_eq!(
        stack.protocol_register(NET_PROTOCOL_TYPE_IP, |_, _, _| {}),
        Err(NetError::Conflict)
    );
}

#[test]
fn test_registration_closed_after_run() {
    let (stack, _, _) = stack_with_device(1500);
    stack.run().unwrap();

    assert_eq!(
        stack.protocol_register(TEST_TYPE, |_, _, _| {}),
        Err(NetError::AlreadyRunning)
    );
    let (late, _) = recorder_device(1500, NetDeviceFlags::empty());
    assert_eq!(stack.device_register(late), Err(NetError::AlreadyRunning));
    assert_eq!(stack.run(), Err(NetError::AlreadyRunning));
    stack.shutdown();
}

#[test]
fn test_failed_run_leaves_stack_stopped() {
    let (stack, dev, _) = stack_with_device(1500);
    stack.irq().run().unwrap();

    assert_eq!(stack.run(), Err(NetError::Irq(IrqError::InvalidState)));
    assert!(!stack.is_running());
    assert!(!dev.is_up());
    // 重试得到同样的错误，而不是 AlreadyRunning
    assert_eq!(stack.run(), Err(NetError::Irq(IrqError::InvalidState)));
    assert!(!stack.is_running());
    assert_eq!(stack.protocol_register(TEST_TYPE, |_, _, _| {}), Ok(()));
    stack.shutdown();
}

#[test]
fn test_device_register_assigns_names() {
    init_logging();
    let stack = NetStack::init().unwrap();
    let (a, _) = recorder_device(1500, NetDeviceFlags::empty());
    let (b, _) = recorder_device(1500, NetDeviceFlags::empty());
    let ia = stack.device_register(Arc::clone(&a)).unwrap();
    let ib = stack.device_register(Arc::clone(&b)).unwrap();

    assert!(ib > ia);
    assert_eq!(a.name(), format!("net{}", ia));
    assert_eq!(stack.devices().len(), 2);
    assert!(Arc::ptr_eq(&stack.device_by_index(ib).unwrap(), &b));
    assert_eq!(stack.device_register(a), Err(NetError::Conflict));
}

#[test]
fn test_iface_family_unique_per_device() {
    let (stack, dev, _) = stack_with_device(1500);
    let lookup = stack.iface_lookup(&dev, IfaceFamily::Ip).unwrap();
    assert_eq!(lookup.family(), IfaceFamily::Ip);
    assert_eq!(lookup.as_ip().unwrap().unicast(), addr("192.0.2.1"));
    assert!(stack.iface_lookup(&dev, IfaceFamily::Ipv6).is_none());

    let other = Arc::new(IpIface::new("198.51.100.1", "255.255.255.0").unwrap());
    assert_eq!(
        stack.iface_attach(&dev, NetIface::Ip(other)),
        Err(NetError::Conflict)
    );
}

#[test]
fn test_iface_requires_registered_device() {
    init_logging();
    let stack = NetStack::init().unwrap();
    let (dev, _) = recorder_device(1500, NetDeviceFlags::empty());
    let iface = Arc::new(IpIface::new("192.0.2.1", "255.255.255.0").unwrap());
    assert_eq!(
        stack.ip_iface_register(&dev, iface),
        Err(NetError::NotFound)
    );
    assert!(stack.iface_lookup(&dev, IfaceFamily::Ip).is_none());
}

#[test]
fn test_iface_cannot_be_shared_between_devices() {
    let (stack, dev, _) = stack_with_device(1500);
    let (other, _) = recorder_device(1500, NetDeviceFlags::empty());
    stack.device_register(Arc::clone(&other)).unwrap();

    let iface = stack.iface_lookup(&dev, IfaceFamily::Ip).unwrap();
    assert_eq!(stack.iface_attach(&other, iface), Err(NetError::Conflict));
    assert!(stack.iface_lookup(&other, IfaceFamily::Ip).is_none());
}

#[test]
fn test_device_output_requires_open_device() {
    let (stack, dev, recorder) = stack_with_device(1500);
    assert_eq!(
        stack.device_output(&dev, TEST_TYPE, b"frame", &[]),
        Err(NetError::DeviceDown)
    );

    stack.run().unwrap();
    assert!(dev.is_up());
    stack.device_output(&dev, TEST_TYPE, b"frame", &[]).unwrap();
    assert_eq!(recorder.len(), 1);

    stack.shutdown();
    assert!(!dev.is_up());
    assert_eq!(
        stack.device_output(&dev, TEST_TYPE, b"frame", &[]),
        Err(NetError::DeviceDown)
    );
    assert_eq!(recorder.len(), 1);
}

#[test]
fn test_device_output_mtu_and_transmit_failure() {
    let (stack, dev, recorder) = stack_with_device(64);
    stack.run().unwrap();

    assert_eq!(
        stack.device_output(&dev, TEST_TYPE, &[0u8; 65], &[]),
        Err(NetError::TooLong)
    );
    stack.device_output(&dev, TEST_TYPE, &[0u8; 64], &[]).unwrap();
    assert_eq!(recorder.len(), 1);

    recorder.set_fail(true);
    assert_eq!(
        stack.device_output(&dev, TEST_TYPE, b"x", &[]),
        Err(NetError::Transmit(NetDeviceError::IoError))
    );
    assert_eq!(recorder.len(), 1);
    stack.shutdown();
}

#[test]
fn test_no_delivery_after_shutdown() {
    let (stack, dev, _) = stack_with_device(1500);
    let seen = collecting_protocol(&stack, TEST_TYPE);
    stack.run().unwrap();
    stack.input_handler(TEST_TYPE, b"before", &dev).unwrap();
    assert!(wait_until(TIMEOUT, || seen.lock().unwrap().len() == 1));

    stack.shutdown();
    assert_eq!(
        stack.input_handler(TEST_TYPE, b"after", &dev),
        Err(NetError::Irq(IrqError::Terminated))
    );
    thread::sleep(Duration::from_millis(20));
    assert_eq!(seen.lock().unwrap().len(), 1);
}
