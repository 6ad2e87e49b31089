// Copyright 2015, Paul Osborne <osbpau@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/license/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option.  This file may not be copied, modified, or distributed
// except according to those terms.

// Many threads, one simulated bus.

use std::collections::HashSet;
use std::thread;

use i2cshare::devices::Pca9555;
use i2cshare::mock::{MockEvent, MockTransport};
use i2cshare::{BusRegistry, Device, Transfer};

const THREADS: u16 = 8;
const ROUNDS: usize = 200;

#[test]
fn concurrent_opens_share_one_handle() {
    let mock = MockTransport::new();
    let registry = BusRegistry::with_transport(mock.clone());

    let handles: HashSet<_> = thread::scope(|s| {
        let workers: Vec<_> = (0..THREADS)
            .map(|i| {
                let registry = &registry;
                s.spawn(move || {
                    if i % 2 == 0 {
                        registry.open(3u32).unwrap()
                    } else {
                        registry.open("/dev/i2c-3").unwrap()
                    }
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    assert_eq!(handles.len(), 1);
    assert_eq!(mock.opens("/dev/i2c-3"), 1);
}

#[test]
fn transfers_never_cross_addresses() {
    let mock = MockTransport::new();
    let registry = BusRegistry::with_transport(mock.clone());

    thread::scope(|s| {
        for i in 0..THREADS {
            let registry = &registry;
            s.spawn(move || {
                let address = 0x20 + i;
                let dev = Device::new(registry, 1u32, address).unwrap();
                for round in 0..ROUNDS {
                    // tag every payload with the address it is meant for
                    let written = dev.write(&[0x10, address as u8, round as u8]).unwrap();
                    assert_eq!(written, 3);
                }
            });
        }
    });

    let events = mock.events();
    let mut writes = 0;
    for event in &events {
        if let MockEvent::Write { address, data, .. } = event {
            assert_eq!(*address, Some(u16::from(data[1])), "payload {:?} misaddressed", data);
            writes += 1;
        }
    }
    assert_eq!(writes, THREADS as usize * ROUNDS);

    // the address cache only reselects when the target changes
    let selects = events
        .iter()
        .filter(|e| matches!(e, MockEvent::SelectAddress { .. }))
        .count();
    assert!(selects >= THREADS as usize);
    assert!(selects <= writes);
}

#[test]
fn reads_come_from_the_requested_address() {
    let mock = MockTransport::new();
    for i in 0..THREADS {
        // every register of a chip holds the chip's own address
        mock.set_registers("/dev/i2c-1", 0x20 + i, 0x00, &[(0x20 + i) as u8; 256]);
    }
    let registry = BusRegistry::with_transport(mock.clone());
    let bus = registry.open(1u32).unwrap();

    thread::scope(|s| {
        for i in 0..THREADS {
            let registry = &registry;
            s.spawn(move || {
                let address = 0x20 + i;
                for _ in 0..ROUNDS {
                    let mut buf = [0u8; 2];
                    let count = registry
                        .transfer(bus, address, Transfer::Read(&mut buf))
                        .unwrap();
                    assert_eq!(count, 2);
                    assert_eq!(buf, [address as u8; 2], "read for 0x{:02x} misaddressed", address);
                }
            });
        }
    });

    let reads = mock
        .events()
        .iter()
        .filter(|e| matches!(e, MockEvent::Read { address: Some(_), len: 2, .. }))
        .count();
    assert_eq!(reads, THREADS as usize * ROUNDS);
}

#[test]
fn drivers_on_separate_chips_keep_their_registers() {
    let mock = MockTransport::new();
    let registry = BusRegistry::with_transport(mock.clone());

    thread::scope(|s| {
        for i in 0..4u16 {
            let registry = &registry;
            s.spawn(move || {
                let dev = Device::new(registry, 1u32, 0x20 + i).unwrap();
                let mut expander = Pca9555::new(dev);
                for pin in 0..16 {
                    assert!(expander.write_output_pin(pin, (pin as u16 + i) % 2 == 0));
                }
            });
        }
    });

    for i in 0..4u16 {
        let expected: u16 = if i % 2 == 0 { 0x5555 } else { 0xAAAA };
        let bytes = mock.registers("/dev/i2c-1", 0x20 + i, 0x02, 2);
        assert_eq!(u16::from(bytes[0]) | u16::from(bytes[1]) << 8, expected);
    }
}

#[test]
fn registry_drop_closes_once() {
    let mock = MockTransport::new();
    {
        let registry = BusRegistry::with_transport(mock.clone());
        thread::scope(|s| {
            for i in 0..THREADS {
                let registry = &registry;
                s.spawn(move || {
                    let dev = Device::new(registry, 0u32, 0x40 + i).unwrap();
                    dev.write(&[0x00, 0x01]).unwrap();
                });
            }
        });
        assert_eq!(mock.closes("/dev/i2c-0"), 0);
    }
    assert_eq!(mock.opens("/dev/i2c-0"), 1);
    assert_eq!(mock.closes("/dev/i2c-0"), 1);
}
