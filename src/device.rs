// Copyright 2015, Paul Osborne <osbpau@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/license/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option.  This file may not be copied, modified, or distributed
// except according to those terms.

use std::fmt;

use crate::core::{BusResult, I2CDevice, Transport};
use crate::registry::{BusHandle, BusName, BusRegistry};

/// A slave device at a fixed address on a shared bus
///
/// The bus itself belongs to the registry; dropping a `Device` leaves it
/// open for every other device on it.
pub struct Device<'r, T: Transport> {
    registry: &'r BusRegistry<T>,
    bus: BusHandle,
    address: u16,
}

impl<'r, T: Transport> Clone for Device<'r, T> {
    fn clone(&self) -> Self {
        Device {
            registry: self.registry,
            bus: self.bus,
            address: self.address,
        }
    }
}

impl<'r, T: Transport> fmt::Debug for Device<'r, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Device")
            .field("bus", &self.bus)
            .field("address", &format_args!("0x{:02x}", self.address))
            .finish()
    }
}

impl<'r, T: Transport> Device<'r, T> {
    /// Create a device for the given bus and slave address
    ///
    /// The bus is opened through the registry if nobody has opened it yet.
    /// Typically the address is expected to be 7-bits but 10-bit addresses
    /// may be supported by the kernel driver in some cases.  Little
    /// validation is done in Rust as the kernel is good at making sure
    /// things are valid.
    pub fn new<N: Into<BusName>>(
        registry: &'r BusRegistry<T>,
        bus: N,
        address: u16,
    ) -> BusResult<Device<'r, T>> {
        let bus = registry.open(bus)?;
        Ok(Device::on_handle(registry, bus, address))
    }

    /// Create a device on a bus that is already open
    pub fn on_handle(registry: &'r BusRegistry<T>, bus: BusHandle, address: u16) -> Device<'r, T> {
        Device {
            registry,
            bus,
            address,
        }
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    pub fn bus(&self) -> BusHandle {
        self.bus
    }

    /// Read up to `len` bytes; the returned buffer holds what actually arrived
    pub fn read(&self, len: usize) -> BusResult<Vec<u8>> {
        let mut buf = vec![0u8; len];
        let count = self.read_into(&mut buf)?;
        buf.truncate(count);
        Ok(buf)
    }

    pub fn read_into(&self, data: &mut [u8]) -> BusResult<usize> {
        self.registry.read(self.bus, self.address, data)
    }

    pub fn write(&self, data: &[u8]) -> BusResult<usize> {
        self.registry.write(self.bus, self.address, data)
    }

    pub fn write_read(&self, write: &[u8], read: &mut [u8]) -> BusResult<usize> {
        self.registry.write_read(self.bus, self.address, write, read)
    }
}

impl<'r, T: Transport> I2CDevice for Device<'r, T> {
    fn address(&self) -> u16 {
        self.address
    }

    fn read(&mut self, data: &mut [u8]) -> BusResult<usize> {
        self.read_into(data)
    }

    fn write(&mut self, data: &[u8]) -> BusResult<usize> {
        Device::write(self, data)
    }

    fn write_read(&mut self, write: &[u8], read: &mut [u8]) -> BusResult<usize> {
        Device::write_read(self, write, read)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BusError;
    use crate::mock::MockTransport;

    #[test]
    fn test_devices_share_bus() {
        let mock = MockTransport::new();
        let registry = BusRegistry::with_transport(mock.clone());
        let a = Device::new(&registry, 1u32, 0x20).unwrap();
        let b = Device::new(&registry, "/dev/i2c-1", 0x21).unwrap();

        assert_eq!(a.bus(), b.bus());
        assert_eq!(a.address(), 0x20);
        assert_eq!(b.address(), 0x21);
        assert_eq!(mock.opens("/dev/i2c-1"), 1);

        drop(a);
        drop(b);
        assert_eq!(mock.closes("/dev/i2c-1"), 0);
    }

    #[test]
    fn test_read_write() {
        let mock = MockTransport::new();
        let registry = BusRegistry::with_transport(mock.clone());
        let dev = Device::new(&registry, 1u32, 0x48).unwrap();

        assert_eq!(dev.write(&[0x10, 1, 2, 3]).unwrap(), 4);
        assert_eq!(mock.registers("/dev/i2c-1", 0x48, 0x10, 3), vec![1, 2, 3]);

        dev.write(&[0x10]).unwrap();
        assert_eq!(dev.read(3).unwrap(), vec![1, 2, 3]);

        let mut buf = [0u8; 2];
        assert_eq!(dev.write_read(&[0x11], &mut buf).unwrap(), 2);
        assert_eq!(buf, [2, 3]);
    }

    #[test]
    fn test_short_write_reported() {
        let mock = MockTransport::new();
        mock.limit_writes(Some(1));
        let registry = BusRegistry::with_transport(mock);
        let dev = Device::new(&registry, 1u32, 0x48).unwrap();
        assert_eq!(dev.write(&[0x00, 0xFF]).unwrap(), 1);
    }

    #[test]
    fn test_open_failure_is_surfaced() {
        let mock = MockTransport::new();
        mock.set_unavailable("/dev/i2c-9");
        let registry = BusRegistry::with_transport(mock);
        match Device::new(&registry, 9u32, 0x20) {
            Err(BusError::Open { .. }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
