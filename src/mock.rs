// Copyright 2015, Paul Osborne <osbpau@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/license/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option.  This file may not be copied, modified, or distributed
// except according to those terms.

//! In-memory buses for running drivers without hardware
//!
//! Every address on every mock bus answers with a 256-byte register map.
//! The first byte of a write sets the register pointer and the remaining
//! bytes are stored from there on; reads continue from the pointer.  All
//! channel activity is appended to an event log that tests can inspect.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use crate::core::{BusChannel, Transport};

/// Register file of one simulated device
pub struct I2CRegisterMap {
    registers: [u8; 0x100],
    offset: u8,
}

impl Default for I2CRegisterMap {
    fn default() -> I2CRegisterMap {
        I2CRegisterMap::new()
    }
}

impl I2CRegisterMap {
    pub fn new() -> I2CRegisterMap {
        I2CRegisterMap {
            registers: [0x00; 0x100],
            offset: 0,
        }
    }

    pub fn write_regs(&mut self, offset: u8, data: &[u8]) {
        for (i, &byte) in data.iter().enumerate() {
            self.registers[offset.wrapping_add(i as u8) as usize] = byte;
        }
    }

    pub fn read_regs(&self, offset: u8, len: usize) -> Vec<u8> {
        (0..len)
            .map(|i| self.registers[offset.wrapping_add(i as u8) as usize])
            .collect()
    }

    /// Read from the current pointer, advancing it
    pub fn read(&mut self, data: &mut [u8]) {
        for byte in data.iter_mut() {
            *byte = self.registers[self.offset as usize];
            self.offset = self.offset.wrapping_add(1);
        }
    }

    /// Write with the first byte taken as the register pointer
    pub fn write(&mut self, data: &[u8]) {
        if let Some((&offset, rest)) = data.split_first() {
            self.write_regs(offset, rest);
            self.offset = offset.wrapping_add(rest.len() as u8);
        }
    }
}

/// Something a mock channel did, in the order it happened
///
/// `address` on transfers is the address the simulated adapter actually
/// had selected when the bytes moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    Open { path: PathBuf },
    SelectAddress { path: PathBuf, address: u16, ok: bool },
    Read { path: PathBuf, address: Option<u16>, len: usize },
    Write { path: PathBuf, address: Option<u16>, data: Vec<u8> },
    WriteRead { path: PathBuf, address: u16, write: Vec<u8>, len: usize },
    Close { path: PathBuf },
}

#[derive(Default)]
struct MockState {
    unavailable: HashSet<PathBuf>,
    failing_addresses: HashSet<u16>,
    write_limit: Option<usize>,
    read_limit: Option<usize>,
    devices: HashMap<(PathBuf, u16), I2CRegisterMap>,
    events: Vec<MockEvent>,
}

impl MockState {
    fn device(&mut self, path: &Path, address: u16) -> &mut I2CRegisterMap {
        self.devices
            .entry((path.to_path_buf(), address))
            .or_insert_with(I2CRegisterMap::new)
    }
}

/// Transport handing out simulated buses
///
/// Clones share state, so a test can keep one clone for inspection after
/// passing another to a registry.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> MockTransport {
        MockTransport::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make opening `path` fail as if the device node were missing
    pub fn set_unavailable<P: AsRef<Path>>(&self, path: P) {
        self.state().unavailable.insert(path.as_ref().to_path_buf());
    }

    /// Make selecting `address` fail from now on
    pub fn fail_select(&self, address: u16) {
        self.state().failing_addresses.insert(address);
    }

    /// Cap the byte count of every write, simulating short transfers
    pub fn limit_writes(&self, limit: Option<usize>) {
        self.state().write_limit = limit;
    }

    /// Cap the byte count of every read, including the read half of a
    /// combined exchange
    pub fn limit_reads(&self, limit: Option<usize>) {
        self.state().read_limit = limit;
    }

    pub fn set_registers<P: AsRef<Path>>(&self, path: P, address: u16, offset: u8, data: &[u8]) {
        self.state()
            .device(path.as_ref(), address)
            .write_regs(offset, data);
    }

    pub fn registers<P: AsRef<Path>>(&self, path: P, address: u16, offset: u8, len: usize) -> Vec<u8> {
        self.state()
            .device(path.as_ref(), address)
            .read_regs(offset, len)
    }

    /// Snapshot of everything recorded so far
    pub fn events(&self) -> Vec<MockEvent> {
        self.state().events.clone()
    }

    pub fn opens<P: AsRef<Path>>(&self, path: P) -> usize {
        let path = path.as_ref();
        self.state()
            .events
            .iter()
            .filter(|e| matches!(e, MockEvent::Open { path: p } if p == path))
            .count()
    }

    pub fn closes<P: AsRef<Path>>(&self, path: P) -> usize {
        let path = path.as_ref();
        self.state()
            .events
            .iter()
            .filter(|e| matches!(e, MockEvent::Close { path: p } if p == path))
            .count()
    }
}

impl Transport for MockTransport {
    type Channel = MockChannel;

    fn open(&self, path: &Path) -> io::Result<MockChannel> {
        let mut state = self.state();
        if state.unavailable.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "no such i2c adapter",
            ));
        }
        state.events.push(MockEvent::Open {
            path: path.to_path_buf(),
        });
        Ok(MockChannel {
            path: path.to_path_buf(),
            selected: None,
            transport: self.clone(),
        })
    }
}

/// One simulated open bus
pub struct MockChannel {
    path: PathBuf,
    selected: Option<u16>,
    transport: MockTransport,
}

fn no_device() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "no slave address selected")
}

impl BusChannel for MockChannel {
    fn select_address(&mut self, address: u16) -> io::Result<()> {
        let ok = !self.transport.state().failing_addresses.contains(&address);
        self.transport.state().events.push(MockEvent::SelectAddress {
            path: self.path.clone(),
            address,
            ok,
        });
        if !ok {
            return Err(io::Error::new(io::ErrorKind::Other, "device busy"));
        }
        // widen the window in which an unserialized caller could swap
        // the address out from under us
        thread::yield_now();
        self.selected = Some(address);
        Ok(())
    }

    fn read(&mut self, data: &mut [u8]) -> io::Result<usize> {
        let address = self.selected.ok_or_else(no_device)?;
        let mut state = self.transport.state();
        let count = state.read_limit.map_or(data.len(), |limit| limit.min(data.len()));
        state.device(&self.path, address).read(&mut data[..count]);
        state.events.push(MockEvent::Read {
            path: self.path.clone(),
            address: Some(address),
            len: count,
        });
        Ok(count)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let address = self.selected.ok_or_else(no_device)?;
        let mut state = self.transport.state();
        let count = state.write_limit.map_or(data.len(), |limit| limit.min(data.len()));
        state.device(&self.path, address).write(&data[..count]);
        state.events.push(MockEvent::Write {
            path: self.path.clone(),
            address: Some(address),
            data: data[..count].to_vec(),
        });
        Ok(count)
    }

    fn write_read(&mut self, address: u16, write: &[u8], read: &mut [u8]) -> io::Result<usize> {
        let mut state = self.transport.state();
        let count = state.read_limit.map_or(read.len(), |limit| limit.min(read.len()));
        let device = state.device(&self.path, address);
        device.write(write);
        device.read(&mut read[..count]);
        state.events.push(MockEvent::WriteRead {
            path: self.path.clone(),
            address,
            write: write.to_vec(),
            len: count,
        });
        Ok(count)
    }
}

impl Drop for MockChannel {
    fn drop(&mut self) {
        self.transport.state().events.push(MockEvent::Close {
            path: self.path.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_map_pointer() {
        let mut regmap = I2CRegisterMap::new();
        regmap.write(&[0x02, 0xAA, 0xBB]);
        assert_eq!(regmap.read_regs(0x02, 2), vec![0xAA, 0xBB]);

        let mut buf = [0u8; 2];
        regmap.write(&[0x02]);
        regmap.read(&mut buf);
        assert_eq!(buf, [0xAA, 0xBB]);
    }

    #[test]
    fn test_register_map_wraps() {
        let mut regmap = I2CRegisterMap::new();
        regmap.write(&[0xFF, 0x01, 0x02]);
        assert_eq!(regmap.read_regs(0xFF, 2), vec![0x01, 0x02]);
        assert_eq!(regmap.read_regs(0x00, 1), vec![0x02]);
    }

    #[test]
    fn test_channel_requires_selection() {
        let mock = MockTransport::new();
        let mut channel = mock.open(Path::new("/dev/i2c-1")).unwrap();
        assert!(channel.write(&[0x00]).is_err());
        channel.select_address(0x20).unwrap();
        assert_eq!(channel.write(&[0x00, 0x01]).unwrap(), 2);
    }

    #[test]
    fn test_write_limit() {
        let mock = MockTransport::new();
        mock.limit_writes(Some(2));
        let mut channel = mock.open(Path::new("/dev/i2c-1")).unwrap();
        channel.select_address(0x20).unwrap();
        assert_eq!(channel.write(&[0x02, 0x01, 0x02]).unwrap(), 2);
        assert_eq!(mock.registers("/dev/i2c-1", 0x20, 0x02, 2), vec![0x01, 0x00]);
    }

    #[test]
    fn test_read_limit() {
        let mock = MockTransport::new();
        mock.set_registers("/dev/i2c-1", 0x20, 0x04, &[0x12, 0x34]);
        mock.limit_reads(Some(1));
        let mut channel = mock.open(Path::new("/dev/i2c-1")).unwrap();

        let mut buf = [0u8; 2];
        assert_eq!(channel.write_read(0x20, &[0x04], &mut buf).unwrap(), 1);
        assert_eq!(buf, [0x12, 0x00]);

        channel.select_address(0x20).unwrap();
        channel.write(&[0x04]).unwrap();
        let mut buf = [0u8; 2];
        assert_eq!(channel.read(&mut buf).unwrap(), 1);
        assert_eq!(buf, [0x12, 0x00]);
    }
}
