// Copyright 2015, Paul Osborne <osbpau@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/license/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option.  This file may not be copied, modified, or distributed
// except according to those terms.

use bitflags::bitflags;
use std::io;
use std::path::{Path, PathBuf};

use crate::registry::BusName;

/// Error that occured while opening a bus or performing an I2C operation
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// The bus device could not be opened (missing device, permissions)
    #[error("unable to open i2c bus {}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },

    /// Selecting the slave address on an open bus failed
    ///
    /// This is never returned from a transfer; the executor logs it and
    /// retries the selection on the next access.
    #[error("unable to select address 0x{address:02x} on {}: {source}", .path.display())]
    AddressSelection {
        path: PathBuf,
        address: u16,
        source: io::Error,
    },

    /// Fewer bytes were transferred than the caller asked for
    #[error("short transfer: {actual} of {expected} bytes")]
    ShortTransfer { expected: usize, actual: usize },

    /// The underlying read or write failed
    #[error("i2c transfer on {} failed: {source}", .path.display())]
    Transfer { path: PathBuf, source: io::Error },

    /// The handle was not issued by this registry
    #[error("unknown bus handle {0}")]
    UnknownHandle(usize),
}

/// Result of an I2C Operation
pub type BusResult<T> = Result<T, BusError>;

bitflags! {
    /// Capabilities reported by a bus adapter
    ///
    /// Mirrors the `I2C_FUNC_*` values from `linux/i2c.h`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Functionality: u32 {
        const I2C = 0x0000_0001;
        const TENBIT_ADDR = 0x0000_0002;
        /// I2C_M_IGNORE_NAK etc.
        const PROTOCOL_MANGLING = 0x0000_0004;
        const SMBUS_PEC = 0x0000_0008;
        /// I2C_M_NOSTART
        const NOSTART = 0x0000_0010;
        const SLAVE = 0x0000_0020;
        /// SMBus 2.0
        const SMBUS_BLOCK_PROC_CALL = 0x0000_8000;
        const SMBUS_QUICK = 0x0001_0000;
        const SMBUS_READ_BYTE = 0x0002_0000;
        const SMBUS_WRITE_BYTE = 0x0004_0000;
        const SMBUS_READ_BYTE_DATA = 0x0008_0000;
        const SMBUS_WRITE_BYTE_DATA = 0x0010_0000;
        const SMBUS_READ_WORD_DATA = 0x0020_0000;
        const SMBUS_WRITE_WORD_DATA = 0x0040_0000;
        const SMBUS_PROC_CALL = 0x0080_0000;
        const SMBUS_READ_BLOCK_DATA = 0x0100_0000;
        const SMBUS_WRITE_BLOCK_DATA = 0x0200_0000;
        /// I2C-like block xfer
        const SMBUS_READ_I2C_BLOCK = 0x0400_0000;
        /// w/ 1-byte reg. addr.
        const SMBUS_WRITE_I2C_BLOCK = 0x0800_0000;
    }
}

/// An open connection to one physical bus
///
/// Implementations wrap whatever the platform hands out for a bus
/// (a file descriptor on Linux).  The registry owns every channel and
/// serializes access to it, so methods take `&mut self` and need not be
/// reentrant.  Dropping the channel closes it.
pub trait BusChannel: Send {
    /// Make `address` the target of subsequent `read`/`write` calls
    fn select_address(&mut self, address: u16) -> io::Result<()>;

    /// Read from the currently selected device, returning the byte count
    fn read(&mut self, data: &mut [u8]) -> io::Result<usize>;

    /// Write to the currently selected device, returning the byte count
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Write `write` to `address` and read back into `read` as one exchange
    ///
    /// Returns the number of bytes read.  The write and the read must go out
    /// as one transaction with a repeated start, with no stop in between.
    fn write_read(&mut self, address: u16, write: &[u8], read: &mut [u8]) -> io::Result<usize>;

    /// Query what the adapter behind this channel can do
    fn functionality(&mut self) -> io::Result<Functionality> {
        Ok(Functionality::I2C)
    }
}

/// Source of bus channels
///
/// This is the seam between the registry and the operating system.
pub trait Transport {
    type Channel: BusChannel;

    /// Open the bus device at `path`
    fn open(&self, path: &Path) -> io::Result<Self::Channel>;

    /// Map a bus identifier onto the key used for deduplication
    ///
    /// Two identifiers naming the same adapter must resolve to the same
    /// path.
    fn resolve(&self, name: &BusName) -> PathBuf {
        name.to_path()
    }
}

/// Interface to an I2C Slave Device from an I2C Master
///
/// Drivers hold something implementing this trait rather than talking to
/// the registry directly.  Counts are returned as reported by the bus;
/// checking them against the requested length is left to the driver.
pub trait I2CDevice {
    /// The 7-bit (or 10-bit) slave address of the device
    fn address(&self) -> u16;

    /// Read data from the device to fill the provided slice
    fn read(&mut self, data: &mut [u8]) -> BusResult<usize>;

    /// Write the provided buffer to the device
    fn write(&mut self, data: &[u8]) -> BusResult<usize>;

    /// Write `write`, then read into `read`, without releasing the bus
    fn write_read(&mut self, write: &[u8], read: &mut [u8]) -> BusResult<usize>;
}
