// Copyright 2015, Paul Osborne <osbpau@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/license/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option.  This file may not be copied, modified, or distributed
// except according to those terms.

//! Buses backed by the Linux i2c-dev interface
//!
//! See https://www.kernel.org/doc/Documentation/i2c/dev-interface

mod ffi;

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::prelude::*;
use std::path::{Path, PathBuf};

use crate::core::{BusChannel, Functionality, Transport};
use crate::registry::{BusName, BusRegistry};

/// Opens `/dev/i2c-N` device files
#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxTransport;

/// Registry over the host's i2c adapters
pub type LinuxBusRegistry = BusRegistry<LinuxTransport>;

impl BusRegistry<LinuxTransport> {
    pub fn new() -> LinuxBusRegistry {
        BusRegistry::with_transport(LinuxTransport)
    }
}

impl Default for BusRegistry<LinuxTransport> {
    fn default() -> LinuxBusRegistry {
        BusRegistry::new()
    }
}

impl Transport for LinuxTransport {
    type Channel = LinuxBusChannel;

    fn open(&self, path: &Path) -> io::Result<LinuxBusChannel> {
        let devfile = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(LinuxBusChannel { devfile })
    }

    /// Follows symlinks so that aliases of one adapter share a handle
    fn resolve(&self, name: &BusName) -> PathBuf {
        let path = name.to_path();
        fs::canonicalize(&path).unwrap_or(path)
    }
}

/// An open i2c-dev file; closed when dropped
pub struct LinuxBusChannel {
    devfile: File,
}

impl AsRawFd for LinuxBusChannel {
    fn as_raw_fd(&self) -> RawFd {
        self.devfile.as_raw_fd()
    }
}

impl BusChannel for LinuxBusChannel {
    fn select_address(&mut self, address: u16) -> io::Result<()> {
        ffi::i2c_set_slave_address(self.as_raw_fd(), address)?;
        Ok(())
    }

    fn read(&mut self, data: &mut [u8]) -> io::Result<usize> {
        self.devfile.read(data)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.devfile.write(data)
    }

    fn write_read(&mut self, address: u16, write: &[u8], read: &mut [u8]) -> io::Result<usize> {
        Ok(ffi::i2c_write_read(self.as_raw_fd(), address, write, read)?)
    }

    fn functionality(&mut self) -> io::Result<Functionality> {
        Ok(ffi::i2c_get_functionality(self.as_raw_fd())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_adapter() {
        let registry = LinuxBusRegistry::new();
        assert!(registry.open("/nonexistent/i2c-bus").is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_resolve_falls_back_to_literal_path() {
        let name = BusName::from("/nonexistent/i2c-0");
        assert_eq!(LinuxTransport.resolve(&name), PathBuf::from("/nonexistent/i2c-0"));
    }
}
