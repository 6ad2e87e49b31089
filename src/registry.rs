// Copyright 2015, Paul Osborne <osbpau@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/license/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option.  This file may not be copied, modified, or distributed
// except according to those terms.

//! Process-wide ownership of bus channels
//!
//! A `BusRegistry` opens each bus at most once and keeps it open until the
//! registry itself is dropped.  Every bus gets its own lock; the lock
//! guards both the channel and the address most recently selected on it,
//! so the cached address can never disagree with what was last sent to
//! the adapter.

use log::{debug, trace, warn};
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::core::{BusChannel, BusError, BusResult, Functionality, Transport};

/// Prefix of the device node for a numbered bus
pub const DEFAULT_BUS_PREFIX: &str = "/dev/i2c-";

/// Identifies a bus either by adapter number or by device path
///
/// `BusName::Index(1)` and `BusName::Path("/dev/i2c-1")` name the same
/// bus and open the same handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BusName {
    Index(u32),
    Path(PathBuf),
}

impl BusName {
    /// The device path this identifier refers to
    pub fn to_path(&self) -> PathBuf {
        match *self {
            BusName::Index(index) => PathBuf::from(format!("{}{}", DEFAULT_BUS_PREFIX, index)),
            BusName::Path(ref path) => path.clone(),
        }
    }
}

impl fmt::Display for BusName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            BusName::Index(index) => write!(f, "{}", index),
            BusName::Path(ref path) => write!(f, "{}", path.display()),
        }
    }
}

impl From<u32> for BusName {
    fn from(index: u32) -> BusName {
        BusName::Index(index)
    }
}

impl<'a> From<&'a str> for BusName {
    fn from(path: &'a str) -> BusName {
        BusName::Path(PathBuf::from(path))
    }
}

impl From<String> for BusName {
    fn from(path: String) -> BusName {
        BusName::Path(PathBuf::from(path))
    }
}

impl<'a> From<&'a Path> for BusName {
    fn from(path: &'a Path) -> BusName {
        BusName::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for BusName {
    fn from(path: PathBuf) -> BusName {
        BusName::Path(path)
    }
}

/// Digits parse as an adapter number, anything else as a path
impl FromStr for BusName {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<BusName, Infallible> {
        Ok(match s.parse::<u32>() {
            Ok(index) => BusName::Index(index),
            Err(_) => BusName::from(s),
        })
    }
}

/// Reference to a bus opened by a `BusRegistry`
///
/// Handles are plain indices into the registry that issued them and stay
/// valid for that registry's whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BusHandle(usize);

impl BusHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One byte transfer against a selected device
#[derive(Debug)]
pub enum Transfer<'a> {
    /// Fill the buffer from the device
    Read(&'a mut [u8]),
    /// Send the buffer to the device
    Write(&'a [u8]),
    /// Send `write`, then fill `read`, as a single exchange
    WriteRead { write: &'a [u8], read: &'a mut [u8] },
}

impl<'a> Transfer<'a> {
    fn len(&self) -> usize {
        match *self {
            Transfer::Read(ref buf) => buf.len(),
            Transfer::Write(buf) => buf.len(),
            Transfer::WriteRead { ref read, .. } => read.len(),
        }
    }
}

/// Channel plus the address last successfully selected on it
///
/// `None` means the address on the adapter is unknown and must be
/// selected again before the next transfer.
struct BusState<C> {
    channel: C,
    selected: Option<u16>,
}

struct BusEntry<C> {
    path: PathBuf,
    state: Mutex<BusState<C>>,
}

struct Buses<C> {
    handles: HashMap<PathBuf, BusHandle>,
    entries: Vec<Arc<BusEntry<C>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<C: BusChannel> BusState<C> {
    /// Point the adapter at `address` unless it is already there
    ///
    /// A failed selection clears the cache but is not fatal: the transfer
    /// still goes ahead against whatever the adapter has configured.
    fn select(&mut self, path: &Path, address: u16) {
        if self.selected == Some(address) {
            return;
        }
        match self.channel.select_address(address) {
            Ok(()) => {
                trace!("{}: selected address 0x{:02x}", path.display(), address);
                self.selected = Some(address);
            }
            Err(source) => {
                self.selected = None;
                let err = BusError::AddressSelection {
                    path: path.to_path_buf(),
                    address,
                    source,
                };
                warn!("{}", err);
            }
        }
    }
}

/// Owner of every bus channel in the process
///
/// Create one registry, share it by reference with the devices that need
/// it, and drop it at shutdown to close every bus it opened.  Buses are
/// opened lazily on the first `open` for their identifier and never
/// closed earlier.
pub struct BusRegistry<T: Transport> {
    transport: T,
    buses: Mutex<Buses<T::Channel>>,
}

impl<T: Transport> BusRegistry<T> {
    /// Create an empty registry that opens buses through `transport`
    pub fn with_transport(transport: T) -> BusRegistry<T> {
        BusRegistry {
            transport,
            buses: Mutex::new(Buses {
                handles: HashMap::new(),
                entries: Vec::new(),
            }),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Open the named bus, or return the handle it was already opened as
    ///
    /// The registry lock is held across the platform open so that racing
    /// callers asking for the same bus all receive one handle.
    pub fn open<N: Into<BusName>>(&self, name: N) -> BusResult<BusHandle> {
        let name = name.into();
        let path = self.transport.resolve(&name);
        let mut buses = lock(&self.buses);
        if let Some(&handle) = buses.handles.get(&path) {
            return Ok(handle);
        }

        let channel = self.transport.open(&path).map_err(|source| BusError::Open {
            path: path.clone(),
            source,
        })?;
        let handle = BusHandle(buses.entries.len());
        debug!("opened i2c bus {} as handle {}", path.display(), handle.0);
        buses.entries.push(Arc::new(BusEntry {
            path: path.clone(),
            state: Mutex::new(BusState {
                channel,
                selected: None,
            }),
        }));
        buses.handles.insert(path, handle);
        Ok(handle)
    }

    /// Path the bus behind `handle` was opened from
    pub fn path(&self, handle: BusHandle) -> BusResult<PathBuf> {
        Ok(self.entry(handle)?.path.clone())
    }

    /// Number of buses currently open
    pub fn len(&self) -> usize {
        lock(&self.buses).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, handle: BusHandle) -> BusResult<Arc<BusEntry<T::Channel>>> {
        lock(&self.buses)
            .entries
            .get(handle.0)
            .cloned()
            .ok_or(BusError::UnknownHandle(handle.0))
    }

    /// Perform one transfer with the device at `address`
    ///
    /// The bus lock is held from address selection through the end of the
    /// transfer, so callers on other threads can neither change the
    /// selected address nor interleave bytes.  Returns the count reported
    /// by the platform; short transfers are not retried.
    pub fn transfer(&self, handle: BusHandle, address: u16, transfer: Transfer<'_>) -> BusResult<usize> {
        let entry = self.entry(handle)?;
        let mut state = lock(&entry.state);
        state.select(&entry.path, address);

        let requested = transfer.len();
        let result = match transfer {
            Transfer::Read(buf) => state.channel.read(buf),
            Transfer::Write(buf) => state.channel.write(buf),
            Transfer::WriteRead { write, read } => state.channel.write_read(address, write, read),
        };
        let count = result.map_err(|source| BusError::Transfer {
            path: entry.path.clone(),
            source,
        })?;
        trace!(
            "{}: 0x{:02x} transferred {}/{} bytes",
            entry.path.display(),
            address,
            count,
            requested
        );
        Ok(count)
    }

    pub fn read(&self, handle: BusHandle, address: u16, data: &mut [u8]) -> BusResult<usize> {
        self.transfer(handle, address, Transfer::Read(data))
    }

    pub fn write(&self, handle: BusHandle, address: u16, data: &[u8]) -> BusResult<usize> {
        self.transfer(handle, address, Transfer::Write(data))
    }

    pub fn write_read(
        &self,
        handle: BusHandle,
        address: u16,
        write: &[u8],
        read: &mut [u8],
    ) -> BusResult<usize> {
        self.transfer(handle, address, Transfer::WriteRead { write, read })
    }

    /// Ask the adapter behind `handle` what it supports
    pub fn functionality(&self, handle: BusHandle) -> BusResult<Functionality> {
        let entry = self.entry(handle)?;
        let mut state = lock(&entry.state);
        state
            .channel
            .functionality()
            .map_err(|source| BusError::Transfer {
                path: entry.path.clone(),
                source,
            })
    }
}

impl<T: Transport> Drop for BusRegistry<T> {
    fn drop(&mut self) {
        let buses = match self.buses.get_mut() {
            Ok(buses) => buses,
            Err(poisoned) => poisoned.into_inner(),
        };
        buses.handles.clear();
        for entry in buses.entries.drain(..) {
            debug!("closing i2c bus {}", entry.path.display());
        }
    }
}
