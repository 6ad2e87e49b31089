// Copyright 2015, Paul Osborne <osbpau@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/license/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option.  This file may not be copied, modified, or distributed
// except according to those terms.

//! # i2cshare
//!
//! The `i2cshare` crate lets many device drivers share the i2c buses of a
//! Linux host.  A single `BusRegistry` opens each bus once, serializes
//! access to it and remembers which slave address is selected, so drivers
//! only deal in byte buffers addressed to their own device:
//!
//! ```no_run
//! # #[cfg(any(target_os = "linux", target_os = "android"))]
//! # fn main() -> Result<(), i2cshare::BusError> {
//! use i2cshare::devices::pca9555::{Pca9555, PinDirection};
//! use i2cshare::{Device, LinuxBusRegistry};
//!
//! let registry = LinuxBusRegistry::new();
//! let dev = Device::new(&registry, 1u32, 0x20)?;
//! let mut expander = Pca9555::with_direction(dev, PinDirection::Output)?;
//! expander.write_output_pin(3, true);
//! # Ok(())
//! # }
//! # #[cfg(not(any(target_os = "linux", target_os = "android")))]
//! # fn main() {}
//! ```
//!
//! The kernel interface is described at
//! https://www.kernel.org/doc/Documentation/i2c/dev-interface

#[cfg(any(target_os = "linux", target_os = "android"))]
#[macro_use]
extern crate nix;

pub mod core;
pub mod devices;
pub mod mock;

mod device;
mod registry;

#[cfg(any(target_os = "linux", target_os = "android"))]
pub mod linux;

pub use crate::core::{BusChannel, BusError, BusResult, Functionality, I2CDevice, Transport};
pub use crate::device::Device;
pub use crate::registry::{BusHandle, BusName, BusRegistry, Transfer, DEFAULT_BUS_PREFIX};

#[cfg(any(target_os = "linux", target_os = "android"))]
pub use crate::linux::{LinuxBusChannel, LinuxBusRegistry, LinuxTransport};
