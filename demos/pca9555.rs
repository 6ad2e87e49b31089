// Copyright 2015, Paul Osborne <osbpau@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/license/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option.  This file may not be copied, modified, or distributed
// except according to those terms.

// Dumps the registers of a PCA9555 and optionally toggles one output pin.

extern crate docopt;
extern crate i2cshare;

use docopt::Docopt;
use std::env::args;

#[cfg(any(target_os = "linux", target_os = "android"))]
use i2cshare::devices::pca9555::{Pca9555, Register};
#[cfg(any(target_os = "linux", target_os = "android"))]
use i2cshare::{BusName, Device, LinuxBusRegistry};

const USAGE: &str = "
Reads registers from a PCA9555 I/O expander via Linux i2cdev.

Usage:
  pca9555 <bus> [--address=<addr>] [--toggle=<pin>]
  pca9555 (-h | --help)
  pca9555 --version

Options:
  -h --help          Show this help text.
  --address=<addr>   Slave address in hex [default: 20].
  --toggle=<pin>     Flip output pin 0-15 (the pin must be configured as output).
  --version          Show version.
";

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn main() {}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn main() {
    let args = Docopt::new(USAGE)
        .and_then(|d| d.argv(args()).parse())
        .unwrap_or_else(|e| e.exit());

    let bus: BusName = match args.get_str("<bus>").parse() {
        Ok(bus) => bus,
        Err(never) => match never {},
    };
    let address_arg = args.get_str("--address");
    let address = match u16::from_str_radix(address_arg.trim_start_matches("0x"), 16) {
        Ok(address) => address,
        Err(_) => {
            println!("Invalid address: {}", address_arg);
            return;
        }
    };

    let registry = LinuxBusRegistry::new();
    let dev = match Device::new(&registry, bus.clone(), address) {
        Ok(dev) => dev,
        Err(e) => {
            println!("Error opening I2C bus {}: {}", bus, e);
            return;
        }
    };
    match registry.functionality(dev.bus()) {
        Ok(funcs) => println!("Adapter functionality: {:?}", funcs),
        Err(e) => println!("Unable to query functionality: {}", e),
    }

    let mut expander = Pca9555::new(dev);
    for &register in &[
        Register::Input,
        Register::Output,
        Register::PolarityInversion,
        Register::Configuration,
    ] {
        println!("{:?}: {:#06x}", register, expander.read_register(register));
    }

    let toggle = args.get_str("--toggle");
    if !toggle.is_empty() {
        let pin: u8 = match toggle.parse() {
            Ok(pin) if pin < 16 => pin,
            _ => {
                println!("Invalid pin: {}", toggle);
                return;
            }
        };
        if expander.flip_output_pin(pin) {
            println!("Output pin {} now {}", pin, expander.read_output_pin(pin));
        } else {
            println!("Failed to toggle output pin {}", pin);
        }
    }
}
