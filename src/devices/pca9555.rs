// Copyright 2015, Paul Osborne <osbpau@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/license/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option.  This file may not be copied, modified, or distributed
// except according to those terms.

//! NXP PCA9555 16-bit I/O expander
//!
//! https://www.nxp.com/docs/en/data-sheet/PCA9555.pdf
//!
//! Every register is 16 bits wide, one bit per pin, sent low byte (port 0)
//! first.  Pin operations are read-modify-write and are not atomic: if two
//! threads modify the same register of the same chip concurrently, one of
//! the updates can be lost.  Callers sharing a chip across threads must
//! serialize register updates themselves.

use byteorder::LittleEndian;
use log::warn;

use super::{read_word, write_word};
use crate::core::{BusResult, I2CDevice};

/// Address with A2..A0 tied low; the chip answers on 0x20 to 0x27
pub const SLAVE_ADDR_BASE: u16 = 0x20;

/// Number of I/O pins
pub const PINS: u8 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    Input = 0x00,
    Output = 0x02,
    PolarityInversion = 0x04,
    /// A set bit makes the pin an input
    Configuration = 0x06,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinDirection {
    Input,
    Output,
}

impl PinDirection {
    /// Configuration register value putting all pins in this direction
    pub fn config(self) -> u16 {
        match self {
            PinDirection::Input => 0xFFFF,
            PinDirection::Output => 0x0000,
        }
    }
}

fn check_pin(pin: u8) {
    assert!(pin < PINS, "pin {} out of range 0..{}", pin, PINS);
}

/// Mask covering bits `start_pin..end_pin`
fn range_mask(start_pin: u8, end_pin: u8) -> u16 {
    let width = u32::from(end_pin.saturating_sub(start_pin));
    (((1u32 << width) - 1) << start_pin) as u16
}

macro_rules! port_accessors {
    ($reg:ident, $read:ident, $read_pin:ident) => {
        pub fn $read(&mut self) -> u16 {
            self.read_register(Register::$reg)
        }

        pub fn $read_pin(&mut self, pin: u8) -> bool {
            self.read_register_pin(Register::$reg, pin)
        }
    };
    ($reg:ident, $read:ident, $read_pin:ident,
     $write:ident, $write_pin:ident, $write_range:ident, $flip:ident) => {
        port_accessors!($reg, $read, $read_pin);

        pub fn $write(&mut self, value: u16) -> bool {
            self.write_register(Register::$reg, value)
        }

        pub fn $write_pin(&mut self, pin: u8, value: bool) -> bool {
            self.write_register_pin(Register::$reg, pin, value)
        }

        pub fn $write_range(&mut self, start_pin: u8, end_pin: u8, values: u16) -> bool {
            self.write_register_range(Register::$reg, start_pin, end_pin, values)
        }

        pub fn $flip(&mut self, pin: u8) -> bool {
            self.flip_register_pin(Register::$reg, pin)
        }
    };
}

/// Driver for one PCA9555
///
/// Register reads report 0 and writes report `false` when the bus
/// transfer fails or comes up short; details are logged.
pub struct Pca9555<D: I2CDevice> {
    i2cdev: D,
    state: u16,
}

impl<D: I2CDevice> Pca9555<D> {
    /// Wrap a device without touching the chip
    pub fn new(i2cdev: D) -> Pca9555<D> {
        Pca9555 { i2cdev, state: 0 }
    }

    /// Wrap a device and put every pin in `direction`
    pub fn with_direction(i2cdev: D, direction: PinDirection) -> BusResult<Pca9555<D>> {
        Pca9555::with_config(i2cdev, direction.config())
    }

    /// Wrap a device and write `config` to the configuration register
    pub fn with_config(i2cdev: D, config: u16) -> BusResult<Pca9555<D>> {
        let mut expander = Pca9555::new(i2cdev);
        write_word::<LittleEndian, _>(&mut expander.i2cdev, Register::Configuration as u8, config)?;
        Ok(expander)
    }

    /// Value last stored with `set_state`
    ///
    /// The driver never reads or changes this itself; callers may use it
    /// to remember pin state between calls.
    pub fn state(&self) -> u16 {
        self.state
    }

    pub fn set_state(&mut self, state: u16) {
        self.state = state;
    }

    pub fn i2cdev(&self) -> &D {
        &self.i2cdev
    }

    pub fn into_inner(self) -> D {
        self.i2cdev
    }

    fn fetch(&mut self, register: Register) -> BusResult<u16> {
        read_word::<LittleEndian, _>(&mut self.i2cdev, register as u8)
    }

    fn store(&mut self, register: Register, value: u16) -> BusResult<()> {
        write_word::<LittleEndian, _>(&mut self.i2cdev, register as u8, value)
    }

    fn report<T>(&self, register: Register, result: BusResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(
                    "pca9555 0x{:02x} {:?}: {}",
                    self.i2cdev.address(),
                    register,
                    err
                );
                None
            }
        }
    }

    /// Read, transform and write back a register
    ///
    /// A failed read aborts without writing.
    fn modify<F: FnOnce(u16) -> u16>(&mut self, register: Register, f: F) -> bool {
        let result = self.fetch(register);
        let old = match self.report(register, result) {
            Some(old) => old,
            None => return false,
        };
        let result = self.store(register, f(old));
        self.report(register, result).is_some()
    }

    pub fn read_register(&mut self, register: Register) -> u16 {
        let result = self.fetch(register);
        self.report(register, result).unwrap_or(0)
    }

    /// Panics if `pin` is not below 16
    pub fn read_register_pin(&mut self, register: Register, pin: u8) -> bool {
        check_pin(pin);
        (self.read_register(register) >> pin) & 1 != 0
    }

    /// True only if all three bytes were written
    pub fn write_register(&mut self, register: Register, value: u16) -> bool {
        let result = self.store(register, value);
        self.report(register, result).is_some()
    }

    /// Panics if `pin` is not below 16
    pub fn write_register_pin(&mut self, register: Register, pin: u8, value: bool) -> bool {
        check_pin(pin);
        let bit = 1u16 << pin;
        self.modify(register, |old| if value { old | bit } else { old & !bit })
    }

    /// Copy the low bits of `values` into pins `start_pin..end_pin`
    ///
    /// An empty range still reads and rewrites the register unchanged.
    /// Panics if either bound is above 16.
    pub fn write_register_range(
        &mut self,
        register: Register,
        start_pin: u8,
        end_pin: u8,
        values: u16,
    ) -> bool {
        assert!(
            start_pin <= PINS && end_pin <= PINS,
            "pin range {}..{} out of range 0..{}",
            start_pin,
            end_pin,
            PINS
        );
        let mask = range_mask(start_pin, end_pin);
        let shifted = (u32::from(values) << start_pin) as u16;
        self.modify(register, |old| (old & !mask) | (shifted & mask))
    }

    /// Panics if `pin` is not below 16
    pub fn flip_register_pin(&mut self, register: Register, pin: u8) -> bool {
        check_pin(pin);
        self.modify(register, |old| old ^ (1u16 << pin))
    }

    port_accessors!(Input, read_input, read_input_pin);
    port_accessors!(Output, read_output, read_output_pin,
                    write_output, write_output_pin, write_output_range, flip_output_pin);
    port_accessors!(PolarityInversion, read_polarity, read_polarity_pin,
                    write_polarity, write_polarity_pin, write_polarity_range, flip_polarity_pin);
    port_accessors!(Configuration, read_config, read_config_pin,
                    write_config, write_config_pin, write_config_range, flip_config_pin);
}
