// Copyright 2015, Paul Osborne <osbpau@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/license/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option.  This file may not be copied, modified, or distributed
// except according to those terms.

//! TI ADS1115 16-bit ADC, raw register access only
//!
//! https://www.ti.com/lit/ds/symlink/ads1115.pdf
//!
//! Registers are big endian.  Turning conversion codes into volts depends
//! on the gain programmed in the config register and is left to the caller.

use byteorder::BigEndian;
use log::warn;

use super::{read_word, write_word};
use crate::core::{BusResult, I2CDevice};

pub const SLAVE_ADDR_GND: u16 = 0x48;
pub const SLAVE_ADDR_VDD: u16 = 0x49;
pub const SLAVE_ADDR_SDA: u16 = 0x4A;
pub const SLAVE_ADDR_SCL: u16 = 0x4B;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    /// Last conversion result, read-only
    Conversion = 0x00,
    Config = 0x01,
    LoThresh = 0x02,
    HiThresh = 0x03,
}

pub struct Ads1115<D: I2CDevice> {
    i2cdev: D,
}

impl<D: I2CDevice> Ads1115<D> {
    pub fn new(i2cdev: D) -> Ads1115<D> {
        Ads1115 { i2cdev }
    }

    pub fn i2cdev(&self) -> &D {
        &self.i2cdev
    }

    pub fn into_inner(self) -> D {
        self.i2cdev
    }

    fn report<T>(&self, register: Register, result: BusResult<T>) -> Option<T> {
        result
            .map_err(|err| warn!("ads1115 0x{:02x} {:?}: {}", self.i2cdev.address(), register, err))
            .ok()
    }

    /// Register contents, or 0 if the read failed
    pub fn read_register(&mut self, register: Register) -> u16 {
        let result = read_word::<BigEndian, _>(&mut self.i2cdev, register as u8);
        self.report(register, result).unwrap_or(0)
    }

    pub fn write_register(&mut self, register: Register, value: u16) -> bool {
        let result = write_word::<BigEndian, _>(&mut self.i2cdev, register as u8, value);
        self.report(register, result).is_some()
    }

    /// Signed conversion code as the chip reports it
    pub fn read_conversion_raw(&mut self) -> i16 {
        self.read_register(Register::Conversion) as i16
    }

    pub fn read_config(&mut self) -> u16 {
        self.read_register(Register::Config)
    }

    pub fn write_config(&mut self, config: u16) -> bool {
        self.write_register(Register::Config, config)
    }
}
