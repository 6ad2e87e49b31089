// Copyright 2015, Paul Osborne <osbpau@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/license/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option.  This file may not be copied, modified, or distributed
// except according to those terms.

//! Drivers for chips with 16-bit registers behind a one-byte pointer

use byteorder::ByteOrder;

use crate::core::{BusError, BusResult, I2CDevice};

pub mod ads1115;
pub mod pca9555;

pub use self::ads1115::Ads1115;
pub use self::pca9555::Pca9555;

fn expect_count(expected: usize, actual: usize) -> BusResult<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(BusError::ShortTransfer { expected, actual })
    }
}

/// Send the register pointer and read the two value bytes back in one
/// exchange
fn read_word<B: ByteOrder, D: I2CDevice>(i2cdev: &mut D, register: u8) -> BusResult<u16> {
    let mut buf = [0u8; 2];
    let count = i2cdev.write_read(&[register], &mut buf)?;
    expect_count(buf.len(), count)?;
    Ok(B::read_u16(&buf))
}

/// Send the register pointer followed by the two value bytes
fn write_word<B: ByteOrder, D: I2CDevice>(i2cdev: &mut D, register: u8, value: u16) -> BusResult<()> {
    let mut buf = [register, 0, 0];
    B::write_u16(&mut buf[1..], value);
    let count = i2cdev.write(&buf)?;
    expect_count(buf.len(), count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Device;
    use crate::mock::MockTransport;
    use crate::registry::BusRegistry;
    use byteorder::{BigEndian, LittleEndian};

    #[test]
    fn test_word_byte_order() {
        let mock = MockTransport::new();
        let registry = BusRegistry::with_transport(mock.clone());
        let mut dev = Device::new(&registry, 1u32, 0x20).unwrap();

        write_word::<LittleEndian, _>(&mut dev, 0x02, 0x1234).unwrap();
        assert_eq!(mock.registers("/dev/i2c-1", 0x20, 0x02, 2), vec![0x34, 0x12]);
        write_word::<BigEndian, _>(&mut dev, 0x04, 0x1234).unwrap();
        assert_eq!(mock.registers("/dev/i2c-1", 0x20, 0x04, 2), vec![0x12, 0x34]);

        assert_eq!(read_word::<LittleEndian, _>(&mut dev, 0x02).unwrap(), 0x1234);
        assert_eq!(read_word::<BigEndian, _>(&mut dev, 0x04).unwrap(), 0x1234);
    }

    #[test]
    fn test_short_write_is_an_error() {
        let mock = MockTransport::new();
        mock.limit_writes(Some(2));
        let registry = BusRegistry::with_transport(mock);
        let mut dev = Device::new(&registry, 1u32, 0x20).unwrap();

        match write_word::<LittleEndian, _>(&mut dev, 0x02, 0xFFFF) {
            Err(BusError::ShortTransfer { expected: 3, actual: 2 }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
