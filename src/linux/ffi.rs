// Copyright 2015, Paul Osborne <osbpau@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/license/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option.  This file may not be copied, modified, or distributed
// except according to those terms.

#![allow(non_camel_case_types)]

use bitflags::bitflags;
use libc::{c_int, c_ulong};
use nix::errno::Errno;
use std::convert::TryFrom;
use std::os::unix::prelude::*;

use crate::core::Functionality;

bitflags! {
    /// Flags of one `i2c_msg` segment, from `linux/i2c.h`
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct I2CMsgFlags: u16 {
        /// read data, from slave to master
        const I2C_M_RD = 0x0001;
    }
}

/// One segment of an `I2C_RDWR` transaction, beginning with a (repeated)
/// START and ending with a STOP if it is the last segment
#[repr(C)]
pub struct i2c_msg {
    /// slave address
    addr: u16,
    /// serialized I2CMsgFlags
    flags: u16,
    /// msg length
    len: u16,
    /// pointer to msg data
    buf: *mut u8,
}

/// This is the structure as used in the I2C_RDWR ioctl call
#[repr(C)]
pub struct i2c_rdwr_ioctl_data {
    // struct i2c_msg __user *msgs;
    msgs: *mut i2c_msg,
    // __u32 nmsgs;
    nmsgs: u32,
}

// from include/uapi/linux/i2c-dev.h
const I2C_SLAVE: u16 = 0x0703;
const I2C_FUNCS: u16 = 0x0705;
const I2C_RDWR: u16 = 0x0707;

ioctl_write_int_bad!(ioctl_set_i2c_slave_address, I2C_SLAVE);
ioctl_read_bad!(ioctl_get_functionality, I2C_FUNCS, c_ulong);
ioctl_write_ptr_bad!(ioctl_i2c_rdwr, I2C_RDWR, i2c_rdwr_ioctl_data);

pub fn i2c_set_slave_address(fd: RawFd, slave_address: u16) -> Result<(), nix::Error> {
    unsafe { ioctl_set_i2c_slave_address(fd, c_int::from(slave_address)) }?;
    Ok(())
}

pub fn i2c_get_functionality(fd: RawFd) -> Result<Functionality, nix::Error> {
    let mut funcs: c_ulong = 0;
    unsafe { ioctl_get_functionality(fd, &mut funcs) }?;
    Ok(Functionality::from_bits_truncate(funcs as u32))
}

fn msg_len(len: usize) -> Result<u16, nix::Error> {
    u16::try_from(len).map_err(|_| Errno::EINVAL)
}

/// Write `write` then read into `read` with a repeated start in between
///
/// Returns the number of bytes read, or 0 if the kernel did not complete
/// both segments.
pub fn i2c_write_read(
    fd: RawFd,
    address: u16,
    write: &[u8],
    read: &mut [u8],
) -> Result<usize, nix::Error> {
    let mut msgs = [
        i2c_msg {
            addr: address,
            flags: I2CMsgFlags::empty().bits(),
            len: msg_len(write.len())?,
            // the kernel only reads from write segments
            buf: write.as_ptr() as *mut u8,
        },
        i2c_msg {
            addr: address,
            flags: I2CMsgFlags::I2C_M_RD.bits(),
            len: msg_len(read.len())?,
            buf: read.as_mut_ptr(),
        },
    ];
    let data = i2c_rdwr_ioctl_data {
        msgs: msgs.as_mut_ptr(),
        nmsgs: msgs.len() as u32,
    };
    let completed = unsafe { ioctl_i2c_rdwr(fd, &data) }?;
    if completed as usize == msgs.len() {
        Ok(read.len())
    } else {
        Ok(0)
    }
}
