//! Linux I2C device implementation
//!
//! This module provides the `LinuxI2c` struct that implements the
//! `I2cMaster` trait using Linux's i2c-dev interface.

use crate::error::{LinuxI2cError, Result};

use seprov_core::error::{Error as CoreError, Result as CoreResult};
use seprov_core::transport::{take_prefixed, BusFeatures, I2cMaster, MAX_RESPONSE_LEN};

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::unix::io::AsRawFd;

/// Default controller device path
pub const DEFAULT_DEVICE: &str = "/dev/i2c-1";

/// Default 7-bit target address of the secure element
pub const DEFAULT_ADDRESS: u16 = 0x48;

/// Linux i2c-dev ioctl constants
mod ioctl {
    // i2c-dev request numbers are plain legacy constants, not _IO-encoded,
    // so the `_bad` macro variants are the right fit.

    /// Bind the target address for read()/write() on the fd
    const I2C_SLAVE: libc::c_ulong = 0x0703;
    /// Query adapter functionality bits
    const I2C_FUNCS: libc::c_ulong = 0x0705;
    /// Combined transfer of several messages with repeated starts
    pub const I2C_RDWR: libc::c_ulong = 0x0707;
    /// Enable/disable SMBus packet error checking
    const I2C_PEC: libc::c_ulong = 0x0708;

    nix::ioctl_write_int_bad!(set_slave_address, I2C_SLAVE);
    nix::ioctl_write_int_bad!(set_pec, I2C_PEC);
    nix::ioctl_read_bad!(get_funcs, I2C_FUNCS, libc::c_ulong);
}

// Adapter functionality bits reported by the I2C_FUNCS query
/// Raw I2C-level transactions
const I2C_FUNC_I2C: libc::c_ulong = 0x0000_0001;
/// SMBus block reads (first received byte is the payload length)
const I2C_FUNC_SMBUS_READ_BLOCK_DATA: libc::c_ulong = 0x0100_0000;

/// Message is a read (master receives)
const I2C_M_RD: u16 = 0x0001;
/// First received byte is the payload length
const I2C_M_RECV_LEN: u16 = 0x0400;

/// One message of an I2C_RDWR transfer
/// This must match the kernel's struct i2c_msg layout
#[repr(C)]
#[derive(Debug)]
struct I2cMsg {
    addr: u16,    // __u16 addr
    flags: u16,   // __u16 flags
    len: u16,     // __u16 len
    buf: *mut u8, // __u8 *buf
}

/// This must match the kernel's struct i2c_rdwr_ioctl_data layout
#[repr(C)]
#[derive(Debug)]
struct I2cRdwrIoctlData {
    msgs: *mut I2cMsg, // struct i2c_msg *msgs
    nmsgs: u32,        // __u32 nmsgs
}

/// Configuration for opening a Linux I2C device
#[derive(Debug, Clone)]
pub struct LinuxI2cConfig {
    /// Device path (e.g., "/dev/i2c-1")
    pub device: String,
    /// 7-bit target address of the secure element
    pub address: u16,
}

impl Default for LinuxI2cConfig {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            address: DEFAULT_ADDRESS,
        }
    }
}

impl LinuxI2cConfig {
    /// Create a new configuration with the given device path
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Default::default()
        }
    }

    /// Set the 7-bit target address
    pub fn with_address(mut self, address: u16) -> Self {
        self.address = address;
        self
    }
}

/// Linux I2C master using the i2c-dev interface
///
/// This struct implements the `I2cMaster` trait for Linux systems using
/// the `/dev/i2c-N` character device interface. It owns the open file
/// descriptor and the bound target address; dropping it closes the device.
pub struct LinuxI2c {
    /// File handle for the i2c-dev device
    file: File,
    /// Bound 7-bit target address
    address: u16,
    /// Adapter functionality bits from the open-time query
    funcs: libc::c_ulong,
}

impl LinuxI2c {
    /// Open a Linux I2C device with the given configuration
    ///
    /// Verifies that the adapter supports raw I2C transactions and
    /// length-prefixed block reads; either missing capability fails the
    /// open. Binding the target address and clearing the PEC flag are
    /// best-effort and only logged on failure.
    pub fn open(config: &LinuxI2cConfig) -> Result<Self> {
        if config.address > 0x7F {
            return Err(LinuxI2cError::InvalidAddress(config.address));
        }

        log::debug!("linux_i2c: Opening device {}", config.device);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&config.device)
            .map_err(|e| LinuxI2cError::OpenFailed {
                path: config.device.clone(),
                source: e,
            })?;

        let fd = file.as_raw_fd();

        // Bind the target address for plain read()/write() on the fd
        if let Err(e) = unsafe { ioctl::set_slave_address(fd, config.address as libc::c_int) } {
            log::warn!("linux_i2c: Failed to bind address 0x{:02X}: {}", config.address, e);
        }

        // Clear packet error checking; the secure element does not speak it
        if let Err(e) = unsafe { ioctl::set_pec(fd, 0) } {
            log::debug!("linux_i2c: Failed to clear PEC flag: {}", e);
        }

        // Query adapter functionality
        let mut funcs: libc::c_ulong = 0;
        unsafe { ioctl::get_funcs(fd, &mut funcs) }.map_err(|e| {
            LinuxI2cError::FuncsQueryFailed(std::io::Error::from_raw_os_error(e as i32))
        })?;

        if funcs & I2C_FUNC_I2C == 0 {
            return Err(LinuxI2cError::Unsupported("plain I2C-level commands"));
        }
        if funcs & I2C_FUNC_SMBUS_READ_BLOCK_DATA == 0 {
            return Err(LinuxI2cError::Unsupported("length-prefixed block reads"));
        }

        log::info!(
            "linux_i2c: Opened {} (target address 0x{:02X})",
            config.device,
            config.address
        );

        Ok(Self {
            file,
            address: config.address,
            funcs,
        })
    }

    /// Open a device with the default target address
    pub fn open_device(device: &str) -> Result<Self> {
        Self::open(&LinuxI2cConfig::new(device))
    }

    /// The bound 7-bit target address
    pub fn address(&self) -> u16 {
        self.address
    }

    /// Write a buffer through the bound-address write() path, checking that
    /// the driver accepted the exact length
    fn write_exact(&mut self, tx: &[u8]) -> CoreResult<()> {
        match self.file.write(tx) {
            Ok(n) if n == tx.len() => Ok(()),
            Ok(n) => {
                log::debug!("linux_i2c: Short write ({} of {} bytes)", n, tx.len());
                Err(CoreError::TransferFailed)
            }
            Err(e) => {
                log::debug!("linux_i2c: Write failed: {}", e);
                Err(CoreError::TransferFailed)
            }
        }
    }
}

impl I2cMaster for LinuxI2c {
    fn features(&self) -> BusFeatures {
        let mut features = BusFeatures::empty();
        if self.funcs & I2C_FUNC_I2C != 0 {
            features |= BusFeatures::PLAIN_I2C;
        }
        if self.funcs & I2C_FUNC_SMBUS_READ_BLOCK_DATA != 0 {
            features |= BusFeatures::RECV_LEN;
        }
        features
    }

    fn write_byte(&mut self, byte: u8) -> CoreResult<()> {
        self.write_exact(&[byte])
    }

    fn write(&mut self, tx: &[u8]) -> CoreResult<()> {
        self.write_exact(tx)
    }

    fn write_read(&mut self, tx: &[u8], rx: &mut [u8], max_len: usize) -> CoreResult<usize> {
        if tx.is_empty() || tx.len() > u16::MAX as usize {
            return Err(CoreError::InvalidArgument);
        }
        let max_len = max_len.clamp(1, MAX_RESPONSE_LEN);

        let mut raw = [0u8; MAX_RESPONSE_LEN];
        // The driver replaces this with the length byte it clocks in; it
        // has to start out as a legal block length.
        raw[0] = 1;

        let mut msgs = [
            I2cMsg {
                addr: self.address,
                flags: 0,
                len: tx.len() as u16,
                buf: tx.as_ptr() as *mut u8,
            },
            I2cMsg {
                addr: self.address,
                flags: I2C_M_RD | I2C_M_RECV_LEN,
                len: max_len as u16,
                buf: raw.as_mut_ptr(),
            },
        ];
        let data = I2cRdwrIoctlData {
            msgs: msgs.as_mut_ptr(),
            nmsgs: msgs.len() as u32,
        };

        // Passing both messages through one I2C_RDWR call makes the kernel
        // issue a repeated start between the write and the read phase.
        let ret = unsafe { libc::ioctl(self.file.as_raw_fd(), ioctl::I2C_RDWR, &data) };
        if ret < 0 {
            let err = std::io::Error::last_os_error();
            log::debug!("linux_i2c: I2C_RDWR failed: {}", err);
            return Err(classify_rdwr_error(&err));
        }

        take_prefixed(&raw, rx)
    }
}

/// Map a failed I2C_RDWR transfer onto the transport error taxonomy.
///
/// Controllers report a NACK during the address phase as ENXIO. On
/// i.MX-class controllers the same code is also raised for a NACK on a
/// data byte, so `NackOnAddress` is not a reliable address-only signal.
fn classify_rdwr_error(err: &std::io::Error) -> CoreError {
    match err.raw_os_error() {
        Some(libc::ENXIO) => CoreError::NackOnAddress,
        _ => CoreError::TransferFailed,
    }
}

/// Parse a target address string (hex with 0x prefix, or decimal)
fn parse_address(s: &str) -> std::result::Result<u16, String> {
    let value = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex address: {}", e))?
    } else {
        s.parse::<u16>().map_err(|e| format!("Invalid address: {}", e))?
    };
    if value > 0x7F {
        return Err(format!("Address 0x{:02X} is not a 7-bit address", value));
    }
    Ok(value)
}

/// Parse backend options from a list of key-value pairs
///
/// - `dev=/dev/i2c-N` - Optional: device path (default: /dev/i2c-1)
/// - `addr=0x48` - Optional: 7-bit target address (default: 0x48)
pub fn parse_options(options: &[(&str, &str)]) -> std::result::Result<LinuxI2cConfig, String> {
    let mut config = LinuxI2cConfig::default();

    for (key, value) in options {
        match *key {
            "dev" => {
                config.device = value.to_string();
            }
            "addr" => {
                config.address = parse_address(value)?;
            }
            _ => {
                log::warn!("linux_i2c: Unknown option: {}={}", key, value);
            }
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nack_errno_maps_to_nack_on_address() {
        let err = std::io::Error::from_raw_os_error(libc::ENXIO);
        assert_eq!(classify_rdwr_error(&err), CoreError::NackOnAddress);
    }

    #[test]
    fn other_errnos_map_to_transfer_failed() {
        for errno in [libc::EIO, libc::ETIMEDOUT, libc::EAGAIN, libc::EBUSY] {
            let err = std::io::Error::from_raw_os_error(errno);
            assert_eq!(classify_rdwr_error(&err), CoreError::TransferFailed);
        }
        let err = std::io::Error::new(std::io::ErrorKind::Other, "no errno");
        assert_eq!(classify_rdwr_error(&err), CoreError::TransferFailed);
    }

    #[test]
    fn parse_options_defaults() {
        let config = parse_options(&[]).unwrap();
        assert_eq!(config.device, DEFAULT_DEVICE);
        assert_eq!(config.address, DEFAULT_ADDRESS);
    }

    #[test]
    fn parse_options_overrides() {
        let config = parse_options(&[("dev", "/dev/i2c-3"), ("addr", "0x50")]).unwrap();
        assert_eq!(config.device, "/dev/i2c-3");
        assert_eq!(config.address, 0x50);

        let config = parse_options(&[("addr", "72")]).unwrap();
        assert_eq!(config.address, 72);
    }

    #[test]
    fn parse_options_rejects_wide_addresses() {
        assert!(parse_options(&[("addr", "0x80")]).is_err());
        assert!(parse_options(&[("addr", "300")]).is_err());
        assert!(parse_options(&[("addr", "i2c")]).is_err());
    }

    #[test]
    fn unknown_options_are_ignored() {
        let config = parse_options(&[("speed", "400")]).unwrap();
        assert_eq!(config.device, DEFAULT_DEVICE);
    }
}
