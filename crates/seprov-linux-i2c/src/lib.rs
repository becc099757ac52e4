//! seprov-linux-i2c - Linux i2c-dev support
//!
//! This crate provides access to an I2C-attached secure element via the
//! Linux `/dev/i2c-N` character device interface.
//!
//! # Overview
//!
//! The Linux I2C driver exposes bus controllers through character devices
//! at `/dev/i2c-N` where N is the bus number. The secure element answers on
//! a fixed 7-bit address (0x48 by default) and frames every response with a
//! leading length byte, which maps onto the kernel's `I2C_M_RECV_LEN` block
//! read support.
//!
//! # Example
//!
//! ```no_run
//! use seprov_linux_i2c::{LinuxI2c, LinuxI2cConfig};
//! use seprov_core::transport::I2cMaster;
//!
//! // Open with default settings (/dev/i2c-1, address 0x48)
//! let mut bus = LinuxI2c::open(&LinuxI2cConfig::default())?;
//!
//! // Or with custom settings
//! let config = LinuxI2cConfig::new("/dev/i2c-2").with_address(0x49);
//! let mut bus = LinuxI2c::open(&config)?;
//!
//! // Wake the secure element
//! bus.write_byte(0x00)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Usage with seprov CLI
//!
//! ```bash
//! # Probe the secure element using default settings
//! seprov probe
//!
//! # Specify bus and address
//! seprov probe --bus linux-i2c:dev=/dev/i2c-2,addr=0x49
//! ```
//!
//! # System Requirements
//!
//! - Linux kernel with i2c-dev support enabled (`CONFIG_I2C_CHARDEV`)
//! - An adapter driver that supports plain I2C messages and SMBus block
//!   reads (`I2C_FUNC_SMBUS_READ_BLOCK_DATA`)
//! - Read/write access to `/dev/i2c-N` (udev rules or the `i2c` group)

pub mod device;
pub mod error;

// Re-exports
pub use device::{parse_options, LinuxI2c, LinuxI2cConfig, DEFAULT_ADDRESS, DEFAULT_DEVICE};
pub use error::{LinuxI2cError, Result};

/// Open a Linux I2C device and return a boxed I2cMaster
///
/// This is a convenience function for use in the CLI backend dispatch.
///
/// # Arguments
///
/// * `options` - Slice of (key, value) pairs from backend string parsing
pub fn open_linux_i2c(
    options: &[(&str, &str)],
) -> std::result::Result<Box<dyn seprov_core::transport::I2cMaster + Send>, Box<dyn std::error::Error>>
{
    let config = parse_options(options)?;
    let bus = LinuxI2c::open(&config)?;
    Ok(Box::new(bus))
}
