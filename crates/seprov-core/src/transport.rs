//! Bus transport trait definitions
//!
//! Platform drivers (Linux i2c-dev, vendor bridges, test doubles) implement
//! [`I2cMaster`]; everything above depends only on this contract.

use crate::error::{Error, Result};
use bitflags::bitflags;

/// Hard cap on the receive phase of a combined transaction, in bytes.
///
/// The secure element frames every response with a leading length byte, so
/// one transaction never carries more than the length byte plus 255 payload
/// bytes.
pub const MAX_RESPONSE_LEN: usize = 256;

bitflags! {
    /// Capabilities a bus controller reports at open time
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BusFeatures: u32 {
        /// Raw I2C-level messages (arbitrary write/read transactions)
        const PLAIN_I2C = 1 << 0;
        /// Block reads where the first received byte carries the payload
        /// length
        const RECV_LEN = 1 << 1;
    }
}

impl Default for BusFeatures {
    fn default() -> Self {
        BusFeatures::empty()
    }
}

/// I2C master bound to one device path and one fixed 7-bit target address.
///
/// All operations are synchronous and blocking; the blocking lifetime is
/// bounded by the underlying driver's transaction timeout. No operation
/// retries internally - every failure surfaces immediately. Implementations
/// are not required to be thread-safe; concurrent callers must serialize
/// access, in particular around [`write_read`](I2cMaster::write_read), whose
/// correctness depends on no other transaction occurring between its two
/// phases.
pub trait I2cMaster {
    /// Get the features supported by this controller
    fn features(&self) -> BusFeatures;

    /// Largest framed response this master can accept in one transaction
    fn max_response_len(&self) -> usize {
        MAX_RESPONSE_LEN
    }

    /// Write a single byte.
    ///
    /// Only used to wake a sleeping secure element; the device does not send
    /// a valid response to it. Succeeds only if the driver accepted exactly
    /// one byte.
    fn write_byte(&mut self, byte: u8) -> Result<()>;

    /// Write the full buffer in one transaction.
    ///
    /// Succeeds only if the driver reports writing the exact requested
    /// length.
    fn write(&mut self, tx: &[u8]) -> Result<()>;

    /// Combined write-then-read with a repeated start.
    ///
    /// The read phase must observe the immediately preceding write without
    /// the bus being released in between. It expects a variable-length
    /// response of at most `max_len` bytes (clamped to
    /// [`MAX_RESPONSE_LEN`]), where the first received byte is the count of
    /// payload bytes that follow. On success `1 + first byte` bytes are
    /// copied into `rx` and that count is returned.
    ///
    /// An address-phase NACK maps to [`Error::NackOnAddress`], any other
    /// transaction failure to [`Error::TransferFailed`].
    fn write_read(&mut self, tx: &[u8], rx: &mut [u8], max_len: usize) -> Result<usize>;

    /// Tear-down hook kept for parity with vendor middleware expectations.
    ///
    /// Does nothing: the handle stays usable afterwards and resources are
    /// only released when the implementation is dropped. Callers must not
    /// rely on it to free anything.
    fn terminate(&mut self) {}
}

/// Copy a length-prefixed response out of a raw receive buffer.
///
/// `raw` is the buffer the driver filled: its first byte is the payload
/// count, so `1 + raw[0]` bytes are valid no matter how many bytes the
/// buffer physically holds. Copies those bytes into `rx` and returns the
/// count.
pub fn take_prefixed(raw: &[u8], rx: &mut [u8]) -> Result<usize> {
    let count = *raw.first().ok_or(Error::TransferFailed)? as usize;
    let total = count + 1;
    if total > raw.len() {
        return Err(Error::TransferFailed);
    }
    if total > rx.len() {
        return Err(Error::BufferTooSmall);
    }
    rx[..total].copy_from_slice(&raw[..total]);
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_prefixed_uses_first_byte_as_payload_count() {
        let mut raw = [0u8; MAX_RESPONSE_LEN];
        raw[..6].copy_from_slice(&[0x05, 0x90, 0x00, 0xAA, 0xBB, 0xCC]);
        raw[6] = 0xEE; // stale bytes past the frame must not be copied

        let mut rx = [0u8; 32];
        let n = take_prefixed(&raw, &mut rx).unwrap();

        assert_eq!(n, 6);
        assert_eq!(&rx[..6], &[0x05, 0x90, 0x00, 0xAA, 0xBB, 0xCC]);
        assert_eq!(rx[6], 0);
    }

    #[test]
    fn take_prefixed_rejects_undersized_caller_buffer() {
        let raw = [0x05u8, 1, 2, 3, 4, 5];
        let mut rx = [0u8; 4];
        assert_eq!(take_prefixed(&raw, &mut rx), Err(Error::BufferTooSmall));
    }

    #[test]
    fn take_prefixed_rejects_truncated_frame() {
        // Length byte promises more payload than the driver buffer holds
        let raw = [0x05u8, 1, 2];
        let mut rx = [0u8; 16];
        assert_eq!(take_prefixed(&raw, &mut rx), Err(Error::TransferFailed));

        let mut rx = [0u8; 16];
        assert_eq!(take_prefixed(&[], &mut rx), Err(Error::TransferFailed));
    }
}
