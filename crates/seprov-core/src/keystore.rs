//! Key and certificate storage over general-purpose data
//!
//! The secure element exposes a flat 4096-byte general-purpose storage area,
//! read and written through the module middleware in at most unit-sized
//! pieces. This module paginates a private key and a certificate across that
//! area:
//!
//! - unit 0 is the header: key length (LE u16) at bytes 0-1, certificate
//!   length (LE u16) at bytes 4-5, every other byte zero
//! - the key starts at unit 1; the certificate starts at the first unit
//!   boundary after the key
//!
//! The layout is bit-exact with already-deployed storage images, so the
//! header format and the unit alignment of each blob must not change.

use crate::error::{Error, Result};
use crate::module::{CloseMode, SecureModule};

/// Size of one storage unit, the transfer granularity, in bytes
pub const GP_UNIT_SIZE: usize = 128;

/// Number of storage units in the general-purpose area
pub const GP_UNIT_COUNT: usize = 32;

/// Total general-purpose storage size in bytes
pub const GP_STORAGE_SIZE: usize = GP_UNIT_SIZE * GP_UNIT_COUNT;

/// Byte offset of the key length field inside the header unit
const HEADER_KEY_LEN: usize = 0;

/// Byte offset of the certificate length field inside the header unit
const HEADER_CERT_LEN: usize = 4;

/// Round a storage offset up to the next unit boundary.
///
/// A no-op on offsets that already sit on a boundary. This is what keeps
/// every stored blob's end unit-aligned regardless of its exact byte
/// length: the offset after writing `len` bytes at a unit-aligned `offset`
/// is `offset + ceil(len / 128) * 128`.
pub fn align_to_unit(offset: usize) -> usize {
    offset.div_ceil(GP_UNIT_SIZE) * GP_UNIT_SIZE
}

/// Build the header unit for the given blob lengths.
fn encode_header(key_len: u16, cert_len: u16) -> [u8; GP_UNIT_SIZE] {
    let mut unit = [0u8; GP_UNIT_SIZE];
    unit[HEADER_KEY_LEN..HEADER_KEY_LEN + 2].copy_from_slice(&key_len.to_le_bytes());
    unit[HEADER_CERT_LEN..HEADER_CERT_LEN + 2].copy_from_slice(&cert_len.to_le_bytes());
    unit
}

/// Decode the blob lengths from a header unit.
///
/// Bytes 2-3 and 6-7 are reserved and ignored.
fn decode_header(unit: &[u8; GP_UNIT_SIZE]) -> (u16, u16) {
    let key_len = u16::from_le_bytes([unit[HEADER_KEY_LEN], unit[HEADER_KEY_LEN + 1]]);
    let cert_len = u16::from_le_bytes([unit[HEADER_CERT_LEN], unit[HEADER_CERT_LEN + 1]]);
    (key_len, cert_len)
}

/// A key/certificate pair read back from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCertPair {
    /// The stored private key bytes
    pub key: Vec<u8>,
    /// The stored certificate bytes
    pub cert: Vec<u8>,
}

/// Key and certificate store over one secure module connection.
///
/// Owns the module handle: [`open`](KeyStore::open) connects,
/// [`finalize`](KeyStore::finalize) closes. Operations are synchronous and
/// are not retried; a failed storage command surfaces once and the caller
/// decides what to do.
pub struct KeyStore<M> {
    module: M,
}

impl<M: SecureModule> KeyStore<M> {
    /// Connect to the secure module and wrap it in a store.
    pub fn open(mut module: M) -> Result<Self> {
        let sw = module.connect();
        if !sw.is_ok() {
            log::warn!("secure module connect returned {}", sw);
            return Err(Error::ConnectFailed);
        }
        Ok(Self { module })
    }

    /// Issue a module-level reset.
    pub fn reset_module(&mut self) -> Result<()> {
        let sw = self.module.reset();
        if !sw.is_ok() {
            log::warn!("secure module reset returned {}", sw);
            return Err(Error::ResetFailed);
        }
        Ok(())
    }

    /// Close the module connection, consuming the store.
    ///
    /// No status is reported back; close failures stay with the middleware.
    pub fn finalize(mut self) {
        self.module.close(CloseMode::Standard);
    }

    /// Borrow the underlying module.
    pub fn module(&self) -> &M {
        &self.module
    }

    /// Mutably borrow the underlying module.
    pub fn module_mut(&mut self) -> &mut M {
        &mut self.module
    }

    /// Store a key and a certificate.
    ///
    /// Writes the header unit first, then the key, then the certificate,
    /// each blob chunked into unit-sized writes and ending on a unit
    /// boundary. Fails with [`Error::InvalidArgument`] - before any storage
    /// command is issued - if either blob is empty or longer than a header
    /// length field can hold.
    pub fn store(&mut self, key: &[u8], cert: &[u8]) -> Result<()> {
        if key.is_empty() || cert.is_empty() {
            return Err(Error::InvalidArgument);
        }
        let key_len = u16::try_from(key.len()).map_err(|_| Error::InvalidArgument)?;
        let cert_len = u16::try_from(cert.len()).map_err(|_| Error::InvalidArgument)?;

        log::debug!(
            "storing {} key bytes and {} certificate bytes",
            key.len(),
            cert.len()
        );

        let header = encode_header(key_len, cert_len);
        if !self.module.write_storage(0, &header).is_ok() {
            return Err(Error::WriteFailed);
        }

        let mut offset = GP_UNIT_SIZE;
        self.write_chunked(&mut offset, key)?;
        self.write_chunked(&mut offset, cert)?;
        Ok(())
    }

    /// Read back the stored key and certificate.
    ///
    /// Fails with [`Error::ReadFailed`] if the header cannot be read, if
    /// either recorded length is zero, or if any chunk read fails.
    pub fn fetch(&mut self) -> Result<KeyCertPair> {
        let mut header = [0u8; GP_UNIT_SIZE];
        if !self.module.read_storage(0, &mut header).is_ok() {
            return Err(Error::ReadFailed);
        }
        let (key_len, cert_len) = decode_header(&header);
        if key_len == 0 || cert_len == 0 {
            return Err(Error::ReadFailed);
        }

        log::debug!(
            "fetching {} key bytes and {} certificate bytes",
            key_len,
            cert_len
        );

        let mut offset = GP_UNIT_SIZE;
        let key = self.read_chunked(&mut offset, key_len as usize)?;
        let cert = self.read_chunked(&mut offset, cert_len as usize)?;
        Ok(KeyCertPair { key, cert })
    }

    /// Zero-fill the whole general-purpose area.
    ///
    /// Writes all 32 units with zeros, wiping the header and both blobs. A
    /// failed unit write aborts with [`Error::WriteFailed`]; units past the
    /// failure keep their previous contents.
    pub fn erase(&mut self) -> Result<()> {
        let zeros = [0u8; GP_UNIT_SIZE];
        for unit in 0..GP_UNIT_COUNT {
            let offset = (unit * GP_UNIT_SIZE) as u16;
            if !self.module.write_storage(offset, &zeros).is_ok() {
                return Err(Error::WriteFailed);
            }
        }
        Ok(())
    }

    /// Write `data` in unit-sized chunks starting at `*offset`, leaving
    /// `*offset` on the unit boundary after the blob.
    fn write_chunked(&mut self, offset: &mut usize, data: &[u8]) -> Result<()> {
        for chunk in data.chunks(GP_UNIT_SIZE) {
            let at = u16::try_from(*offset).map_err(|_| Error::WriteFailed)?;
            if !self.module.write_storage(at, chunk).is_ok() {
                return Err(Error::WriteFailed);
            }
            *offset += chunk.len();
        }
        *offset = align_to_unit(*offset);
        Ok(())
    }

    /// Read `len` bytes in unit-sized chunks starting at `*offset`, leaving
    /// `*offset` on the unit boundary after the blob.
    fn read_chunked(&mut self, offset: &mut usize, len: usize) -> Result<Vec<u8>> {
        let mut data = vec![0u8; len];
        for chunk in data.chunks_mut(GP_UNIT_SIZE) {
            let at = u16::try_from(*offset).map_err(|_| Error::ReadFailed)?;
            if !self.module.read_storage(at, chunk).is_ok() {
                return Err(Error::ReadFailed);
            }
            *offset += chunk.len();
        }
        *offset = align_to_unit(*offset);
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_to_unit_rounds_up_partial_units() {
        assert_eq!(align_to_unit(0), 0);
        assert_eq!(align_to_unit(1), 128);
        assert_eq!(align_to_unit(127), 128);
        assert_eq!(align_to_unit(128), 128);
        assert_eq!(align_to_unit(129), 256);
        assert_eq!(align_to_unit(4095), 4096);
    }

    #[test]
    fn next_offset_matches_unit_count_of_blob() {
        // After writing L bytes at a unit-aligned offset O, the next blob
        // starts at O + ceil(L / 128) * 128.
        for (start, len) in [(128usize, 1usize), (128, 2), (128, 128), (256, 129), (128, 4088)] {
            let expected = start + len.div_ceil(GP_UNIT_SIZE) * GP_UNIT_SIZE;
            assert_eq!(align_to_unit(start + len), expected, "start {start} len {len}");
        }
    }

    #[test]
    fn header_round_trips_and_is_bit_exact() {
        let unit = encode_header(2, 7);
        assert_eq!(&unit[..8], &[0x02, 0, 0, 0, 0x07, 0, 0, 0]);
        assert!(unit[8..].iter().all(|&b| b == 0));
        assert_eq!(decode_header(&unit), (2, 7));

        let unit = encode_header(0x1234, 0xABCD);
        assert_eq!(&unit[..8], &[0x34, 0x12, 0, 0, 0xCD, 0xAB, 0, 0]);
        assert_eq!(decode_header(&unit), (0x1234, 0xABCD));
    }

    #[test]
    fn decode_header_ignores_reserved_bytes() {
        let mut unit = encode_header(10, 20);
        unit[2] = 0xFF;
        unit[3] = 0xFF;
        unit[6] = 0xFF;
        unit[7] = 0xFF;
        assert_eq!(decode_header(&unit), (10, 20));
    }
}
