//! seprov-dummy - In-memory secure element emulator for testing
//!
//! This crate provides two test doubles:
//!
//! - [`DummyModule`] emulates the secure module's general-purpose storage
//!   commands in memory. It is also a first-class CLI backend, optionally
//!   persisting its storage image to a file so provisioning images can be
//!   prepared and inspected without hardware.
//! - [`DummyBus`] is a scripted bus master that replays queued
//!   length-prefixed responses, for exercising transport-level code.

use std::collections::VecDeque;
use std::path::PathBuf;

use seprov_core::error::{Error as CoreError, Result as CoreResult};
use seprov_core::keystore::GP_STORAGE_SIZE;
use seprov_core::module::{CloseMode, SecureModule, StatusWord};
use seprov_core::transport::{take_prefixed, BusFeatures, I2cMaster, MAX_RESPONSE_LEN};

/// Command issued while no connection is open
const SW_NOT_CONNECTED: StatusWord = StatusWord(0x6985);
/// Storage offset or length outside the general-purpose area
const SW_OUT_OF_RANGE: StatusWord = StatusWord(0x6B00);
/// Injected failure
const SW_FAILED: StatusWord = StatusWord(0x6F00);

/// In-memory secure module
///
/// Emulates the general-purpose storage area of a secure element. Commands
/// require an open connection and respect the storage bounds; everything
/// else always succeeds unless a failure is injected.
pub struct DummyModule {
    storage: Vec<u8>,
    connected: bool,
    reads: usize,
    writes: usize,
    resets: usize,
    refuse_connect: bool,
    refuse_reset: bool,
    fail_read_at: Option<u16>,
    fail_write_at: Option<u16>,
    persist: Option<PathBuf>,
}

impl Default for DummyModule {
    fn default() -> Self {
        Self::new()
    }
}

impl DummyModule {
    /// Create a module with zero-filled storage
    pub fn new() -> Self {
        Self {
            storage: vec![0; GP_STORAGE_SIZE],
            connected: false,
            reads: 0,
            writes: 0,
            resets: 0,
            refuse_connect: false,
            refuse_reset: false,
            fail_read_at: None,
            fail_write_at: None,
            persist: None,
        }
    }

    /// Create a module with a pre-filled storage image
    pub fn with_storage(image: &[u8]) -> Self {
        let mut module = Self::new();
        let len = image.len().min(module.storage.len());
        module.storage[..len].copy_from_slice(&image[..len]);
        module
    }

    /// Create a module backed by a storage image file
    ///
    /// Loads the image if the file exists (shorter images leave the rest of
    /// the storage zeroed) and writes the storage back on `close`.
    pub fn with_storage_file(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let mut module = match std::fs::read(&path) {
            Ok(image) => Self::with_storage(&image),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::new(),
            Err(e) => return Err(e),
        };
        module.persist = Some(path);
        Ok(module)
    }

    /// Get a reference to the storage image
    pub fn storage(&self) -> &[u8] {
        &self.storage
    }

    /// Get a mutable reference to the storage image
    pub fn storage_mut(&mut self) -> &mut [u8] {
        &mut self.storage
    }

    /// Whether a connection is currently open
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Number of storage reads issued so far
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// Number of storage writes issued so far
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Number of resets issued so far
    pub fn resets(&self) -> usize {
        self.resets
    }

    /// Make `connect` fail
    pub fn refuse_connections(&mut self, refuse: bool) {
        self.refuse_connect = refuse;
    }

    /// Make `reset` fail
    pub fn refuse_resets(&mut self, refuse: bool) {
        self.refuse_reset = refuse;
    }

    /// Fail every storage read that starts at `offset`
    pub fn fail_reads_at(&mut self, offset: Option<u16>) {
        self.fail_read_at = offset;
    }

    /// Fail every storage write that starts at `offset`
    pub fn fail_writes_at(&mut self, offset: Option<u16>) {
        self.fail_write_at = offset;
    }

    fn check_range(&self, offset: u16, len: usize) -> Option<StatusWord> {
        if !self.connected {
            return Some(SW_NOT_CONNECTED);
        }
        if offset as usize + len > self.storage.len() {
            return Some(SW_OUT_OF_RANGE);
        }
        None
    }
}

impl SecureModule for DummyModule {
    fn connect(&mut self) -> StatusWord {
        if self.refuse_connect {
            return SW_FAILED;
        }
        self.connected = true;
        StatusWord::OK
    }

    fn close(&mut self, _mode: CloseMode) {
        self.connected = false;
        if let Some(path) = &self.persist {
            if let Err(e) = std::fs::write(path, &self.storage) {
                log::error!("dummy: Failed to persist storage to {}: {}", path.display(), e);
            }
        }
    }

    fn reset(&mut self) -> StatusWord {
        if !self.connected {
            return SW_NOT_CONNECTED;
        }
        if self.refuse_reset {
            return SW_FAILED;
        }
        self.resets += 1;
        self.storage.fill(0);
        StatusWord::OK
    }

    fn read_storage(&mut self, offset: u16, buf: &mut [u8]) -> StatusWord {
        self.reads += 1;
        if let Some(sw) = self.check_range(offset, buf.len()) {
            return sw;
        }
        if self.fail_read_at == Some(offset) {
            return SW_FAILED;
        }
        let start = offset as usize;
        buf.copy_from_slice(&self.storage[start..start + buf.len()]);
        StatusWord::OK
    }

    fn write_storage(&mut self, offset: u16, data: &[u8]) -> StatusWord {
        self.writes += 1;
        if let Some(sw) = self.check_range(offset, data.len()) {
            return sw;
        }
        if self.fail_write_at == Some(offset) {
            return SW_FAILED;
        }
        let start = offset as usize;
        self.storage[start..start + data.len()].copy_from_slice(data);
        StatusWord::OK
    }
}

/// Scripted bus master
///
/// Records everything the caller writes and answers combined transactions
/// from a queue of canned payloads, framing each with the length-prefix
/// convention. A queued error is returned instead of the next response.
#[derive(Default)]
pub struct DummyBus {
    /// Frames written by the caller, including the write phase of combined
    /// transactions
    pub sent: Vec<Vec<u8>>,
    wakes: usize,
    responses: VecDeque<Vec<u8>>,
    next_error: Option<CoreError>,
}

impl DummyBus {
    /// Create a bus with no queued responses
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response payload for the next combined transaction
    ///
    /// The payload is what follows the length byte on the wire; the bus
    /// prepends the length byte itself.
    pub fn queue_response(&mut self, payload: &[u8]) {
        assert!(payload.len() < MAX_RESPONSE_LEN, "payload too long to frame");
        self.responses.push_back(payload.to_vec());
    }

    /// Fail the next combined transaction with `error`
    pub fn fail_next_with(&mut self, error: CoreError) {
        self.next_error = Some(error);
    }

    /// Number of wake-up bytes received so far
    pub fn wakes(&self) -> usize {
        self.wakes
    }
}

impl I2cMaster for DummyBus {
    fn features(&self) -> BusFeatures {
        BusFeatures::PLAIN_I2C | BusFeatures::RECV_LEN
    }

    fn write_byte(&mut self, byte: u8) -> CoreResult<()> {
        self.wakes += 1;
        self.sent.push(vec![byte]);
        Ok(())
    }

    fn write(&mut self, tx: &[u8]) -> CoreResult<()> {
        self.sent.push(tx.to_vec());
        Ok(())
    }

    fn write_read(&mut self, tx: &[u8], rx: &mut [u8], max_len: usize) -> CoreResult<usize> {
        self.sent.push(tx.to_vec());
        if let Some(error) = self.next_error.take() {
            return Err(error);
        }
        let payload = self.responses.pop_front().ok_or(CoreError::TransferFailed)?;

        let max_len = max_len.clamp(1, MAX_RESPONSE_LEN);
        if payload.len() + 1 > max_len {
            return Err(CoreError::TransferFailed);
        }

        let mut raw = [0u8; MAX_RESPONSE_LEN];
        raw[0] = payload.len() as u8;
        raw[1..1 + payload.len()].copy_from_slice(&payload);
        take_prefixed(&raw, rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seprov_core::keystore::{KeyStore, GP_UNIT_SIZE};

    fn provisioned(key: &[u8], cert: &[u8]) -> KeyStore<DummyModule> {
        let mut store = KeyStore::open(DummyModule::new()).unwrap();
        store.store(key, cert).unwrap();
        store
    }

    fn pattern(len: usize, seed: u8) -> Vec<u8> {
        (0..len).map(|i| (i as u8).wrapping_mul(7).wrapping_add(seed)).collect()
    }

    #[test]
    fn store_then_fetch_round_trips() {
        for (key_len, cert_len) in [(1, 1), (2, 7), (127, 129), (128, 128), (300, 500), (2000, 2088)] {
            let key = pattern(key_len, 0x11);
            let cert = pattern(cert_len, 0x47);
            let mut store = provisioned(&key, &cert);
            let pair = store.fetch().unwrap();
            assert_eq!(pair.key, key, "key of {} bytes", key_len);
            assert_eq!(pair.cert, cert, "cert of {} bytes", cert_len);
        }
    }

    #[test]
    fn storage_layout_matches_deployed_format() {
        let store = provisioned(b"AB", b"XYZCERT");
        let gp = store.module().storage();

        // Header unit: both lengths as LE u16 padded to 4 bytes, rest zero
        assert_eq!(&gp[..8], &[0x02, 0x00, 0x00, 0x00, 0x07, 0x00, 0x00, 0x00]);
        assert!(gp[8..GP_UNIT_SIZE].iter().all(|&b| b == 0));

        // Key at unit 1; the cert starts at the next unit boundary even
        // though the key fills only two bytes of its unit
        assert_eq!(&gp[GP_UNIT_SIZE..GP_UNIT_SIZE + 2], b"AB");
        assert_eq!(&gp[2 * GP_UNIT_SIZE..2 * GP_UNIT_SIZE + 7], b"XYZCERT");
    }

    #[test]
    fn full_unit_key_places_cert_without_padding() {
        let key = pattern(GP_UNIT_SIZE, 0x01);
        let store = provisioned(&key, b"CERT");
        let gp = store.module().storage();
        assert_eq!(&gp[GP_UNIT_SIZE..2 * GP_UNIT_SIZE], &key[..]);
        assert_eq!(&gp[2 * GP_UNIT_SIZE..2 * GP_UNIT_SIZE + 4], b"CERT");
    }

    #[test]
    fn erase_zeroes_storage_and_fails_later_fetch() {
        let mut store = provisioned(b"key-data", b"cert-data");
        store.erase().unwrap();
        assert!(store.module().storage().iter().all(|&b| b == 0));
        assert_eq!(store.fetch(), Err(CoreError::ReadFailed));
    }

    #[test]
    fn empty_blobs_are_rejected_before_any_transaction() {
        let mut store = KeyStore::open(DummyModule::new()).unwrap();
        assert_eq!(store.store(b"", b"cert"), Err(CoreError::InvalidArgument));
        assert_eq!(store.store(b"key", b""), Err(CoreError::InvalidArgument));
        assert_eq!(store.store(b"", b""), Err(CoreError::InvalidArgument));
        assert_eq!(store.module().writes(), 0);
        assert_eq!(store.module().reads(), 0);
    }

    #[test]
    fn blob_longer_than_header_field_is_rejected() {
        let mut store = KeyStore::open(DummyModule::new()).unwrap();
        let oversized = vec![0xAA; u16::MAX as usize + 1];
        assert_eq!(store.store(&oversized, b"cert"), Err(CoreError::InvalidArgument));
        assert_eq!(store.module().writes(), 0);
    }

    #[test]
    fn blob_overflowing_storage_is_rejected_by_the_module() {
        let mut store = KeyStore::open(DummyModule::new()).unwrap();
        let too_big = pattern(4096, 0x00);
        assert_eq!(store.store(&too_big, b"cert"), Err(CoreError::WriteFailed));
    }

    #[test]
    fn failed_chunk_write_surfaces() {
        let mut module = DummyModule::new();
        // Second key chunk lands at unit 2
        module.fail_writes_at(Some(2 * GP_UNIT_SIZE as u16));
        let mut store = KeyStore::open(module).unwrap();
        let key = pattern(300, 0x22);
        assert_eq!(store.store(&key, b"cert"), Err(CoreError::WriteFailed));
    }

    #[test]
    fn failed_header_or_chunk_read_surfaces() {
        let mut store = provisioned(&pattern(300, 0x33), b"cert");

        store.module_mut().fail_reads_at(Some(0));
        assert_eq!(store.fetch(), Err(CoreError::ReadFailed));

        store.module_mut().fail_reads_at(Some(2 * GP_UNIT_SIZE as u16));
        assert_eq!(store.fetch(), Err(CoreError::ReadFailed));

        store.module_mut().fail_reads_at(None);
        assert!(store.fetch().is_ok());
    }

    #[test]
    fn refused_connect_fails_open() {
        let mut module = DummyModule::new();
        module.refuse_connections(true);
        assert!(matches!(KeyStore::open(module), Err(CoreError::ConnectFailed)));
    }

    #[test]
    fn module_reset_wipes_storage() {
        let mut store = provisioned(b"key", b"cert");
        store.reset_module().unwrap();
        assert_eq!(store.module().resets(), 1);
        assert_eq!(store.fetch(), Err(CoreError::ReadFailed));

        store.module_mut().refuse_resets(true);
        assert_eq!(store.reset_module(), Err(CoreError::ResetFailed));
    }

    #[test]
    fn close_drops_the_connection() {
        let mut module = DummyModule::new();
        assert_eq!(module.connect(), StatusWord::OK);
        assert!(module.is_connected());
        module.close(CloseMode::Standard);
        assert!(!module.is_connected());
        assert_eq!(module.read_storage(0, &mut [0u8; 1]), SW_NOT_CONNECTED);
    }

    #[test]
    fn storage_file_round_trips_through_close() {
        let path = std::env::temp_dir().join(format!("seprov-dummy-{}.bin", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let mut store =
            KeyStore::open(DummyModule::with_storage_file(&path).unwrap()).unwrap();
        store.store(b"persisted-key", b"persisted-cert").unwrap();
        store.finalize();

        let image = std::fs::read(&path).unwrap();
        assert_eq!(image.len(), GP_STORAGE_SIZE);

        let mut store =
            KeyStore::open(DummyModule::with_storage_file(&path).unwrap()).unwrap();
        let pair = store.fetch().unwrap();
        assert_eq!(pair.key, b"persisted-key");
        assert_eq!(pair.cert, b"persisted-cert");

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn bus_frames_responses_with_length_prefix() {
        let mut bus = DummyBus::new();
        bus.queue_response(&[0x90, 0x00, 0xAA, 0xBB, 0xCC]);

        let mut rx = [0u8; MAX_RESPONSE_LEN];
        let n = bus.write_read(&[0x01, 0x02], &mut rx, MAX_RESPONSE_LEN).unwrap();

        assert_eq!(n, 6);
        assert_eq!(&rx[..6], &[0x05, 0x90, 0x00, 0xAA, 0xBB, 0xCC]);
        assert_eq!(bus.sent.last().unwrap(), &vec![0x01, 0x02]);
    }

    #[test]
    fn bus_rejects_responses_beyond_the_requested_maximum() {
        let mut bus = DummyBus::new();
        bus.queue_response(&[0u8; 32]);
        let mut rx = [0u8; MAX_RESPONSE_LEN];
        assert_eq!(
            bus.write_read(&[0x01], &mut rx, 16),
            Err(CoreError::TransferFailed)
        );
    }

    #[test]
    fn bus_surfaces_injected_transaction_errors() {
        let mut bus = DummyBus::new();
        bus.queue_response(&[0x90, 0x00]);
        bus.fail_next_with(CoreError::NackOnAddress);

        let mut rx = [0u8; MAX_RESPONSE_LEN];
        assert_eq!(
            bus.write_read(&[0x01], &mut rx, MAX_RESPONSE_LEN),
            Err(CoreError::NackOnAddress)
        );
        // The queued response survives for the retry the caller decides on
        assert_eq!(bus.write_read(&[0x01], &mut rx, MAX_RESPONSE_LEN), Ok(3));
    }

    #[test]
    fn bus_counts_wake_pulses() {
        let mut bus = DummyBus::new();
        bus.write_byte(0x00).unwrap();
        bus.write_byte(0x00).unwrap();
        assert_eq!(bus.wakes(), 2);
    }
}
