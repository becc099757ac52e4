//! Error types for seprov-core

use thiserror::Error;

/// Core error type shared by the transport and key store layers - Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    // Transport errors
    /// Opening the bus device, querying its capabilities, or binding the
    /// target address failed
    #[error("bus initialization failed")]
    InitFailed,
    /// A bus transaction failed or transferred fewer bytes than requested
    #[error("bus transfer failed")]
    TransferFailed,
    /// The target did not acknowledge its address.
    ///
    /// Some controllers report a data-byte NACK with the same driver error
    /// code, so this is not a reliable address-only signal.
    #[error("target address not acknowledged")]
    NackOnAddress,
    /// The receive buffer cannot hold the framed response
    #[error("receive buffer too small")]
    BufferTooSmall,

    // Secure module errors
    /// The secure module did not accept the connection
    #[error("secure module connect failed")]
    ConnectFailed,
    /// The secure module rejected the reset command
    #[error("secure module reset failed")]
    ResetFailed,

    // Key store errors
    /// An empty blob was passed, or a blob length does not fit the header
    #[error("invalid argument")]
    InvalidArgument,
    /// Reading the header or a storage chunk failed, or the header holds a
    /// zero length
    #[error("storage read failed")]
    ReadFailed,
    /// Writing the header or a storage chunk failed
    #[error("storage write failed")]
    WriteFailed,
}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
