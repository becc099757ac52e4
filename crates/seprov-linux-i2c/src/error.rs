//! Error types for Linux I2C operations

use thiserror::Error;

/// Linux I2C specific errors
#[derive(Debug, Error)]
pub enum LinuxI2cError {
    /// Failed to open device
    #[error("Failed to open {path}: {source}")]
    OpenFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to query adapter functionality
    #[error("Failed to query adapter functionality: {0}")]
    FuncsQueryFailed(#[source] std::io::Error),

    /// The adapter lacks a required capability
    #[error("Adapter does not support {0}")]
    Unsupported(&'static str),

    /// Target address outside the 7-bit range
    #[error("Invalid target address 0x{0:02X} (must be a 7-bit address)")]
    InvalidAddress(u16),
}

/// Every open-time failure collapses to an init failure in the core
/// taxonomy; the full diagnostic stays available on this error type.
impl From<LinuxI2cError> for seprov_core::Error {
    fn from(_: LinuxI2cError) -> Self {
        seprov_core::Error::InitFailed
    }
}

/// Result type for Linux I2C operations
pub type Result<T> = std::result::Result<T, LinuxI2cError>;
