//! seprov-core - Core library for secure element key/cert provisioning
//!
//! This crate provides the building blocks for storing a private key and a
//! certificate inside the general-purpose (GP) data area of an I2C-attached
//! secure element:
//!
//! - [`transport`] - the raw bus contract implemented by platform drivers
//! - [`module`] - the boundary to the vendor secure-module command library
//! - [`keystore`] - unit-chunked paging of key/cert blobs over GP storage
//!
//! The cryptographic command set of the secure element is out of scope; the
//! vendor middleware implements [`module::SecureModule`] on top of any
//! [`transport::I2cMaster`].
//!
//! # Example
//!
//! ```ignore
//! use seprov_core::keystore::KeyStore;
//!
//! fn provision<M: seprov_core::module::SecureModule>(module: M) -> seprov_core::Result<()> {
//!     let mut store = KeyStore::open(module)?;
//!     store.store(b"...key...", b"...cert...")?;
//!     store.finalize();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod error;
pub mod keystore;
pub mod module;
pub mod transport;

pub use error::{Error, Result};
