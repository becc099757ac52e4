//! Erase command implementation

use seprov_core::keystore::{KeyStore, GP_STORAGE_SIZE};
use seprov_core::module::SecureModule;

/// Run the erase command
pub fn run<M: SecureModule>(store: &mut KeyStore<M>) -> Result<(), Box<dyn std::error::Error>> {
    store.erase()?;
    println!("Erased {} bytes of general-purpose storage", GP_STORAGE_SIZE);
    Ok(())
}
