//! Reset command implementation

use seprov_core::keystore::KeyStore;
use seprov_core::module::SecureModule;

/// Run the reset command
pub fn run<M: SecureModule>(store: &mut KeyStore<M>) -> Result<(), Box<dyn std::error::Error>> {
    store.reset_module()?;
    println!("Secure module reset");
    Ok(())
}
