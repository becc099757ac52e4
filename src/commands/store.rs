//! Store command implementation

use seprov_core::keystore::KeyStore;
use seprov_core::module::SecureModule;
use std::path::Path;

/// Run the store command
pub fn run<M: SecureModule>(
    store: &mut KeyStore<M>,
    key_path: &Path,
    cert_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let key = std::fs::read(key_path)
        .map_err(|e| format!("Failed to read key file {}: {}", key_path.display(), e))?;
    let cert = std::fs::read(cert_path)
        .map_err(|e| format!("Failed to read certificate file {}: {}", cert_path.display(), e))?;

    store.store(&key, &cert)?;

    println!(
        "Stored {}-byte key and {}-byte certificate",
        key.len(),
        cert.len()
    );
    Ok(())
}
