//! Fetch command implementation

use seprov_core::keystore::KeyStore;
use seprov_core::module::SecureModule;
use std::path::Path;

/// Run the fetch command
pub fn run<M: SecureModule>(
    store: &mut KeyStore<M>,
    key_path: &Path,
    cert_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let pair = store.fetch()?;

    std::fs::write(key_path, &pair.key)
        .map_err(|e| format!("Failed to write key file {}: {}", key_path.display(), e))?;
    std::fs::write(cert_path, &pair.cert)
        .map_err(|e| format!("Failed to write certificate file {}: {}", cert_path.display(), e))?;

    println!(
        "Fetched {}-byte key to {} and {}-byte certificate to {}",
        pair.key.len(),
        key_path.display(),
        pair.cert.len(),
        cert_path.display()
    );
    Ok(())
}
