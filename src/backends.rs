//! Backend registration and dispatch
//!
//! Two kinds of backends exist: *module* backends implement the secure
//! module command interface the key store runs on, and *bus* backends
//! implement the raw I2C transport used by `probe`. Both are selected with
//! a `name:option=value,...` string and feature-gated at compile time.

use seprov_core::keystore::KeyStore;
use seprov_core::module::SecureModule;
use seprov_core::transport::I2cMaster;

/// Information about a backend
pub struct BackendInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Short description
    pub description: &'static str,
}

/// Get information about all available module backends
pub fn available_modules() -> Vec<BackendInfo> {
    vec![BackendInfo {
        name: "dummy",
        description: "In-memory secure element emulator (file=<image> to persist)",
    }]
}

/// Get information about all available bus backends
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_buses() -> Vec<BackendInfo> {
    let mut buses = Vec::new();

    #[cfg(feature = "linux-i2c")]
    buses.push(BackendInfo {
        name: "linux-i2c",
        description: "Linux i2c-dev interface (dev=/dev/i2c-N,addr=0x48)",
    });

    buses.push(BackendInfo {
        name: "dummy",
        description: "Scripted bus that acknowledges everything",
    });

    buses
}

/// Generate help text listing the given backends
fn backend_help(kind: &str, backends: &[BackendInfo]) -> String {
    let mut help = format!("Available {} backends:\n", kind);
    for b in backends {
        help.push_str(&format!("  {:12} - {}\n", b.name, b.description));
    }
    help
}

/// Generate a short list of module backend names for CLI help
pub fn module_names_short() -> String {
    let names: Vec<&str> = available_modules().iter().map(|b| b.name).collect();
    names.join(", ")
}

/// Generate a short list of bus backend names for CLI help
pub fn bus_names_short() -> String {
    let names: Vec<&str> = available_buses().iter().map(|b| b.name).collect();
    names.join(", ")
}

/// Parse a backend string into name and options
///
/// Format: "name" or "name:option1=value1,option2=value2"
pub fn parse_backend_string(s: &str) -> (&str, Vec<(&str, &str)>) {
    if let Some((name, opts)) = s.split_once(':') {
        let options: Vec<_> = opts
            .split(',')
            .filter_map(|opt| opt.split_once('='))
            .collect();
        (name, options)
    } else {
        (s, Vec::new())
    }
}

/// Open the module backend selected by `spec`
pub fn open_module(spec: &str) -> Result<Box<dyn SecureModule + Send>, Box<dyn std::error::Error>> {
    let (name, options) = parse_backend_string(spec);

    match name {
        "dummy" => {
            let file = options.iter().find(|(k, _)| *k == "file").map(|(_, v)| *v);
            let module = match file {
                Some(path) => seprov_dummy::DummyModule::with_storage_file(path)
                    .map_err(|e| format!("Failed to load storage image {}: {}", path, e))?,
                None => seprov_dummy::DummyModule::new(),
            };
            Ok(Box::new(module))
        }
        _ => Err(unknown_backend_error("module", name, &available_modules())),
    }
}

/// Open the bus backend selected by `spec`
pub fn open_bus(spec: &str) -> Result<Box<dyn I2cMaster + Send>, Box<dyn std::error::Error>> {
    let (name, options) = parse_backend_string(spec);

    match name {
        #[cfg(feature = "linux-i2c")]
        "linux-i2c" | "linux_i2c" | "i2cdev" => {
            log::info!("Opening Linux I2C bus...");
            seprov_linux_i2c::open_linux_i2c(&options).map_err(|e| {
                format!(
                    "Failed to open Linux I2C device: {}\n\
                     Make sure the device exists and you have read/write permissions.\n\
                     You may need to: sudo usermod -aG i2c $USER",
                    e
                )
                .into()
            })
        }
        "dummy" => {
            let _ = options;
            Ok(Box::new(seprov_dummy::DummyBus::new()))
        }
        _ => Err(unknown_backend_error("bus", name, &available_buses())),
    }
}

/// Execute a function with a key store opened on the selected module backend
///
/// The store is finalized (connection closed) after the function returns,
/// whether it succeeded or not.
pub fn with_keystore<F>(spec: &str, f: F) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnOnce(&mut KeyStore<Box<dyn SecureModule + Send>>) -> Result<(), Box<dyn std::error::Error>>,
{
    let module = open_module(spec)?;
    let mut store = KeyStore::open(module)?;
    let result = f(&mut store);
    store.finalize();
    result
}

fn unknown_backend_error(
    kind: &str,
    name: &str,
    backends: &[BackendInfo],
) -> Box<dyn std::error::Error> {
    let mut msg = format!("Unknown {} backend: {}\n\n", kind, name);
    msg.push_str(&backend_help(kind, backends));
    msg.push_str("\nUse 'seprov list-backends' for more details");
    msg.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_strings_split_into_name_and_options() {
        assert_eq!(parse_backend_string("dummy"), ("dummy", vec![]));
        assert_eq!(
            parse_backend_string("linux-i2c:dev=/dev/i2c-2,addr=0x49"),
            ("linux-i2c", vec![("dev", "/dev/i2c-2"), ("addr", "0x49")])
        );
        // Malformed options are dropped rather than fatal
        assert_eq!(parse_backend_string("dummy:file"), ("dummy", vec![]));
    }

    #[test]
    fn unknown_backends_are_rejected() {
        assert!(open_module("hardware").is_err());
        assert!(open_bus("spidev").is_err());
    }
}
