//! seprov - Secure element key/cert provisioning
//!
//! Stores a private key and a certificate in the general-purpose data area
//! of an I2C-attached secure element.
//!
//! # Architecture
//!
//! The key store runs on a `SecureModule` backend - the vendor middleware
//! on real hardware, or the in-memory emulator shipped in-tree. The raw bus
//! layer (Linux i2c-dev) sits below that middleware and is reachable
//! directly through the `probe` command.

mod backends;
mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    match cli.command {
        Commands::Store { module, key, cert } => {
            backends::with_keystore(&module, |store| commands::store::run(store, &key, &cert))
        }
        Commands::Fetch { module, key, cert } => {
            backends::with_keystore(&module, |store| commands::fetch::run(store, &key, &cert))
        }
        Commands::Erase { module } => {
            backends::with_keystore(&module, |store| commands::erase::run(store))
        }
        Commands::Reset { module } => {
            backends::with_keystore(&module, |store| commands::reset::run(store))
        }
        Commands::Probe { bus } => commands::probe::run(&bus),
        Commands::ListBackends => {
            commands::list_backends();
            Ok(())
        }
    }
}
