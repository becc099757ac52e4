//! CLI argument parsing

use crate::backends;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Generate dynamic help text for the module argument
fn module_help() -> String {
    format!(
        "Module backend to use [available: {}]",
        backends::module_names_short()
    )
}

/// Generate dynamic help text for the bus argument
fn bus_help() -> String {
    format!(
        "Bus backend to use [available: {}]",
        backends::bus_names_short()
    )
}

#[derive(Parser)]
#[command(name = "seprov")]
#[command(author, version, about = "Secure element key/cert provisioning", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store a key and certificate in general-purpose storage
    Store {
        /// Module backend to use
        #[arg(short, long, help = module_help())]
        module: String,

        /// Key file to store
        #[arg(short, long)]
        key: PathBuf,

        /// Certificate file to store
        #[arg(short, long)]
        cert: PathBuf,
    },

    /// Read back the stored key and certificate into files
    Fetch {
        /// Module backend to use
        #[arg(short, long, help = module_help())]
        module: String,

        /// Output file for the key
        #[arg(short, long)]
        key: PathBuf,

        /// Output file for the certificate
        #[arg(short, long)]
        cert: PathBuf,
    },

    /// Zero-fill the whole general-purpose storage area
    Erase {
        /// Module backend to use
        #[arg(short, long, help = module_help())]
        module: String,
    },

    /// Issue a module-level reset
    Reset {
        /// Module backend to use
        #[arg(short, long, help = module_help())]
        module: String,
    },

    /// Check that the secure element answers on the bus
    Probe {
        /// Bus backend to use
        #[arg(short, long, default_value = "linux-i2c", help = bus_help())]
        bus: String,
    },

    /// List compiled-in backends
    ListBackends,
}
