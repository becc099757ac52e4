//! List command implementation

use crate::backends;

/// Print all compiled-in backends
pub fn list_backends() {
    println!("Module backends:");
    for b in backends::available_modules() {
        println!("  {:12} - {}", b.name, b.description);
    }
    println!();
    println!("Bus backends:");
    for b in backends::available_buses() {
        println!("  {:12} - {}", b.name, b.description);
    }
}
