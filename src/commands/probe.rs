//! Probe command implementation

use crate::backends;

/// Run the probe command
///
/// Opens the raw bus and sends the single-byte wake-up pulse. The device
/// does not answer the pulse with data; an accepted write is enough to tell
/// that something acknowledges the address.
pub fn run(bus_spec: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut bus = backends::open_bus(bus_spec)?;

    log::debug!("probe: bus features {:?}", bus.features());

    bus.write_byte(0x00).map_err(|e| {
        format!(
            "Secure element did not accept the wake-up byte: {}\n\
             Check the bus number, the target address and the wiring.",
            e
        )
    })?;

    println!("Secure element acknowledged the wake-up byte");
    Ok(())
}
