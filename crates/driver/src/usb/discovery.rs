//! Turret discovery
//!
//! Walks the bus once, keeps devices whose vendor/product pair appears in the
//! known-device table, and optionally opens them.

use crate::error::{DriverError, Result};
use crate::usb::device::RusbTransport;
use protocol::{DeviceFamily, DeviceIdentity, KNOWN_DEVICES};
use rusb::{Context, Device, UsbContext};
use std::time::Duration;
use tracing::{debug, info, warn};

/// A vendor/product pair and the family it maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownDevice {
    pub identity: DeviceIdentity,
    pub family: DeviceFamily,
}

impl KnownDevice {
    pub const fn new(identity: DeviceIdentity, family: DeviceFamily) -> Self {
        Self { identity, family }
    }
}

/// The built-in table
pub fn default_known_devices() -> Vec<KnownDevice> {
    KNOWN_DEVICES
        .iter()
        .map(|(identity, family)| KnownDevice::new(*identity, *family))
        .collect()
}

/// Where a matching turret sits on the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurretInfo {
    pub identity: DeviceIdentity,
    pub family: DeviceFamily,
    pub bus_number: u8,
    pub address: u8,
}

impl TurretInfo {
    /// Short label, also used as the sequencer name
    pub fn label(&self) -> String {
        format!("{:03}-{:03}", self.bus_number, self.address)
    }
}

/// A matching turret, opened and ready to drive
pub struct DiscoveredTurret {
    pub info: TurretInfo,
    pub transport: RusbTransport,
}

fn match_device(device: &Device<Context>, known: &[KnownDevice]) -> Option<TurretInfo> {
    let descriptor = match device.device_descriptor() {
        Ok(d) => d,
        Err(e) => {
            debug!(
                "Skipping bus={} addr={}: no descriptor ({})",
                device.bus_number(),
                device.address(),
                e
            );
            return None;
        }
    };

    let identity = DeviceIdentity::new(descriptor.vendor_id(), descriptor.product_id());
    known
        .iter()
        .find(|k| k.identity == identity)
        .map(|k| TurretInfo {
            identity,
            family: k.family,
            bus_number: device.bus_number(),
            address: device.address(),
        })
}

/// List matching turrets without opening them
pub fn list_turrets(context: &Context, known: &[KnownDevice]) -> Result<Vec<TurretInfo>> {
    let devices = context.devices()?;
    let turrets: Vec<TurretInfo> = devices
        .iter()
        .filter_map(|device| match_device(&device, known))
        .collect();

    debug!("Found {} matching device(s)", turrets.len());
    Ok(turrets)
}

/// Find and open every matching turret
///
/// Devices that match but cannot be opened are skipped with a warning.
/// Returns [`DriverError::NoDevicesFound`] when nothing usable is left.
pub fn find_turrets(
    context: &Context,
    known: &[KnownDevice],
    timeout: Duration,
) -> Result<Vec<DiscoveredTurret>> {
    let devices = context.devices()?;
    let mut turrets = Vec::new();

    for device in devices.iter() {
        let Some(info) = match_device(&device, known) else {
            continue;
        };

        match RusbTransport::open(&device, timeout) {
            Ok(transport) => {
                info!("Found {} turret at {} ({})", info.family, info.label(), info.identity);
                turrets.push(DiscoveredTurret { info, transport });
            }
            Err(e) => {
                warn!("Failed to open {} at {}: {}", info.identity, info.label(), e);
            }
        }
    }

    if turrets.is_empty() {
        return Err(DriverError::NoDevicesFound);
    }

    Ok(turrets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{CLASSIC_IDENTITY, THUNDER_IDENTITY};

    #[test]
    fn test_default_known_devices() {
        let known = default_known_devices();
        assert_eq!(known.len(), 2);
        assert!(known.contains(&KnownDevice::new(THUNDER_IDENTITY, DeviceFamily::Thunder)));
        assert!(known.contains(&KnownDevice::new(CLASSIC_IDENTITY, DeviceFamily::Classic)));
    }

    #[test]
    fn test_turret_info_label() {
        let info = TurretInfo {
            identity: THUNDER_IDENTITY,
            family: DeviceFamily::Thunder,
            bus_number: 1,
            address: 12,
        };
        assert_eq!(info.label(), "001-012");
    }

    #[test]
    fn test_discovery_without_usb_access() {
        // Context creation may fail without USB permissions
        let Ok(context) = Context::new() else {
            return;
        };

        // Nothing matches an empty table
        match find_turrets(&context, &[], Duration::from_millis(100)) {
            Err(DriverError::NoDevicesFound) => {}
            Err(e) => eprintln!("Enumeration failed (expected without permissions): {}", e),
            Ok(found) => panic!("matched {} device(s) against an empty table", found.len()),
        }
    }
}
