//! rusb-backed transport
//!
//! Opens a turret, takes interface 0 away from the kernel HID driver when it
//! holds it, and hands it back on close.

use crate::error::TransportError;
use crate::transport::Transport;
use rusb::{Context, Device, DeviceHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// Default timeout for control transfers (5 seconds)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// The HID interface every known turret exposes
const TURRET_INTERFACE: u8 = 0;

/// Open USB device handle
pub struct RusbTransport {
    handle: Option<DeviceHandle<Context>>,
    /// Whether we detached the kernel driver and must reattach it
    detached_kernel_driver: bool,
    claimed: bool,
    timeout: Duration,
    label: String,
}

impl RusbTransport {
    /// Open the device
    ///
    /// Failing to detach or claim the interface is not fatal: control
    /// transfers on endpoint 0 still work on most hosts, so we only warn.
    pub fn open(device: &Device<Context>, timeout: Duration) -> Result<Self, rusb::Error> {
        let label = format!("bus {:03} device {:03}", device.bus_number(), device.address());
        let handle = device.open()?;
        debug!("Opened {}", label);

        let mut detached_kernel_driver = false;
        match handle.kernel_driver_active(TURRET_INTERFACE) {
            Ok(true) => {
                debug!("Detaching kernel driver from {}", label);
                match handle.detach_kernel_driver(TURRET_INTERFACE) {
                    Ok(()) => detached_kernel_driver = true,
                    Err(e) => warn!("Failed to detach kernel driver from {}: {}", label, e),
                }
            }
            Ok(false) => {
                debug!("No kernel driver active on {}", label);
            }
            Err(e) => {
                debug!("Could not check kernel driver status for {}: {}", label, e);
            }
        }

        let claimed = match handle.claim_interface(TURRET_INTERFACE) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to claim interface on {}: {}", label, e);
                false
            }
        };

        Ok(Self {
            handle: Some(handle),
            detached_kernel_driver,
            claimed,
            timeout,
            label,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }
}

impl Transport for RusbTransport {
    fn control_transfer(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
    ) -> Result<(), TransportError> {
        let handle = self.handle.as_ref().ok_or(TransportError::Closed)?;

        let written = handle.write_control(request_type, request, value, index, data, self.timeout)?;
        if written != data.len() {
            return Err(TransportError::ShortWrite {
                written,
                expected: data.len(),
            });
        }

        Ok(())
    }

    fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            if self.claimed {
                if let Err(e) = handle.release_interface(TURRET_INTERFACE) {
                    warn!("Failed to release interface on {}: {}", self.label, e);
                }
                self.claimed = false;
            }

            // Restore the device to kernel control
            if self.detached_kernel_driver {
                if let Err(e) = handle.attach_kernel_driver(TURRET_INTERFACE) {
                    debug!("Could not reattach kernel driver to {}: {}", self.label, e);
                }
                self.detached_kernel_driver = false;
            }

            debug!("Closed {}", self.label);
        }
    }
}

impl Drop for RusbTransport {
    fn drop(&mut self) {
        self.close();
    }
}
