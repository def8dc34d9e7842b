//! Device actuator
//!
//! Owns a turret's transport and turns one [`Action`] into one control
//! transfer using the encoding of the device's family. There are no retries
//! here; a failed transfer is returned as-is.

use crate::error::{Result, TransportError};
use crate::transport::Transport;
use protocol::{Action, DeviceFamily, DeviceIdentity, encode};
use tracing::debug;

/// Human readable model name for a turret
pub fn describe(family: DeviceFamily, identity: DeviceIdentity) -> String {
    match family {
        DeviceFamily::Thunder => "Dream Cheeky Thunder".to_string(),
        DeviceFamily::Classic => "Classic".to_string(),
        DeviceFamily::Unknown => format!("Unknown Turret ({})", identity),
    }
}

/// A turret's transport plus the family that decides its wire format
pub struct Actuator {
    transport: Option<Box<dyn Transport>>,
    family: DeviceFamily,
    identity: DeviceIdentity,
}

impl Actuator {
    pub fn new(
        transport: impl Transport,
        family: DeviceFamily,
        identity: DeviceIdentity,
    ) -> Self {
        Self {
            transport: Some(Box::new(transport)),
            family,
            identity,
        }
    }

    pub fn family(&self) -> DeviceFamily {
        self.family
    }

    pub fn identity(&self) -> DeviceIdentity {
        self.identity
    }

    pub fn human_readable_name(&self) -> String {
        describe(self.family, self.identity)
    }

    /// Send one action to the device
    ///
    /// Capability errors are raised before the transport is touched.
    pub fn send(&mut self, action: Action) -> Result<()> {
        let request = encode(self.family, action)?;
        let transport = self.transport.as_mut().ok_or(TransportError::Closed)?;

        debug!(
            "Control transfer: request_type={:#x}, request={:#x}, value={:#x}, index={:#x}, data={:02x?}",
            request.request_type, request.request, request.value, request.index, request.data
        );

        transport.control_transfer(
            request.request_type,
            request.request,
            request.value,
            request.index,
            &request.data,
        )?;

        Ok(())
    }

    /// Release the transport
    ///
    /// Returns true the first time; later calls do nothing.
    pub fn close(&mut self) -> bool {
        match self.transport.take() {
            Some(mut transport) => {
                transport.close();
                debug!("Closed {}", self.human_readable_name());
                true
            }
            None => false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.transport.is_none()
    }
}

impl Drop for Actuator {
    fn drop(&mut self) {
        self.close();
    }
}
