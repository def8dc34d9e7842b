//! Control-transfer transport abstraction
//!
//! The sequencer never talks to rusb directly. It drives a [`Transport`],
//! which is [`crate::usb::RusbTransport`] on real hardware and an in-memory
//! mock in tests.

use crate::error::TransportError;

/// A device endpoint that accepts host-to-device control transfers
pub trait Transport: Send + 'static {
    /// Issue one OUT control transfer carrying `data`
    fn control_transfer(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
    ) -> Result<(), TransportError>;

    /// Release the underlying device handle
    ///
    /// Called at most once by the owning actuator.
    fn close(&mut self);
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn control_transfer(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
    ) -> Result<(), TransportError> {
        (**self).control_transfer(request_type, request, value, index, data)
    }

    fn close(&mut self) {
        (**self).close()
    }
}
