//! Driver error types

use crate::sequencer::SequencerState;
use protocol::ProtocolError;
use thiserror::Error;

/// Failure of a single control transfer
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),

    #[error("Short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    #[error("Transport already closed")]
    Closed,

    #[error("{0}")]
    Other(String),
}

/// Errors surfaced by the turret driver
#[derive(Debug, Error)]
pub enum DriverError {
    /// Discovery matched nothing
    #[error("No devices found")]
    NoDevicesFound,

    /// Capability or limit errors from the protocol layer
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Sequencer is not accepting commands (state: {0})")]
    NotRunning(SequencerState),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Queue error: {0}")]
    Queue(#[from] common::Error),

    #[error("Failed to spawn worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("Worker thread panicked")]
    WorkerPanicked,

    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),
}

impl DriverError {
    /// True when the device family cannot execute the command
    pub fn is_unsupported_capability(&self) -> bool {
        matches!(
            self,
            DriverError::Protocol(ProtocolError::UnsupportedCapability { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, DriverError>;
