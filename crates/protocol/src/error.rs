//! Protocol error types

use crate::command::Category;
use crate::types::DeviceFamily;
use thiserror::Error;

/// Protocol-level errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The device family has no wire encoding for this category
    #[error("{family} does not support {category} commands")]
    UnsupportedCapability {
        family: DeviceFamily,
        category: Category,
    },

    /// Duration limits that would not keep a motion inside its travel range
    #[error("Invalid duration limits: {0}")]
    InvalidLimits(String),
}

/// Type alias for protocol results
pub type Result<T> = std::result::Result<T, ProtocolError>;
