//! Protocol library for rust-turret
//!
//! This crate defines the command model for USB desk turrets, the device
//! families and their wire encodings, and the safety limits applied to motion
//! durations. It performs no I/O.
//!
//! # Example
//!
//! ```
//! use protocol::{Command, DeviceFamily, DurationLimits, encode};
//! use std::time::Duration;
//!
//! let cmd = Command::up(Duration::from_secs(5));
//!
//! // Tilting longer than a full sweep is cut down
//! let pause = DurationLimits::default().normalize(cmd.action(), cmd.requested_duration());
//! assert_eq!(pause, Duration::from_millis(1500));
//!
//! // The classic launcher takes a single-byte report
//! let req = encode(DeviceFamily::Classic, cmd.action()).unwrap();
//! assert_eq!(req.data, vec![0x02]);
//! ```

pub mod codec;
pub mod command;
pub mod error;
pub mod limits;
pub mod types;

pub use codec::{CLASSIC_REPORT_VALUE, THUNDER_REPORT_LEN, encode};
pub use command::{Action, Category, Command, LightAction, MotionAction};
pub use error::{ProtocolError, Result};
pub use limits::DurationLimits;
pub use types::{
    CLASSIC_IDENTITY, ControlRequest, DeviceFamily, DeviceIdentity, KNOWN_DEVICES,
    THUNDER_IDENTITY,
};
