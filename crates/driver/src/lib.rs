//! Turret driver for rust-turret
//!
//! Every turret gets a [`Sequencer`]: a bounded FIFO and one worker thread
//! that sends queued commands to the device in order, pausing after each one
//! for its (clamped) duration. [`Turret`] adds the familiar movements on top.
//!
//! # Example
//!
//! ```
//! use driver::{Pacing, SequencerConfig, Transport, TransportError, Turret};
//! use protocol::{DeviceFamily, THUNDER_IDENTITY};
//! use std::time::Duration;
//!
//! struct Printer;
//!
//! impl Transport for Printer {
//!     fn control_transfer(
//!         &mut self,
//!         _request_type: u8,
//!         _request: u8,
//!         _value: u16,
//!         _index: u16,
//!         data: &[u8],
//!     ) -> Result<(), TransportError> {
//!         println!("{:02x?}", data);
//!         Ok(())
//!     }
//!
//!     fn close(&mut self) {}
//! }
//!
//! let turret = Turret::open(
//!     Printer,
//!     DeviceFamily::Thunder,
//!     THUNDER_IDENTITY,
//!     SequencerConfig::default(),
//!     Pacing::default(),
//! )
//! .unwrap();
//!
//! turret.light(true).unwrap();
//! turret.left(Duration::from_millis(10)).unwrap();
//! turret.shutdown().unwrap();
//! ```
//!
//! An in-memory transport and recording pacers live in `test_utils`, behind
//! the `test-utils` feature.

pub mod actuator;
pub mod error;
pub mod observer;
pub mod pacer;
pub mod sequencer;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod transport;
pub mod turret;
pub mod usb;

pub use actuator::{Actuator, describe};
pub use error::{DriverError, Result, TransportError};
pub use observer::{CommandObserver, LoggingObserver};
pub use pacer::{Pacer, ThreadPacer};
pub use sequencer::{Sequencer, SequencerConfig, SequencerState};
pub use transport::Transport;
pub use turret::{BLINK_INTERVAL, FIRE_COOLDOWN, Pacing, STOP_PAUSE, Turret};
