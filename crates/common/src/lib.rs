//! Common utilities for rust-turret
//!
//! This crate provides shared functionality between the driver and the
//! command-line tool: the bounded command queue that feeds each turret's
//! worker thread, error handling, and logging setup.

pub mod channel;
pub mod error;
pub mod logging;

pub use channel::{
    CommandReceiver, CommandSender, DEFAULT_QUEUE_CAPACITY, QueuedCommand, create_command_queue,
};
pub use error::{Error, Result};
pub use logging::setup_logging;
