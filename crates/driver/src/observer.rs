//! Hooks for what happens inside a worker thread
//!
//! The worker never panics or stops on a failed transfer. It reports the
//! failure to its [`CommandObserver`] and moves on to the next command.

use crate::error::DriverError;
use protocol::Command;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Receives worker-loop notifications for one device
///
/// Called from the worker thread; implementations should return quickly
/// since the next command waits on them.
pub trait CommandObserver: Send + Sync {
    /// A command reached the device; `pause` is the effective pacing
    fn on_command_sent(&self, _device: &str, _command: &Command, _pause: Duration) {}

    /// A command could not be delivered
    fn on_command_failed(&self, device: &str, command: &Command, error: &DriverError);

    /// Queued commands were dropped by an abrupt close
    fn on_commands_discarded(&self, _device: &str, _count: usize) {}

    /// The shutdown sentinel was reached
    fn on_shutdown_complete(&self, _device: &str) {}
}

/// Default observer: emits tracing events
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl CommandObserver for LoggingObserver {
    fn on_command_sent(&self, device: &str, command: &Command, pause: Duration) {
        debug!("[{}] sent {}, pacing {:?}", device, command.action(), pause);
    }

    fn on_command_failed(&self, device: &str, command: &Command, error: &DriverError) {
        warn!("[{}] {} failed: {}", device, command.action(), error);
    }

    fn on_commands_discarded(&self, device: &str, count: usize) {
        warn!("[{}] discarded {} queued command(s)", device, count);
    }

    fn on_shutdown_complete(&self, device: &str) {
        info!("[{}] command queue drained", device);
    }
}
