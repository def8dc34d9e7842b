//! Pauses between consecutive commands

use std::time::Duration;

/// Waits out the pause that follows a command
///
/// The worker thread calls this after each transfer whose effective duration
/// is non-zero, and nowhere else.
pub trait Pacer: Send + 'static {
    fn pause(&mut self, duration: Duration);
}

/// Sleeps the worker thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    fn pause(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
