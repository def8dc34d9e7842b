//! Bounded command queue between callers and a turret worker thread
//!
//! Any number of [`CommandSender`] clones may push commands; exactly one
//! [`CommandReceiver`] consumes them on the device's worker thread. The queue
//! is strict FIFO and applies backpressure: a push onto a full queue waits
//! until the worker frees a slot.

use async_channel::{Receiver, Sender, bounded};
use protocol::Command;
use tokio::sync::oneshot;
use tracing::{trace, warn};

/// Default number of commands a device queue holds before senders block
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Items travelling through a device queue
#[derive(Debug)]
pub enum QueuedCommand {
    /// Send a command to the device, then pace
    Execute(Command),

    /// Stop the worker once everything ahead of this has run
    Shutdown {
        /// Fired by the worker after it dequeues the sentinel
        done: oneshot::Sender<()>,
    },
}

impl QueuedCommand {
    /// Build a shutdown sentinel and the receiver that observes its completion
    pub fn shutdown() -> (Self, oneshot::Receiver<()>) {
        let (done, rx) = oneshot::channel();
        (QueuedCommand::Shutdown { done }, rx)
    }
}

/// Producer end (cheap to clone, safe to share across threads)
#[derive(Clone)]
pub struct CommandSender {
    tx: Sender<QueuedCommand>,
}

impl CommandSender {
    /// Push a command, blocking the calling thread while the queue is full
    ///
    /// Must not be called from inside an async task.
    pub fn send_blocking(&self, item: QueuedCommand) -> crate::Result<()> {
        self.tx
            .send_blocking(item)
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Close the queue. Pending and future sends fail.
    ///
    /// Returns true if this call closed it.
    pub fn close(&self) -> bool {
        self.tx.close()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Number of commands waiting
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        // bounded channels always report a capacity
        self.tx.capacity().unwrap_or(DEFAULT_QUEUE_CAPACITY)
    }
}

/// Consumer end, owned by the worker thread
pub struct CommandReceiver {
    rx: Receiver<QueuedCommand>,
}

impl CommandReceiver {
    /// Wait for the next command (blocking)
    ///
    /// Fails once the queue is closed and empty.
    pub fn recv_blocking(&self) -> crate::Result<QueuedCommand> {
        self.rx
            .recv_blocking()
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Close the queue and throw away everything still in it
    ///
    /// Returns how many items were discarded.
    pub fn close_and_discard(&self) -> usize {
        self.rx.close();
        let mut discarded = 0;
        while self.rx.try_recv().is_ok() {
            discarded += 1;
        }
        discarded
    }

    pub fn is_closed(&self) -> bool {
        self.rx.is_closed()
    }
}

/// Create a device command queue
///
/// Returns (CommandSender for callers, CommandReceiver for the worker thread).
/// A capacity of zero is raised to one.
pub fn create_command_queue(capacity: usize) -> (CommandSender, CommandReceiver) {
    if capacity == 0 {
        warn!("Command queue capacity 0 is not usable, using 1");
    }
    let (tx, rx) = bounded(capacity.max(1));
    trace!("Created command queue (capacity {})", capacity.max(1));
    (CommandSender { tx }, CommandReceiver { rx })
}
