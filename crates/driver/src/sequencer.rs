//! Per-device command sequencer
//!
//! Each turret gets one dedicated worker thread that owns its [`Actuator`].
//! Callers push [`Command`]s into a bounded FIFO; the worker pops them one at
//! a time, clamps the requested pause, sends the command, then sleeps for the
//! clamped pause before looking at the next one. Nothing else ever touches
//! the transport, so commands for one device never overlap.
//!
//! ```text
//!   enqueue ──┐
//!   enqueue ──┼──> [ bounded FIFO ] ──> worker: normalize → send → pause → loop
//!   enqueue ──┘
//! ```
//!
//! # Lifecycle
//!
//! `Running → Draining → Closed`.
//!
//! - [`Sequencer::request_shutdown`] puts a sentinel behind everything already
//!   queued and waits until the worker reaches it. Nothing is lost. The state
//!   is `Closed` once the worker has taken the sentinel.
//! - [`Sequencer::close`] releases the device. If no shutdown was requested,
//!   whatever is still queued is dropped unexecuted; a command the worker has
//!   already picked up still finishes, pause included.

use crate::actuator::{Actuator, describe};
use crate::error::{DriverError, Result};
use crate::observer::{CommandObserver, LoggingObserver};
use crate::pacer::{Pacer, ThreadPacer};
use common::{CommandReceiver, CommandSender, DEFAULT_QUEUE_CAPACITY, QueuedCommand};
use protocol::{Command, DeviceFamily, DeviceIdentity, DurationLimits, ProtocolError};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

/// Sequencer lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SequencerState {
    /// Accepting commands
    Running,
    /// Shutdown requested; no new commands accepted
    Draining,
    /// Worker gone, transport released
    Closed,
}

impl fmt::Display for SequencerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequencerState::Running => f.write_str("running"),
            SequencerState::Draining => f.write_str("draining"),
            SequencerState::Closed => f.write_str("closed"),
        }
    }
}

/// Lifecycle shared by the sequencer and its worker
///
/// Reads never wait on the queue.
#[derive(Debug)]
struct StateCell(AtomicU8);

impl StateCell {
    fn new(state: SequencerState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    fn load(&self) -> SequencerState {
        match self.0.load(Ordering::Acquire) {
            0 => SequencerState::Running,
            1 => SequencerState::Draining,
            _ => SequencerState::Closed,
        }
    }

    fn store(&self, state: SequencerState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Move `from → to`; on failure returns the current state
    fn transition(
        &self,
        from: SequencerState,
        to: SequencerState,
    ) -> std::result::Result<(), SequencerState> {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| self.load())
    }
}

/// Settings for one sequencer
#[derive(Debug, Clone)]
pub struct SequencerConfig {
    /// Label used in logs and as the worker thread name suffix
    pub name: String,
    /// Queue capacity before `enqueue` blocks
    pub capacity: usize,
    /// Motion duration limits
    pub limits: DurationLimits,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            name: "turret".to_string(),
            capacity: DEFAULT_QUEUE_CAPACITY,
            limits: DurationLimits::default(),
        }
    }
}

/// Command queue plus the worker thread that drains it
pub struct Sequencer {
    name: String,
    family: DeviceFamily,
    identity: DeviceIdentity,
    limits: DurationLimits,
    sender: CommandSender,
    state: Arc<StateCell>,
    /// Readers are in-flight enqueues; the shutdown flip takes it for writing
    admission: RwLock<()>,
    discard: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<Actuator>>>,
}

impl Sequencer {
    /// Start a sequencer with the default pacer and logging observer
    pub fn spawn(actuator: Actuator, config: SequencerConfig) -> Result<Self> {
        Self::spawn_with(
            actuator,
            config,
            Box::new(ThreadPacer),
            Arc::new(LoggingObserver),
        )
    }

    /// Start a sequencer with a custom pacer and observer
    pub fn spawn_with(
        actuator: Actuator,
        config: SequencerConfig,
        pacer: Box<dyn Pacer>,
        observer: Arc<dyn CommandObserver>,
    ) -> Result<Self> {
        let (sender, receiver) = common::create_command_queue(config.capacity);
        let discard = Arc::new(AtomicBool::new(false));
        let state = Arc::new(StateCell::new(SequencerState::Running));
        let family = actuator.family();
        let identity = actuator.identity();

        let worker = Worker {
            name: config.name.clone(),
            actuator,
            receiver,
            limits: config.limits,
            pacer,
            observer,
            discard: discard.clone(),
            state: state.clone(),
        };

        let handle = std::thread::Builder::new()
            .name(format!("turret-{}", config.name))
            .spawn(move || worker.run())
            .map_err(DriverError::WorkerSpawn)?;

        info!(
            "[{}] sequencer started for {} (queue capacity {})",
            config.name,
            describe(family, identity),
            sender.capacity()
        );

        Ok(Self {
            name: config.name,
            family,
            identity,
            limits: config.limits,
            sender,
            state,
            admission: RwLock::new(()),
            discard,
            worker: Mutex::new(Some(handle)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn family(&self) -> DeviceFamily {
        self.family
    }

    pub fn identity(&self) -> DeviceIdentity {
        self.identity
    }

    pub fn limits(&self) -> &DurationLimits {
        &self.limits
    }

    pub fn human_readable_name(&self) -> String {
        describe(self.family, self.identity)
    }

    pub fn state(&self) -> SequencerState {
        self.state.load()
    }

    /// Commands waiting behind the one in flight
    pub fn pending(&self) -> usize {
        self.sender.len()
    }

    /// Append a command to the queue
    ///
    /// Blocks while the queue is full. Commands the device family cannot
    /// execute are rejected here, before they are queued.
    pub fn enqueue(&self, command: Command) -> Result<()> {
        if command.is_shutdown() {
            return Err(DriverError::InvalidCommand(
                "the shutdown sentinel is issued by request_shutdown()".to_string(),
            ));
        }
        if !self.family.supports(command.category()) {
            return Err(ProtocolError::UnsupportedCapability {
                family: self.family,
                category: command.category(),
            }
            .into());
        }

        // Held across the send so a command can never land behind the sentinel
        let _admitted = self
            .admission
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let state = self.state.load();
        if state != SequencerState::Running {
            return Err(DriverError::NotRunning(state));
        }

        self.sender
            .send_blocking(QueuedCommand::Execute(command))
            .map_err(|e| {
                if self.sender.is_closed() {
                    DriverError::NotRunning(SequencerState::Closed)
                } else {
                    DriverError::Queue(e)
                }
            })
    }

    /// Queue the shutdown sentinel and wait for the worker to reach it
    ///
    /// Everything enqueued before this call runs first. Calling it again, or
    /// after [`Sequencer::close`], does nothing.
    pub fn request_shutdown(&self) -> Result<()> {
        {
            // Waits for in-flight enqueues; later ones see Draining
            let _flip = self
                .admission
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if let Err(state) = self
                .state
                .transition(SequencerState::Running, SequencerState::Draining)
            {
                debug!("[{}] shutdown already requested ({})", self.name, state);
                return Ok(());
            }
        }

        let (sentinel, done) = QueuedCommand::shutdown();
        if let Err(e) = self.sender.send_blocking(sentinel) {
            if self.sender.is_closed() {
                return Ok(());
            }
            return Err(e.into());
        }

        info!(
            "[{}] waiting for {} queued command(s) to drain",
            self.name,
            self.sender.len().saturating_sub(1)
        );

        match done.blocking_recv() {
            Ok(()) => debug!("[{}] shutdown handshake complete", self.name),
            Err(_) => warn!("[{}] closed before the queue drained", self.name),
        }
        Ok(())
    }

    /// Stop the worker and release the device
    ///
    /// Without a prior [`Sequencer::request_shutdown`] this is an abrupt stop:
    /// queued commands are discarded. Waits for a command already in flight.
    /// Safe to call more than once.
    pub fn close(&self) -> Result<()> {
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(handle) = handle else {
            return Ok(());
        };

        // Fail blocked senders first
        self.discard.store(true, Ordering::Release);
        self.sender.close();
        self.state.store(SequencerState::Closed);

        let mut actuator = handle.join().map_err(|_| {
            error!("[{}] worker thread panicked", self.name);
            DriverError::WorkerPanicked
        })?;
        actuator.close();

        info!("[{}] sequencer closed", self.name);
        Ok(())
    }
}

impl Drop for Sequencer {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            error!("[{}] error closing sequencer: {}", self.name, e);
        }
    }
}

/// State moved onto the worker thread
struct Worker {
    name: String,
    actuator: Actuator,
    receiver: CommandReceiver,
    limits: DurationLimits,
    pacer: Box<dyn Pacer>,
    observer: Arc<dyn CommandObserver>,
    discard: Arc<AtomicBool>,
    state: Arc<StateCell>,
}

impl Worker {
    /// Drain the queue until the sentinel arrives or the queue is closed
    ///
    /// Hands the actuator back so the sequencer can release it.
    fn run(mut self) -> Actuator {
        debug!("[{}] worker thread started", self.name);

        loop {
            let item = match self.receiver.recv_blocking() {
                Ok(item) => item,
                Err(_) => {
                    debug!("[{}] queue closed", self.name);
                    break;
                }
            };

            if self.discard.load(Ordering::Acquire) {
                let dropped = 1 + self.receiver.close_and_discard();
                self.observer.on_commands_discarded(&self.name, dropped);
                break;
            }

            match item {
                QueuedCommand::Shutdown { done } => {
                    self.receiver.close_and_discard();
                    self.state.store(SequencerState::Closed);
                    self.observer.on_shutdown_complete(&self.name);
                    let _ = done.send(());
                    break;
                }
                QueuedCommand::Execute(command) => self.execute(command),
            }
        }

        self.state.store(SequencerState::Closed);
        debug!("[{}] worker thread stopped", self.name);
        self.actuator
    }

    fn execute(&mut self, command: Command) {
        let action = command.action();
        let pause = self.limits.normalize(action, command.requested_duration());

        // A panicking transport must not take the worker down with it
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.actuator.send(action)
        }));

        match result {
            Ok(Ok(())) => self.observer.on_command_sent(&self.name, &command, pause),
            Ok(Err(e)) => self.observer.on_command_failed(&self.name, &command, &e),
            Err(panic) => {
                error!("[{}] panic while sending {}: {:?}", self.name, action, panic);
                self.observer
                    .on_command_failed(&self.name, &command, &DriverError::WorkerPanicked);
            }
        }

        if !pause.is_zero() {
            self.pacer.pause(pause);
        }
    }
}
