//! Test utilities for rust-turret
//!
//! Provides an in-memory transport, pacers that record or hold pauses, and an
//! observer that remembers what the worker reported. All of them are cheap
//! clones sharing state, so a test keeps one copy and hands the other to the
//! sequencer.
//!
//! # Example
//!
//! ```
//! use driver::test_utils::{MockTransport, Timeline};
//! use driver::Actuator;
//! use protocol::{Action, DeviceFamily, MotionAction, THUNDER_IDENTITY};
//!
//! let timeline = Timeline::new();
//! let mock = MockTransport::with_timeline(timeline.clone());
//! let mut actuator = Actuator::new(mock.clone(), DeviceFamily::Thunder, THUNDER_IDENTITY);
//! actuator.send(Action::Motion(MotionAction::Stop)).unwrap();
//! assert_eq!(timeline.transfers().len(), 1);
//! ```

use crate::error::{DriverError, TransportError};
use crate::observer::CommandObserver;
use crate::pacer::Pacer;
use crate::transport::Transport;
use async_channel::{Receiver, Sender, unbounded};
use protocol::Command;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Default test timeout (5 seconds)
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// One control transfer as seen by [`MockTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedTransfer {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub data: Vec<u8>,
}

/// Things that happened to a device, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineEvent {
    Transfer(RecordedTransfer),
    Pause(Duration),
    Closed,
}

/// Shared, ordered record of transfers and pauses
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    events: Arc<Mutex<Vec<TimelineEvent>>>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: TimelineEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    pub fn events(&self) -> Vec<TimelineEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn transfers(&self) -> Vec<RecordedTransfer> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                TimelineEvent::Transfer(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    pub fn pauses(&self) -> Vec<Duration> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                TimelineEvent::Pause(d) => Some(d),
                _ => None,
            })
            .collect()
    }
}

/// In-memory [`Transport`]
///
/// Records every attempted transfer. Individual calls can be made to fail by
/// their zero-based index.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    timeline: Timeline,
    calls: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
    failures: Arc<Mutex<HashMap<usize, TransportError>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record into an existing timeline (shared with a pacer)
    pub fn with_timeline(timeline: Timeline) -> Self {
        Self {
            timeline,
            ..Self::default()
        }
    }

    /// Make the `call`-th transfer fail with `error`
    pub fn fail_transfer(&self, call: usize, error: TransportError) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(call, error);
    }

    pub fn transfers(&self) -> Vec<RecordedTransfer> {
        self.timeline.transfers()
    }

    pub fn transfer_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl Transport for MockTransport {
    fn control_transfer(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
    ) -> Result<(), TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.timeline.push(TimelineEvent::Transfer(RecordedTransfer {
            request_type,
            request,
            value,
            index,
            data: data.to_vec(),
        }));

        match self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&call)
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.timeline.push(TimelineEvent::Closed);
    }
}

/// [`Pacer`] that records pauses instead of sleeping
#[derive(Debug, Clone, Default)]
pub struct RecordingPacer {
    timeline: Timeline,
}

impl RecordingPacer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeline(timeline: Timeline) -> Self {
        Self { timeline }
    }

    pub fn pauses(&self) -> Vec<Duration> {
        self.timeline.pauses()
    }
}

impl Pacer for RecordingPacer {
    fn pause(&mut self, duration: Duration) {
        self.timeline.push(TimelineEvent::Pause(duration));
    }
}

/// [`Pacer`] that holds the worker inside each pause until released
///
/// Lets a test freeze the worker mid-pacing, e.g. to fill the queue.
pub struct GatedPacer {
    entered: Sender<Duration>,
    release: Receiver<()>,
}

/// Test-side handle of a [`GatedPacer`]
#[derive(Clone)]
pub struct PacerGate {
    entered: Receiver<Duration>,
    release: Sender<()>,
}

impl GatedPacer {
    pub fn new() -> (Self, PacerGate) {
        let (entered_tx, entered_rx) = unbounded();
        let (release_tx, release_rx) = unbounded();
        (
            Self {
                entered: entered_tx,
                release: release_rx,
            },
            PacerGate {
                entered: entered_rx,
                release: release_tx,
            },
        )
    }
}

impl Pacer for GatedPacer {
    fn pause(&mut self, duration: Duration) {
        let _ = self.entered.send_blocking(duration);
        // A dropped gate lets the worker run freely
        let _ = self.release.recv_blocking();
    }
}

impl PacerGate {
    /// Wait until the worker enters its next pause
    pub fn wait_entered(&self) -> Option<Duration> {
        self.entered.recv_blocking().ok()
    }

    /// Let the worker leave one pause
    pub fn release(&self) {
        let _ = self.release.send_blocking(());
    }

    /// Let the worker leave every future pause
    pub fn open(&self) {
        self.release.close();
    }
}

/// What a [`RecordingObserver`] saw
#[derive(Debug, Clone)]
pub enum ObservedEvent {
    Sent { command: Command, pause: Duration },
    Failed { command: Command, error: String },
    Discarded(usize),
    ShutdownComplete,
}

/// [`CommandObserver`] that keeps every notification
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ObservedEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: ObservedEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    pub fn events(&self) -> Vec<ObservedEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn failures(&self) -> Vec<(Command, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ObservedEvent::Failed { command, error } => Some((command, error)),
                _ => None,
            })
            .collect()
    }

    pub fn sent_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ObservedEvent::Sent { .. }))
            .count()
    }

    pub fn discarded(&self) -> usize {
        self.events()
            .iter()
            .map(|e| match e {
                ObservedEvent::Discarded(n) => *n,
                _ => 0,
            })
            .sum()
    }

    pub fn shutdowns(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ObservedEvent::ShutdownComplete))
            .count()
    }
}

impl CommandObserver for RecordingObserver {
    fn on_command_sent(&self, _device: &str, command: &Command, pause: Duration) {
        self.push(ObservedEvent::Sent {
            command: *command,
            pause,
        });
    }

    fn on_command_failed(&self, _device: &str, command: &Command, error: &DriverError) {
        self.push(ObservedEvent::Failed {
            command: *command,
            error: error.to_string(),
        });
    }

    fn on_commands_discarded(&self, _device: &str, count: usize) {
        self.push(ObservedEvent::Discarded(count));
    }

    fn on_shutdown_complete(&self, _device: &str) {
        self.push(ObservedEvent::ShutdownComplete);
    }
}

/// Poll `condition` until it holds or `timeout` passes
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}
