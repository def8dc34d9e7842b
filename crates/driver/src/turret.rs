//! High-level turret handle
//!
//! [`Turret`] wraps a [`Sequencer`] with the movements people actually ask
//! for. Every method only enqueues; the worker thread does the rest.

use crate::actuator::Actuator;
use crate::error::Result;
use crate::sequencer::{Sequencer, SequencerConfig, SequencerState};
use crate::transport::Transport;
use protocol::{Command, DeviceFamily, DeviceIdentity, LightAction};
use std::time::Duration;

/// Pause after each shot so the launcher can re-arm
pub const FIRE_COOLDOWN: Duration = Duration::from_millis(4500);
/// Pause between light toggles when blinking
pub const BLINK_INTERVAL: Duration = Duration::from_millis(200);
/// Pause after a stop
pub const STOP_PAUSE: Duration = Duration::from_millis(50);

/// Fixed pauses used by the convenience operations
///
/// These are not motion axes, so the duration limits never touch them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub fire_cooldown: Duration,
    pub blink_interval: Duration,
    pub stop_pause: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            fire_cooldown: FIRE_COOLDOWN,
            blink_interval: BLINK_INTERVAL,
            stop_pause: STOP_PAUSE,
        }
    }
}

/// One turret, driven through its command queue
pub struct Turret {
    sequencer: Sequencer,
    pacing: Pacing,
}

impl Turret {
    /// Wrap a running sequencer
    pub fn new(sequencer: Sequencer, pacing: Pacing) -> Self {
        Self { sequencer, pacing }
    }

    /// Spawn a sequencer for `transport` with the default pacer and observer
    pub fn open(
        transport: impl Transport,
        family: DeviceFamily,
        identity: DeviceIdentity,
        config: SequencerConfig,
        pacing: Pacing,
    ) -> Result<Self> {
        let actuator = Actuator::new(transport, family, identity);
        let sequencer = Sequencer::spawn(actuator, config)?;
        Ok(Self::new(sequencer, pacing))
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn family(&self) -> DeviceFamily {
        self.sequencer.family()
    }

    pub fn human_readable_name(&self) -> String {
        self.sequencer.human_readable_name()
    }

    pub fn state(&self) -> SequencerState {
        self.sequencer.state()
    }

    pub fn enqueue(&self, command: Command) -> Result<()> {
        self.sequencer.enqueue(command)
    }

    /// Rotate left for `duration`
    pub fn left(&self, duration: Duration) -> Result<()> {
        self.enqueue(Command::left(duration))
    }

    /// Rotate right for `duration`
    pub fn right(&self, duration: Duration) -> Result<()> {
        self.enqueue(Command::right(duration))
    }

    /// Tilt up for `duration`
    pub fn up(&self, duration: Duration) -> Result<()> {
        self.enqueue(Command::up(duration))
    }

    /// Tilt down for `duration`
    pub fn down(&self, duration: Duration) -> Result<()> {
        self.enqueue(Command::down(duration))
    }

    /// Interrupt any movement
    pub fn stop(&self) -> Result<()> {
        self.enqueue(Command::stop(self.pacing.stop_pause))
    }

    /// Fire `shots` missiles, one cooldown each
    pub fn fire(&self, shots: u32) -> Result<()> {
        for _ in 0..shots {
            self.enqueue(Command::fire(self.pacing.fire_cooldown))?;
        }
        Ok(())
    }

    pub fn light(&self, on: bool) -> Result<()> {
        self.enqueue(Command::light(LightAction::from(on), Duration::ZERO))
    }

    /// Blink the light `times` times, ending lit
    pub fn blink_on(&self, times: u32) -> Result<()> {
        self.blink(times, LightAction::Off, LightAction::On)
    }

    /// Blink the light `times` times, ending dark
    pub fn blink_off(&self, times: u32) -> Result<()> {
        self.blink(times, LightAction::On, LightAction::Off)
    }

    fn blink(&self, times: u32, first: LightAction, last: LightAction) -> Result<()> {
        let interval = self.pacing.blink_interval;
        for _ in 0..times {
            self.enqueue(Command::light(first, interval))?;
            self.enqueue(Command::light(last, interval))?;
        }
        Ok(())
    }

    /// Park in the lowest, leftmost position
    ///
    /// Runs a full tilt down followed by a full pan left.
    pub fn reset(&self) -> Result<()> {
        let limits = *self.sequencer.limits();
        self.down(limits.vertical_ceiling())?;
        self.left(limits.horizontal_ceiling())
    }

    /// Wait for every queued command to run, then release the device
    pub fn shutdown(&self) -> Result<()> {
        self.sequencer.request_shutdown()?;
        self.sequencer.close()
    }

    /// Release the device now, dropping queued commands
    pub fn close(&self) -> Result<()> {
        self.sequencer.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::LoggingObserver;
    use crate::test_utils::{MockTransport, RecordingPacer};
    use protocol::THUNDER_IDENTITY;
    use std::sync::Arc;

    fn recorded_turret() -> (Turret, MockTransport, RecordingPacer) {
        let mock = MockTransport::new();
        let pacer = RecordingPacer::new();
        let sequencer = Sequencer::spawn_with(
            Actuator::new(mock.clone(), DeviceFamily::Thunder, THUNDER_IDENTITY),
            SequencerConfig::default(),
            Box::new(pacer.clone()),
            Arc::new(LoggingObserver),
        )
        .unwrap();
        (Turret::new(sequencer, Pacing::default()), mock, pacer)
    }

    #[test]
    fn test_fire_paces_each_shot() {
        let (turret, mock, pacer) = recorded_turret();
        turret.fire(3).unwrap();
        turret.shutdown().unwrap();

        assert_eq!(mock.transfer_count(), 3);
        assert!(mock.transfers().iter().all(|t| t.data[1] == 0x10));
        assert_eq!(pacer.pauses(), vec![FIRE_COOLDOWN; 3]);
    }

    #[test]
    fn test_blink_on_ends_lit() {
        let (turret, mock, pacer) = recorded_turret();
        turret.blink_on(2).unwrap();
        turret.shutdown().unwrap();

        let values: Vec<u8> = mock.transfers().iter().map(|t| t.data[1]).collect();
        assert_eq!(values, vec![0x00, 0x01, 0x00, 0x01]);
        assert_eq!(pacer.pauses(), vec![BLINK_INTERVAL; 4]);
    }

    #[test]
    fn test_blink_off_ends_dark() {
        let (turret, mock, _pacer) = recorded_turret();
        turret.blink_off(1).unwrap();
        turret.shutdown().unwrap();

        let values: Vec<u8> = mock.transfers().iter().map(|t| t.data[1]).collect();
        assert_eq!(values, vec![0x01, 0x00]);
    }

    #[test]
    fn test_reset_moves_down_then_left() {
        let (turret, mock, pacer) = recorded_turret();
        turret.reset().unwrap();
        turret.shutdown().unwrap();

        let values: Vec<u8> = mock.transfers().iter().map(|t| t.data[1]).collect();
        assert_eq!(values, vec![0x01, 0x04]);
        assert_eq!(
            pacer.pauses(),
            vec![Duration::from_secs(2), Duration::from_secs(8)]
        );
    }

    #[test]
    fn test_stop_and_light() {
        let (turret, mock, pacer) = recorded_turret();
        turret.light(true).unwrap();
        turret.stop().unwrap();
        turret.light(false).unwrap();
        turret.shutdown().unwrap();

        let transfers = mock.transfers();
        assert_eq!(transfers[0].data[..2], [0x03, 0x01]);
        assert_eq!(transfers[1].data[..2], [0x02, 0x20]);
        assert_eq!(transfers[2].data[..2], [0x03, 0x00]);
        assert_eq!(pacer.pauses(), vec![STOP_PAUSE]);
    }

    #[test]
    fn test_shutdown_twice() {
        let (turret, mock, _pacer) = recorded_turret();
        turret.left(Duration::ZERO).unwrap();
        turret.shutdown().unwrap();
        turret.shutdown().unwrap();
        turret.close().unwrap();

        assert_eq!(mock.transfer_count(), 1);
        assert_eq!(mock.close_count(), 1);
        assert_eq!(turret.state(), SequencerState::Closed);
    }
}
