//! Sequencer integration tests
//!
//! Drive a full sequencer against the in-memory transport and check the
//! order of transfers and pauses the device would have seen.

use driver::test_utils::{
    DEFAULT_TEST_TIMEOUT, GatedPacer, MockTransport, RecordingObserver, RecordingPacer, Timeline,
    TimelineEvent, wait_until,
};
use driver::{
    Actuator, DriverError, LoggingObserver, Sequencer, SequencerConfig, SequencerState,
    TransportError,
};
use protocol::{CLASSIC_IDENTITY, Command, DeviceFamily, DeviceIdentity, THUNDER_IDENTITY};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

fn thunder_sequencer(
    mock: &MockTransport,
    pacer: RecordingPacer,
    observer: Arc<RecordingObserver>,
) -> Sequencer {
    Sequencer::spawn_with(
        Actuator::new(mock.clone(), DeviceFamily::Thunder, THUNDER_IDENTITY),
        SequencerConfig::default(),
        Box::new(pacer),
        observer,
    )
    .unwrap()
}

mod ordering {
    use super::*;

    #[test]
    fn test_light_and_sweep_scenario() {
        let timeline = Timeline::new();
        let mock = MockTransport::with_timeline(timeline.clone());
        let pacer = RecordingPacer::with_timeline(timeline.clone());
        let sequencer = thunder_sequencer(&mock, pacer, Arc::new(RecordingObserver::new()));

        sequencer.enqueue(Command::light_on(Duration::ZERO)).unwrap();
        sequencer.enqueue(Command::left(Duration::from_secs(1))).unwrap();
        sequencer.enqueue(Command::right(Duration::from_secs(1))).unwrap();
        sequencer.enqueue(Command::stop(Duration::ZERO)).unwrap();
        sequencer.enqueue(Command::light_off(Duration::ZERO)).unwrap();
        sequencer.request_shutdown().unwrap();
        sequencer.close().unwrap();

        let report = |category: u8, code: u8| vec![category, code, 0, 0, 0, 0, 0, 0];
        let one_second = TimelineEvent::Pause(Duration::from_secs(1));

        let events: Vec<TimelineEvent> = timeline.events();
        let shape: Vec<String> = events
            .iter()
            .map(|e| match e {
                TimelineEvent::Transfer(t) => format!("send {:?}", t.data),
                TimelineEvent::Pause(d) => format!("pause {:?}", d),
                TimelineEvent::Closed => "closed".to_string(),
            })
            .collect();
        assert_eq!(events.len(), 8, "unexpected timeline: {:?}", shape);

        let transfers = timeline.transfers();
        assert_eq!(transfers.len(), 5);
        assert_eq!(transfers[0].data, report(0x03, 0x01));
        assert_eq!(transfers[1].data, report(0x02, 0x04));
        assert_eq!(transfers[2].data, report(0x02, 0x08));
        assert_eq!(transfers[3].data, report(0x02, 0x20));
        assert_eq!(transfers[4].data, report(0x03, 0x00));
        assert!(transfers.iter().all(|t| t.request_type == 0x21 && t.request == 0x09));

        // A pause only follows each of the two timed moves
        assert!(matches!(events[0], TimelineEvent::Transfer(_)));
        assert!(matches!(events[1], TimelineEvent::Transfer(_)));
        assert_eq!(events[2], one_second);
        assert!(matches!(events[3], TimelineEvent::Transfer(_)));
        assert_eq!(events[4], one_second);
        assert!(matches!(events[5], TimelineEvent::Transfer(_)));
        assert!(matches!(events[6], TimelineEvent::Transfer(_)));
        assert_eq!(events[7], TimelineEvent::Closed);
    }

    #[test]
    fn test_each_producer_keeps_its_own_order() {
        let mock = MockTransport::new();
        let sequencer = thunder_sequencer(
            &mock,
            RecordingPacer::new(),
            Arc::new(RecordingObserver::new()),
        );

        // Producer A only moves up and down, producer B only left and right
        std::thread::scope(|s| {
            s.spawn(|| {
                for i in 0..20u64 {
                    let cmd = if i % 2 == 0 {
                        Command::up(Duration::from_millis(i))
                    } else {
                        Command::down(Duration::from_millis(i))
                    };
                    sequencer.enqueue(cmd).unwrap();
                }
            });
            s.spawn(|| {
                for i in 0..20u64 {
                    let cmd = if i % 2 == 0 {
                        Command::left(Duration::from_millis(i))
                    } else {
                        Command::right(Duration::from_millis(i))
                    };
                    sequencer.enqueue(cmd).unwrap();
                }
            });
        });
        sequencer.request_shutdown().unwrap();

        let codes: Vec<u8> = mock.transfers().iter().map(|t| t.data[1]).collect();
        assert_eq!(codes.len(), 40);

        let vertical: Vec<u8> = codes.iter().copied().filter(|c| *c <= 0x02).collect();
        let horizontal: Vec<u8> = codes.iter().copied().filter(|c| *c >= 0x04).collect();
        let expected_vertical: Vec<u8> = (0..20).map(|i| if i % 2 == 0 { 0x02 } else { 0x01 }).collect();
        let expected_horizontal: Vec<u8> =
            (0..20).map(|i| if i % 2 == 0 { 0x04 } else { 0x08 }).collect();
        assert_eq!(vertical, expected_vertical);
        assert_eq!(horizontal, expected_horizontal);
    }

    #[test]
    fn test_classic_wire_format() {
        let mock = MockTransport::new();
        let sequencer = Sequencer::spawn_with(
            Actuator::new(mock.clone(), DeviceFamily::Classic, CLASSIC_IDENTITY),
            SequencerConfig::default(),
            Box::new(RecordingPacer::new()),
            Arc::new(LoggingObserver),
        )
        .unwrap();

        sequencer.enqueue(Command::fire(Duration::ZERO)).unwrap();
        sequencer.request_shutdown().unwrap();

        let transfers = mock.transfers();
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].value, 0x0200);
        assert_eq!(transfers[0].index, 0);
        assert_eq!(transfers[0].data, vec![0x10]);
    }
}

mod backpressure {
    use super::*;

    #[test]
    fn test_full_queue_blocks_until_worker_advances() {
        let mock = MockTransport::new();
        let (pacer, gate) = GatedPacer::new();
        let sequencer = Sequencer::spawn_with(
            Actuator::new(mock.clone(), DeviceFamily::Thunder, THUNDER_IDENTITY),
            SequencerConfig::default(),
            Box::new(pacer),
            Arc::new(LoggingObserver),
        )
        .unwrap();

        // Park the worker inside the pause of the first command
        sequencer.enqueue(Command::left(Duration::from_secs(1))).unwrap();
        assert_eq!(gate.wait_entered(), Some(Duration::from_secs(1)));

        for _ in 0..64 {
            sequencer.enqueue(Command::stop(Duration::ZERO)).unwrap();
        }
        assert_eq!(sequencer.pending(), 64);

        let accepted = AtomicBool::new(false);
        std::thread::scope(|s| {
            s.spawn(|| {
                sequencer.enqueue(Command::right(Duration::ZERO)).unwrap();
                accepted.store(true, Ordering::SeqCst);
            });

            std::thread::sleep(Duration::from_millis(100));
            assert!(!accepted.load(Ordering::SeqCst), "enqueue should block on a full queue");

            gate.release();
            assert!(wait_until(DEFAULT_TEST_TIMEOUT, || accepted.load(Ordering::SeqCst)));
        });

        sequencer.request_shutdown().unwrap();

        let transfers = mock.transfers();
        assert_eq!(transfers.len(), 66);
        assert_eq!(transfers[0].data[1], 0x04);
        assert_eq!(transfers[65].data[1], 0x08);
    }

    #[test]
    fn test_close_releases_blocked_producer() {
        let mock = MockTransport::new();
        let (pacer, gate) = GatedPacer::new();
        let config = SequencerConfig {
            capacity: 1,
            ..SequencerConfig::default()
        };
        let sequencer = Sequencer::spawn_with(
            Actuator::new(mock.clone(), DeviceFamily::Thunder, THUNDER_IDENTITY),
            config,
            Box::new(pacer),
            Arc::new(LoggingObserver),
        )
        .unwrap();

        sequencer.enqueue(Command::up(Duration::from_millis(500))).unwrap();
        gate.wait_entered();
        sequencer.enqueue(Command::down(Duration::ZERO)).unwrap();

        std::thread::scope(|s| {
            let producer = s.spawn(|| sequencer.enqueue(Command::left(Duration::ZERO)));

            std::thread::sleep(Duration::from_millis(50));
            // Let the worker finish its pause once close is under way
            s.spawn(|| {
                wait_until(DEFAULT_TEST_TIMEOUT, || {
                    sequencer.state() == SequencerState::Closed
                });
                gate.open();
            });
            sequencer.close().unwrap();

            let result = producer.join().unwrap();
            assert!(matches!(
                result,
                Err(DriverError::NotRunning(SequencerState::Closed))
            ));
        });

        // Only the command that was in flight reached the device
        assert_eq!(mock.transfer_count(), 1);
        assert_eq!(mock.close_count(), 1);
    }
}

mod shutdown {
    use super::*;

    #[test]
    fn test_shutdown_drains_everything() {
        let mock = MockTransport::new();
        let observer = Arc::new(RecordingObserver::new());
        let sequencer = thunder_sequencer(&mock, RecordingPacer::new(), observer.clone());

        for _ in 0..10 {
            sequencer.enqueue(Command::fire(Duration::from_millis(4500))).unwrap();
        }
        sequencer.request_shutdown().unwrap();

        assert_eq!(mock.transfer_count(), 10);
        assert_eq!(observer.sent_count(), 10);
        assert_eq!(observer.shutdowns(), 1);
        assert_eq!(observer.discarded(), 0);

        // Transport stays open until close
        assert_eq!(mock.close_count(), 0);
        sequencer.close().unwrap();
        assert_eq!(mock.close_count(), 1);
    }

    #[test]
    fn test_close_without_shutdown_discards_queue() {
        let mock = MockTransport::new();
        let (pacer, gate) = GatedPacer::new();
        let observer = Arc::new(RecordingObserver::new());
        let sequencer = Sequencer::spawn_with(
            Actuator::new(mock.clone(), DeviceFamily::Thunder, THUNDER_IDENTITY),
            SequencerConfig::default(),
            Box::new(pacer),
            observer.clone(),
        )
        .unwrap();

        sequencer.enqueue(Command::right(Duration::from_secs(1))).unwrap();
        gate.wait_entered();
        for _ in 0..5 {
            sequencer.enqueue(Command::stop(Duration::ZERO)).unwrap();
        }

        std::thread::scope(|s| {
            s.spawn(|| {
                // Wait until close has flipped the state before releasing the worker
                wait_until(DEFAULT_TEST_TIMEOUT, || {
                    sequencer.state() == SequencerState::Closed
                });
                gate.open();
            });
            sequencer.close().unwrap();
        });

        assert_eq!(mock.transfer_count(), 1);
        assert_eq!(observer.discarded(), 5);
        assert_eq!(observer.shutdowns(), 0);
        assert_eq!(mock.close_count(), 1);
    }

    #[test]
    fn test_state_readable_while_shutdown_waits() {
        let mock = MockTransport::new();
        let (pacer, gate) = GatedPacer::new();
        let config = SequencerConfig {
            capacity: 1,
            ..SequencerConfig::default()
        };
        let sequencer = Sequencer::spawn_with(
            Actuator::new(mock.clone(), DeviceFamily::Thunder, THUNDER_IDENTITY),
            config,
            Box::new(pacer),
            Arc::new(LoggingObserver),
        )
        .unwrap();

        // Worker parked in a pause, queue full
        sequencer.enqueue(Command::up(Duration::from_secs(1))).unwrap();
        gate.wait_entered();
        sequencer.enqueue(Command::down(Duration::ZERO)).unwrap();

        let observed_draining = AtomicBool::new(false);
        let reader_done = AtomicBool::new(false);
        std::thread::scope(|s| {
            let shutdown = s.spawn(|| sequencer.request_shutdown());
            s.spawn(|| {
                let seen = wait_until(Duration::from_millis(500), || {
                    sequencer.state() == SequencerState::Draining
                });
                observed_draining.store(seen, Ordering::SeqCst);
                reader_done.store(true, Ordering::SeqCst);
            });

            let returned = wait_until(DEFAULT_TEST_TIMEOUT, || reader_done.load(Ordering::SeqCst));
            assert!(!shutdown.is_finished());
            gate.open();

            assert!(returned, "state() blocked behind request_shutdown");
            assert!(observed_draining.load(Ordering::SeqCst));
            shutdown.join().unwrap().unwrap();
        });

        assert_eq!(sequencer.state(), SequencerState::Closed);
        assert_eq!(mock.transfer_count(), 2);
    }

    #[test]
    fn test_state_closed_once_queue_drained() {
        let mock = MockTransport::new();
        let observer = Arc::new(RecordingObserver::new());
        let sequencer = thunder_sequencer(&mock, RecordingPacer::new(), observer.clone());

        sequencer.enqueue(Command::left(Duration::ZERO)).unwrap();
        sequencer.request_shutdown().unwrap();

        assert_eq!(sequencer.state(), SequencerState::Closed);
        assert!(matches!(
            sequencer.enqueue(Command::right(Duration::ZERO)),
            Err(DriverError::NotRunning(SequencerState::Closed))
        ));
        assert_eq!(mock.close_count(), 0);

        sequencer.close().unwrap();
        assert_eq!(mock.close_count(), 1);
    }

    #[test]
    fn test_close_is_idempotent() {
        let mock = MockTransport::new();
        let sequencer = thunder_sequencer(
            &mock,
            RecordingPacer::new(),
            Arc::new(RecordingObserver::new()),
        );

        sequencer.request_shutdown().unwrap();
        sequencer.close().unwrap();
        sequencer.close().unwrap();
        sequencer.request_shutdown().unwrap();
        drop(sequencer);

        assert_eq!(mock.close_count(), 1);
    }

    #[test]
    fn test_enqueue_after_close_fails() {
        let mock = MockTransport::new();
        let sequencer = thunder_sequencer(
            &mock,
            RecordingPacer::new(),
            Arc::new(RecordingObserver::new()),
        );
        sequencer.close().unwrap();

        assert!(matches!(
            sequencer.enqueue(Command::up(Duration::ZERO)),
            Err(DriverError::NotRunning(SequencerState::Closed))
        ));
        assert_eq!(mock.transfer_count(), 0);
    }
}

mod failures {
    use super::*;

    #[test]
    fn test_light_rejected_before_queueing_on_classic() {
        let mock = MockTransport::new();
        let sequencer = Sequencer::spawn_with(
            Actuator::new(mock.clone(), DeviceFamily::Classic, CLASSIC_IDENTITY),
            SequencerConfig::default(),
            Box::new(RecordingPacer::new()),
            Arc::new(LoggingObserver),
        )
        .unwrap();

        assert!(
            sequencer
                .enqueue(Command::light_on(Duration::ZERO))
                .unwrap_err()
                .is_unsupported_capability()
        );
        sequencer.enqueue(Command::left(Duration::ZERO)).unwrap();
        sequencer.request_shutdown().unwrap();

        assert_eq!(mock.transfer_count(), 1);
    }

    #[test]
    fn test_unknown_family_rejects_everything() {
        let mock = MockTransport::new();
        let identity = DeviceIdentity::new(0x1234, 0x5678);
        let sequencer = Sequencer::spawn_with(
            Actuator::new(mock.clone(), DeviceFamily::Unknown, identity),
            SequencerConfig::default(),
            Box::new(RecordingPacer::new()),
            Arc::new(LoggingObserver),
        )
        .unwrap();

        assert_eq!(
            sequencer.human_readable_name(),
            "Unknown Turret (0x1234:0x5678)"
        );
        assert!(
            sequencer
                .enqueue(Command::up(Duration::ZERO))
                .unwrap_err()
                .is_unsupported_capability()
        );
        assert_eq!(mock.transfer_count(), 0);
    }

    #[test]
    fn test_transport_failure_still_paces() {
        let timeline = Timeline::new();
        let mock = MockTransport::with_timeline(timeline.clone());
        mock.fail_transfer(0, TransportError::Other("pipe error".to_string()));
        let observer = Arc::new(RecordingObserver::new());
        let sequencer = thunder_sequencer(
            &mock,
            RecordingPacer::with_timeline(timeline.clone()),
            observer.clone(),
        );

        sequencer.enqueue(Command::down(Duration::from_millis(300))).unwrap();
        sequencer.enqueue(Command::up(Duration::from_millis(300))).unwrap();
        sequencer.request_shutdown().unwrap();

        assert_eq!(timeline.pauses(), vec![Duration::from_millis(300); 2]);
        let failures = observer.failures();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].1.contains("pipe error"));
        assert_eq!(observer.sent_count(), 1);
    }
}
