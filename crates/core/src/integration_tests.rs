//! Integration tests: exercise full polling cycles against a simulated mouse.
//!
//! Each test attaches mock devices to a mock USB stack, runs the poller, and
//! checks both the outcome and the recorded USB traffic.

#[cfg(test)]
mod tests {
    use crate::catalog::pids;
    use crate::error::Error;
    use crate::frame::{commands, FRAME_LEN};
    use crate::poller::{BatteryPoller, BatteryState, LastKnown, PollOutcome};
    use crate::session::SETTLE_DELAY;
    use crate::transport::mock::{EventLog, FailAt, MockBackend, MockDevice, MockEvent};
    use crate::transport::ControlSetup;
    use crate::RAZER_VID;
    use std::time::Duration;

    const BATTERY: u8 = commands::BATTERY_LEVEL.id;
    const CHARGING: u8 = commands::CHARGING_STATE.id;

    fn mouse(pid: u16, battery: u8, charging: u8) -> MockDevice {
        MockDevice::new(RAZER_VID, pid)
            .with_reply(BATTERY, battery)
            .with_reply(CHARGING, charging)
    }

    fn poller_for(backend: MockBackend) -> (BatteryPoller, EventLog) {
        let log = backend.log();
        let clock = backend.clock();
        (BatteryPoller::new(Box::new(backend), Box::new(clock)), log)
    }

    fn is_open(e: &MockEvent) -> bool {
        matches!(e, MockEvent::Open(_))
    }

    fn is_close(e: &MockEvent) -> bool {
        *e == MockEvent::Close
    }

    /// Test: Viper Ultimate at half charge on the cable.
    #[test]
    fn viper_ultimate_full_cycle() {
        let backend = MockBackend::new().with_device(mouse(pids::VIPER_ULTIMATE, 128, 1));
        let (poller, log) = poller_for(backend);

        assert_eq!(
            poller.poll_once(),
            PollOutcome::Ready(BatteryState {
                battery_percent: 50.2,
                is_charging: true,
            })
        );

        // Both frames carry the Viper's transaction ID.
        let frames: Vec<Vec<u8>> = log
            .events()
            .into_iter()
            .filter_map(|e| match e {
                MockEvent::ControlOut { data, .. } => Some(data),
                _ => None,
            })
            .collect();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], commands::BATTERY_LEVEL.encode(0x3F).to_vec());
        assert_eq!(frames[1], commands::CHARGING_STATE.encode(0x3F).to_vec());
        assert_eq!(log.count(is_close), 1);
    }

    /// Test: models with transaction ID 0x1F get it in byte 1.
    #[test]
    fn basilisk_uses_its_transaction_id() {
        let backend =
            MockBackend::new().with_device(mouse(pids::BASILISK_V3_PRO_WIRELESS, 255, 0));
        let (poller, log) = poller_for(backend);

        assert_eq!(
            poller.try_poll().unwrap(),
            BatteryState {
                battery_percent: 100.0,
                is_charging: false,
            }
        );
        let all_1f = log.events().iter().all(|e| match e {
            MockEvent::ControlOut { data, .. } => data[1] == 0x1F,
            _ => true,
        });
        assert!(all_1f);
    }

    /// Test: nothing attached means unreachable, and no session is opened.
    #[test]
    fn no_devices_is_unreachable_without_session() {
        let (poller, log) = poller_for(MockBackend::new());

        assert_eq!(poller.poll_once(), PollOutcome::Unreachable);
        assert!(matches!(poller.try_poll(), Err(Error::DeviceNotFound(_))));
        assert_eq!(log.count(is_open), 0);
        assert_eq!(log.count(is_close), 0);
    }

    /// Test: a non-Razer device with a catalogued PID is ignored.
    #[test]
    fn foreign_vendor_is_ignored() {
        let backend = MockBackend::new().with_device(
            MockDevice::new(0x046D, pids::VIPER_ULTIMATE)
                .with_reply(BATTERY, 200)
                .with_reply(CHARGING, 0),
        );
        let (poller, log) = poller_for(backend);
        assert_eq!(poller.poll_once(), PollOutcome::Unreachable);
        assert_eq!(log.count(is_open), 0);
    }

    /// Test: a zero reading is reported as unreachable, not as an empty battery.
    #[test]
    fn zero_reading_is_unreachable() {
        let backend = MockBackend::new().with_device(mouse(pids::VIPER_ULTIMATE, 0, 0));
        let (poller, _log) = poller_for(backend);

        assert_eq!(poller.try_poll().unwrap().battery_percent, 0.0);
        assert_eq!(poller.poll_once(), PollOutcome::Unreachable);
    }

    /// Test: claim failure closes the session and yields unreachable.
    #[test]
    fn claim_failure_closes_session() {
        let backend = MockBackend::new()
            .with_device(mouse(pids::VIPER_ULTIMATE, 128, 1).failing_at(FailAt::Claim));
        let (poller, log) = poller_for(backend);

        assert!(matches!(poller.try_poll(), Err(Error::InterfaceClaim(_))));
        assert_eq!(poller.poll_once(), PollOutcome::Unreachable);
        assert_eq!(log.count(is_open), 2);
        assert_eq!(log.count(is_close), 2);
        assert_eq!(
            log.count(|e| matches!(e, MockEvent::ControlOut { .. })),
            0
        );
    }

    /// Test: open failure surfaces as an open error with nothing to close.
    #[test]
    fn open_failure_is_unreachable() {
        let device = mouse(pids::DEATHADDER_V3_PRO_WIRELESS, 128, 1).failing_at(FailAt::Open);
        let backend = MockBackend::new().with_device(device);
        let (poller, log) = poller_for(backend);

        assert!(matches!(poller.try_poll(), Err(Error::Open(_))));
        assert_eq!(poller.poll_once(), PollOutcome::Unreachable);
        assert_eq!(log.count(is_close), 0);
    }

    /// Test: every transfer-stage failure still releases and closes.
    #[test]
    fn transfer_failures_release_and_close() {
        for step in [
            FailAt::ControlOut,
            FailAt::ShortWrite,
            FailAt::ControlIn,
            FailAt::Timeout,
        ] {
            let backend = MockBackend::new()
                .with_device(mouse(pids::VIPER_V2_PRO_WIRELESS, 128, 1).failing_at(step));
            let (poller, log) = poller_for(backend);

            let err = poller.try_poll().unwrap_err();
            match step {
                FailAt::Timeout => assert!(matches!(err, Error::TransferTimeout(_))),
                _ => assert!(matches!(err, Error::Transfer(_))),
            }
            assert_eq!(log.count(|e| *e == MockEvent::Release(0)), 1, "{step:?}");
            assert_eq!(log.count(is_close), 1, "{step:?}");
            assert_eq!(poller.poll_once(), PollOutcome::Unreachable);
        }
    }

    /// Test: a truncated reply is a decode error.
    #[test]
    fn short_reply_is_decode_error() {
        let backend = MockBackend::new().with_device(
            MockDevice::new(RAZER_VID, pids::NAGA_V2_PRO_WIRELESS)
                .with_raw_reply(BATTERY, vec![0x02, 0x1F, 0x00, 0x00])
                .with_reply(CHARGING, 0),
        );
        let (poller, log) = poller_for(backend);

        assert!(matches!(
            poller.try_poll(),
            Err(Error::Decode {
                expected: 10,
                actual: 4
            })
        ));
        assert_eq!(log.count(is_close), 1);
        assert_eq!(poller.poll_once(), PollOutcome::Unreachable);
    }

    /// Test: the two round trips are sequential, each with its own settle delay.
    #[test]
    fn transfers_are_sequential_with_settle_delay() {
        let backend = MockBackend::new().with_device(mouse(pids::VIPER_ULTIMATE, 200, 0));
        let clock = backend.clock();
        let (poller, log) = poller_for(backend);
        poller.poll_once();

        let transfers: Vec<(char, Duration, ControlSetup)> = log
            .events()
            .into_iter()
            .filter_map(|e| match e {
                MockEvent::ControlOut { at, setup, .. } => Some(('o', at, setup)),
                MockEvent::ControlIn { at, setup, length } => {
                    assert_eq!(length, FRAME_LEN);
                    Some(('i', at, setup))
                }
                _ => None,
            })
            .collect();

        let kinds: String = transfers.iter().map(|t| t.0).collect();
        assert_eq!(kinds, "oioi");
        for pair in transfers.chunks(2) {
            assert_eq!(pair[0].2, ControlSetup::SET_FEATURE_REPORT);
            assert_eq!(pair[1].2, ControlSetup::GET_FEATURE_REPORT);
            assert!(pair[1].1 - pair[0].1 >= SETTLE_DELAY);
        }
        assert!(clock.now() >= SETTLE_DELAY * 2);
    }

    /// Test: an unconfigured device gets configuration 1 before the claim.
    #[test]
    fn unconfigured_device_is_configured_first() {
        let backend =
            MockBackend::new().with_device(mouse(pids::VIPER_ULTIMATE, 128, 0).unconfigured());
        let (poller, log) = poller_for(backend);
        assert!(poller.poll_once().state().is_some());

        let events = log.events();
        let set = events
            .iter()
            .position(|e| *e == MockEvent::SetConfiguration(1))
            .expect("configuration selected");
        let claim = events
            .iter()
            .position(|e| *e == MockEvent::Claim(0))
            .expect("interface claimed");
        assert!(set < claim);
    }

    /// Test: charging byte values other than 1 read as not charging.
    #[test]
    fn unexpected_charging_value_is_not_charging() {
        let backend = MockBackend::new().with_device(mouse(pids::VIPER_ULTIMATE, 128, 2));
        let (poller, _log) = poller_for(backend);
        assert_eq!(poller.poll_once().state().map(|s| s.is_charging), Some(false));
    }

    /// Test: the first supported device wins when several are attached.
    #[test]
    fn first_supported_device_is_polled() {
        let backend = MockBackend::new()
            .with_device(MockDevice::new(RAZER_VID, 0x0999))
            .with_device(mouse(pids::DEATHADDER_V2_PRO_WIRELESS, 51, 0))
            .with_device(mouse(pids::VIPER_ULTIMATE, 255, 1));
        let (poller, log) = poller_for(backend);

        assert_eq!(
            poller.poll_once().state().map(|s| s.battery_percent),
            Some(20.0)
        );
        assert_eq!(
            log.count(|e| *e == MockEvent::Open(pids::DEATHADDER_V2_PRO_WIRELESS)),
            1
        );
        assert_eq!(log.count(is_open), 1);
    }

    /// Test: repeated cycles never leave an interface claimed.
    #[test]
    fn repeated_cycles_balance_claims() {
        let backend = MockBackend::new().with_device(mouse(pids::VIPER_ULTIMATE, 128, 1));
        let (poller, log) = poller_for(backend);
        for _ in 0..3 {
            assert!(matches!(poller.poll_once(), PollOutcome::Ready(_)));
        }
        assert_eq!(log.count(|e| matches!(e, MockEvent::Claim(_))), 3);
        assert_eq!(log.count(|e| matches!(e, MockEvent::Release(_))), 3);
        assert_eq!(log.count(is_close), 3);
    }

    /// Test: deliver publishes readings and signals disconnection.
    #[test]
    fn deliver_to_sink() {
        let backend = MockBackend::new().with_device(mouse(pids::VIPER_ULTIMATE, 128, 1));
        let (poller, _log) = poller_for(backend);
        let mut sink = LastKnown::default();

        poller.deliver(&mut sink);
        assert!(sink.connected);
        assert_eq!(sink.state.map(|s| s.summary()), Some("Charging: 50.2%".to_string()));

        let (empty, _log) = poller_for(MockBackend::new());
        assert_eq!(empty.deliver(&mut sink), PollOutcome::Unreachable);
        assert!(!sink.connected);
        assert!(sink.state.is_some());
    }

    /// Test: enumeration failure is unreachable rather than a panic.
    #[test]
    fn enumeration_failure_is_unreachable() {
        let (poller, _log) = poller_for(MockBackend::new().failing_enumeration());
        assert!(matches!(poller.try_poll(), Err(Error::Enumeration(_))));
        assert_eq!(poller.poll_once(), PollOutcome::Unreachable);
    }
}
