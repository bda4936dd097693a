use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel as xch;
use rstest::rstest;
use shade_core::builder::validate_and_build;
use shade_core::mocks::{ManualClock, RecordingSink, RelayLog, SpyActuator, never_both_active};
use shade_core::{
    AutomationCfg, Channel, CoverStateMachine, DriveCfg, ExternalSwitchObserver, Origin,
    SwitchEvent, SwitchProbe,
};
use shade_traits::clock::MonotonicClock;

fn rig() -> (
    ManualClock,
    RelayLog,
    CoverStateMachine<SpyActuator, RecordingSink>,
) {
    let clock = ManualClock::new();
    let log = RelayLog::default();
    let cover = validate_and_build(
        SpyActuator::new(Channel::Up, log.clone()),
        SpyActuator::new(Channel::Down, log.clone()),
        RecordingSink::new(),
        DriveCfg::default(),
        None,
        AutomationCfg::default(),
        Arc::new(clock.clone()),
    )
    .expect("build cover");
    (clock, log, cover)
}

fn external(channel: Channel, active: bool) -> SwitchEvent {
    SwitchEvent {
        channel,
        active,
        origin: Origin::External,
    }
}

/// Count how many times the replayed relay state transitions into
/// "both released" after at least one channel was engaged.
fn stop_count(log: &[(Channel, bool)]) -> usize {
    let mut up = false;
    let mut down = false;
    let mut engaged = false;
    let mut stops = 0;
    for (channel, active) in log {
        match channel {
            Channel::Up => up = *active,
            Channel::Down => down = *active,
        }
        if up || down {
            engaged = true;
        } else if engaged {
            stops += 1;
            engaged = false;
        }
    }
    stops
}

#[rstest]
#[case(Channel::Up, Channel::Down)]
#[case(Channel::Down, Channel::Up)]
fn both_active_stops_exactly_once(#[case] first: Channel, #[case] second: Channel) {
    let (_clock, log, mut cover) = rig();
    cover.set_known_position(50);

    let (tx, rx) = xch::unbounded();
    let mut observer = ExternalSwitchObserver::new(rx);
    tx.send(external(first, true)).unwrap();
    tx.send(external(second, true)).unwrap();

    observer.reconcile(&mut cover).expect("reconcile");

    let log = log.lock().unwrap();
    assert!(never_both_active(&log));
    assert_eq!(stop_count(&log), 1);
    assert!(!cover.is_traveling());
}

#[test]
fn single_active_switch_mirrors_travel() {
    let (_clock, _log, mut cover) = rig();
    cover.set_known_position(50);

    let (tx, rx) = xch::unbounded();
    let mut observer = ExternalSwitchObserver::new(rx);
    tx.send(external(Channel::Up, true)).unwrap();
    observer.reconcile(&mut cover).expect("reconcile");
    assert!(cover.is_opening());

    tx.send(external(Channel::Up, false)).unwrap();
    tx.send(external(Channel::Down, true)).unwrap();
    observer.reconcile(&mut cover).expect("reconcile");
    assert!(cover.is_closing());
}

#[test]
fn release_during_travel_is_an_external_stop() {
    let (clock, _log, mut cover) = rig();
    cover.set_known_position(0);

    let (tx, rx) = xch::unbounded();
    let mut observer = ExternalSwitchObserver::new(rx);
    tx.send(external(Channel::Up, true)).unwrap();
    observer.reconcile(&mut cover).expect("reconcile");
    assert!(cover.is_opening());

    clock.advance(Duration::from_secs(5));
    tx.send(external(Channel::Up, false)).unwrap();
    observer.reconcile(&mut cover).expect("reconcile");
    assert!(!cover.is_traveling());
    assert_eq!(cover.position(), 20);
}

#[test]
fn self_issued_events_update_bookkeeping_only() {
    let (_clock, log, mut cover) = rig();
    cover.set_known_position(50);

    let (tx, rx) = xch::unbounded();
    let mut observer = ExternalSwitchObserver::new(rx);
    tx.send(SwitchEvent {
        channel: Channel::Up,
        active: true,
        origin: Origin::SelfIssued,
    })
    .unwrap();
    observer.reconcile(&mut cover).expect("reconcile");

    assert!(log.lock().unwrap().is_empty());
    assert!(!cover.is_traveling());

    // The tracked state still counts: an external down-press now reads
    // as contradictory and fails safe.
    tx.send(external(Channel::Down, true)).unwrap();
    observer.reconcile(&mut cover).expect("reconcile");
    assert_eq!(
        log.lock().unwrap().as_slice(),
        &[(Channel::Up, false), (Channel::Down, false)]
    );
}

#[test]
fn both_released_while_idle_is_quiet() {
    let (_clock, log, mut cover) = rig();
    cover.set_known_position(50);

    let (tx, rx) = xch::unbounded();
    let mut observer = ExternalSwitchObserver::new(rx);
    tx.send(external(Channel::Up, false)).unwrap();
    tx.send(external(Channel::Down, false)).unwrap();
    observer.reconcile(&mut cover).expect("reconcile");

    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn probe_emits_tagged_transitions_and_shuts_down() {
    let log = RelayLog::default();
    let up = SpyActuator::new(Channel::Up, log.clone());
    let down = SpyActuator::new(Channel::Down, log.clone());
    let up_state = up.state_handle();
    let self_drive = Arc::new(AtomicBool::new(false));

    let probe = SwitchProbe::spawn(
        up,
        down,
        self_drive.clone(),
        Duration::from_millis(1),
        MonotonicClock::new(),
    );
    let events = probe.events();

    up_state.store(true, Ordering::SeqCst);
    let event = events
        .recv_timeout(Duration::from_secs(1))
        .expect("probe event");
    assert_eq!(
        event,
        SwitchEvent {
            channel: Channel::Up,
            active: true,
            origin: Origin::External,
        }
    );

    // With the self-drive flag raised, the next transition is tagged.
    self_drive.store(true, Ordering::SeqCst);
    up_state.store(false, Ordering::SeqCst);
    let event = events
        .recv_timeout(Duration::from_secs(1))
        .expect("probe event");
    assert_eq!(event.origin, Origin::SelfIssued);

    // Drop joins the probe thread.
    drop(probe);
}
