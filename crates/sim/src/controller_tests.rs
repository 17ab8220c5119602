// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use depot_core::{FakeClock, LogMode, SystemClock, WorkerId};
use std::time::Duration;

fn test_config() -> SimConfig {
    SimConfig {
        perf_mode: true,
        retry_tick: Duration::from_millis(5),
        watchdog_period: Duration::from_millis(10),
        shutdown_grace: Duration::from_millis(500),
        ..SimConfig::default()
    }
}

fn manned_state(config: &SimConfig) -> StationState {
    let mut state = StationState::new(config);
    for i in 0..state.drivers.len() {
        state.drivers[i] = Some(WorkerId(i as u32 + 1));
    }
    state
}

fn test_logger() -> (Arc<StationLogger>, std::path::PathBuf) {
    let dir = tempfile::tempdir().map(|d| d.keep()).unwrap_or_default();
    (Arc::new(StationLogger::new(dir.clone(), LogMode::Verbose)), dir)
}

// --- repair_fleet -----------------------------------------------------------

#[test]
fn dead_driver_is_cleared_and_riders_evacuated() {
    let config = test_config();
    let mut state = manned_state(&config);
    state.counters.total_passengers_created = 3;
    state.bus_mut(BusId(0)).passenger_count = 3;

    let clock = FakeClock::new();
    let repair = repair_fleet(&mut state, &[true, false, false], &clock, &config);

    assert_eq!(repair.cleared, vec![BusId(0)]);
    assert!(state.drivers[0].is_none());
    let bus = state.bus(BusId(0));
    assert_eq!(bus.passenger_count, 0);
    assert!(bus.at_station);
    assert!(!bus.boarding_open);
    assert_eq!(state.counters.passengers_left_early, 3);
    assert!(state.accounting().balanced());
}

#[test]
fn active_slot_moves_to_the_lowest_live_driver() {
    let config = test_config();
    let mut state = manned_state(&config);
    assert_eq!(state.active_bus, Some(BusId(0)));

    let clock = FakeClock::new();
    let repair = repair_fleet(&mut state, &[true, false, false], &clock, &config);

    assert!(repair.reassigned);
    assert_eq!(state.active_bus, Some(BusId(1)));
    assert!(state.active_bus_valid());
    assert!(state.bus(BusId(1)).departure_time.is_some());
}

#[test]
fn active_slot_empties_when_no_driver_is_left() {
    let config = test_config();
    let mut state = manned_state(&config);

    let clock = FakeClock::new();
    let repair = repair_fleet(&mut state, &[true, true, true], &clock, &config);

    assert!(repair.reassigned);
    assert_eq!(state.active_bus, None);
    assert!(state.active_bus_valid());
}

#[test]
fn overdue_loaded_bus_is_forced_out() {
    let config = test_config();
    let mut state = manned_state(&config);
    let clock = FakeClock::new();
    {
        let bus = state.bus_mut(BusId(1));
        bus.passenger_count = 2;
        bus.departure_time = Some(clock.now());
    }
    clock.advance(config.departure_grace + Duration::from_secs(1));

    let repair = repair_fleet(&mut state, &[false, false, false], &clock, &config);
    assert_eq!(repair.force_depart, vec![BusId(1)]);
}

#[test]
fn bus_within_grace_is_not_forced() {
    let config = test_config();
    let mut state = manned_state(&config);
    let clock = FakeClock::new();
    {
        let bus = state.bus_mut(BusId(1));
        bus.passenger_count = 2;
        bus.departure_time = Some(clock.deadline(config.boarding_interval));
    }

    let repair = repair_fleet(&mut state, &[false, false, false], &clock, &config);
    assert!(repair.force_depart.is_empty());
}

// --- should_terminate -------------------------------------------------------

#[test]
fn running_station_with_traffic_keeps_going() {
    let config = test_config();
    let mut state = manned_state(&config);
    state.spawning_stopped = true;
    state.passengers_live = 1;
    assert!(!should_terminate(&state));
}

#[test]
fn quiet_station_terminates_once_spawning_stops() {
    let config = test_config();
    let mut state = manned_state(&config);
    assert!(!should_terminate(&state));
    state.spawning_stopped = true;
    assert!(should_terminate(&state));
}

#[test]
fn stop_flag_terminates_unconditionally() {
    let config = test_config();
    let mut state = manned_state(&config);
    state.passengers_live = 10;
    state.running = false;
    assert!(should_terminate(&state));
}

#[test]
fn bus_out_on_a_trip_blocks_termination() {
    let config = test_config();
    let mut state = manned_state(&config);
    state.spawning_stopped = true;
    state.bus_mut(BusId(2)).at_station = false;
    assert!(!should_terminate(&state));
}

// --- controller task --------------------------------------------------------

fn start_controller(
    config: SimConfig,
) -> (
    Shared,
    Channels,
    mpsc::UnboundedSender<AdminSignal>,
    tokio::task::JoinHandle<()>,
) {
    let config = Arc::new(config);
    let shared = Shared::new(&config);
    let channels = Channels::new(config.ticket_queue_slots, config.boarding_queue_slots);
    let (admin_tx, admin_rx) = mpsc::unbounded_channel();
    let (logger, _dir) = test_logger();
    let controller = Controller::new(
        shared.clone(),
        channels.clone(),
        config,
        logger,
        SystemClock,
        admin_rx,
        Vec::new(),
        Vec::new(),
    );
    let handle = tokio::spawn(controller.run());
    (shared, channels, admin_tx, handle)
}

#[tokio::test]
async fn close_station_flips_flags_and_frees_waiters() {
    let mut config = test_config();
    config.ticket_queue_slots = 0; // every producer would block
    let (shared, channels, admin, controller) = start_controller(config);
    // Keep the controller from terminating while we look around.
    shared.lock_state_mut(|s| s.passengers_live = 1);

    admin.send(AdminSignal::CloseStation).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let (closed, open, stopped) = shared.lock_state(|s| {
        (s.station_closed, s.station_open, s.spawning_stopped)
    });
    assert!(closed);
    assert!(!open);
    assert!(stopped);
    // Saturation released the ticket slots.
    assert!(channels.tickets.available_slots() > 0);

    admin.send(AdminSignal::Shutdown).unwrap();
    shared.lock_state_mut(|s| s.passengers_live = 0);
    controller.await.unwrap();
}

#[tokio::test]
async fn shutdown_signal_ends_the_run() {
    let (shared, _channels, admin, controller) = start_controller(test_config());
    shared.lock_state_mut(|s| s.passengers_live = 1);

    admin.send(AdminSignal::Shutdown).unwrap();
    controller.await.unwrap();

    assert!(shared.lock_state(|s| !s.running));
}

#[tokio::test]
async fn quiet_station_winds_down_by_itself() {
    let (shared, _channels, _admin, controller) = start_controller(test_config());
    shared.lock_state_mut(|s| s.spawning_stopped = true);
    controller.await.unwrap();
    assert!(shared.lock_state(|s| !s.running));
}

// --- final report -----------------------------------------------------------

#[test]
fn balanced_report_carries_the_breakdown() {
    let config = test_config();
    let shared = Shared::new(&config);
    shared.lock_state_mut(|s| {
        s.counters.total_passengers_created = 4;
        s.counters.passengers_transported = 3;
        s.counters.passengers_left_early = 1;
    });
    let (logger, dir) = test_logger();

    let report = write_final_report(&shared, &logger);
    assert!(report.balanced);
    assert_eq!(report.accounting.created, 4);

    let stats = std::fs::read_to_string(dir.join("stats.log")).unwrap_or_default();
    assert!(stats.contains("created=4"));
}

#[test]
fn imbalance_is_reported_not_fatal() {
    let config = test_config();
    let shared = Shared::new(&config);
    shared.lock_state_mut(|s| {
        s.counters.total_passengers_created = 5;
        s.counters.passengers_transported = 3;
    });
    let (logger, dir) = test_logger();

    let report = write_final_report(&shared, &logger);
    assert!(!report.balanced);

    let master = std::fs::read_to_string(dir.join("master.log")).unwrap_or_default();
    assert!(master.contains("[ERROR] accounting mismatch"));
}
