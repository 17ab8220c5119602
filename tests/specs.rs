// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Whole-station runs at millisecond pacing, checking the observable
//! properties a real deployment is judged by: the accounting balance,
//! capacity limits, active-bus repair, and drain behavior under faults.

use depot_core::{AdminSignal, BusId, LogMode, SimConfig};
use depot_sim::{launch, StationLogger};
use std::sync::Arc;
use std::time::Duration;

fn fast_config() -> SimConfig {
    SimConfig {
        perf_mode: true,
        boarding_interval: Duration::from_millis(30),
        min_return_time: Duration::from_millis(5),
        max_return_time: Duration::from_millis(15),
        min_arrival: Duration::from_millis(1),
        max_arrival: Duration::from_millis(4),
        retry_tick: Duration::from_millis(2),
        watchdog_period: Duration::from_millis(10),
        departure_grace: Duration::from_millis(20),
        shutdown_grace: Duration::from_secs(10),
        ..SimConfig::default()
    }
}

fn logger() -> Arc<StationLogger> {
    let dir = tempfile::tempdir().map(|d| d.keep()).unwrap_or_default();
    Arc::new(StationLogger::new(dir, LogMode::Minimal))
}

/// Scenario 1: happy drain. Everyone admitted reaches a terminal state and
/// the books balance.
#[tokio::test(flavor = "multi_thread")]
async fn happy_drain_balances_the_books() {
    let config = SimConfig {
        max_passengers: Some(20),
        ..fast_config()
    };
    let handle = launch(config, logger()).unwrap();
    let report = handle.wait().await.unwrap();

    assert!(report.balanced, "accounting: {}", report.accounting);
    assert_eq!(
        report.accounting.created,
        report.accounting.transported + report.accounting.left_early
    );
    assert!(report.accounting.transported > 0);
    // At least one bus completed a trip.
    assert!(report.bus_trips.iter().sum::<u32>() >= 1);

    // The report is what operators archive; it must serialize.
    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"total_passengers_created\""));
}

/// Scenario 2: closing the station mid-run freezes admissions; everyone
/// already inside reaches a terminal state.
#[tokio::test(flavor = "multi_thread")]
async fn close_station_freezes_admissions_and_drains() {
    let handle = launch(fast_config(), logger()).unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;

    assert!(handle.signal(AdminSignal::CloseStation));
    for _ in 0..200 {
        if handle.shared().lock_state(|s| s.station_closed) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    // Let arrivals already in flight settle before snapshotting.
    tokio::time::sleep(Duration::from_millis(30)).await;
    let created_at_close = handle
        .shared()
        .lock_state(|s| s.counters.total_passengers_created);

    let report = handle.wait().await.unwrap();
    assert!(report.balanced, "accounting: {}", report.accounting);
    assert_eq!(report.counters.total_passengers_created, created_at_close);
    assert_eq!(report.accounting.waiting, 0);
    assert_eq!(report.accounting.in_office, 0);
}

/// Scenario 3: with departures scheduled far in the future, only the
/// early-depart signal can move a bus; any trip is a forced, below-capacity
/// departure.
#[tokio::test(flavor = "multi_thread")]
async fn early_depart_forces_partial_departures() {
    let config = SimConfig {
        max_passengers: Some(12),
        boarding_interval: Duration::from_secs(120),
        ..fast_config()
    };
    let handle = launch(config, logger()).unwrap();

    for _ in 0..5 {
        tokio::time::sleep(Duration::from_millis(40)).await;
        handle.signal(AdminSignal::EarlyDepart);
    }
    // Give the last forced departure a moment, then stop the run.
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.signal(AdminSignal::Shutdown);

    let report = handle.wait().await.unwrap();
    assert!(report.balanced, "accounting: {}", report.accounting);
    // The schedule could never fire: every transported rider proves a
    // forced, below-capacity departure.
    assert!(report.accounting.transported > 0);
}

/// Scenario 4: killing the active driver is repaired within a watchdog
/// tick or two, and the run still completes balanced.
#[tokio::test(flavor = "multi_thread")]
async fn active_driver_crash_is_repaired() {
    let config = SimConfig {
        max_passengers: Some(30),
        ..fast_config()
    };
    let handle = launch(config, logger()).unwrap();
    tokio::time::sleep(Duration::from_millis(40)).await;

    let victim = handle.shared().lock_state(|s| s.active_bus);
    let victim = victim.unwrap_or(BusId(0));
    assert!(handle.crash_driver(victim.index()));

    let mut repaired = false;
    for _ in 0..200 {
        tokio::time::sleep(Duration::from_millis(5)).await;
        repaired = handle.shared().lock_state(|s| {
            s.drivers[victim.index()].is_none()
                && s.active_bus != Some(victim)
                && s.active_bus_valid()
        });
        if repaired {
            break;
        }
    }
    assert!(repaired, "watchdog never repaired the fleet");

    let report = handle.wait().await.unwrap();
    assert!(report.balanced, "accounting: {}", report.accounting);
}

/// Scenario 5: one office dies; the other keeps issuing and nobody is
/// stranded without a terminal state.
#[tokio::test(flavor = "multi_thread")]
async fn office_crash_does_not_lose_passengers() {
    let config = SimConfig {
        max_passengers: Some(30),
        vip_percent: 0,
        ..fast_config()
    };
    let handle = launch(config, logger()).unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;

    assert!(handle.crash_office(0));
    let issued_at_crash = handle.shared().lock_state(|s| s.counters.tickets_issued);

    let report = handle.wait().await.unwrap();
    assert!(report.balanced, "accounting: {}", report.accounting);
    assert!(report.counters.tickets_issued >= issued_at_crash);
    assert_eq!(
        report.accounting.created,
        report.accounting.transported + report.accounting.left_early
    );
}

/// Scenario 6: a starved ticket queue holds passengers at the semaphore
/// (no tickets, office count rising); restoring the slots drains the run.
#[tokio::test(flavor = "multi_thread")]
async fn starved_ticket_queue_backpressures_then_drains() {
    let config = SimConfig {
        max_passengers: Some(25),
        vip_percent: 0,
        ticket_queue_slots: 0,
        ..fast_config()
    };
    let handle = launch(config, logger()).unwrap();
    tokio::time::sleep(Duration::from_millis(120)).await;

    let (issued, in_office) = handle
        .shared()
        .lock_state(|s| (s.counters.tickets_issued, s.counters.passengers_in_office));
    assert_eq!(issued, 0, "no ticket can be issued while starved");
    assert!(in_office > 0, "arrivals should be queued at the semaphore");

    handle.release_ticket_slots(200);
    let report = handle.wait().await.unwrap();
    assert!(report.balanced, "accounting: {}", report.accounting);
    assert!(report.counters.tickets_issued > 0);
    assert_eq!(report.accounting.in_office, 0);
}

/// Scenario 7: same pattern against the boarding queue.
#[tokio::test(flavor = "multi_thread")]
async fn starved_boarding_queue_backpressures_then_drains() {
    let config = SimConfig {
        max_passengers: Some(25),
        boarding_queue_slots: 0,
        ..fast_config()
    };
    let handle = launch(config, logger()).unwrap();
    tokio::time::sleep(Duration::from_millis(120)).await;

    let boarded = handle.shared().lock_state(|s| s.counters.boarded_people);
    assert_eq!(boarded, 0, "no boarding can complete while starved");

    handle.release_boarding_slots(100);
    let report = handle.wait().await.unwrap();
    assert!(report.balanced, "accounting: {}", report.accounting);
    assert!(report.counters.boarded_people > 0);
}

/// Scenario 8: round-robin handoff keeps trip counts roughly even.
#[tokio::test(flavor = "multi_thread")]
async fn round_robin_spreads_trips_across_the_fleet() {
    let config = SimConfig {
        max_passengers: Some(80),
        ..fast_config()
    };
    let handle = launch(config, logger()).unwrap();
    let report = handle.wait().await.unwrap();

    assert!(report.balanced, "accounting: {}", report.accounting);
    let min = report.bus_trips.iter().copied().min().unwrap_or(0);
    let max = report.bus_trips.iter().copied().max().unwrap_or(0);
    assert!(max >= 1, "fleet never moved: {:?}", report.bus_trips);
    assert!(
        min >= max / 2 || max - min <= 2,
        "unfair trip spread: {:?}",
        report.bus_trips
    );
}

/// Capacity invariant: under depart-when-full pressure no bus ever exceeds
/// its seat or rack capacity.
#[tokio::test(flavor = "multi_thread")]
async fn capacity_is_never_exceeded_under_pressure() {
    let config = SimConfig {
        max_passengers: Some(60),
        depart_when_full: true,
        bike_percent: 60,
        ..fast_config()
    };
    let handle = launch(config, logger()).unwrap();

    // Sample the fleet while the run is hot.
    let mut max_seen = 0u32;
    let mut max_bikes = 0u32;
    for _ in 0..60 {
        tokio::time::sleep(Duration::from_millis(3)).await;
        let (seats, bikes) = handle.shared().lock_state(|s| {
            (
                s.buses.iter().map(|b| b.passenger_count).max().unwrap_or(0),
                s.buses.iter().map(|b| b.bike_count).max().unwrap_or(0),
            )
        });
        max_seen = max_seen.max(seats);
        max_bikes = max_bikes.max(bikes);
    }

    let report = handle.wait().await.unwrap();
    assert!(report.balanced, "accounting: {}", report.accounting);
    assert!(max_seen <= 10, "seat capacity exceeded: {}", max_seen);
    assert!(max_bikes <= 3, "bike capacity exceeded: {}", max_bikes);
}
