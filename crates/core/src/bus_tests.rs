// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

#[test]
fn parked_bus_is_open_and_empty() {
    let bus = BusState::parked(BusId(1));
    assert!(bus.at_station);
    assert!(bus.boarding_open);
    assert_eq!(bus.passenger_count, 0);
    assert_eq!(bus.bike_count, 0);
    assert_eq!(bus.entering_count, 0);
    assert!(bus.departure_time.is_none());
}

#[test]
fn arrive_back_resets_loads_and_counts_the_trip() {
    let mut bus = BusState::parked(BusId(0));
    bus.passenger_count = 7;
    bus.bike_count = 2;
    bus.at_station = false;
    bus.boarding_open = false;
    bus.return_time = Some(Instant::now());

    let next = Instant::now() + Duration::from_secs(8);
    bus.arrive_back(next);

    assert_eq!(bus.passenger_count, 0);
    assert_eq!(bus.bike_count, 0);
    assert!(bus.at_station);
    assert!(bus.boarding_open);
    assert_eq!(bus.departure_time, Some(next));
    assert!(bus.return_time.is_none());
    assert_eq!(bus.trips_completed, 1);
}

#[test]
fn free_seats_saturates() {
    let mut bus = BusState::parked(BusId(2));
    bus.passenger_count = 12;
    assert_eq!(bus.free_seats(10), 0);
    bus.passenger_count = 4;
    assert_eq!(bus.free_seats(10), 6);
}

#[test]
fn bus_id_display() {
    assert_eq!(BusId(2).to_string(), "bus-2");
}
