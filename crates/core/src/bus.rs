// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-bus record.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Index of a bus in the station's fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BusId(pub usize);

impl BusId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for BusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bus-{}", self.0)
    }
}

/// Live state of one bus.
///
/// `departure_time`/`return_time` are monotonic deadlines; `None` means no
/// departure (or return) is currently scheduled.
#[derive(Debug, Clone)]
pub struct BusState {
    pub id: BusId,
    pub at_station: bool,
    pub boarding_open: bool,
    pub passenger_count: u32,
    pub bike_count: u32,
    /// Parties approved but still walking through an entrance gate.
    pub entering_count: u32,
    pub departure_time: Option<Instant>,
    pub return_time: Option<Instant>,
    pub trips_completed: u32,
}

impl BusState {
    /// A bus parked at the station with boarding open and no departure
    /// scheduled yet.
    pub fn parked(id: BusId) -> Self {
        Self {
            id,
            at_station: true,
            boarding_open: true,
            passenger_count: 0,
            bike_count: 0,
            entering_count: 0,
            departure_time: None,
            return_time: None,
            trips_completed: 0,
        }
    }

    /// Reset performed every time the bus returns to the station.
    pub fn arrive_back(&mut self, next_departure: Instant) {
        self.passenger_count = 0;
        self.bike_count = 0;
        self.entering_count = 0;
        self.at_station = true;
        self.boarding_open = true;
        self.departure_time = Some(next_departure);
        self.return_time = None;
        self.trips_completed += 1;
    }

    /// Seats still free.
    pub fn free_seats(&self, capacity: u32) -> u32 {
        capacity.saturating_sub(self.passenger_count)
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
