// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The shared station record: gates, fleet, worker registries, counters.
//!
//! One instance lives behind a single mutex for the whole simulation. Every
//! mutation goes through the methods here so the accounting invariant
//! (created = transported + waiting + in office + on bus + left early) holds
//! after each transition, not only at termination.

use crate::bus::{BusId, BusState};
use crate::config::SimConfig;
use crate::passenger::Passenger;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Registry token for a driver or ticket office worker. A vacant slot is
/// `None` (the pid-zero sentinel of a process-based station).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerId(pub u32);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// The station's counter block. All passenger-denominated counters move in
/// seat-count units so a two-seat party is never half-accounted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub total_passengers_created: u32,
    pub passengers_transported: u32,
    pub passengers_waiting: u32,
    pub passengers_in_office: u32,
    pub passengers_left_early: u32,
    pub tickets_issued: u32,
    pub tickets_denied: u32,
    pub tickets_sold_people: u32,
    pub boarded_people: u32,
    pub boarded_vip_people: u32,
    pub adults_created: u32,
    pub children_created: u32,
    pub vip_people_created: u32,
}

/// Where every created person currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accounting {
    pub created: u32,
    pub transported: u32,
    pub waiting: u32,
    pub in_office: u32,
    pub on_bus: u32,
    pub left_early: u32,
}

impl Accounting {
    pub fn balanced(&self) -> bool {
        self.created
            == self.transported + self.waiting + self.in_office + self.on_bus + self.left_early
    }
}

impl fmt::Display for Accounting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "created={} transported={} waiting={} in_office={} on_bus={} left_early={}",
            self.created, self.transported, self.waiting, self.in_office, self.on_bus,
            self.left_early
        )
    }
}

/// The one shared mutable record of the simulation.
#[derive(Debug, Clone)]
pub struct StationState {
    pub running: bool,
    pub station_open: bool,
    pub boarding_allowed: bool,
    pub spawning_stopped: bool,
    pub station_closed: bool,

    pub buses: Vec<BusState>,
    /// The unique bus currently authorized to accept boardings.
    pub active_bus: Option<BusId>,

    pub drivers: Vec<Option<WorkerId>>,
    pub offices: Vec<Option<WorkerId>>,

    /// Passenger tasks that have arrived and not yet reached a terminal
    /// state. Used by the termination predicate; not part of the public
    /// counter block.
    pub passengers_live: u32,

    pub counters: Counters,
}

impl StationState {
    /// Fresh station: every bus parked, bus 0 active, all gates open.
    pub fn new(config: &SimConfig) -> Self {
        Self {
            running: true,
            station_open: true,
            boarding_allowed: true,
            spawning_stopped: false,
            station_closed: false,
            buses: (0..config.buses).map(|i| BusState::parked(BusId(i))).collect(),
            active_bus: Some(BusId(0)),
            drivers: vec![None; config.buses],
            offices: vec![None; config.ticket_offices],
            passengers_live: 0,
            counters: Counters::default(),
        }
    }

    pub fn bus(&self, id: BusId) -> &BusState {
        &self.buses[id.index()]
    }

    pub fn bus_mut(&mut self, id: BusId) -> &mut BusState {
        &mut self.buses[id.index()]
    }

    /// Invariant: if an active bus is set, it is at the station with a live
    /// driver registered.
    pub fn active_bus_valid(&self) -> bool {
        match self.active_bus {
            None => true,
            Some(id) => self.bus(id).at_station && self.drivers[id.index()].is_some(),
        }
    }

    /// Every bus parked, empty, with nobody in an entrance.
    pub fn fleet_idle(&self) -> bool {
        self.buses
            .iter()
            .all(|b| b.at_station && b.passenger_count == 0 && b.entering_count == 0)
    }

    pub fn accounting(&self) -> Accounting {
        let c = &self.counters;
        Accounting {
            created: c.total_passengers_created,
            transported: c.passengers_transported,
            waiting: c.passengers_waiting,
            in_office: c.passengers_in_office,
            on_bus: self.buses.iter().map(|b| b.passenger_count).sum(),
            left_early: c.passengers_left_early,
        }
    }

    // --- passenger lifecycle transitions -----------------------------------

    /// A new party is admitted to the simulation.
    pub fn record_arrival(&mut self, passenger: &Passenger, config: &SimConfig) {
        let c = &mut self.counters;
        c.total_passengers_created += passenger.seat_count();
        if passenger.age >= config.adult_min_age {
            c.adults_created += 1;
        } else {
            c.children_created += 1;
        }
        if passenger.child_age.is_some() {
            c.children_created += 1;
        }
        if passenger.is_vip {
            c.vip_people_created += 1;
        }
        self.passengers_live += 1;
    }

    /// The party's task reached a terminal state (transported or left early).
    pub fn record_departure_from_simulation(&mut self) {
        self.passengers_live = self.passengers_live.saturating_sub(1);
    }

    pub fn enter_office(&mut self, seats: u32) {
        self.counters.passengers_in_office += seats;
    }

    pub fn leave_office(&mut self, seats: u32) {
        self.counters.passengers_in_office =
            self.counters.passengers_in_office.saturating_sub(seats);
    }

    /// Office approved: ticket stamped, party leaves the office.
    pub fn issue_ticket(&mut self, seats: u32) {
        let c = &mut self.counters;
        c.tickets_issued += 1;
        c.tickets_sold_people += seats;
        c.passengers_in_office = c.passengers_in_office.saturating_sub(seats);
    }

    /// Office refused: party leaves the office without a ticket.
    pub fn deny_ticket(&mut self, seats: u32) {
        let c = &mut self.counters;
        c.tickets_denied += 1;
        c.passengers_in_office = c.passengers_in_office.saturating_sub(seats);
    }

    pub fn enter_waiting(&mut self, seats: u32) {
        self.counters.passengers_waiting += seats;
    }

    pub fn leave_waiting(&mut self, seats: u32) {
        self.counters.passengers_waiting = self.counters.passengers_waiting.saturating_sub(seats);
    }

    pub fn record_left_early(&mut self, seats: u32) {
        self.counters.passengers_left_early += seats;
    }

    /// A party has walked through the gate onto a bus. Charges the seats and
    /// the bike atomically and moves the party out of the waiting count.
    pub fn complete_boarding(&mut self, bus_id: BusId, passenger: &Passenger) {
        let seats = passenger.seat_count();
        let has_bike = passenger.has_bike;
        let is_vip = passenger.is_vip;
        let bus = self.bus_mut(bus_id);
        bus.passenger_count += seats;
        if has_bike {
            bus.bike_count += 1;
        }
        bus.entering_count = bus.entering_count.saturating_sub(1);
        let c = &mut self.counters;
        c.passengers_waiting = c.passengers_waiting.saturating_sub(seats);
        c.boarded_people += seats;
        if is_vip {
            c.boarded_vip_people += seats;
        }
    }

    /// The bus leaves the station; its riders become transported. The load
    /// counters zero here so the accounting breakdown never counts a rider
    /// both as transported and as on a bus.
    pub fn depart_bus(&mut self, bus_id: BusId, return_time: std::time::Instant) -> u32 {
        let bus = self.bus_mut(bus_id);
        bus.boarding_open = false;
        bus.at_station = false;
        bus.departure_time = None;
        bus.return_time = Some(return_time);
        let riders = bus.passenger_count;
        bus.passenger_count = 0;
        bus.bike_count = 0;
        self.counters.passengers_transported += riders;
        riders
    }
}

#[cfg(test)]
#[path = "station_tests.rs"]
mod tests;
