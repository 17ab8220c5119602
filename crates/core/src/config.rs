// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Simulation configuration.
//!
//! Every tunable of the station lives here so tests can shrink timings and
//! scenario presets can override capacities without touching component code.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// A configuration that cannot run at all.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("at least one bus is required")]
    NoBuses,
    #[error("at least one ticket office is required")]
    NoOffices,
    #[error("bus capacity below a single two-seat party")]
    CapacityTooSmall,
    #[error("return time range is inverted")]
    InvertedReturnRange,
    #[error("arrival delay range is inverted")]
    InvertedArrivalRange,
}

/// Verbosity of the station log sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogMode {
    Verbose,
    #[default]
    Summary,
    Minimal,
}

impl FromStr for LogMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "verbose" => Ok(LogMode::Verbose),
            "summary" => Ok(LogMode::Summary),
            "minimal" => Ok(LogMode::Minimal),
            other => Err(format!("unknown log mode: {}", other)),
        }
    }
}

/// Full configuration for one simulation run.
///
/// Defaults mirror the station's production constants. Durations are fields
/// rather than constants so integration tests can run entire simulations in
/// milliseconds.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Number of buses (each with its own driver task).
    pub buses: usize,
    /// Seats per bus.
    pub bus_capacity: u32,
    /// Bike rack slots per bus.
    pub bike_capacity: u32,
    /// Ticket office worker count.
    pub ticket_offices: usize,

    /// Scheduled wait at the station before a bus departs.
    pub boarding_interval: Duration,
    /// Trip duration is drawn uniformly from this range.
    pub min_return_time: Duration,
    pub max_return_time: Duration,

    /// Age below which a person counts as a child.
    pub child_age_limit: u8,
    /// Minimum age to travel with an accompanying minor.
    pub adult_min_age: u8,
    /// Ticket validation bounds.
    pub min_age: u8,
    pub max_age: u8,

    /// Demographic percentages applied when a passenger arrives.
    pub vip_percent: u8,
    pub bike_percent: u8,
    pub adult_with_child_percent: u8,

    /// Arrival pacing: delay between passenger spawns is drawn uniformly
    /// from this range.
    pub min_arrival: Duration,
    pub max_arrival: Duration,

    /// Backpressure bounds on in-flight requests.
    pub ticket_queue_slots: usize,
    pub boarding_queue_slots: usize,

    /// Simulated service latencies (skipped in perf mode).
    pub ticket_service_time: Duration,
    pub boarding_time_per_seat: Duration,

    /// Sleep between retries of a transient condition.
    pub retry_tick: Duration,
    /// Controller watchdog period.
    pub watchdog_period: Duration,
    /// Slack past a bus's scheduled departure before the watchdog forces it out.
    pub departure_grace: Duration,
    /// How long the supervisor waits for stragglers before aborting them.
    pub shutdown_grace: Duration,

    /// Disable artificial service latencies.
    pub perf_mode: bool,
    /// Depart immediately on reaching capacity instead of waiting out the
    /// boarding interval.
    pub depart_when_full: bool,
    /// Stop admitting new passengers once this many have been spawned.
    pub max_passengers: Option<u32>,

    pub log_mode: LogMode,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            buses: 3,
            bus_capacity: 10,
            bike_capacity: 3,
            ticket_offices: 2,
            boarding_interval: Duration::from_secs(8),
            min_return_time: Duration::from_secs(3),
            max_return_time: Duration::from_secs(8),
            child_age_limit: 8,
            adult_min_age: 18,
            min_age: 5,
            max_age: 99,
            vip_percent: 1,
            bike_percent: 20,
            adult_with_child_percent: 15,
            min_arrival: Duration::from_millis(200),
            max_arrival: Duration::from_millis(1000),
            ticket_queue_slots: 200,
            boarding_queue_slots: 100,
            ticket_service_time: Duration::from_millis(400),
            boarding_time_per_seat: Duration::from_millis(250),
            retry_tick: Duration::from_millis(500),
            watchdog_period: Duration::from_secs(1),
            departure_grace: Duration::from_secs(2),
            shutdown_grace: Duration::from_secs(120),
            perf_mode: false,
            depart_when_full: false,
            max_passengers: None,
            log_mode: LogMode::default(),
        }
    }
}

impl SimConfig {
    /// Default passenger cap applied by `--max_p` when no count is given.
    pub const DEFAULT_MAX_PASSENGERS: u32 = 30;

    /// Artificial service latency, suppressed in perf mode.
    pub fn service_delay(&self, nominal: Duration) -> Duration {
        if self.perf_mode {
            Duration::ZERO
        } else {
            nominal
        }
    }

    /// Boarding latency for a party occupying `seats` seats.
    pub fn boarding_delay(&self, seats: u32) -> Duration {
        self.service_delay(self.boarding_time_per_seat * seats)
    }

    /// Trip latency. Perf mode keeps a token sleep so the bus still yields.
    pub fn trip_delay(&self, nominal: Duration) -> Duration {
        if self.perf_mode {
            Duration::from_millis(1)
        } else {
            nominal
        }
    }

    /// Reject configurations that cannot run at all.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buses == 0 {
            return Err(ConfigError::NoBuses);
        }
        if self.ticket_offices == 0 {
            return Err(ConfigError::NoOffices);
        }
        if self.bus_capacity < 2 {
            return Err(ConfigError::CapacityTooSmall);
        }
        if self.min_return_time > self.max_return_time {
            return Err(ConfigError::InvertedReturnRange);
        }
        if self.min_arrival > self.max_arrival {
            return Err(ConfigError::InvertedArrivalRange);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
