// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol payload types shared by the station components.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a ticket or boarding request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// No ticket and not VIP.
    NoTicket,
    /// Boarding globally suspended or the bus's door is closed.
    BoardingClosed,
    /// The addressed bus is out on a trip.
    NotAtStation,
    /// Not enough free seats for the party.
    BusFull,
    /// Bike rack at capacity.
    BikeRackFull,
    /// The station has been closed to new business.
    StationClosed,
    /// Descriptor failed validation at the ticket office.
    InvalidPassenger,
    /// The request was drained during teardown.
    Shutdown,
}

impl DenyReason {
    /// Only capacity refusals and a bus caught mid-trip are worth retrying
    /// after a tick. Every other refusal, a closed boarding door included,
    /// is terminal for the passenger.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DenyReason::BusFull | DenyReason::BikeRackFull | DenyReason::NotAtStation
        )
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DenyReason::NoTicket => "no ticket",
            DenyReason::BoardingClosed => "boarding closed",
            DenyReason::NotAtStation => "bus not at station",
            DenyReason::BusFull => "bus full",
            DenyReason::BikeRackFull => "bike rack full",
            DenyReason::StationClosed => "station closed",
            DenyReason::InvalidPassenger => "invalid passenger record",
            DenyReason::Shutdown => "shutting down",
        };
        f.write_str(s)
    }
}

/// Admin signals accepted by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminSignal {
    /// One-shot: every bus with at least one passenger departs now. Rearms.
    EarlyDepart,
    /// Terminal and idempotent: no new arrivals, drain the waiters, then end.
    CloseStation,
    /// Immediate orderly termination.
    Shutdown,
}

impl fmt::Display for AdminSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AdminSignal::EarlyDepart => "early-depart",
            AdminSignal::CloseStation => "close-station",
            AdminSignal::Shutdown => "shutdown",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
