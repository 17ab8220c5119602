// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Passenger descriptor and demographic sampling.

use crate::bus::BusId;
use crate::config::SimConfig;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a passenger. Allocation starts at 1; zero is never
/// a valid id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PassengerId(pub u32);

impl PassengerId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for PassengerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Everything the station needs to know about one arriving party.
///
/// An accompanying minor is folded into the adult's descriptor: `child_age`
/// is `Some` and the party occupies two seats. A party with a minor never
/// carries a bike.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passenger {
    pub id: PassengerId,
    pub age: u8,
    pub is_vip: bool,
    pub has_bike: bool,
    pub child_age: Option<u8>,
    pub has_ticket: bool,
    pub assigned_bus: Option<BusId>,
}

impl Passenger {
    /// Draw a passenger's attributes using the configured percentages.
    pub fn sample(id: PassengerId, config: &SimConfig, rng: &mut impl Rng) -> Self {
        let age = rng.random_range(config.min_age..75);
        let is_vip = rng.random_range(0..100) < config.vip_percent;

        let with_child = age >= config.adult_min_age
            && rng.random_range(0..100) < config.adult_with_child_percent;
        let child_age = if with_child {
            Some(rng.random_range(1..config.child_age_limit))
        } else {
            None
        };

        // A minor occupies the adult's hands; no bike in that case.
        let has_bike = child_age.is_none() && rng.random_range(0..100) < config.bike_percent;

        Self {
            id,
            age,
            is_vip,
            has_bike,
            child_age,
            has_ticket: false,
            assigned_bus: None,
        }
    }

    /// Seats this party charges against a bus: 2 with an accompanying minor.
    pub fn seat_count(&self) -> u32 {
        if self.child_age.is_some() {
            2
        } else {
            1
        }
    }

    pub fn is_adult(&self, config: &SimConfig) -> bool {
        self.age >= config.adult_min_age
    }

    /// Whether a ticket office will accept this descriptor at all.
    pub fn valid_for_ticket(&self, config: &SimConfig) -> bool {
        self.id.as_u32() > 0 && self.age >= config.min_age && self.age <= config.max_age
    }

    /// Boarding eligibility: a ticket, or VIP standing.
    pub fn may_board(&self) -> bool {
        self.has_ticket || self.is_vip
    }
}

#[cfg(test)]
#[path = "passenger_tests.rs"]
mod tests;
