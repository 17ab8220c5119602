// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared handle to the station record.

use depot_core::{SimConfig, StationState};
use parking_lot::Mutex;
use std::sync::Arc;

/// Cloneable handle to the single mutable station record.
///
/// All access goes through the closure helpers so no guard ever crosses an
/// await point.
#[derive(Clone)]
pub struct Shared {
    state: Arc<Mutex<StationState>>,
}

impl Shared {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(StationState::new(config))),
        }
    }

    /// Read under the station mutex.
    pub fn lock_state<T>(&self, f: impl FnOnce(&StationState) -> T) -> T {
        let guard = self.state.lock();
        f(&guard)
    }

    /// Mutate under the station mutex.
    pub fn lock_state_mut<T>(&self, f: impl FnOnce(&mut StationState) -> T) -> T {
        let mut guard = self.state.lock();
        f(&mut guard)
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
