// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the simulator.
//!
//! Child workers are tasks in the same process, so "inheriting" the
//! environment is automatic; these are read once at startup.

use depot_core::{LogMode, SimConfig};
use std::path::PathBuf;

/// `BUS_LOG_MODE` ∈ {verbose, summary, minimal}
pub fn log_mode() -> Option<LogMode> {
    std::env::var("BUS_LOG_MODE").ok().and_then(|s| s.parse().ok())
}

/// `BUS_PERF_MODE` ∈ {0, 1}
pub fn perf_mode() -> Option<bool> {
    std::env::var("BUS_PERF_MODE")
        .ok()
        .and_then(|s| match s.trim() {
            "1" => Some(true),
            "0" => Some(false),
            _ => None,
        })
}

/// `BUS_FULL_DEPART` ∈ {0, 1}
pub fn full_depart() -> Option<bool> {
    std::env::var("BUS_FULL_DEPART")
        .ok()
        .and_then(|s| match s.trim() {
            "1" => Some(true),
            "0" => Some(false),
            _ => None,
        })
}

/// Log sink directory: `BUS_LOG_DIR`, default `./logs`.
pub fn log_dir() -> PathBuf {
    std::env::var("BUS_LOG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("logs"))
}

/// Overlay environment settings onto a config. CLI flags are applied after
/// this, so flags win over environment.
pub fn apply(config: &mut SimConfig) {
    if let Some(mode) = log_mode() {
        config.log_mode = mode;
    }
    if let Some(perf) = perf_mode() {
        config.perf_mode = perf;
    }
    if let Some(full) = full_depart() {
        config.depart_when_full = full;
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
