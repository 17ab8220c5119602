// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line surface of the simulator.

use clap::{Parser, ValueEnum};
use depot_core::{LogMode, SimConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogModeArg {
    Verbose,
    Summary,
    Minimal,
}

impl From<LogModeArg> for LogMode {
    fn from(arg: LogModeArg) -> Self {
        match arg {
            LogModeArg::Verbose => LogMode::Verbose,
            LogModeArg::Summary => LogMode::Summary,
            LogModeArg::Minimal => LogMode::Minimal,
        }
    }
}

/// Suburban bus station simulator.
#[derive(Debug, Parser)]
#[command(name = "depot", version, about = "Suburban bus station simulator")]
pub struct Args {
    /// Verbosity of the station log sink
    #[arg(long, value_enum)]
    pub log: Option<LogModeArg>,

    /// Disable artificial sleeps that simulate service latency
    #[arg(long)]
    pub perf: bool,

    /// Depart immediately on reaching capacity instead of waiting out the
    /// boarding interval
    #[arg(long)]
    pub full: bool,

    /// Cap the total number of admitted passengers
    #[arg(
        long = "max-p",
        alias = "max_p",
        value_name = "N",
        num_args = 0..=1,
        default_missing_value = "30"
    )]
    pub max_p: Option<u32>,

    /// Canned scenario: happy drain with a small cap
    #[arg(long)]
    pub test1: bool,
    /// Canned scenario: close the station mid-run
    #[arg(long)]
    pub test2: bool,
    /// Canned scenario: repeated early departures
    #[arg(long)]
    pub test3: bool,
    /// Canned scenario: crash the active driver
    #[arg(long)]
    pub test4: bool,
    /// Canned scenario: crash one ticket office
    #[arg(long)]
    pub test5: bool,
    /// Canned scenario: ticket queue starved, then restored
    #[arg(long)]
    pub test6: bool,
    /// Canned scenario: boarding queue starved, then restored
    #[arg(long)]
    pub test7: bool,
    /// Canned scenario: round-robin fairness soak
    #[arg(long)]
    pub test8: bool,
    /// Canned scenario: perf-mode soak
    #[arg(long)]
    pub test9: bool,
    /// Canned scenario: depart-when-full stress
    #[arg(long)]
    pub test10: bool,
}

impl Args {
    /// Overlay the flags onto a config. Called after the environment
    /// overlay, so flags win.
    pub fn apply(&self, config: &mut SimConfig) {
        if let Some(mode) = self.log {
            config.log_mode = mode.into();
        }
        if self.perf {
            config.perf_mode = true;
        }
        if self.full {
            config.depart_when_full = true;
        }
        if let Some(cap) = self.max_p {
            config.max_passengers = Some(cap);
        }
    }

    /// The selected scenario, lowest number winning if several are set.
    pub fn scenario(&self) -> Option<u8> {
        let flags = [
            self.test1, self.test2, self.test3, self.test4, self.test5, self.test6, self.test7,
            self.test8, self.test9, self.test10,
        ];
        flags.iter().position(|&set| set).map(|i| i as u8 + 1)
    }
}

#[cfg(test)]
#[path = "args_tests.rs"]
mod tests;
