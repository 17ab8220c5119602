// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Canned scenarios behind the `--testN` flags: a config preset plus a
//! schedule of injected signals and faults. Outcomes are judged by reading
//! the final report, same as any other run.

use depot_core::{AdminSignal, SimConfig};
use depot_sim::SimHandle;
use std::time::Duration;

/// Apply scenario `number`'s preset on top of the baseline config.
pub fn configure(number: u8, config: &mut SimConfig) {
    match number {
        // Happy drain with a small cap.
        1 => config.max_passengers = Some(20),
        // Close the station five seconds into a 50-passenger run.
        2 => config.max_passengers = Some(50),
        // Twenty passengers, early departures forced repeatedly.
        3 => config.max_passengers = Some(20),
        // Crash the active driver mid-run.
        4 => config.max_passengers = Some(40),
        // Crash one of the two ticket offices.
        5 => config.max_passengers = Some(40),
        // Ticket queue starved at launch, restored later.
        6 => {
            config.max_passengers = Some(50);
            config.ticket_queue_slots = 0;
        }
        // Boarding queue starved at launch, restored later.
        7 => {
            config.max_passengers = Some(50);
            config.boarding_queue_slots = 0;
        }
        // Fairness soak: enough traffic that every bus departs repeatedly.
        8 => {
            config.max_passengers = Some(90);
            config.min_arrival = Duration::from_millis(100);
            config.max_arrival = Duration::from_millis(300);
        }
        // Perf-mode soak.
        9 => {
            config.max_passengers = Some(200);
            config.perf_mode = true;
            config.min_arrival = Duration::from_millis(1);
            config.max_arrival = Duration::from_millis(5);
        }
        // Depart-when-full stress.
        10 => {
            config.max_passengers = Some(60);
            config.depart_when_full = true;
            config.min_arrival = Duration::from_millis(50);
            config.max_arrival = Duration::from_millis(150);
        }
        _ => {}
    }
}

/// Run scenario `number`'s injection schedule against a live station.
/// Returns once every scheduled action has been delivered; the caller then
/// waits for the run itself.
pub async fn drive(number: u8, handle: &SimHandle) {
    match number {
        2 => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            handle.signal(AdminSignal::CloseStation);
        }
        3 => {
            for _ in 0..5 {
                tokio::time::sleep(Duration::from_secs(3)).await;
                handle.signal(AdminSignal::EarlyDepart);
            }
        }
        4 => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            let active = handle.shared().lock_state(|s| s.active_bus);
            if let Some(bus) = active {
                tracing::info!(bus = %bus, "scenario: crashing the active driver");
                handle.crash_driver(bus.index());
            }
        }
        5 => {
            tokio::time::sleep(Duration::from_secs(3)).await;
            tracing::info!("scenario: crashing ticket office 0");
            handle.crash_office(0);
        }
        6 => {
            tokio::time::sleep(Duration::from_secs(10)).await;
            tracing::info!("scenario: restoring the ticket queue slots");
            handle.release_ticket_slots(SimConfig::default().ticket_queue_slots);
        }
        7 => {
            tokio::time::sleep(Duration::from_secs(10)).await;
            tracing::info!("scenario: restoring the boarding queue slots");
            handle.release_boarding_slots(SimConfig::default().boarding_queue_slots);
        }
        _ => {}
    }
}

#[cfg(test)]
#[path = "scenarios_tests.rs"]
mod tests;
