// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor: brings the station up, paces arrivals, takes it down.
//!
//! Bring-up order matters: the controller owns the lifecycle, offices and
//! drivers attach to the shared record, and only then does passenger
//! admission begin.

use crate::controller::{write_final_report, Controller, DriverLink, FinalReport, OfficeLink};
use crate::driver::Driver;
use crate::error::SimError;
use crate::logging::StationLogger;
use crate::office::TicketOffice;
use crate::passenger::PassengerActor;
use crate::queues::Channels;
use crate::state::Shared;
use depot_core::{AdminSignal, BusId, Passenger, PassengerId, SimConfig, SystemClock, WorkerId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle, JoinSet};

/// A running simulation. Admin signals and fault injection go through here;
/// `wait()` returns the final accounting.
pub struct SimHandle {
    admin: mpsc::UnboundedSender<AdminSignal>,
    shared: Shared,
    channels: Channels,
    driver_aborts: Vec<AbortHandle>,
    office_aborts: Vec<AbortHandle>,
    supervise: JoinHandle<FinalReport>,
}

impl SimHandle {
    /// Live view of the station record, for probes and scenario checks.
    pub fn shared(&self) -> &Shared {
        &self.shared
    }

    /// Deliver an admin signal to the controller.
    pub fn signal(&self, signal: AdminSignal) -> bool {
        self.admin.send(signal).is_ok()
    }

    /// A sender scenarios can hold on to.
    pub fn admin(&self) -> mpsc::UnboundedSender<AdminSignal> {
        self.admin.clone()
    }

    /// Fault injection: kill a driver task outright. The watchdog is
    /// expected to notice and repair.
    pub fn crash_driver(&self, index: usize) -> bool {
        match self.driver_aborts.get(index) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Fault injection: kill a ticket office task outright.
    pub fn crash_office(&self, index: usize) -> bool {
        match self.office_aborts.get(index) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Scenario plumbing: hand slots back to a queue that was launched
    /// deliberately starved.
    pub fn release_ticket_slots(&self, count: usize) {
        self.channels.tickets.release_slots(count);
    }

    /// Scenario plumbing, boarding-queue flavor.
    pub fn release_boarding_slots(&self, count: usize) {
        self.channels.boarding.release_slots(count);
    }

    /// Wait for the run to end and collect the final report.
    pub async fn wait(self) -> Result<FinalReport, SimError> {
        self.supervise
            .await
            .map_err(|e| SimError::WorkerLost(e.to_string()))
    }
}

/// Bring the station up and start admitting passengers.
pub fn launch(config: SimConfig, logger: Arc<StationLogger>) -> Result<SimHandle, SimError> {
    config.validate().map_err(|e| SimError::Config(e.to_string()))?;
    let config = Arc::new(config);
    let shared = Shared::new(&config);
    let channels = Channels::new(config.ticket_queue_slots, config.boarding_queue_slots);
    let (admin_tx, admin_rx) = mpsc::unbounded_channel();

    let mut next_worker = 1u32;
    let mut worker_id = || {
        let id = WorkerId(next_worker);
        next_worker += 1;
        id
    };

    let mut driver_links = Vec::new();
    let mut driver_aborts = Vec::new();
    let mut driver_tasks = Vec::new();
    for i in 0..config.buses {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let driver = Driver::new(
            BusId(i),
            worker_id(),
            shared.clone(),
            channels.clone(),
            Arc::clone(&config),
            Arc::clone(&logger),
            SystemClock,
            cmd_rx,
        );
        let task = tokio::spawn(driver.run());
        driver_links.push(DriverLink {
            bus: BusId(i),
            commands: cmd_tx,
            handle: task.abort_handle(),
        });
        driver_aborts.push(task.abort_handle());
        driver_tasks.push(task);
    }

    let mut office_links = Vec::new();
    let mut office_aborts = Vec::new();
    let mut office_tasks = Vec::new();
    for i in 0..config.ticket_offices {
        let office = TicketOffice::new(
            i,
            worker_id(),
            shared.clone(),
            channels.clone(),
            Arc::clone(&config),
            Arc::clone(&logger),
        );
        let task = tokio::spawn(office.run());
        office_links.push(OfficeLink {
            id: i,
            handle: task.abort_handle(),
        });
        office_aborts.push(task.abort_handle());
        office_tasks.push(task);
    }

    let controller = Controller::new(
        shared.clone(),
        channels.clone(),
        Arc::clone(&config),
        Arc::clone(&logger),
        SystemClock,
        admin_rx,
        driver_links,
        office_links,
    );
    let controller_task = tokio::spawn(controller.run());

    let supervise = tokio::spawn(supervise(
        shared.clone(),
        channels.clone(),
        Arc::clone(&config),
        logger,
        controller_task,
        driver_tasks,
        office_tasks,
    ));

    Ok(SimHandle {
        admin: admin_tx,
        shared,
        channels,
        driver_aborts,
        office_aborts,
        supervise,
    })
}

/// Pace arrivals, reap finished passengers, and run the shutdown ladder:
/// orderly first, cancellation after the grace period, abort as a last
/// resort.
async fn supervise(
    shared: Shared,
    channels: Channels,
    config: Arc<SimConfig>,
    logger: Arc<StationLogger>,
    mut controller: JoinHandle<()>,
    drivers: Vec<JoinHandle<()>>,
    offices: Vec<JoinHandle<()>>,
) -> FinalReport {
    let mut passengers: JoinSet<crate::passenger::Outcome> = JoinSet::new();
    let mut rng = StdRng::from_os_rng();
    let mut next_id = 1u32;
    let mut spawned = 0u32;

    loop {
        if shared.lock_state(|s| s.spawning_stopped || !s.running) {
            break;
        }
        if let Some(cap) = config.max_passengers {
            if spawned >= cap {
                shared.lock_state_mut(|s| s.spawning_stopped = true);
                break;
            }
        }

        let min = config.min_arrival.as_millis() as u64;
        let max = config.max_arrival.as_millis() as u64;
        let delay = Duration::from_millis(rng.random_range(min..=max));
        tokio::select! {
            biased;
            _ = channels.shutdown.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }

        let descriptor = Passenger::sample(PassengerId::new(next_id), &config, &mut rng);
        next_id += 1;
        spawned += 1;
        let actor = PassengerActor::new(
            descriptor,
            shared.clone(),
            channels.clone(),
            Arc::clone(&config),
            Arc::clone(&logger),
        );
        passengers.spawn(actor.run());

        // Non-blocking reap of finished passenger tasks.
        while passengers.try_join_next().is_some() {}
    }
    shared.lock_state_mut(|s| s.spawning_stopped = true);
    tracing::info!(spawned, "passenger admission stopped");

    // The controller decides when the station is done. If it misses the
    // grace period, cancel outright and collect it.
    if tokio::time::timeout(config.shutdown_grace, &mut controller)
        .await
        .is_err()
    {
        tracing::warn!("controller missed the shutdown grace; cancelling");
        channels.shutdown.cancel();
        let _ = controller.await;
    }

    // Orderly teardown is done; release anything still parked on a channel.
    channels.shutdown.cancel();

    let reap = async {
        while passengers.join_next().await.is_some() {}
    };
    if tokio::time::timeout(config.shutdown_grace, reap).await.is_err() {
        tracing::warn!("aborting straggler passengers");
        passengers.abort_all();
        while passengers.join_next().await.is_some() {}
    }

    for task in drivers.into_iter().chain(offices) {
        join_or_abort(task, config.shutdown_grace).await;
    }

    write_final_report(&shared, &logger)
}

async fn join_or_abort(mut task: JoinHandle<()>, grace: Duration) {
    if tokio::time::timeout(grace, &mut task).await.is_err() {
        task.abort();
        let _ = task.await;
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
