// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Station controller: lifecycle owner, admin-signal handler, watchdog.

use crate::logging::{LogCategory, LogLevel, StationLogger};
use crate::protocol::{BoardingResponse, DriverCommand, TicketResponse};
use crate::queues::Channels;
use crate::state::Shared;
use depot_core::{
    Accounting, AdminSignal, BusId, Clock, Counters, DenyReason, SimConfig, StationState,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::MissedTickBehavior;

/// Controller's handle on one driver task.
pub struct DriverLink {
    pub bus: BusId,
    pub commands: mpsc::UnboundedSender<DriverCommand>,
    pub handle: AbortHandle,
}

/// Controller's handle on one ticket office task.
pub struct OfficeLink {
    pub id: usize,
    pub handle: AbortHandle,
}

/// Outcome of one watchdog pass over the fleet.
#[derive(Debug, Default)]
pub(crate) struct FleetRepair {
    /// Buses whose driver died; registry cleared, bus sidelined.
    pub cleared: Vec<BusId>,
    /// The active slot moved (or emptied).
    pub reassigned: bool,
    /// Loaded buses overdue past the grace period.
    pub force_depart: Vec<BusId>,
}

/// One watchdog pass. Mutates the record in place; the caller holds the
/// station mutex.
pub(crate) fn repair_fleet<C: Clock>(
    state: &mut StationState,
    driver_dead: &[bool],
    clock: &C,
    config: &SimConfig,
) -> FleetRepair {
    let mut repair = FleetRepair::default();

    for i in 0..state.buses.len() {
        let dead = driver_dead.get(i).copied().unwrap_or(false);
        if state.drivers[i].is_none() || !dead {
            continue;
        }
        state.drivers[i] = None;
        let bus = state.bus_mut(BusId(i));
        let stranded = bus.passenger_count;
        bus.passenger_count = 0;
        bus.bike_count = 0;
        bus.entering_count = 0;
        bus.at_station = true;
        bus.boarding_open = false;
        bus.departure_time = None;
        bus.return_time = None;
        if stranded > 0 {
            // Riders of a driverless bus are evacuated, not transported.
            state.counters.passengers_left_early += stranded;
        }
        repair.cleared.push(BusId(i));
    }

    if let Some(active) = state.active_bus {
        if state.drivers[active.index()].is_none() || !state.bus(active).at_station {
            let successor = (0..state.buses.len())
                .find(|&j| state.drivers[j].is_some() && state.buses[j].at_station)
                .map(BusId);
            state.active_bus = successor;
            if let Some(next) = successor {
                let bus = state.bus_mut(next);
                bus.boarding_open = true;
                bus.departure_time = Some(clock.deadline(config.boarding_interval));
            }
            repair.reassigned = true;
        }
    }

    for bus in &state.buses {
        if bus.passenger_count == 0 || state.drivers[bus.id.index()].is_none() {
            continue;
        }
        if let Some(scheduled) = bus.departure_time {
            if clock.expired(scheduled + config.departure_grace) {
                repair.force_depart.push(bus.id);
            }
        }
    }

    repair
}

/// Termination predicate: an explicit stop, or a quiet station with nothing
/// left to do.
pub(crate) fn should_terminate(state: &StationState) -> bool {
    if !state.running {
        return true;
    }
    state.spawning_stopped
        && state.passengers_live == 0
        && state.counters.passengers_waiting == 0
        && state.counters.passengers_in_office == 0
        && state.fleet_idle()
}

pub struct Controller<C: Clock> {
    shared: Shared,
    channels: Channels,
    config: Arc<SimConfig>,
    logger: Arc<StationLogger>,
    clock: C,
    admin: mpsc::UnboundedReceiver<AdminSignal>,
    drivers: Vec<DriverLink>,
    offices: Vec<OfficeLink>,
}

impl<C: Clock> Controller<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        shared: Shared,
        channels: Channels,
        config: Arc<SimConfig>,
        logger: Arc<StationLogger>,
        clock: C,
        admin: mpsc::UnboundedReceiver<AdminSignal>,
        drivers: Vec<DriverLink>,
        offices: Vec<OfficeLink>,
    ) -> Self {
        Self {
            shared,
            channels,
            config,
            logger,
            clock,
            admin,
            drivers,
            offices,
        }
    }

    pub async fn run(mut self) {
        self.logger
            .append(LogCategory::Master, LogLevel::Info, "station controller online");

        let mut tick = tokio::time::interval(self.config.watchdog_period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                biased;
                _ = self.channels.shutdown.cancelled() => break,
                Some(signal) = self.admin.recv() => self.process_signal(signal),
                _ = tick.tick() => {
                    self.watchdog_tick();
                    if self.shared.lock_state(should_terminate) {
                        break;
                    }
                }
            }
        }

        self.wind_down().await;
    }

    fn process_signal(&mut self, signal: AdminSignal) {
        self.logger.append(
            LogCategory::Master,
            LogLevel::Warn,
            &format!("admin signal: {}", signal),
        );
        tracing::info!(%signal, "admin signal");
        match signal {
            AdminSignal::EarlyDepart => {
                for link in &self.drivers {
                    if !link.handle.is_finished() {
                        let _ = link.commands.send(DriverCommand::ForceDepart);
                    }
                }
            }
            AdminSignal::CloseStation => {
                let first_time = self.shared.lock_state_mut(|s| {
                    if s.station_closed {
                        return false;
                    }
                    s.station_closed = true;
                    s.station_open = false;
                    s.spawning_stopped = true;
                    true
                });
                if first_time {
                    // Release everyone blocked at the turnstile or the
                    // ticket queue; they re-read the flags and leave.
                    self.channels.gates.saturate_entry();
                    self.channels.tickets.saturate_slots();
                }
            }
            AdminSignal::Shutdown => {
                self.shared.lock_state_mut(|s| s.running = false);
            }
        }
    }

    fn watchdog_tick(&mut self) {
        let dead: Vec<bool> = self.drivers.iter().map(|l| l.handle.is_finished()).collect();
        let repair = self
            .shared
            .lock_state_mut(|s| repair_fleet(s, &dead, &self.clock, &self.config));

        for bus in &repair.cleared {
            self.logger.append(
                LogCategory::Dispatcher,
                LogLevel::Warn,
                &format!("driver of {} lost; bus sidelined", bus),
            );
            tracing::warn!(bus = %bus, "driver lost");
        }
        if repair.reassigned {
            let active = self.shared.lock_state(|s| s.active_bus);
            let label = active.map_or_else(|| "none".to_string(), |b| b.to_string());
            self.logger.append(
                LogCategory::Dispatcher,
                LogLevel::Info,
                &format!("active bus reassigned: {}", label),
            );
        }
        for bus in repair.force_depart {
            if let Some(link) = self.drivers.get(bus.index()) {
                self.logger.append(
                    LogCategory::Dispatcher,
                    LogLevel::Info,
                    &format!("{} overdue; forcing departure", bus),
                );
                let _ = link.commands.send(DriverCommand::ForceDepart);
            }
        }

        // Crashed offices leave their registry slot occupied.
        for office in &self.offices {
            if office.handle.is_finished() {
                let id = office.id;
                self.shared.lock_state_mut(|s| s.offices[id] = None);
            }
        }
    }

    /// Orderly end of the run: stop the world, free every waiter, and make
    /// sure no request is left without a response.
    async fn wind_down(&mut self) {
        self.logger
            .append(LogCategory::Master, LogLevel::Info, "station winding down");
        self.shared.lock_state_mut(|s| {
            s.running = false;
            s.spawning_stopped = true;
        });
        self.channels.tickets.saturate_slots();
        self.channels.boarding.saturate_slots();
        self.channels.gates.saturate_entry();
        for link in &self.drivers {
            let _ = link.commands.send(DriverCommand::Shutdown);
        }

        let deadline = tokio::time::Instant::now() + self.config.shutdown_grace;

        // A closed station still owes its remaining waiters a ride.
        loop {
            let owed = self.shared.lock_state(|s| {
                s.station_closed
                    && s.counters.passengers_waiting > 0
                    && s.drivers.iter().any(Option::is_some)
            });
            if !owed || tokio::time::Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(self.config.retry_tick).await;
        }

        // Let drivers park before we take the intake for the final drain.
        while !self.drivers.iter().all(|l| l.handle.is_finished()) {
            if tokio::time::Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(self.config.retry_tick).await;
        }

        self.drain_boarding().await;
        self.drain_tickets().await;
        self.logger
            .append(LogCategory::Master, LogLevel::Info, "station controller offline");
    }

    /// Refuse queued boarding requests so no passenger hangs on a reply.
    async fn drain_boarding(&self) {
        let intake = self.channels.boarding.intake();
        let mut intake = intake.lock().await;
        intake.close();
        let mut drained = 0u32;
        while let Some(request) = intake.try_recv() {
            self.channels.boarding.release_slot();
            let _ = request
                .reply
                .send(BoardingResponse::denied(DenyReason::Shutdown));
            drained += 1;
        }
        if drained > 0 {
            self.logger.append(
                LogCategory::Dispatcher,
                LogLevel::Info,
                &format!("drained {} boarding requests", drained),
            );
        }
    }

    /// Backstop for the office drain: if every office died, their queue
    /// still must not strand anyone.
    async fn drain_tickets(&self) {
        let receiver = self.channels.tickets.receiver();
        let mut rx = receiver.lock().await;
        rx.close();
        while let Ok(request) = rx.try_recv() {
            self.channels.tickets.release_slot();
            let seats = request.passenger.seat_count();
            self.shared.lock_state_mut(|s| s.deny_ticket(seats));
            let _ = request.reply.send(TicketResponse {
                passenger: request.passenger,
                approved: false,
                reason: Some(DenyReason::Shutdown),
            });
        }
    }
}

/// The station's closing books.
#[derive(Debug, Clone, Serialize)]
pub struct FinalReport {
    pub counters: Counters,
    pub accounting: Accounting,
    pub bus_trips: Vec<u32>,
    pub balanced: bool,
}

/// Snapshot the counters, write the STATS lines, and flag any imbalance as
/// an ERROR without crashing.
pub fn write_final_report(shared: &Shared, logger: &StationLogger) -> FinalReport {
    let (counters, accounting, bus_trips) = shared.lock_state(|s| {
        (
            s.counters.clone(),
            s.accounting(),
            s.buses.iter().map(|b| b.trips_completed).collect::<Vec<_>>(),
        )
    });
    let balanced = accounting.balanced();

    logger.stats(&accounting.to_string());
    if let Ok(json) = serde_json::to_string(&counters) {
        logger.stats(&json);
    }
    if balanced {
        logger.append(LogCategory::Master, LogLevel::Info, "final accounting balanced");
    } else {
        logger.append(
            LogCategory::Master,
            LogLevel::Error,
            &format!("accounting mismatch: {}", accounting),
        );
        tracing::error!(%accounting, "accounting mismatch at shutdown");
    }

    FinalReport {
        counters,
        accounting,
        bus_trips,
        balanced,
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
