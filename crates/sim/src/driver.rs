// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bus driver: owns one bus, services boarding while active, runs trips.
//!
//! At most one bus is active at a time; only its driver holds the boarding
//! intake. A departing driver hands the active slot to its successor under
//! the station mutex before it stops accepting requests, so there is never
//! a window with two buses boarding.

use crate::logging::{LogCategory, LogLevel, StationLogger};
use crate::protocol::{BoardingRequest, BoardingResponse, DriverCommand};
use crate::queues::Channels;
use crate::state::Shared;
use depot_core::{BusId, BusState, Clock, DenyReason, Passenger, SimConfig, StationState, WorkerId};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Whether a boarding request is admissible right now. Checks run in the
/// order a conductor would: credentials, station policy, then this bus.
pub(crate) fn admission(
    state: &StationState,
    bus_id: BusId,
    passenger: &Passenger,
    config: &SimConfig,
) -> Result<(), DenyReason> {
    if !passenger.may_board() {
        return Err(DenyReason::NoTicket);
    }
    if !state.boarding_allowed {
        return Err(DenyReason::BoardingClosed);
    }
    let bus = state.bus(bus_id);
    if !bus.at_station {
        return Err(DenyReason::NotAtStation);
    }
    if !bus.boarding_open {
        return Err(DenyReason::BoardingClosed);
    }
    if bus.passenger_count + passenger.seat_count() > config.bus_capacity {
        return Err(DenyReason::BusFull);
    }
    if passenger.has_bike && bus.bike_count >= config.bike_capacity {
        return Err(DenyReason::BikeRackFull);
    }
    Ok(())
}

/// Departure rule: never with an empty bus; otherwise on a full bus (when
/// the depart-when-full option is on), once the scheduled deadline has
/// expired, or when forced.
pub(crate) fn should_depart<C: Clock>(
    bus: &BusState,
    clock: &C,
    force: bool,
    config: &SimConfig,
) -> bool {
    if bus.passenger_count == 0 {
        return false;
    }
    if config.depart_when_full && bus.passenger_count >= config.bus_capacity {
        return true;
    }
    if let Some(scheduled) = bus.departure_time {
        if clock.expired(scheduled) {
            return true;
        }
    }
    force
}

/// Round-robin successor: first bus after `departing` that is parked with a
/// live driver.
pub(crate) fn next_active(state: &StationState, departing: BusId) -> Option<BusId> {
    let n = state.buses.len();
    for k in 1..n {
        let idx = (departing.index() + k) % n;
        if state.buses[idx].at_station && state.drivers[idx].is_some() {
            return Some(BusId(idx));
        }
    }
    None
}

#[derive(Debug, PartialEq, Eq)]
enum Served {
    /// Time to pull out.
    Depart,
    /// No longer the active bus.
    Idle,
    /// Orderly exit.
    Exit,
}

/// One driver task, bound to one bus for the whole run.
pub struct Driver<C: Clock> {
    bus_id: BusId,
    worker: WorkerId,
    shared: Shared,
    channels: Channels,
    config: Arc<SimConfig>,
    logger: Arc<StationLogger>,
    clock: C,
    commands: mpsc::UnboundedReceiver<DriverCommand>,
    force_depart: bool,
}

impl<C: Clock> Driver<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bus_id: BusId,
        worker: WorkerId,
        shared: Shared,
        channels: Channels,
        config: Arc<SimConfig>,
        logger: Arc<StationLogger>,
        clock: C,
        commands: mpsc::UnboundedReceiver<DriverCommand>,
    ) -> Self {
        Self {
            bus_id,
            worker,
            shared,
            channels,
            config,
            logger,
            clock,
            commands,
            force_depart: false,
        }
    }

    pub async fn run(mut self) {
        let bus_id = self.bus_id;
        let first_departure = self.clock.deadline(self.config.boarding_interval);
        self.shared.lock_state_mut(|s| {
            s.drivers[bus_id.index()] = Some(self.worker);
            s.bus_mut(bus_id).departure_time = Some(first_departure);
        });
        tracing::debug!(bus = %bus_id, "driver on duty");

        loop {
            if self.channels.shutdown.is_cancelled() || self.should_exit() {
                break;
            }
            let active = self.shared.lock_state(|s| s.active_bus == Some(bus_id));
            if active {
                match self.serve_boarding().await {
                    Served::Depart => self.depart_and_trip().await,
                    Served::Idle => {}
                    Served::Exit => break,
                }
            } else if self.idle_turn().await == Served::Exit {
                break;
            }
        }

        self.shared.lock_state_mut(|s| {
            s.drivers[bus_id.index()] = None;
            s.bus_mut(bus_id).boarding_open = false;
            if s.active_bus == Some(bus_id) {
                s.active_bus = next_active(s, bus_id);
            }
        });
        tracing::debug!(bus = %bus_id, "driver off duty");
    }

    /// A closed station still obliges the fleet to move remaining waiters.
    fn should_exit(&self) -> bool {
        self.shared.lock_state(|s| {
            !s.running && !(s.station_closed && s.counters.passengers_waiting > 0)
        })
    }

    fn handle_command(&mut self, command: DriverCommand) {
        match command {
            DriverCommand::ForceDepart => {
                tracing::debug!(bus = %self.bus_id, "force-depart requested");
                self.force_depart = true;
            }
            DriverCommand::Shutdown => {
                tracing::debug!(bus = %self.bus_id, "shutdown requested");
            }
        }
    }

    /// Parked without the active slot: doze, but stay responsive to
    /// commands and to a force-depart with riders still aboard.
    async fn idle_turn(&mut self) -> Served {
        tokio::select! {
            biased;
            _ = self.channels.shutdown.cancelled() => return Served::Exit,
            command = self.commands.recv() => match command {
                Some(c) => self.handle_command(c),
                // Command channel gone: the controller is down. Pace the
                // loop so the exit checks still run without spinning.
                None => tokio::time::sleep(self.config.retry_tick).await,
            },
            _ = tokio::time::sleep(self.config.retry_tick) => {}
        }
        let depart = self.shared.lock_state(|s| {
            let bus = s.bus(self.bus_id);
            bus.at_station && should_depart(bus, &self.clock, self.force_depart, &self.config)
        });
        self.force_depart = false;
        if depart {
            self.depart_and_trip().await;
        }
        Served::Idle
    }

    /// Hold the boarding intake and admit passengers until it is time to
    /// depart, the active slot moves elsewhere, or the station winds down.
    async fn serve_boarding(&mut self) -> Served {
        let bus_id = self.bus_id;
        let intake = self.channels.boarding.intake();
        let mut intake = intake.lock().await;

        enum Step {
            Out(Served),
            Wait(Duration),
        }

        loop {
            if self.channels.shutdown.is_cancelled() || self.should_exit() {
                return Served::Exit;
            }
            let force = self.force_depart;
            self.force_depart = false;
            let next_departure = self.clock.deadline(self.config.boarding_interval);
            let step = self.shared.lock_state_mut(|s| {
                if s.active_bus != Some(bus_id) {
                    return Step::Out(Served::Idle);
                }
                if should_depart(s.bus(bus_id), &self.clock, force, &self.config) {
                    // Hand over the active slot before we stop accepting.
                    let successor = next_active(s, bus_id);
                    s.active_bus = successor;
                    if let Some(next) = successor {
                        s.bus_mut(next).departure_time = Some(next_departure);
                    }
                    return Step::Out(Served::Depart);
                }
                // Loaded bus: nap at most until its own departure deadline.
                let bus = s.bus(bus_id);
                let wait = match bus.departure_time {
                    Some(scheduled) if bus.passenger_count > 0 => {
                        self.clock.until(scheduled).min(self.config.retry_tick)
                    }
                    _ => self.config.retry_tick,
                };
                Step::Wait(wait)
            });
            let wait = match step {
                Step::Out(verdict) => return verdict,
                Step::Wait(wait) => wait,
            };

            tokio::select! {
                biased;
                _ = self.channels.shutdown.cancelled() => return Served::Exit,
                command = self.commands.recv() => match command {
                    Some(c) => self.handle_command(c),
                    None => tokio::time::sleep(self.config.retry_tick).await,
                },
                request = intake.recv() => match request {
                    Some(r) => {
                        self.channels.boarding.release_slot();
                        self.admit(r).await;
                    }
                    None => return Served::Exit,
                },
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    /// Serve one boarding request end to end. The counter update and the
    /// reply are adjacent with no await between them.
    async fn admit(&self, request: BoardingRequest) {
        let bus_id = self.bus_id;
        let passenger = request.passenger;
        let seats = passenger.seat_count();

        let verdict = self.shared.lock_state_mut(|s| {
            let v = admission(s, bus_id, &passenger, &self.config);
            if v.is_ok() {
                s.bus_mut(bus_id).entering_count += 1;
            }
            v
        });
        if let Err(reason) = verdict {
            self.logger.append(
                LogCategory::Driver,
                LogLevel::Debug,
                &format!("{} denied {}: {}", bus_id, passenger.id, reason),
            );
            let _ = request.reply.send(BoardingResponse::denied(reason));
            return;
        }

        // One party through one physical door at a time.
        let door = if passenger.has_bike {
            self.channels.gates.bike_door.clone()
        } else {
            self.channels.gates.passenger_door.clone()
        };
        let permit = tokio::select! {
            biased;
            _ = self.channels.shutdown.cancelled() => None,
            permit = door.acquire_owned() => permit.ok(),
        };
        let Some(permit) = permit else {
            self.shared.lock_state_mut(|s| {
                let bus = s.bus_mut(bus_id);
                bus.entering_count = bus.entering_count.saturating_sub(1);
            });
            let _ = request.reply.send(BoardingResponse::denied(DenyReason::Shutdown));
            return;
        };

        tokio::time::sleep(self.config.boarding_delay(seats)).await;

        self.shared.lock_state_mut(|s| s.complete_boarding(bus_id, &passenger));
        drop(permit);
        self.logger.append(
            LogCategory::Driver,
            LogLevel::Info,
            &format!("{} boarded {} ({} seat{})", bus_id, passenger.id, seats, if seats == 1 { "" } else { "s" }),
        );
        let _ = request.reply.send(BoardingResponse::approved(bus_id));
    }

    /// Wait for the entrance to clear, run the trip, come back, and claim
    /// the active slot if it is vacant.
    async fn depart_and_trip(&mut self) {
        let bus_id = self.bus_id;
        loop {
            let entering = self.shared.lock_state(|s| s.bus(bus_id).entering_count);
            if entering == 0 {
                break;
            }
            tokio::time::sleep(self.config.retry_tick).await;
        }

        let trip = {
            let mut rng = rand::rng();
            let min = self.config.min_return_time.as_millis() as u64;
            let max = self.config.max_return_time.as_millis() as u64;
            Duration::from_millis(rng.random_range(min..=max))
        };
        let return_time = self.clock.deadline(trip);
        let riders = self.shared.lock_state_mut(|s| s.depart_bus(bus_id, return_time));
        self.logger.append(
            LogCategory::Driver,
            LogLevel::Info,
            &format!("{} departed with {} aboard", bus_id, riders),
        );
        tracing::info!(bus = %bus_id, riders, "departed");

        tokio::select! {
            biased;
            _ = self.channels.shutdown.cancelled() => return,
            _ = tokio::time::sleep(self.config.trip_delay(trip)) => {}
        }

        let next_departure = self.clock.deadline(self.config.boarding_interval);
        self.shared.lock_state_mut(|s| {
            s.bus_mut(bus_id).arrive_back(next_departure);
            let vacant = match s.active_bus {
                None => true,
                Some(active) => {
                    !s.bus(active).at_station || s.drivers[active.index()].is_none()
                }
            };
            if vacant {
                s.active_bus = Some(bus_id);
            }
        });
        self.logger.append(
            LogCategory::Driver,
            LogLevel::Info,
            &format!("{} returned to the station", bus_id),
        );
        tracing::debug!(bus = %bus_id, "returned");
    }
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
