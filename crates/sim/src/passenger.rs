// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Passenger state machine: arrival, ticketing, station entry, boarding.
//!
//! Every party runs as its own task. An accompanying minor is a cooperative
//! subtask of the adult's task: it waits for the adult's word and never
//! boards on its own.

use crate::error::SimError;
use crate::logging::{LogCategory, LogLevel, StationLogger};
use crate::protocol::{BoardingRequest, TicketRequest};
use crate::queues::Channels;
use crate::state::Shared;
use depot_core::{BusId, Passenger, SimConfig};
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

/// Terminal state of one passenger task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Aboard a bus; the driver's departure will count the party as
    /// transported.
    Boarded(BusId),
    /// Counted as created but never transported.
    LeftEarly,
    /// Arrived after the station closed; never counted at all.
    TurnedAway,
}

/// What the adult tells the accompanying minor.
#[derive(Debug, Clone, Copy)]
enum MinorNews {
    Waiting,
    Boarded(BusId),
    GaveUp,
}

pub struct PassengerActor {
    descriptor: Passenger,
    shared: Shared,
    channels: Channels,
    config: Arc<SimConfig>,
    logger: Arc<StationLogger>,
}

impl PassengerActor {
    pub fn new(
        descriptor: Passenger,
        shared: Shared,
        channels: Channels,
        config: Arc<SimConfig>,
        logger: Arc<StationLogger>,
    ) -> Self {
        Self {
            descriptor,
            shared,
            channels,
            config,
            logger,
        }
    }

    pub async fn run(mut self) -> Outcome {
        let admitted = self.shared.lock_state_mut(|s| {
            if s.station_closed || !s.running {
                return false;
            }
            s.record_arrival(&self.descriptor, &self.config);
            true
        });
        if !admitted {
            self.logger.append(
                LogCategory::Passenger,
                LogLevel::Debug,
                &format!("{} turned away at the door", self.descriptor.id),
            );
            return Outcome::TurnedAway;
        }

        let (minor_tx, minor_task) = self.start_minor();
        let outcome = self.journey().await;
        match outcome {
            Outcome::Boarded(bus) => {
                let _ = minor_tx.send(MinorNews::Boarded(bus));
            }
            _ => {
                let _ = minor_tx.send(MinorNews::GaveUp);
            }
        }
        if let Some(task) = minor_task {
            let _ = task.await;
        }
        self.shared.lock_state_mut(|s| s.record_departure_from_simulation());

        match outcome {
            Outcome::Boarded(bus) => self.logger.append(
                LogCategory::Passenger,
                LogLevel::Info,
                &format!("{} boarded {}", self.descriptor.id, bus),
            ),
            Outcome::LeftEarly => self.logger.append(
                LogCategory::Passenger,
                LogLevel::Info,
                &format!("{} left early", self.descriptor.id),
            ),
            Outcome::TurnedAway => {}
        }
        outcome
    }

    async fn journey(&mut self) -> Outcome {
        // VIPs board on standing alone.
        if !self.descriptor.is_vip {
            match self.buy_ticket().await {
                Ok(true) => {}
                Ok(false) | Err(_) => return Outcome::LeftEarly,
            }
        }
        if !self.enter_station().await {
            return Outcome::LeftEarly;
        }
        match self.board().await {
            Some(bus) => Outcome::Boarded(bus),
            None => {
                let seats = self.descriptor.seat_count();
                self.shared.lock_state_mut(|s| {
                    s.leave_waiting(seats);
                    s.record_left_early(seats);
                });
                Outcome::LeftEarly
            }
        }
    }

    /// Queue at a ticket office. `Ok(true)` means the descriptor now holds
    /// a stamped ticket. All failure paths settle the party's accounting
    /// before returning.
    async fn buy_ticket(&mut self) -> Result<bool, SimError> {
        let seats = self.descriptor.seat_count();
        self.shared.lock_state_mut(|s| s.enter_office(seats));

        if self
            .channels
            .tickets
            .acquire_slot(&self.channels.shutdown)
            .await
            .is_err()
        {
            self.leave_office_early(seats);
            return Err(SimError::Teardown);
        }
        // A saturated semaphore may have released us after closing time.
        if self.shared.lock_state(|s| s.station_closed || !s.running) {
            self.channels.tickets.return_slot();
            self.leave_office_early(seats);
            return Ok(false);
        }

        let (reply, response) = oneshot::channel();
        let request = TicketRequest {
            passenger: self.descriptor.clone(),
            reply,
        };
        if self.channels.tickets.send(request).is_err() {
            self.channels.tickets.return_slot();
            self.leave_office_early(seats);
            return Err(SimError::Teardown);
        }

        match response.await {
            Ok(r) if r.approved => {
                self.descriptor = r.passenger;
                Ok(true)
            }
            Ok(_denied) => {
                // The office already settled the office count.
                self.shared.lock_state_mut(|s| s.record_left_early(seats));
                Ok(false)
            }
            Err(_) => {
                // Reply dropped: the office died before accounting for us.
                self.leave_office_early(seats);
                Err(SimError::Teardown)
            }
        }
    }

    fn leave_office_early(&self, seats: u32) {
        self.shared.lock_state_mut(|s| {
            s.leave_office(seats);
            s.record_left_early(seats);
        });
    }

    /// Pass the admission turnstile and join the waiting crowd. Up to ten
    /// attempts, one tick apart, before giving up.
    async fn enter_station(&mut self) -> bool {
        let seats = self.descriptor.seat_count();
        let mut permit = None;
        for _ in 0..10 {
            let entry = self.channels.gates.station_entry.clone();
            match tokio::time::timeout(self.config.retry_tick, entry.acquire_owned()).await {
                Ok(Ok(p)) => {
                    permit = Some(p);
                    break;
                }
                Ok(Err(_closed)) => break,
                Err(_busy) => {}
            }
        }
        let Some(permit) = permit else {
            self.shared.lock_state_mut(|s| s.record_left_early(seats));
            return false;
        };

        // Re-check under the lock: closing may have raced our entry.
        let entered = self.shared.lock_state_mut(|s| {
            if !s.station_open {
                s.record_left_early(seats);
                return false;
            }
            s.enter_waiting(seats);
            true
        });
        drop(permit);
        entered
    }

    /// Ask the active driver to board until aboard or told to stop.
    /// Returns the assigned bus, or `None` if the party gave up (caller
    /// settles the waiting count).
    async fn board(&mut self) -> Option<BusId> {
        loop {
            let (running, active, boarding_allowed) = self
                .shared
                .lock_state(|s| (s.running, s.active_bus, s.boarding_allowed));
            if !running {
                return None;
            }
            let Some(active) = active else {
                tokio::time::sleep(self.config.retry_tick).await;
                continue;
            };
            if !boarding_allowed {
                tokio::time::sleep(self.config.retry_tick).await;
                continue;
            }

            if self
                .channels
                .boarding
                .acquire_slot(&self.channels.shutdown)
                .await
                .is_err()
            {
                return None;
            }
            let (reply, response) = oneshot::channel();
            let request = BoardingRequest {
                passenger: self.descriptor.clone(),
                bus_hint: Some(active),
                reply,
            };
            if self.channels.boarding.send(request).is_err() {
                self.channels.boarding.return_slot();
                return None;
            }

            match response.await {
                Ok(r) if r.approved => {
                    let bus = r.bus.unwrap_or(active);
                    self.descriptor.assigned_bus = Some(bus);
                    return Some(bus);
                }
                Ok(r) => {
                    let transient = r.reason.is_some_and(|reason| reason.is_transient());
                    if !transient {
                        return None;
                    }
                    tokio::time::sleep(self.config.retry_tick).await;
                }
                Err(_) => {
                    // The serving driver died mid-admission; the watchdog
                    // will seat a new active bus. Try again.
                    tokio::time::sleep(self.config.retry_tick).await;
                }
            }
        }
    }

    /// Spawn the accompanying minor's subtask, if this party has one.
    fn start_minor(&self) -> (watch::Sender<MinorNews>, Option<JoinHandle<()>>) {
        let (tx, mut rx) = watch::channel(MinorNews::Waiting);
        let task = self.descriptor.child_age.map(|age| {
            let id = self.descriptor.id;
            let logger = Arc::clone(&self.logger);
            tokio::spawn(async move {
                while rx.changed().await.is_ok() {
                    let news = *rx.borrow();
                    match news {
                        MinorNews::Boarded(bus) => {
                            logger.append(
                                LogCategory::Passenger,
                                LogLevel::Debug,
                                &format!("minor (age {}) with {} boarded {}", age, id, bus),
                            );
                            return;
                        }
                        MinorNews::GaveUp => {
                            logger.append(
                                LogCategory::Passenger,
                                LogLevel::Debug,
                                &format!("minor (age {}) with {} left with the adult", age, id),
                            );
                            return;
                        }
                        MinorNews::Waiting => {}
                    }
                }
            })
        });
        (tx, task)
    }
}

#[cfg(test)]
#[path = "passenger_tests.rs"]
mod tests;
