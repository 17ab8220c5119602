// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ticket office worker pool.
//!
//! Offices share one inbound queue and take it one receive at a time. A
//! request is accounted (counter update) and replied to with no await point
//! in between, so a received `TicketResponse` always implies the counters
//! moved, and a dropped reply always implies they did not.

use crate::logging::{LogCategory, LogLevel, StationLogger};
use crate::protocol::{TicketRequest, TicketResponse};
use crate::queues::Channels;
use crate::state::Shared;
use depot_core::{DenyReason, SimConfig, WorkerId};
use std::sync::Arc;

enum Turn {
    Request(TicketRequest),
    QueueClosed,
    Tick,
    Teardown,
}

/// One ticket office worker.
pub struct TicketOffice {
    pub id: usize,
    worker: WorkerId,
    shared: Shared,
    channels: Channels,
    config: Arc<SimConfig>,
    logger: Arc<StationLogger>,
}

impl TicketOffice {
    pub fn new(
        id: usize,
        worker: WorkerId,
        shared: Shared,
        channels: Channels,
        config: Arc<SimConfig>,
        logger: Arc<StationLogger>,
    ) -> Self {
        Self {
            id,
            worker,
            shared,
            channels,
            config,
            logger,
        }
    }

    pub async fn run(self) {
        let office_id = self.id;
        self.shared.lock_state_mut(|s| s.offices[office_id] = Some(self.worker));
        tracing::debug!(office = office_id, "ticket office open");

        let receiver = self.channels.tickets.receiver();
        loop {
            if !self.shared.lock_state(|s| s.running) {
                break;
            }
            let turn = {
                let mut rx = receiver.lock().await;
                tokio::select! {
                    biased;
                    _ = self.channels.shutdown.cancelled() => Turn::Teardown,
                    request = rx.recv() => match request {
                        Some(r) => {
                            // Slot back before the lock drops: the next
                            // producer may enqueue immediately.
                            self.channels.tickets.release_slot();
                            Turn::Request(r)
                        }
                        None => Turn::QueueClosed,
                    },
                    // Periodic wake-up to re-check the running flag.
                    _ = tokio::time::sleep(self.config.retry_tick) => Turn::Tick,
                }
            };
            match turn {
                Turn::Request(request) => self.serve(request).await,
                Turn::Tick => continue,
                Turn::QueueClosed | Turn::Teardown => break,
            }
        }

        self.drain().await;
        self.shared.lock_state_mut(|s| s.offices[office_id] = None);
        tracing::debug!(office = office_id, "ticket office closed");
    }

    /// Handle one request: validate, simulate service, stamp, account, reply.
    async fn serve(&self, request: TicketRequest) {
        let mut passenger = request.passenger;
        let seats = passenger.seat_count();

        if !passenger.valid_for_ticket(&self.config) {
            self.shared.lock_state_mut(|s| s.deny_ticket(seats));
            self.logger.append(
                LogCategory::TicketOffice,
                LogLevel::Warn,
                &format!("office {} denied {}: invalid record", self.id, passenger.id),
            );
            let _ = request.reply.send(TicketResponse {
                passenger,
                approved: false,
                reason: Some(DenyReason::InvalidPassenger),
            });
            return;
        }

        tokio::time::sleep(self.config.service_delay(self.config.ticket_service_time)).await;

        passenger.has_ticket = true;
        self.shared.lock_state_mut(|s| s.issue_ticket(seats));
        self.logger.append(
            LogCategory::TicketOffice,
            LogLevel::Info,
            &format!(
                "office {} issued ticket to {} ({} seat{})",
                self.id,
                passenger.id,
                seats,
                if seats == 1 { "" } else { "s" }
            ),
        );
        let _ = request.reply.send(TicketResponse {
            passenger,
            approved: true,
            reason: None,
        });
    }

    /// Refuse everything still queued so no passenger hangs on a reply.
    async fn drain(&self) {
        let receiver = self.channels.tickets.receiver();
        let mut rx = receiver.lock().await;
        rx.close();
        let mut drained = 0u32;
        while let Ok(request) = rx.try_recv() {
            self.channels.tickets.release_slot();
            let seats = request.passenger.seat_count();
            self.shared.lock_state_mut(|s| s.deny_ticket(seats));
            let _ = request.reply.send(TicketResponse {
                passenger: request.passenger,
                approved: false,
                reason: Some(DenyReason::Shutdown),
            });
            drained += 1;
        }
        if drained > 0 {
            self.logger.append(
                LogCategory::TicketOffice,
                LogLevel::Info,
                &format!("office {} drained {} pending requests", self.id, drained),
            );
        }
    }
}

#[cfg(test)]
#[path = "office_tests.rs"]
mod tests;
