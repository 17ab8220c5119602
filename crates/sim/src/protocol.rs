// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request/response envelopes exchanged between station components.
//!
//! Each request carries a dedicated `oneshot` reply sender: responses are
//! never refused, and a dropped sender is the receiver's teardown cue.

use depot_core::{BusId, DenyReason, Passenger};
use tokio::sync::oneshot;

/// A passenger asking a ticket office for a ticket.
#[derive(Debug)]
pub struct TicketRequest {
    pub passenger: Passenger,
    pub reply: oneshot::Sender<TicketResponse>,
}

/// The office's verdict. On approval, `passenger` carries the stamped
/// descriptor (`has_ticket` set).
#[derive(Debug, Clone)]
pub struct TicketResponse {
    pub passenger: Passenger,
    pub approved: bool,
    pub reason: Option<DenyReason>,
}

/// A passenger asking the active driver to board.
#[derive(Debug)]
pub struct BoardingRequest {
    pub passenger: Passenger,
    /// The bus the passenger observed as active when it queued up. The
    /// serving driver re-checks under the lock.
    pub bus_hint: Option<BusId>,
    pub reply: oneshot::Sender<BoardingResponse>,
}

/// The driver's verdict on one boarding request.
#[derive(Debug, Clone)]
pub struct BoardingResponse {
    pub approved: bool,
    pub bus: Option<BusId>,
    pub reason: Option<DenyReason>,
}

impl BoardingResponse {
    pub fn approved(bus: BusId) -> Self {
        Self {
            approved: true,
            bus: Some(bus),
            reason: None,
        }
    }

    pub fn denied(reason: DenyReason) -> Self {
        Self {
            approved: false,
            bus: None,
            reason: Some(reason),
        }
    }
}

/// Controller-to-driver nudges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverCommand {
    /// Depart now if at least one passenger is aboard. One-shot; rearms.
    ForceDepart,
    /// Orderly termination is underway.
    Shutdown,
}
