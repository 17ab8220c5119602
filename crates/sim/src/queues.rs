// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded request queues and the station's physical gates.
//!
//! Backpressure contract: a producer acquires one slot permit before
//! sending; the consumer returns one permit per dequeue. Overload therefore
//! turns into waiting at the semaphore, never into message loss. Closing a
//! station (or shutting down) saturates the semaphores so every blocked
//! producer wakes up, re-reads the flags, and exits on its own.

use crate::error::SimError;
use crate::protocol::{BoardingRequest, TicketRequest};
use std::sync::Arc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio_util::sync::CancellationToken;

/// Permit count used to saturate a semaphore: large enough that no realistic
/// waiter population ever blocks again, small enough to never approach the
/// semaphore's internal ceiling even if applied repeatedly.
const SATURATE_PERMITS: usize = 1 << 20;

/// Acquire one slot permit, racing teardown. The permit is forgotten: the
/// consumer returns it after dequeuing.
pub(crate) async fn acquire_slot(
    slots: &Arc<Semaphore>,
    cancel: &CancellationToken,
) -> Result<(), SimError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SimError::Teardown),
        permit = slots.acquire() => match permit {
            Ok(p) => {
                p.forget();
                Ok(())
            }
            Err(_) => Err(SimError::Teardown),
        },
    }
}

/// The ticket office's inbound queue: one shared channel consumed by the
/// office pool, bounded by a slot semaphore.
#[derive(Clone)]
pub struct TicketQueue {
    tx: mpsc::UnboundedSender<TicketRequest>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<TicketRequest>>>,
    slots: Arc<Semaphore>,
}

impl TicketQueue {
    pub fn new(slot_count: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
            slots: Arc::new(Semaphore::new(slot_count)),
        }
    }

    pub async fn acquire_slot(&self, cancel: &CancellationToken) -> Result<(), SimError> {
        acquire_slot(&self.slots, cancel).await
    }

    /// Consumer side: return one slot after dequeuing a request.
    pub fn release_slot(&self) {
        self.slots.add_permits(1);
    }

    /// Return an unused slot permit (producer gave up before sending).
    pub fn return_slot(&self) {
        self.slots.add_permits(1);
    }

    pub fn send(&self, request: TicketRequest) -> Result<(), SimError> {
        self.tx.send(request).map_err(|_| SimError::Teardown)
    }

    /// Shared receiver; offices lock it one receive at a time.
    pub fn receiver(&self) -> Arc<Mutex<mpsc::UnboundedReceiver<TicketRequest>>> {
        Arc::clone(&self.rx)
    }

    /// Wake every producer blocked on a slot.
    pub fn saturate_slots(&self) {
        self.slots.add_permits(SATURATE_PERMITS);
    }

    /// Hand back several slots at once (scenario plumbing).
    pub fn release_slots(&self, count: usize) {
        self.slots.add_permits(count);
    }

    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }
}

/// Boarding intake: VIP requests ride a separate channel that the consumer
/// drains preferentially, which realizes "VIP before non-VIP at the point
/// of receipt" without a global ordering.
pub struct BoardingIntake {
    vip: mpsc::UnboundedReceiver<BoardingRequest>,
    regular: mpsc::UnboundedReceiver<BoardingRequest>,
}

impl BoardingIntake {
    /// Next request, VIPs first. `None` once both channels are closed and
    /// drained.
    pub async fn recv(&mut self) -> Option<BoardingRequest> {
        loop {
            match self.vip.try_recv() {
                Ok(request) => return Some(request),
                Err(TryRecvError::Disconnected) => return self.regular.recv().await,
                Err(TryRecvError::Empty) => {}
            }
            tokio::select! {
                biased;
                request = self.vip.recv() => match request {
                    Some(r) => return Some(r),
                    // VIP side closed; fall through to the regular channel.
                    None => continue,
                },
                request = self.regular.recv() => return request,
            }
        }
    }

    /// Non-blocking variant used by the shutdown drain, VIPs first.
    pub fn try_recv(&mut self) -> Option<BoardingRequest> {
        if let Ok(request) = self.vip.try_recv() {
            return Some(request);
        }
        self.regular.try_recv().ok()
    }

    /// Stop accepting new requests; buffered ones remain receivable.
    pub fn close(&mut self) {
        self.vip.close();
        self.regular.close();
    }
}

/// Boarding request queue with VIP priority and slot backpressure.
#[derive(Clone)]
pub struct BoardingQueue {
    vip_tx: mpsc::UnboundedSender<BoardingRequest>,
    regular_tx: mpsc::UnboundedSender<BoardingRequest>,
    intake: Arc<Mutex<BoardingIntake>>,
    slots: Arc<Semaphore>,
}

impl BoardingQueue {
    pub fn new(slot_count: usize) -> Self {
        let (vip_tx, vip) = mpsc::unbounded_channel();
        let (regular_tx, regular) = mpsc::unbounded_channel();
        Self {
            vip_tx,
            regular_tx,
            intake: Arc::new(Mutex::new(BoardingIntake { vip, regular })),
            slots: Arc::new(Semaphore::new(slot_count)),
        }
    }

    pub async fn acquire_slot(&self, cancel: &CancellationToken) -> Result<(), SimError> {
        acquire_slot(&self.slots, cancel).await
    }

    pub fn release_slot(&self) {
        self.slots.add_permits(1);
    }

    pub fn return_slot(&self) {
        self.slots.add_permits(1);
    }

    /// Route by the passenger's standing: VIPs jump ahead at the receiver.
    pub fn send(&self, request: BoardingRequest) -> Result<(), SimError> {
        let tx = if request.passenger.is_vip {
            &self.vip_tx
        } else {
            &self.regular_tx
        };
        tx.send(request).map_err(|_| SimError::Teardown)
    }

    /// The intake is locked by whichever driver is currently active; the
    /// controller takes it for the final drain.
    pub fn intake(&self) -> Arc<Mutex<BoardingIntake>> {
        Arc::clone(&self.intake)
    }

    pub fn saturate_slots(&self) {
        self.slots.add_permits(SATURATE_PERMITS);
    }

    /// Hand back several slots at once (scenario plumbing).
    pub fn release_slots(&self, count: usize) {
        self.slots.add_permits(count);
    }

    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }
}

/// The station's physical gates, each a binary semaphore serializing one
/// door, plus the admission turnstile.
#[derive(Clone)]
pub struct Gates {
    pub station_entry: Arc<Semaphore>,
    pub passenger_door: Arc<Semaphore>,
    pub bike_door: Arc<Semaphore>,
}

impl Gates {
    pub fn new() -> Self {
        Self {
            station_entry: Arc::new(Semaphore::new(1)),
            passenger_door: Arc::new(Semaphore::new(1)),
            bike_door: Arc::new(Semaphore::new(1)),
        }
    }

    /// Release everyone blocked at the admission turnstile so they can
    /// observe the closed flag and leave.
    pub fn saturate_entry(&self) {
        self.station_entry.add_permits(SATURATE_PERMITS);
    }
}

impl Default for Gates {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a component needs to talk to the rest of the station.
#[derive(Clone)]
pub struct Channels {
    pub tickets: TicketQueue,
    pub boarding: BoardingQueue,
    pub gates: Gates,
    /// Hard teardown: fired by the supervisor once orderly shutdown is done.
    pub shutdown: CancellationToken,
}

impl Channels {
    pub fn new(ticket_slots: usize, boarding_slots: usize) -> Self {
        Self {
            tickets: TicketQueue::new(ticket_slots),
            boarding: BoardingQueue::new(boarding_slots),
            gates: Gates::new(),
            shutdown: CancellationToken::new(),
        }
    }
}

#[cfg(test)]
#[path = "queues_tests.rs"]
mod tests;
