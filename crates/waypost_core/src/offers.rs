//! # Inventory Offer Registry
//!
//! Offers wait here until someone answers them or they expire. Resolution
//! and expiry both go through the registry lock and remove the entry in
//! the same critical section, so each offer is settled exactly once.

use crate::grid::InventoryOffer;
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Answer to an inventory offer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OfferDecision {
    /// Take the offer, filing it in `folder` (or the default folder for its kind)
    Accept {
        /// Target folder
        folder: Option<Uuid>,
    },
    /// Refuse the offer
    Decline,
}

/// Offer registry failures.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferError {
    /// No pending offer with this session id.
    #[error("no pending inventory offer {0}")]
    NotFound(Uuid),
}

struct PendingOffer {
    offer: InventoryOffer,
    decision: Sender<OfferDecision>,
}

/// Handle the acceptance side waits on.
#[derive(Debug)]
pub struct OfferTicket {
    id: Uuid,
    decision: Receiver<OfferDecision>,
}

impl OfferTicket {
    /// Session id of the offer.
    #[inline]
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }
}

/// Pending inventory offers keyed by session id.
#[derive(Default)]
pub struct OfferRegistry {
    pending: Mutex<HashMap<Uuid, PendingOffer>>,
}

impl OfferRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Files an offer. Returns `None` when an offer with the same session
    /// id is still pending; the first one keeps its ticket.
    pub fn register(&self, offer: InventoryOffer) -> Option<OfferTicket> {
        let id = offer.session;
        match self.pending.lock().entry(id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let (tx, rx) = bounded(1);
                slot.insert(PendingOffer {
                    offer,
                    decision: tx,
                });
                Some(OfferTicket { id, decision: rx })
            }
        }
    }

    /// Answers a pending offer and removes it.
    pub fn resolve(&self, id: Uuid, decision: OfferDecision) -> Result<InventoryOffer, OfferError> {
        let mut pending = self.pending.lock();
        let entry = pending.remove(&id).ok_or(OfferError::NotFound(id))?;
        // Capacity one and a single sender: this never blocks or fails
        // unless the waiter has already gone away.
        let _ = entry.decision.try_send(decision);
        Ok(entry.offer)
    }

    /// Copy of a pending offer.
    #[must_use]
    pub fn peek(&self, id: Uuid) -> Option<InventoryOffer> {
        self.pending.lock().get(&id).map(|p| p.offer.clone())
    }

    /// Removes an offer nobody answered. Returns false if it was already
    /// settled.
    pub fn expire(&self, id: Uuid) -> bool {
        self.pending.lock().remove(&id).is_some()
    }

    /// Number of pending offers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Whether no offers are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Waits up to `timeout` for an answer. Unanswered offers are expired
    /// and settle as declined.
    pub fn await_decision(&self, ticket: &OfferTicket, timeout: Duration) -> OfferDecision {
        if let Ok(decision) = ticket.decision.recv_timeout(timeout) {
            return decision;
        }
        if self.expire(ticket.id) {
            tracing::info!(offer = %ticket.id, "inventory offer expired");
            return OfferDecision::Decline;
        }
        // Resolved between the timeout and the expiry attempt.
        ticket
            .decision
            .try_recv()
            .unwrap_or(OfferDecision::Decline)
    }
}

impl std::fmt::Debug for OfferRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfferRegistry")
            .field("pending", &self.len())
            .finish()
    }
}
