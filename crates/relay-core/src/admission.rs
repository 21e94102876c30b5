//! Per-user admission guard.
//!
//! Every user owns one exclusive slot, created lazily and kept for the rest of
//! the process lifetime. A completion request runs only while it holds its
//! user's slot; a second request for the same user is turned away instead of
//! queued.
//!
//! The table is a sharded [`DashMap`] so unrelated users never contend on a
//! single lock. A slot is an [`AtomicU64`] holding either zero (free) or the token
//! of the acquisition that holds it, set with compare-and-set. The map shard is
//! locked only long enough to look up or insert the slot; acquisition never
//! waits.
//!
//! Tokens are unique per guard, so a permit only ever clears its own hold: if
//! the slot was force-released and re-acquired in the meantime, dropping the
//! old permit leaves the new holder alone.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use dashmap::DashMap;

use crate::domain::UserId;

const FREE: u64 = 0;

#[derive(Debug)]
pub struct AdmissionGuard {
    slots: DashMap<UserId, Arc<AtomicU64>>,
    next_token: AtomicU64,
}

impl Default for AdmissionGuard {
    fn default() -> Self {
        Self {
            slots: DashMap::new(),
            next_token: AtomicU64::new(FREE + 1),
        }
    }
}

impl AdmissionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, user_id: UserId) -> Arc<AtomicU64> {
        if let Some(slot) = self.slots.get(&user_id) {
            return slot.clone();
        }
        self.slots
            .entry(user_id)
            .or_insert_with(|| Arc::new(AtomicU64::new(FREE)))
            .clone()
    }

    /// Claim `slot` under a fresh token. Returns the token on success.
    fn claim(&self, slot: &AtomicU64) -> Option<u64> {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        slot.compare_exchange(FREE, token, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| token)
    }

    /// Mark the user's slot held iff it was free. Never blocks.
    pub fn try_acquire(&self, user_id: UserId) -> bool {
        self.claim(&self.slot(user_id)).is_some()
    }

    /// Mark the user's slot free, whoever holds it. Releasing a free or unknown
    /// slot is a no-op.
    pub fn release(&self, user_id: UserId) {
        if let Some(slot) = self.slots.get(&user_id) {
            slot.store(FREE, Ordering::Release);
        }
    }

    /// Point-in-time view of the slot; may be stale by the time it is read.
    pub fn is_held(&self, user_id: UserId) -> bool {
        self.slots
            .get(&user_id)
            .map(|slot| slot.load(Ordering::Acquire) != FREE)
            .unwrap_or(false)
    }

    /// Acquire the user's slot as a scoped permit.
    ///
    /// The slot is released when the permit is dropped, whichever way its owner
    /// exits (return, error, panic unwinding, task abort).
    pub fn try_permit(&self, user_id: UserId) -> Option<AdmissionPermit> {
        let slot = self.slot(user_id);
        let token = self.claim(&slot)?;
        Some(AdmissionPermit {
            user_id,
            token,
            slot,
        })
    }

    /// Number of slots ever created. Slots are never removed.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

/// Exclusive hold on one user's admission slot.
#[derive(Debug)]
pub struct AdmissionPermit {
    user_id: UserId,
    token: u64,
    slot: Arc<AtomicU64>,
}

impl AdmissionPermit {
    pub fn user_id(&self) -> UserId {
        self.user_id
    }
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        // Only clear our own hold; a stale permit must not free a newer one.
        let _ = self.slot.compare_exchange(
            self.token,
            FREE,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}
