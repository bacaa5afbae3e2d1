// SPDX-License-Identifier: GPL-2.0-only
//! The request/response queue: a bounded FIFO of outstanding policy
//! questions, plus a pending-response table keyed by request id.
//!
//! Every caller here is a distinct, blocking, synchronous call site rather
//! than an async task, so this deliberately does not reach for
//! `tokio::sync::mpsc`. It instead uses a `parking_lot::{Mutex, Condvar}`
//! pair: one condvar for "not full", one for "not empty", plus a third for
//! the pending table. None of the three locks nest with each other.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use parking_lot::{Condvar, Mutex};
use trustedcell_common::{CellId, Error, Result};

use crate::{cache::Decision, fingerprint::Fingerprint};

/// Capacity of the outbound request FIFO.
pub const QUEUE_CAPACITY: usize = 16;

/// How often a blocking wait re-checks its [`CancelToken`] and re-polls its
/// condition. Real kernel code wakes immediately on a pending signal; a
/// userspace condvar loop approximates that with bounded-latency polling
/// instead, since there is no portable "interrupt this thread" primitive.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// A cooperative cancellation handle. Cloning shares the same underlying
/// flag; calling [`CancelToken::cancel`] from any clone is observed by every
/// blocking wait holding another clone within one [`POLL_INTERVAL`].
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// An outstanding policy question, as placed on the FIFO and later popped by
/// the host's read endpoint.
#[derive(Debug, Clone)]
pub struct Request {
    pub id: u64,
    pub fingerprint: Fingerprint,
}

#[derive(Debug, Clone, Copy)]
enum PendingState {
    Waiting,
    Resolved(Decision, bool),
}

struct PendingSlot {
    state: PendingState,
}

struct Outbound {
    queue: Mutex<VecDeque<Request>>,
    not_full: Condvar,
    not_empty: Condvar,
}

struct PendingTable {
    table: Mutex<HashMap<u64, PendingSlot>>,
    resolved: Condvar,
}

pub struct RequestQueue {
    capacity: usize,
    outbound: Outbound,
    pending: PendingTable,
    next_id: AtomicU64,
}

impl RequestQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            outbound: Outbound {
                queue: Mutex::new(VecDeque::with_capacity(capacity)),
                not_full: Condvar::new(),
                not_empty: Condvar::new(),
            },
            pending: PendingTable {
                table: Mutex::new(HashMap::new()),
                resolved: Condvar::new(),
            },
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocates the next request id. Strictly increasing, never reused, for
    /// the lifetime of this queue.
    pub fn next_request_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Registers a pending-response slot before the matching request is
    /// enqueued, so invariant 6 (every popped request has a matching pending
    /// entry) never has a window where it doesn't hold.
    pub fn register_pending(&self, id: u64) {
        self.pending.table.lock().insert(id, PendingSlot { state: PendingState::Waiting });
    }

    /// Removes a pending-response slot without waiting for a response.
    /// Called by the requester on cancellation — the requester always owns
    /// this cleanup, never the responder.
    pub fn unregister_pending(&self, id: u64) {
        self.pending.table.lock().remove(&id);
    }

    /// Blocks until there is room on the FIFO, then enqueues `request`.
    pub fn send(&self, request: Request, cancel: &CancelToken) -> Result<()> {
        let mut guard = self.outbound.queue.lock();
        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            if guard.len() < self.capacity {
                guard.push_back(request);
                drop(guard);
                self.outbound.not_empty.notify_all();
                return Ok(());
            }
            self.outbound.not_full.wait_for(&mut guard, POLL_INTERVAL);
        }
    }

    /// Blocks until the FIFO is non-empty, then pops the oldest request.
    pub fn recv(&self, cancel: &CancelToken) -> Result<Request> {
        let mut guard = self.outbound.queue.lock();
        loop {
            if let Some(request) = guard.pop_front() {
                drop(guard);
                self.outbound.not_full.notify_all();
                return Ok(request);
            }
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            self.outbound.not_empty.wait_for(&mut guard, POLL_INTERVAL);
        }
    }

    /// Host write endpoint: resolves a pending response and wakes every
    /// waiter. Returns `Error::Invalid` if no such request is pending (the
    /// id is unknown, or was already resolved and collected).
    pub fn put_response(&self, id: u64, decision: Decision, cacheable: bool) -> Result<()> {
        let mut table = self.pending.table.lock();
        match table.get_mut(&id) {
            Some(slot) => {
                slot.state = PendingState::Resolved(decision, cacheable);
                drop(table);
                self.pending.resolved.notify_all();
                Ok(())
            }
            None => Err(Error::Invalid("unknown or already-resolved request id")),
        }
    }

    /// Non-blocking poll: returns the resolved `(decision, cacheable)` pair
    /// and removes the entry, or `None` if it isn't resolved yet. Returns
    /// `Error::NoData` if the id isn't registered at all.
    pub fn get_response(&self, id: u64) -> Result<Option<(Decision, bool)>> {
        let mut table = self.pending.table.lock();
        match table.get(&id) {
            Some(slot) => match slot.state {
                PendingState::Resolved(decision, cacheable) => {
                    table.remove(&id);
                    Ok(Some((decision, cacheable)))
                }
                PendingState::Waiting => Ok(None),
            },
            None => Err(Error::NoData),
        }
    }

    /// Blocks until `id`'s response is resolved, then removes and returns it.
    /// On cancellation, removes the pending entry before returning.
    pub fn wait_for_response(&self, id: u64, cancel: &CancelToken) -> Result<(Decision, bool)> {
        let mut table = self.pending.table.lock();
        loop {
            match table.get(&id) {
                Some(slot) => {
                    if let PendingState::Resolved(decision, cacheable) = slot.state {
                        table.remove(&id);
                        return Ok((decision, cacheable));
                    }
                }
                None => return Err(Error::NoData),
            }
            if cancel.is_cancelled() {
                table.remove(&id);
                return Err(Error::Cancelled);
            }
            self.pending.resolved.wait_for(&mut table, POLL_INTERVAL);
        }
    }
}
