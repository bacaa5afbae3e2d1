// SPDX-License-Identifier: GPL-2.0-only
//! The decision orchestrator: the single `decide(...)` entry point every
//! hooked operation funnels through.

use std::sync::Arc;

use trustedcell_common::{CellId, Metrics, Result};

use crate::{
    cache::{Decision, DecisionCache},
    fingerprint::{validate_action, validate_category, validate_owner, Fingerprint},
    queue::{CancelToken, Request, RequestQueue},
};

pub struct Orchestrator {
    cache: DecisionCache,
    queue: RequestQueue,
    metrics: Arc<Metrics>,
}

impl Orchestrator {
    pub fn new(queue_capacity: usize) -> Self {
        let metrics = Arc::new(Metrics::default());
        Self {
            cache: DecisionCache::new(metrics.clone()),
            queue: RequestQueue::new(queue_capacity),
            metrics,
        }
    }

    pub fn queue(&self) -> &RequestQueue {
        &self.queue
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// The mediation entry point, uncancellable variant. Equivalent to
    /// calling [`Orchestrator::decide_with_cancel`] with a token that is
    /// never cancelled.
    pub fn decide(&self, uid: u32, cell: &CellId, category: &str, owner: &str, action: &str) -> Result<Decision> {
        self.decide_with_cancel(uid, cell, category, owner, action, &CancelToken::new())
    }

    /// `decide(uid, cell, category, owner, action)`:
    ///
    /// 1. Consult the cache with a borrowing (zero-allocation) fingerprint.
    /// 2. On miss, build an owned request, register a pending-response slot.
    /// 3. Enqueue it; on cancellation, unregister and propagate.
    /// 4. Wait for the host's response; on cancellation, unregister and
    ///    propagate (the queue itself does the unregistering here).
    /// 5. If the host marked the decision cacheable, install it. A failed
    ///    insert never changes the decision returned to the caller.
    /// 6. Return the decision.
    #[tracing::instrument(level = "debug", skip(self, owner, cancel), fields(cell = %cell))]
    pub fn decide_with_cancel(
        &self,
        uid: u32,
        cell: &CellId,
        category: &str,
        owner: &str,
        action: &str,
        cancel: &CancelToken,
    ) -> Result<Decision> {
        validate_category(category)?;
        validate_owner(owner)?;
        validate_action(action)?;

        if let Some(decision) = self.cache.lookup(uid, cell, category, owner, action) {
            return Ok(decision);
        }

        let fingerprint = Fingerprint::new(uid, cell.clone(), category, owner, action)?;
        let id = self.queue.next_request_id();
        self.queue.register_pending(id);

        let request = Request { id, fingerprint: fingerprint.clone() };
        if let Err(err) = self.queue.send(request, cancel) {
            self.queue.unregister_pending(id);
            self.metrics.record_request_cancelled();
            return Err(err);
        }
        self.metrics.record_request_enqueued();

        let (decision, cacheable) = self.queue.wait_for_response(id, cancel)?;

        if cacheable {
            self.cache.add(fingerprint, decision);
        }

        match decision {
            Decision::Allow => self.metrics.record_decide_allow(),
            Decision::Deny => self.metrics.record_decide_deny(),
        }

        Ok(decision)
    }
}
