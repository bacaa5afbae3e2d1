// SPDX-License-Identifier: GPL-2.0-only
//! Counters for the mediation pipeline.
//!
//! Plain atomics live next to the data structures they instrument, and each
//! counter is additionally mirrored out through the `metrics` facade so an
//! operator can wire in whatever recorder (Prometheus, statsd, ...) the
//! deployment uses.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Metrics {
    pub cache_hit: AtomicU64,
    pub cache_miss: AtomicU64,
    pub cache_insert: AtomicU64,
    pub cache_replace: AtomicU64,
    pub cache_evict: AtomicU64,
    pub request_enqueued: AtomicU64,
    pub request_cancelled: AtomicU64,
    pub decide_allow: AtomicU64,
    pub decide_deny: AtomicU64,
}

impl Metrics {
    fn bump(counter: &AtomicU64, name: &'static str) {
        counter.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(name).increment(1);
    }

    pub fn record_cache_hit(&self) {
        Self::bump(&self.cache_hit, "trustedcell_cache_hit");
    }

    pub fn record_cache_miss(&self) {
        Self::bump(&self.cache_miss, "trustedcell_cache_miss");
    }

    pub fn record_cache_insert(&self) {
        Self::bump(&self.cache_insert, "trustedcell_cache_insert");
    }

    pub fn record_cache_replace(&self) {
        Self::bump(&self.cache_replace, "trustedcell_cache_replace");
    }

    pub fn record_cache_evict(&self, count: u64) {
        self.cache_evict.fetch_add(count, Ordering::Relaxed);
        metrics::counter!("trustedcell_cache_evict").increment(count);
    }

    pub fn record_request_enqueued(&self) {
        Self::bump(&self.request_enqueued, "trustedcell_request_enqueued");
    }

    pub fn record_request_cancelled(&self) {
        Self::bump(&self.request_cancelled, "trustedcell_request_cancelled");
    }

    pub fn record_decide_allow(&self) {
        Self::bump(&self.decide_allow, "trustedcell_decide_allow");
    }

    pub fn record_decide_deny(&self) {
        Self::bump(&self.decide_deny, "trustedcell_decide_deny");
    }
}
