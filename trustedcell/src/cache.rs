// SPDX-License-Identifier: GPL-2.0-only
//! The decision cache: a fixed array of `S = 256` shards, each holding up to
//! `C = 64` entries behind its own lock, with popularity-based eviction.
//!
//! Shard selection hashes the fingerprint tuple and picks a `RwLock`-guarded
//! shard (`hash % shards.len()`). Each shard is a plain `Vec<CacheEntry>`,
//! scanned linearly rather than through a `HashMap`, since `C = 64` makes a
//! linear scan cheap and the match predicate (owner-qualification) isn't a
//! plain key equality a hash map could express directly.

use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use parking_lot::RwLock;
use trustedcell_common::{CellId, Metrics};

use crate::fingerprint::{shard_hash, Fingerprint};

/// Number of shards.
pub const SHARDS: usize = 256;
/// Maximum live entries per shard.
pub const SHARD_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn from_permit(permit: bool) -> Self {
        if permit {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }

    pub fn is_allow(self) -> bool {
        matches!(self, Decision::Allow)
    }
}

struct CacheEntry {
    fingerprint: Fingerprint,
    decision: Decision,
    popularity: AtomicU32,
}

#[derive(Default)]
struct Shard {
    entries: Vec<CacheEntry>,
}

pub struct DecisionCache {
    shards: Vec<RwLock<Shard>>,
    hasher: ahash::RandomState,
    metrics: Arc<Metrics>,
}

impl DecisionCache {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            shards: (0..SHARDS).map(|_| RwLock::new(Shard::default())).collect(),
            hasher: ahash::RandomState::new(),
            metrics,
        }
    }

    fn shard_index(&self, uid: u32, cell: &CellId, category: &str, owner: &str, action: &str) -> usize {
        (shard_hash(&self.hasher, uid, cell, category, owner, action) as usize) % self.shards.len()
    }

    /// Read-only traversal of the matching shard. On hit, atomically bumps
    /// the entry's popularity and returns the stored decision.
    pub fn lookup(&self, uid: u32, cell: &CellId, category: &str, owner: &str, action: &str) -> Option<Decision> {
        let idx = self.shard_index(uid, cell, category, owner, action);
        let shard = self.shards[idx].read();
        for entry in shard.entries.iter() {
            if entry.fingerprint.matches(uid, cell, category, owner, action) {
                entry.popularity.fetch_add(1, Ordering::Relaxed);
                self.metrics.record_cache_hit();
                return Some(entry.decision);
            }
        }
        self.metrics.record_cache_miss();
        None
    }

    /// Inserts a freshly-decided entry, evicting unpopular entries first if
    /// the shard is already at capacity.
    ///
    /// Eviction threshold is `popularity <= average`, computed once over the
    /// pre-eviction set — this can evict the majority of a shard in one pass
    /// (including entries exactly at the mean), by design: an aggressive
    /// reclaim rather than a softened percentile-based one.
    pub fn add(&self, fingerprint: Fingerprint, decision: Decision) {
        let idx = self.shard_index(
            fingerprint.uid,
            &fingerprint.cell,
            &fingerprint.category,
            &fingerprint.owner,
            &fingerprint.action,
        );
        let mut shard = self.shards[idx].write();

        if shard.entries.len() >= SHARD_CAPACITY {
            let total: u64 = shard.entries.iter().map(|e| e.popularity.load(Ordering::Relaxed) as u64).sum();
            let average = total / shard.entries.len() as u64;
            let before = shard.entries.len();
            shard.entries.retain(|e| e.popularity.load(Ordering::Relaxed) as u64 > average);
            let evicted = before - shard.entries.len();
            if evicted > 0 {
                self.metrics.record_cache_evict(evicted as u64);
                tracing::debug!(shard = idx, evicted, average, "decision cache shard eviction");
            }
        }

        if let Some(existing) = shard.entries.iter_mut().find(|e| {
            e.fingerprint
                .matches(fingerprint.uid, &fingerprint.cell, &fingerprint.category, &fingerprint.owner, &fingerprint.action)
        }) {
            existing.fingerprint = fingerprint;
            existing.decision = decision;
            self.metrics.record_cache_replace();
        } else {
            shard.entries.insert(
                0,
                CacheEntry {
                    fingerprint,
                    decision,
                    popularity: AtomicU32::new(1),
                },
            );
            self.metrics.record_cache_insert();
        }
    }

    /// Number of live entries in the shard a fingerprint would hash to.
    /// Exposed for tests asserting the `len <= SHARD_CAPACITY` invariant.
    #[cfg(test)]
    fn shard_len(&self, uid: u32, cell: &CellId, category: &str, owner: &str, action: &str) -> usize {
        let idx = self.shard_index(uid, cell, category, owner, action);
        self.shards[idx].read().entries.len()
    }
}
