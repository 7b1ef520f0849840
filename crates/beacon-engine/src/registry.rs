//! Advertisement registry — the authoritative table of live advertisements.
//!
//! A record present in the table is Advertising; stopping removes it. The
//! table records insertion order so scan-start snapshots replay in the order
//! advertisements were published. All access happens under the engine lock
//! in `discovery.rs` — the registry itself is plain data.

use std::collections::HashMap;

use beacon_core::{AdId, Advertisement, DiscoveryError};

struct AdEntry {
    ad: Advertisement,
    /// Monotonic insertion sequence, for snapshot ordering.
    seq: u64,
}

/// Table of currently-live advertisements, keyed by id.
#[derive(Default)]
pub(crate) struct Registry {
    ads: HashMap<AdId, AdEntry>,
    next_seq: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record whose id has already been assigned.
    ///
    /// Fails with `DuplicateId` if the id is live; the existing record is
    /// untouched and nothing else changes.
    pub fn insert(&mut self, ad: Advertisement) -> Result<(), DiscoveryError> {
        debug_assert!(!ad.id.is_zero(), "registry requires an assigned id");
        if self.ads.contains_key(&ad.id) {
            return Err(DiscoveryError::DuplicateId(ad.id));
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.ads.insert(ad.id, AdEntry { ad, seq });
        Ok(())
    }

    /// Remove a record, returning it if it was live. A second remove of the
    /// same id returns None — this is what makes stop idempotent upstream.
    pub fn remove(&mut self, id: &AdId) -> Option<Advertisement> {
        self.ads.remove(id).map(|entry| entry.ad)
    }

    pub fn lookup(&self, id: &AdId) -> Option<&Advertisement> {
        self.ads.get(id).map(|entry| &entry.ad)
    }

    pub fn len(&self) -> usize {
        self.ads.len()
    }

    /// All live records, in insertion order.
    pub fn snapshot(&self) -> Vec<Advertisement> {
        let mut entries: Vec<&AdEntry> = self.ads.values().collect();
        entries.sort_by_key(|entry| entry.seq);
        entries.iter().map(|entry| entry.ad.clone()).collect()
    }
}
