//! Notification router — fans registry mutations out to scan sessions.
//!
//! Each session entry owns its compiled query, its delivery channel, and the
//! set of ids it has reported Found. That set is what enforces the ordering
//! contract: Found at most once per live id, Lost only after Found, never a
//! Lost without one. Sessions are isolated — an entry's events depend only
//! on its own query and its own history.
//!
//! Like the registry, the router is plain data operated on under the engine
//! lock. Delivery uses unbounded sends, so fan-out never blocks the lock
//! holder and never drops an event.

use std::collections::{HashMap, HashSet};

use tokio::sync::mpsc;

use beacon_core::{AdId, Advertisement, Query, Update};

struct SessionEntry {
    query: Query,
    tx: mpsc::UnboundedSender<Update>,
    /// Ids this session has reported Found and not yet reported Lost.
    reported: HashSet<AdId>,
}

impl SessionEntry {
    fn deliver(&self, session_id: u64, update: Update) {
        // A send error means the receiver is mid-teardown; the session will
        // unregister itself, so the event can only be dropped after stop.
        if self.tx.send(update).is_err() {
            tracing::trace!(session_id, "update dropped: session closing");
        }
    }
}

/// The set of live scan sessions, keyed by session id.
#[derive(Default)]
pub(crate) struct Router {
    sessions: HashMap<u64, SessionEntry>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session and replay the registry snapshot through it.
    ///
    /// Replay and registration are one step, performed under the engine
    /// lock, so the snapshot and all future events form a single ordered
    /// stream: nothing missed, nothing double-counted.
    pub fn register(
        &mut self,
        session_id: u64,
        query: Query,
        tx: mpsc::UnboundedSender<Update>,
        snapshot: &[Advertisement],
    ) {
        let mut entry = SessionEntry {
            query,
            tx,
            reported: HashSet::new(),
        };
        for ad in snapshot {
            if entry.query.matches(ad) {
                entry.reported.insert(ad.id);
                entry.deliver(session_id, Update::Found(ad.clone()));
            }
        }
        tracing::debug!(
            session_id,
            query = %entry.query,
            replayed = entry.reported.len(),
            "scan session registered"
        );
        self.sessions.insert(session_id, entry);
    }

    /// Drop a session. Events already queued on its channel are the caller's
    /// to discard; no new ones will be sent after this returns.
    pub fn unregister(&mut self, session_id: u64) {
        if self.sessions.remove(&session_id).is_some() {
            tracing::debug!(session_id, "scan session unregistered");
        }
    }

    /// A record was just advertised: push Found to every session whose query
    /// matches and which has not already reported this id.
    pub fn ad_found(&mut self, ad: &Advertisement) {
        for (session_id, entry) in &mut self.sessions {
            if entry.reported.contains(&ad.id) || !entry.query.matches(ad) {
                continue;
            }
            entry.reported.insert(ad.id);
            entry.deliver(*session_id, Update::Found(ad.clone()));
        }
    }

    /// A record was just stopped: push Lost to exactly the sessions that
    /// previously received Found for it. Clearing the id lets a future
    /// advertisement reuse it and be Found again.
    pub fn ad_lost(&mut self, ad: &Advertisement) {
        for (session_id, entry) in &mut self.sessions {
            if entry.reported.remove(&ad.id) {
                entry.deliver(*session_id, Update::Lost(ad.clone()));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }
}
