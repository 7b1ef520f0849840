//! The `Discovery` handle — advertise and scan against the shared engine.
//!
//! There is one registry+router per engine, guarded by a single mutex.
//! Advertise, stop, and the snapshot+register step of scan all linearize
//! through it, so a session can never register "between" a mutation and its
//! fan-out. A `Discovery` value is a cheap clone of the shared state: two
//! handles in the same process observe one registry.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;

use beacon_core::config::{BeaconConfig, EngineSettings};
use beacon_core::{AdId, Advertisement, DiscoveryError, Query};

use crate::registry::Registry;
use crate::router::Router;
use crate::session::ScanSession;

pub(crate) struct State {
    pub registry: Registry,
    pub router: Router,
}

pub(crate) struct Shared {
    state: Mutex<State>,
    next_session_id: AtomicU64,
    settings: EngineSettings,
}

impl Shared {
    pub fn state(&self) -> MutexGuard<'_, State> {
        // No code panics while holding the lock.
        self.state.lock().expect("discovery state lock poisoned")
    }
}

/// Handle onto the process-wide discovery engine.
///
/// Clone freely: every clone shares the same registry and router. Sessions
/// and advertise handles belong to whoever created them, but all observe the
/// same advertisements.
#[derive(Clone)]
pub struct Discovery {
    shared: Arc<Shared>,
}

impl Discovery {
    pub fn new() -> Self {
        Self::with_settings(EngineSettings::default())
    }

    pub fn with_settings(settings: EngineSettings) -> Self {
        Discovery {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    registry: Registry::new(),
                    router: Router::new(),
                }),
                next_session_id: AtomicU64::new(1),
                settings,
            }),
        }
    }

    /// Build an engine from loaded configuration.
    pub fn from_config(config: &BeaconConfig) -> Self {
        Self::with_settings(config.engine.clone())
    }

    /// Publish an advertisement.
    ///
    /// A zero id is assigned a fresh random one; a non-zero id that is
    /// already live fails with `DuplicateId` and changes nothing. On success
    /// every matching session receives Found before this returns, and the
    /// returned handle stops the advertisement — explicitly via
    /// [`AdvertiseHandle::stop`], or implicitly when dropped.
    pub fn advertise(
        &self,
        mut ad: Advertisement,
    ) -> Result<(AdId, AdvertiseHandle), DiscoveryError> {
        if ad.id.is_zero() {
            ad.id = AdId::random();
        }
        let id = ad.id;

        let mut state = self.shared.state();
        state.registry.insert(ad.clone())?;
        state.router.ad_found(&ad);

        let live = state.registry.len();
        drop(state);

        tracing::debug!(id = %id, interface = %ad.interface_name, live, "advertisement published");
        let threshold = self.shared.settings.ad_warn_threshold;
        if threshold > 0 && live > threshold {
            tracing::warn!(live, threshold, "advertisement table above warn threshold");
        }

        Ok((
            id,
            AdvertiseHandle {
                shared: Arc::clone(&self.shared),
                id,
                stopped: AtomicBool::new(false),
            },
        ))
    }

    /// Start a scan.
    ///
    /// The query is compiled first; a malformed one fails with
    /// `InvalidQuery` and no session is created. Otherwise the session
    /// immediately receives Found for every currently-live matching
    /// advertisement (in publication order), then live updates until stopped.
    pub fn scan(&self, query: &str) -> Result<ScanSession, DiscoveryError> {
        let query = Query::parse(query)?;
        let session_id = self.shared.next_session_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        let mut state = self.shared.state();
        let snapshot = state.registry.snapshot();
        state.router.register(session_id, query, tx, &snapshot);
        drop(state);

        Ok(ScanSession::new(
            Arc::clone(&self.shared),
            session_id,
            rx,
        ))
    }

    /// Fetch a live advertisement by id. Returns an owned copy.
    pub fn lookup(&self, id: &AdId) -> Option<Advertisement> {
        self.shared.state().registry.lookup(id).cloned()
    }

    /// Number of currently-live advertisements. Diagnostic surface for the
    /// calling layer; not part of the discovery contract.
    pub fn live_ads(&self) -> usize {
        self.shared.state().registry.len()
    }

    /// Number of currently-registered scan sessions.
    pub fn live_sessions(&self) -> usize {
        self.shared.state().router.len()
    }
}

impl Default for Discovery {
    fn default() -> Self {
        Self::new()
    }
}

/// Stops one advertisement. Stop is idempotent and safe to call
/// concurrently; dropping the handle stops the advertisement too.
pub struct AdvertiseHandle {
    shared: Arc<Shared>,
    id: AdId,
    stopped: AtomicBool,
}

impl std::fmt::Debug for AdvertiseHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdvertiseHandle")
            .field("id", &self.id)
            .field("stopped", &self.stopped)
            .finish_non_exhaustive()
    }
}

impl AdvertiseHandle {
    pub fn id(&self) -> AdId {
        self.id
    }

    /// Remove the advertisement and push Lost to every session that had
    /// reported it Found. Calling again (or racing another caller) does
    /// nothing: the swap decides a single winner, and the registry's
    /// single-shot remove backs it up.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut state = self.shared.state();
        if let Some(ad) = state.registry.remove(&self.id) {
            state.router.ad_lost(&ad);
            drop(state);
            tracing::debug!(id = %self.id, "advertisement stopped");
        }
    }
}

impl Drop for AdvertiseHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
