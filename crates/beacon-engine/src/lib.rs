//! beacon-engine — the in-process discovery engine.
//!
//! One process-wide registry of live advertisements, a notification router
//! that fans registry mutations out to scan sessions, and the [`Discovery`]
//! handle callers use to advertise and scan. Transport bindings adapt these
//! in-process operations to whatever wire protocol is in use; the engine
//! itself never sees a socket.

mod registry;
mod router;
mod session;

pub mod discovery;

pub use beacon_core::{AdId, Advertisement, DiscoveryError, Update};
pub use discovery::{AdvertiseHandle, Discovery};
pub use session::ScanSession;
