//! Advertisement records and their fixed-width identifiers.
//!
//! An [`Advertisement`] describes one discoverable interface: its name, the
//! endpoints it is reachable at, and caller-supplied metadata. The record is
//! an owned value — once handed to the registry or delivered in an update it
//! is detached from any mutable state.

use std::collections::BTreeMap;
use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Width of an advertisement id in bytes.
pub const AD_ID_LEN: usize = 16;

/// Fixed-width opaque advertisement identifier.
///
/// The all-zero value means "not yet assigned": `advertise` treats it as
/// absent and generates a fresh id. Every non-zero id is unique among
/// currently-live advertisements — the registry rejects a live duplicate.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct AdId([u8; AD_ID_LEN]);

impl AdId {
    /// The all-zero "absent" id.
    pub const ZERO: AdId = AdId([0u8; AD_ID_LEN]);

    pub fn new(bytes: [u8; AD_ID_LEN]) -> Self {
        AdId(bytes)
    }

    /// Draw a fresh id from the thread RNG.
    ///
    /// 128 random bits. The registry independently rejects a live collision,
    /// so a (vanishingly unlikely) repeat cannot corrupt the table.
    pub fn random() -> Self {
        let mut bytes = [0u8; AD_ID_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        AdId(bytes)
    }

    /// True for the all-zero "absent" id.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; AD_ID_LEN]
    }

    pub fn as_bytes(&self) -> &[u8; AD_ID_LEN] {
        &self.0
    }
}

impl fmt::Display for AdId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for AdId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AdId({})", hex::encode(self.0))
    }
}

/// A published record describing a discoverable interface.
///
/// `addresses` order is caller-supplied and preserved; the matcher never
/// compares it. `attributes` are queryable; `attachments` are opaque payloads
/// delivered verbatim and never inspected. Absent maps are empty maps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Advertisement {
    /// Advertisement id. `AdId::ZERO` = assign one at advertise time.
    pub id: AdId,

    /// Name of the advertised service interface.
    pub interface_name: String,

    /// Endpoint strings, in caller order.
    pub addresses: Vec<String>,

    /// Queryable string metadata. Keys unique.
    pub attributes: BTreeMap<String, String>,

    /// Opaque byte payloads. Keys unique. Not queryable.
    pub attachments: BTreeMap<String, Vec<u8>>,
}

impl Default for Advertisement {
    fn default() -> Self {
        Self {
            id: AdId::ZERO,
            interface_name: String::new(),
            addresses: Vec::new(),
            attributes: BTreeMap::new(),
            attachments: BTreeMap::new(),
        }
    }
}

impl Advertisement {
    /// Convenience constructor for the common case: name + addresses.
    pub fn new(interface_name: impl Into<String>, addresses: Vec<String>) -> Self {
        Self {
            interface_name: interface_name.into(),
            addresses,
            ..Self::default()
        }
    }
}

/// A scan notification: an advertisement started or stopped matching.
///
/// Updates carry owned records — a consumer reading one later is unaffected
/// by registry mutations that happened in between.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Update {
    Found(Advertisement),
    Lost(Advertisement),
}

impl Update {
    /// The advertisement this update is about, whichever way it went.
    pub fn advertisement(&self) -> &Advertisement {
        match self {
            Update::Found(ad) | Update::Lost(ad) => ad,
        }
    }

    pub fn id(&self) -> AdId {
        self.advertisement().id
    }

    pub fn is_lost(&self) -> bool {
        matches!(self, Update::Lost(_))
    }
}
