//! beacon-core — shared types, query language, and configuration.
//! All other Beacon crates depend on this one.

pub mod ad;
pub mod config;
pub mod error;
pub mod query;

pub use ad::{AdId, Advertisement, Update, AD_ID_LEN};
pub use error::DiscoveryError;
pub use query::Query;
