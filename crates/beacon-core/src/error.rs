//! Discovery error taxonomy.
//!
//! Exactly two operation-level failures exist. Everything else — stopping an
//! advertisement twice, stopping a scan twice, scanning with an empty query —
//! is a defined no-op so caller teardown stays simple.

use crate::ad::AdId;
use crate::query::QueryError;

/// Errors reported synchronously by `advertise` and `scan`.
///
/// Neither is retried internally, and neither leaves partial state behind:
/// a rejected advertise changes nothing, a rejected scan creates no session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiscoveryError {
    /// The caller-supplied id is already live in the registry.
    /// The existing advertisement is unaffected.
    #[error("advertisement id {0} is already being advertised")]
    DuplicateId(AdId),

    /// The query string failed to compile. No session was created.
    #[error("invalid query: {0}")]
    InvalidQuery(#[from] QueryError),
}
