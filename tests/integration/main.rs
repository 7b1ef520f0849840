//! Beacon integration test harness.
//!
//! End-to-end discovery scenarios against the in-process engine: advertise,
//! scan, live Found/Lost delivery, teardown. Everything here goes through
//! the public surface of beacon-engine — no reaching into internals.

mod concurrency;

use std::time::Duration;

use anyhow::{bail, Context, Result};
use beacon_core::{AdId, Advertisement, Update, AD_ID_LEN};
use beacon_engine::{Discovery, ScanSession};

// ── Fixtures ──────────────────────────────────────────────────────────────────

/// The two records used across scenarios: one with a caller-supplied id,
/// one expecting an assigned id.
pub fn fixture_ads() -> Vec<Advertisement> {
    let mut supplied_id = [0u8; AD_ID_LEN];
    supplied_id[..3].copy_from_slice(&[1, 2, 3]);

    let mut a = Advertisement::new("v.io/v23/a", vec!["/h1:123/x".into()]);
    a.id = AdId::new(supplied_id);
    a.attributes.insert("a1".into(), "v".into());
    a.attachments.insert("a2".into(), vec![1]);

    let mut b = Advertisement::new("v.io/v23/b", vec!["/h1:123/y".into()]);
    b.attributes.insert("b1".into(), "w".into());
    b.attachments.insert("b2".into(), vec![2]);

    vec![a, b]
}

// ── Harness ───────────────────────────────────────────────────────────────────

/// Receive the next update or fail after two seconds.
pub async fn next_update(scan: &mut ScanSession) -> Result<Update> {
    tokio::time::timeout(Duration::from_secs(2), scan.recv())
        .await
        .context("timed out waiting for update")?
        .context("scan session closed unexpectedly")
}

/// Open a scan, require Found for exactly `want` (any order), then nothing
/// else, and tear the session down.
pub async fn scan_and_match(d: &Discovery, query: &str, want: &[Advertisement]) -> Result<()> {
    let mut scan = d.scan(query)?;
    let mut got = Vec::with_capacity(want.len());
    for _ in 0..want.len() {
        match next_update(&mut scan).await? {
            Update::Found(ad) => got.push(ad),
            Update::Lost(ad) => bail!("unexpected Lost({}) during match", ad.id),
        }
    }
    if let Some(extra) = scan.try_recv() {
        bail!("unexpected extra update: {extra:?}");
    }

    let mut got_sorted = got;
    got_sorted.sort_by_key(|ad| ad.id);
    let mut want_sorted = want.to_vec();
    want_sorted.sort_by_key(|ad| ad.id);
    if got_sorted != want_sorted {
        bail!("scan {query:?} matched {got_sorted:?}, wanted {want_sorted:?}");
    }
    Ok(())
}
