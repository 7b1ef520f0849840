use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use beacon_core::{AdId, Advertisement, Update};
use beacon_engine::Discovery;

use crate::next_update;

/// Many advertisers racing one long-lived scan: every record is Found
/// exactly once, every stop is Lost exactly once, and within each id the
/// Found always lands first.
#[tokio::test]
async fn concurrent_advertisers_ordered_per_id() -> Result<()> {
    const N: usize = 32;
    let d = Discovery::new();
    let mut scan = d.scan("")?;

    let mut tasks = Vec::new();
    for i in 0..N {
        let d = d.clone();
        tasks.push(tokio::spawn(async move {
            let (id, handle) = d
                .advertise(Advertisement::new(format!("if/{i}"), vec![format!("/h:{i}/x")]))
                .expect("advertise failed");
            // Let the Found circulate a moment before tearing down.
            tokio::time::sleep(Duration::from_millis(5)).await;
            handle.stop();
            id
        }));
    }
    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await?);
    }

    // 2N events total: one Found and one Lost per advertisement.
    let mut found: HashMap<AdId, usize> = HashMap::new();
    let mut lost: HashMap<AdId, usize> = HashMap::new();
    for _ in 0..2 * N {
        match next_update(&mut scan).await? {
            Update::Found(ad) => {
                *found.entry(ad.id).or_default() += 1;
            }
            Update::Lost(ad) => {
                assert_eq!(found.get(&ad.id), Some(&1), "Lost before Found for {}", ad.id);
                *lost.entry(ad.id).or_default() += 1;
            }
        }
    }
    assert!(scan.try_recv().is_none());
    for id in &ids {
        assert_eq!(found.get(id), Some(&1));
        assert_eq!(lost.get(id), Some(&1));
    }
    Ok(())
}

/// Sessions registered while advertisers are racing see each live record
/// exactly once — the snapshot and the live stream never overlap or miss.
#[tokio::test]
async fn scans_started_mid_churn_see_each_ad_once() -> Result<()> {
    const N: usize = 24;
    let d = Discovery::new();

    let mut advertisers = Vec::new();
    for i in 0..N {
        let d = d.clone();
        advertisers.push(tokio::spawn(async move {
            let (_, handle) = d
                .advertise(Advertisement::new(format!("if/{i}"), vec![format!("/h:{i}/x")]))
                .expect("advertise failed");
            // Keep the advertisement alive past the end of the test.
            std::mem::forget(handle);
        }));
    }

    // Open sessions while the advertisers are still in flight.
    let mut scans = Vec::new();
    for _ in 0..8 {
        scans.push(d.scan("")?);
        tokio::task::yield_now().await;
    }
    for task in advertisers {
        task.await?;
    }

    for scan in &mut scans {
        let mut counts: HashMap<AdId, usize> = HashMap::new();
        for _ in 0..N {
            let update = next_update(scan).await?;
            assert!(!update.is_lost(), "nothing was stopped");
            *counts.entry(update.id()).or_default() += 1;
        }
        assert!(scan.try_recv().is_none());
        assert_eq!(counts.len(), N, "every advertisement seen exactly once");
    }
    Ok(())
}

/// Stopping sessions and advertisements from different tasks at once must
/// not deadlock or panic. The whole dance is bounded by a timeout.
#[tokio::test]
async fn teardown_races_do_not_deadlock() -> Result<()> {
    let d = Discovery::new();

    let churn = {
        let d = d.clone();
        tokio::spawn(async move {
            for i in 0..200 {
                let (_, handle) = d
                    .advertise(Advertisement::new(format!("if/{}", i % 4), vec!["/h:1/x".into()]))
                    .expect("advertise failed");
                handle.stop();
                if i % 16 == 0 {
                    tokio::task::yield_now().await;
                }
            }
        })
    };

    let scanning = {
        let d = d.clone();
        tokio::spawn(async move {
            for _ in 0..100 {
                let mut scan = d.scan("").expect("scan failed");
                let _ = scan.try_recv();
                scan.stop();
            }
        })
    };

    tokio::time::timeout(Duration::from_secs(10), async {
        churn.await?;
        scanning.await?;
        Ok::<_, anyhow::Error>(())
    })
    .await
    .context("teardown race deadlocked")??;

    assert_eq!(d.live_ads(), 0);
    assert_eq!(d.live_sessions(), 0);
    Ok(())
}

/// Two sessions with disjoint queries: churn on one interface never leaks
/// into the other session's stream.
#[tokio::test]
async fn session_isolation_under_churn() -> Result<()> {
    let d = Discovery::new();
    let mut scan_a = d.scan(r#"v.InterfaceName="a""#)?;
    let mut scan_b = d.scan(r#"v.InterfaceName="b""#)?;

    let (_, handle_b) = d.advertise(Advertisement::new("b", vec!["/h:1/y".into()]))?;
    for _ in 0..10 {
        let (_, handle) = d.advertise(Advertisement::new("a", vec!["/h:1/x".into()]))?;
        handle.stop();
    }

    // scan_a saw ten Found/Lost pairs, scan_b exactly one Found.
    let mut events = 0;
    while scan_a.try_recv().is_some() {
        events += 1;
    }
    assert_eq!(events, 20);

    assert!(matches!(next_update(&mut scan_b).await?, Update::Found(_)));
    assert!(scan_b.try_recv().is_none());

    handle_b.stop();
    assert!(matches!(next_update(&mut scan_b).await?, Update::Lost(_)));
    Ok(())
}
