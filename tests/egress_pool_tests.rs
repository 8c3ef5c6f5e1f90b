//! Egress pool behaviour under simulated and real time.
//!
//! Tests verify:
//! - Mutual exclusion of BUSY identities under concurrent acquirers
//! - Guard interval between two uses of the same identity
//! - ERROR transition after repeated failures and the 600s cooldown
//! - Round-robin order across identities

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use table_translator::egress::{Clock, EgressPool, EgressStatus, ManualClock, PoolConfig};
use table_translator::{EgressIdentity, Outcome};

/// Direct connection plus `proxies` proxy identities.
fn identities(proxies: usize) -> Vec<EgressIdentity> {
    let mut ids = vec![EgressIdentity::direct()];
    for i in 1..=proxies {
        ids.push(EgressIdentity::proxy(i, format!("192.0.2.{}:8080", i)));
    }
    ids
}

fn manual_pool(proxies: usize, rpm: u32) -> (EgressPool, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(0));
    let config = PoolConfig::from_rate_limit(rpm).unwrap();
    let pool = EgressPool::with_clock(identities(proxies), config, clock.clone()).unwrap();
    (pool, clock)
}

// ============================================================================
// ROTATION SCENARIOS
// ============================================================================

#[test]
fn test_four_identities_cycle_and_respect_guard() {
    // 3 proxies + direct, 10 requests/min => 6s guard
    let (pool, clock) = manual_pool(3, 10);

    let mut seen = Vec::new();
    for t in 0..4 {
        clock.set_secs(t);
        let id = pool.try_acquire().expect("an identity should be free");
        seen.push(id.id);
        pool.release(&id, Outcome::Success);
    }
    assert_eq!(seen, vec![0, 1, 2, 3]);

    // Everything was used within the last 6 seconds
    for t in 4..=6 {
        clock.set_secs(t);
        assert!(
            pool.try_acquire().is_none(),
            "no identity may be reused at t={}",
            t
        );
    }

    clock.advance_ms(1);
    assert_eq!(pool.try_acquire().map(|i| i.id), Some(0));
}

#[test]
fn test_guard_interval_holds_for_any_pool_size() {
    for proxies in 0..4 {
        let (pool, clock) = manual_pool(proxies, 12); // 5s guard
        let mut last_use: HashMap<usize, u64> = HashMap::new();

        for step in 0..60u64 {
            clock.set_secs(step);
            if let Some(id) = pool.try_acquire() {
                if let Some(prev) = last_use.insert(id.id, step) {
                    assert!(
                        step - prev > 5,
                        "identity {} reused after {}s with {} proxies",
                        id.id,
                        step - prev,
                        proxies
                    );
                }
                pool.release(&id, Outcome::Success);
            }
        }

        assert_eq!(last_use.len(), proxies + 1, "every identity gets used");
    }
}

// ============================================================================
// ERROR STATE AND COOLDOWN
// ============================================================================

#[test]
fn test_four_failures_move_identity_to_error() {
    // 60/min => 1s guard
    let (pool, clock) = manual_pool(1, 60);

    let direct = pool.try_acquire().unwrap();
    assert_eq!(direct.id, 0);
    pool.release(&direct, Outcome::Failure);

    // Hold the proxy so every retry lands on the direct identity
    clock.advance_secs(2);
    let proxy = pool.try_acquire().unwrap();
    assert_eq!(proxy.id, 1);

    for attempt in 2..=4 {
        clock.advance_secs(2);
        let id = pool.try_acquire().unwrap();
        assert_eq!(id.id, 0);
        pool.release(&id, Outcome::Failure);

        let state = pool.state(0).unwrap();
        assert_eq!(state.consecutive_errors, attempt);
        let expected = if attempt > 3 {
            EgressStatus::Error
        } else {
            EgressStatus::Ready
        };
        assert_eq!(state.status, expected);
    }

    // 5th attempt goes elsewhere
    pool.release(&proxy, Outcome::Success);
    clock.advance_secs(2);
    let fifth = pool.try_acquire().unwrap();
    assert_eq!(fifth.id, 1);
    pool.release(&fifth, Outcome::Success);
}

#[test]
fn test_error_identity_waits_600_seconds() {
    let (pool, clock) = manual_pool(0, 60);

    let mut last_use = 0;
    for _ in 0..4 {
        clock.advance_secs(2);
        last_use = clock.now_ms() / 1000;
        let id = pool.try_acquire().unwrap();
        pool.release(&id, Outcome::Failure);
    }
    assert_eq!(pool.state(0).unwrap().status, EgressStatus::Error);

    clock.set_secs(last_use + 300);
    assert!(pool.try_acquire().is_none());

    clock.set_secs(last_use + 600);
    assert!(pool.try_acquire().is_none());

    clock.advance_ms(1);
    let recovered = pool.try_acquire().expect("cooldown elapsed");
    pool.release(&recovered, Outcome::Success);

    let state = pool.state(0).unwrap();
    assert_eq!(state.status, EgressStatus::Ready);
    assert_eq!(state.consecutive_errors, 0);
}

#[test]
fn test_error_identity_failing_again_returns_to_error() {
    let (pool, clock) = manual_pool(0, 60);

    for _ in 0..4 {
        clock.advance_secs(2);
        let id = pool.try_acquire().unwrap();
        pool.release(&id, Outcome::Failure);
    }

    clock.advance_secs(601);
    let id = pool.try_acquire().unwrap();
    pool.release(&id, Outcome::Failure);

    let state = pool.state(0).unwrap();
    assert_eq!(state.status, EgressStatus::Error);
    assert_eq!(state.consecutive_errors, 5);
}

// ============================================================================
// CONCURRENCY
// ============================================================================

#[test]
fn test_concurrent_acquirers_never_share_busy_identity() {
    let config = PoolConfig {
        guard_interval: Duration::from_millis(0),
        ..PoolConfig::default()
    };
    let pool = Arc::new(EgressPool::new(identities(2), config).unwrap());
    let in_use: Arc<Mutex<HashSet<usize>>> = Arc::new(Mutex::new(HashSet::new()));
    let violations = Arc::new(Mutex::new(0usize));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let in_use = Arc::clone(&in_use);
            let violations = Arc::clone(&violations);
            thread::spawn(move || {
                let mut acquired = 0;
                while acquired < 50 {
                    let id = match pool.try_acquire() {
                        Some(id) => id,
                        None => {
                            thread::yield_now();
                            continue;
                        }
                    };
                    if !in_use.lock().insert(id.id) {
                        *violations.lock() += 1;
                    }
                    thread::sleep(Duration::from_micros(50));
                    in_use.lock().remove(&id.id);
                    pool.release(&id, Outcome::Success);
                    acquired += 1;
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(*violations.lock(), 0);
    for snapshot in pool.snapshot() {
        assert_eq!(snapshot.state.status, EgressStatus::Ready);
    }
}

#[tokio::test]
async fn test_acquire_polls_until_guard_elapses() {
    let config = PoolConfig {
        guard_interval: Duration::from_millis(50),
        poll_interval: Duration::from_millis(5),
        ..PoolConfig::default()
    };
    let pool = EgressPool::new(identities(0), config).unwrap();

    let first = pool.acquire(None).await.unwrap();
    pool.release(&first, Outcome::Success);

    let started = std::time::Instant::now();
    let second = pool.acquire(Some(Duration::from_secs(2))).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(45));
    assert_eq!(second.id, 0);
}
