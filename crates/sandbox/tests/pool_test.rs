//! Pool leasing integration tests.
//!
//! These exercise the exclusivity, no-leak, and blocking guarantees of the
//! sandbox pool using the mock isolation backend — no subprocesses or
//! Docker required.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use codebox_core::config::PoolConfig;
use codebox_core::Error;
use codebox_sandbox::{MockIsolator, SandboxPool};

// =============================================================================
// Helpers
// =============================================================================

fn pool_with_capacity(capacity: usize) -> (tempfile::TempDir, Arc<SandboxPool>) {
    let root = tempfile::tempdir().expect("tempdir");
    let config = PoolConfig {
        capacity,
        root_dir: root.path().join("boxes"),
    };
    let pool = SandboxPool::new(
        &config,
        Duration::from_secs(1),
        Arc::new(MockIsolator::default()),
    )
    .expect("pool construction");
    (root, Arc::new(pool))
}

// =============================================================================
// Exclusivity
// =============================================================================

#[tokio::test]
async fn concurrent_leases_never_exceed_capacity() {
    let (_root, pool) = pool_with_capacity(2);
    let current = Arc::new(AtomicUsize::new(0));
    let high_water = Arc::new(AtomicUsize::new(0));

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let pool = Arc::clone(&pool);
        let current = Arc::clone(&current);
        let high_water = Arc::clone(&high_water);
        tasks.push(tokio::spawn(async move {
            let lease = pool.obtain().await.expect("obtain");
            let now = current.fetch_add(1, Ordering::SeqCst) + 1;
            high_water.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            current.fetch_sub(1, Ordering::SeqCst);
            drop(lease);
        }));
    }
    for task in tasks {
        task.await.expect("task");
    }

    assert!(
        high_water.load(Ordering::SeqCst) <= 2,
        "more than capacity slots were leased at once"
    );
    assert_eq!(pool.available(), 2, "all slots returned after the burst");
}

#[tokio::test]
async fn leased_slots_are_distinct() {
    let (_root, pool) = pool_with_capacity(3);

    let a = pool.obtain().await.unwrap();
    let b = pool.obtain().await.unwrap();
    let c = pool.obtain().await.unwrap();

    assert_ne!(a.id(), b.id());
    assert_ne!(b.id(), c.id());
    assert_ne!(a.id(), c.id());
    assert_eq!(pool.available(), 0);
}

// =============================================================================
// Blocking obtain
// =============================================================================

#[tokio::test]
async fn obtain_blocks_until_a_slot_frees_up() {
    let (_root, pool) = pool_with_capacity(1);

    let held = pool.obtain().await.unwrap();

    let waiter = {
        let pool = Arc::clone(&pool);
        tokio::spawn(async move { pool.obtain().await.map(|lease| lease.id()) })
    };

    // The waiter must not get a slot while the only one is held.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiter.is_finished(), "waiter acquired a held slot");

    drop(held);
    let id = tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .expect("waiter should complete after release")
        .expect("join")
        .expect("obtain");
    assert_eq!(id, 0);
}

// =============================================================================
// No-leak
// =============================================================================

#[tokio::test]
async fn slot_returns_even_when_the_request_fails_midway() {
    let (_root, pool) = pool_with_capacity(2);
    assert_eq!(pool.available(), 2);

    {
        let mut lease = pool.obtain().await.unwrap();
        lease.clean_and_init().await.unwrap();
        // No meta report was ever produced; the request dies here.
        let err = lease.collect_outputs().await.unwrap_err();
        assert!(matches!(err, Error::MissingMetaReport(_)));
    }

    assert_eq!(pool.available(), 2, "lease drop must return the slot");
}

// =============================================================================
// Cleanliness across leases
// =============================================================================

#[tokio::test]
async fn next_lease_starts_from_an_empty_directory() {
    let (_root, pool) = pool_with_capacity(1);

    {
        let mut lease = pool.obtain().await.unwrap();
        lease.clean_and_init().await.unwrap();
        lease.write_file("leftover.txt", b"previous tenant").await.unwrap();
        // Dropped dirty on purpose: release does not clean.
    }

    let mut lease = pool.obtain().await.unwrap();
    let leftover = lease.path().join("leftover.txt");
    assert!(leftover.exists(), "release itself must not wipe the slot");
    lease.clean_and_init().await.unwrap();
    assert!(
        !leftover.exists(),
        "clean_and_init owns cross-lease cleanup"
    );
}

// =============================================================================
// Shutdown
// =============================================================================

#[tokio::test]
async fn shutdown_refuses_new_leases_and_removes_directories() {
    let (_root, pool) = pool_with_capacity(2);
    let slot_dir = {
        let lease = pool.obtain().await.unwrap();
        let dir = lease.path().to_path_buf();
        drop(lease);
        dir
    };
    assert!(slot_dir.is_dir());

    pool.shutdown().await.unwrap();

    assert!(!slot_dir.exists(), "shutdown removes slot directories");
    let err = pool.obtain().await.unwrap_err();
    assert!(matches!(err, Error::PoolClosed));
}
