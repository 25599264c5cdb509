//! Behavioural tests for the connection pool, driven by the mock driver.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use ora_client::{DriverError, DriverErrorKind, ErrorKind, RawConnection};
use ora_pool::{ConnectionLifecycle, Pool, PoolConfig, SlotState};
use ora_testing::{MockDriver, init_tracing, test_config};
use parking_lot::Mutex;
use tokio_test::{assert_err, assert_ok};

fn config(min: u32, max: u32) -> PoolConfig {
    PoolConfig::new()
        .min_connections(min)
        .max_connections(max)
        .acquire_timeout(Duration::from_secs(2))
        .sweep_interval(None)
}

async fn pool(driver: &MockDriver, config: PoolConfig) -> Pool {
    init_tracing();
    Pool::new(driver.arc(), test_config(), config).await.unwrap()
}

async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn warms_to_min_size() {
    let driver = MockDriver::new();
    let pool = pool(&driver, config(2, 5)).await;

    let status = pool.status();
    assert_eq!(status.total, 2);
    assert_eq!(status.available, 2);
    assert_eq!(status.in_use, 0);
    assert_eq!(driver.opened(), 2);
}

#[tokio::test]
async fn warm_up_fails_fast() {
    init_tracing();
    let driver = MockDriver::new();
    driver.set_connect_error(Some(DriverError::from_ora_code(12541, "TNS:no listener")));

    let err = Pool::new(driver.arc(), test_config(), config(2, 5))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConnectFailed);
    assert_eq!(driver.open_sessions(), 0);
}

#[tokio::test]
async fn builder_requires_driver() {
    let err = Pool::builder()
        .connection_config(test_config())
        .build()
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn no_slot_is_shared_and_size_stays_bounded() {
    let driver = MockDriver::new();
    let pool = pool(&driver, config(1, 3)).await;
    let in_use: Arc<Mutex<HashSet<u64>>> = Arc::new(Mutex::new(HashSet::new()));

    let mut tasks = Vec::new();
    for _ in 0..24 {
        let pool = pool.clone();
        let in_use = Arc::clone(&in_use);
        tasks.push(tokio::spawn(async move {
            let conn = pool.acquire(Duration::from_secs(5)).await.unwrap();
            assert!(in_use.lock().insert(conn.id()), "slot handed out twice");
            assert!(pool.status().total <= 3);
            tokio::time::sleep(Duration::from_millis(5)).await;
            assert!(in_use.lock().remove(&conn.id()));
            pool.release(conn).await;
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert!(driver.peak_sessions() <= 3);
    let status = pool.status();
    assert!(status.total >= 1 && status.total <= 3);
    assert_eq!(status.in_use, 0);
    assert_eq!(pool.metrics().checkouts_successful, 24);
}

#[tokio::test]
async fn acquire_at_capacity_times_out_promptly() {
    let driver = MockDriver::new();
    let pool = pool(&driver, config(0, 1)).await;
    let _held = pool.get().await.unwrap();

    let started = Instant::now();
    let err = pool.acquire(Duration::from_millis(100)).await.unwrap_err();
    let elapsed = started.elapsed();

    assert_eq!(err.kind(), ErrorKind::PoolExhausted);
    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_millis(400), "took {elapsed:?}");
    assert_eq!(pool.status().waiting, 0);
    assert_eq!(pool.metrics().checkouts_failed, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn waiters_are_served_in_arrival_order() {
    let driver = MockDriver::new();
    let pool = pool(&driver, config(0, 1)).await;
    let held = pool.get().await.unwrap();
    let order = Arc::new(Mutex::new(Vec::new()));

    let mut tasks = Vec::new();
    for name in ["first", "second", "third"] {
        let task_pool = pool.clone();
        let order = Arc::clone(&order);
        tasks.push(tokio::spawn(async move {
            let conn = task_pool.acquire(Duration::from_secs(5)).await.unwrap();
            order.lock().push(name);
            tokio::time::sleep(Duration::from_millis(5)).await;
            task_pool.release(conn).await;
        }));
        let expected = tasks.len() as u32;
        let probe = pool.clone();
        eventually(|| probe.status().waiting == expected).await;
    }

    pool.release(held).await;
    for task in tasks {
        task.await.unwrap();
    }
    assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    assert_eq!(driver.opened(), 1);
}

#[tokio::test]
async fn broken_slot_is_never_handed_out_again() {
    let driver = MockDriver::new();
    let pool = pool(&driver, config(0, 2)).await;

    let mut conn = pool.get().await.unwrap();
    let broken_id = conn.id();
    conn.mark_broken();
    pool.release(conn).await;

    assert_eq!(pool.status().total, 0);
    assert_eq!(driver.closed(), 1);

    for _ in 0..4 {
        let conn = pool.get().await.unwrap();
        assert_ne!(conn.id(), broken_id);
        pool.release(conn).await;
    }
}

#[tokio::test]
async fn capacity_of_discarded_slot_goes_to_waiter() {
    let driver = MockDriver::new();
    let pool = pool(&driver, config(0, 1)).await;
    let mut held = pool.get().await.unwrap();

    let waiter = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.acquire(Duration::from_secs(5)).await })
    };
    eventually(|| pool.status().waiting == 1).await;

    held.mark_broken();
    pool.release(held).await;

    let conn = waiter.await.unwrap().unwrap();
    assert_eq!(driver.opened(), 2);
    assert!(pool.status().total <= 1);
    pool.release(conn).await;
}

#[tokio::test]
async fn failed_idle_probe_evicts_and_replaces() {
    let driver = MockDriver::new();
    let pool = pool(
        &driver,
        config(1, 2).validation_interval(Duration::ZERO),
    )
    .await;
    assert_eq!(pool.status().total, 1);

    driver.kill_sessions();
    let conn = pool.get().await.unwrap();

    assert_eq!(driver.opened(), 2);
    assert_eq!(pool.status().total, 1);
    assert_eq!(pool.metrics().health_checks_failed, 1);
    pool.release(conn).await;
}

#[tokio::test]
async fn validate_idle_evicts_dead_sessions() {
    let driver = MockDriver::new();
    let pool = pool(&driver, config(2, 4)).await;

    driver.set_healthy(false);
    let (healthy, failed) = pool.validate_idle(false).await;
    assert_eq!((healthy, failed), (0, 2));
    assert_eq!(pool.status().total, 0);

    driver.set_healthy(true);
    let conn = assert_ok!(pool.get().await);
    assert_eq!(pool.status().total, 1);
    pool.release(conn).await;
}

#[tokio::test]
async fn transient_probe_failure_is_retried() {
    let driver = MockDriver::new();
    let pool = pool(
        &driver,
        config(1, 1).validation_interval(Duration::ZERO),
    )
    .await;

    driver.fail_next_validations(
        1,
        DriverError::new(DriverErrorKind::Transient, "ORA-12516: no available handler"),
    );
    let conn = pool.get().await.unwrap();

    assert_eq!(driver.opened(), 1);
    assert_eq!(pool.metrics().health_checks_failed, 0);
    pool.release(conn).await;
}

#[tokio::test]
async fn explicit_validate_marks_broken_on_failure() {
    let driver = MockDriver::new();
    let pool = pool(&driver, config(0, 1)).await;
    let mut conn = pool.get().await.unwrap();

    assert_ok!(pool.validate(&mut conn).await);
    driver.kill_sessions();
    let err = assert_err!(pool.validate(&mut conn).await);
    assert_eq!(err.kind(), ErrorKind::ConnectionLost);
    assert!(conn.is_broken());
    assert_eq!(conn.metadata().state, SlotState::Closed);

    pool.release(conn).await;
    assert_eq!(pool.status().total, 0);
}

#[tokio::test]
async fn dirty_session_is_rolled_back_on_release() {
    let driver = MockDriver::new();
    let pool = pool(&driver, config(0, 1)).await;

    let mut conn = pool.get().await.unwrap();
    conn.raw()
        .unwrap()
        .execute("UPDATE emp SET sal = sal * 1.1", &[])
        .await
        .unwrap();
    assert!(conn.session_state().in_transaction);
    pool.release(conn).await;

    assert_eq!(driver.rollbacks(), 1);
    assert_eq!(pool.metrics().resets_performed, 1);

    let conn = pool.get().await.unwrap();
    assert!(!conn.session_state().is_dirty());
    assert_eq!(driver.opened(), 1);
    pool.release(conn).await;
}

/// Rolls back like the default lifecycle, but slowly.
struct SlowReset;

#[async_trait]
impl ConnectionLifecycle for SlowReset {
    async fn validate(&self, conn: &mut dyn RawConnection) -> Result<(), DriverError> {
        conn.ping().await
    }

    async fn reset(&self, conn: &mut dyn RawConnection) -> Result<(), DriverError> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        conn.rollback().await
    }
}

#[tokio::test]
async fn cancelled_release_gives_capacity_back() {
    init_tracing();
    let driver = MockDriver::new();
    let pool = Pool::with_lifecycle(
        driver.arc(),
        test_config(),
        config(0, 1),
        Arc::new(SlowReset),
    )
    .await
    .unwrap();

    let mut conn = pool.get().await.unwrap();
    conn.raw()
        .unwrap()
        .execute("UPDATE emp SET sal = sal * 1.1", &[])
        .await
        .unwrap();
    let released = tokio::time::timeout(Duration::from_millis(10), pool.release(conn)).await;
    assert!(released.is_err());

    eventually(|| {
        let status = pool.status();
        status.total == 0 && status.in_use == 0
    })
    .await;
    eventually(|| driver.open_sessions() == 0).await;

    let conn = assert_ok!(pool.acquire(Duration::from_millis(300)).await);
    assert!(!conn.session_state().in_transaction);
    assert_eq!(driver.opened(), 2);
}

#[tokio::test]
async fn failed_reset_discards_session() {
    let driver = MockDriver::new();
    let pool = pool(&driver, config(0, 1)).await;
    driver.set_rollback_fails(true);

    let mut conn = pool.get().await.unwrap();
    conn.raw()
        .unwrap()
        .execute("DELETE FROM emp", &[])
        .await
        .unwrap();
    pool.release(conn).await;

    assert_eq!(pool.status().total, 0);
    assert_eq!(pool.metrics().resets_failed, 1);
    assert_eq!(driver.open_sessions(), 0);
}

#[tokio::test]
async fn connect_failure_is_reported_and_capacity_restored() {
    let driver = MockDriver::new();
    let pool = pool(&driver, config(0, 1)).await;
    driver.fail_next_connects(1, DriverError::from_ora_code(12541, "TNS:no listener"));

    let err = pool.get().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConnectFailed);
    assert_eq!(pool.status().total, 0);

    let conn = assert_ok!(pool.get().await);
    pool.release(conn).await;
}

#[tokio::test]
async fn dropped_connection_returns_to_pool() {
    let driver = MockDriver::new();
    let pool = pool(&driver, config(0, 1)).await;

    let conn = pool.get().await.unwrap();
    drop(conn);

    eventually(|| pool.status().available == 1).await;
    assert_eq!(pool.status().in_use, 0);
}

#[tokio::test]
async fn detached_connection_frees_capacity() {
    let driver = MockDriver::new();
    let pool = pool(&driver, config(0, 1)).await;

    let conn = pool.get().await.unwrap();
    let mut raw = conn.detach().expect("connection");
    assert_eq!(pool.status().total, 0);
    raw.close().await.unwrap();

    let conn = assert_ok!(pool.acquire(Duration::from_millis(200)).await);
    pool.release(conn).await;
}

#[tokio::test]
async fn expired_connection_is_retired() {
    let driver = MockDriver::new();
    let pool = pool(
        &driver,
        config(0, 1).max_lifetime(Some(Duration::from_millis(50))),
    )
    .await;

    let conn = pool.get().await.unwrap();
    let first = conn.id();
    pool.release(conn).await;
    tokio::time::sleep(Duration::from_millis(80)).await;

    let conn = pool.get().await.unwrap();
    assert_ne!(conn.id(), first);
    assert_eq!(pool.metrics().lifetime_expirations, 1);
    pool.release(conn).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn idle_eviction_settles_to_min() {
    let driver = MockDriver::new();
    let pool = pool(
        &driver,
        config(2, 5).idle_timeout(Duration::from_millis(50)),
    )
    .await;

    let mut held = Vec::new();
    for _ in 0..5 {
        held.push(pool.get().await.unwrap());
    }
    assert_eq!(pool.status().total, 5);
    for conn in held {
        pool.release(conn).await;
    }

    tokio::time::sleep(Duration::from_millis(80)).await;
    let evicted = pool.evict_idle().await;

    assert_eq!(evicted, 3);
    let status = pool.status();
    assert_eq!(status.total, 2);
    assert_eq!(status.available, 2);
    assert_eq!(pool.metrics().idle_evictions, 3);
}

#[tokio::test]
async fn background_sweep_evicts_and_replenishes() {
    let driver = MockDriver::new();
    let pool = pool(
        &driver,
        config(2, 4)
            .idle_timeout(Duration::from_millis(30))
            .sweep_interval(Some(Duration::from_millis(20))),
    )
    .await;

    let mut held = Vec::new();
    for _ in 0..4 {
        held.push(pool.get().await.unwrap());
    }
    for conn in held {
        pool.release(conn).await;
    }
    eventually(|| pool.status().total == 2).await;
    assert_eq!(pool.status().available, 2);
    assert!(pool.metrics().idle_evictions >= 2);

    // A pool drained below its minimum is topped up by the next pass.
    driver.kill_sessions();
    pool.validate_idle(false).await;
    eventually(|| pool.status().total == 2 && driver.opened() == 6).await;
}

#[tokio::test]
async fn idle_validation_does_not_postpone_eviction() {
    let driver = MockDriver::new();
    let pool = pool(
        &driver,
        config(1, 4)
            .idle_timeout(Duration::from_millis(100))
            .validation_interval(Duration::from_millis(20))
            .sweep_interval(Some(Duration::from_millis(20))),
    )
    .await;

    let mut held = Vec::new();
    for _ in 0..4 {
        held.push(pool.get().await.unwrap());
    }
    for conn in held {
        pool.release(conn).await;
    }

    eventually(|| pool.status().total == 1).await;
    let metrics = pool.metrics();
    assert!(metrics.idle_evictions >= 3);
    assert!(metrics.health_checks_performed > 4);
}

#[tokio::test]
async fn idle_validation_is_not_counted_as_use() {
    let driver = MockDriver::new();
    let pool = pool(&driver, config(1, 1)).await;

    assert_eq!(pool.validate_idle(false).await, (1, 0));
    let conn = pool.get().await.unwrap();
    assert_eq!(conn.metadata().use_count, 1);
    pool.release(conn).await;

    assert_eq!(pool.validate_idle(false).await, (1, 0));
    let conn = pool.get().await.unwrap();
    assert_eq!(conn.metadata().use_count, 2);
}

#[tokio::test]
async fn acquire_after_shutdown_fails_fast() {
    let driver = MockDriver::new();
    let pool = pool(&driver, config(0, 1)).await;
    pool.shutdown(Duration::ZERO).await;

    let started = Instant::now();
    let err = pool.acquire(Duration::from_secs(5)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PoolClosed);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn shutdown_drains_checked_out_connections() {
    let driver = MockDriver::new();
    let pool = pool(&driver, config(1, 2)).await;

    let conn = pool.get().await.unwrap();
    let releaser = {
        let pool = pool.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            pool.release(conn).await;
        })
    };

    let report = pool.shutdown(Duration::from_secs(2)).await;
    releaser.await.unwrap();

    assert_eq!(report.drained, 1);
    assert_eq!(report.forced, 0);
    assert_eq!(report.idle_closed, 0);
    assert_eq!(driver.open_sessions(), 0);

    let err = pool.get().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PoolClosed);
}

#[tokio::test]
async fn shutdown_revokes_connections_after_drain_timeout() {
    let driver = MockDriver::new();
    let pool = pool(&driver, config(2, 2)).await;
    let mut conn = pool.get().await.unwrap();

    let report = pool.shutdown(Duration::from_millis(50)).await;
    assert_eq!(report.forced, 1);
    assert_eq!(report.idle_closed, 1);

    let err = conn.raw().err().expect("revoked");
    assert_eq!(err.kind(), ErrorKind::PoolClosed);

    pool.release(conn).await;
    assert_eq!(driver.open_sessions(), 0);
    assert_eq!(pool.status().total, 0);
}

#[tokio::test]
async fn shutdown_wakes_waiters() {
    let driver = MockDriver::new();
    let pool = pool(&driver, config(0, 1)).await;
    let held = pool.get().await.unwrap();

    let waiter = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.acquire(Duration::from_secs(10)).await })
    };
    eventually(|| pool.status().waiting == 1).await;

    let report = pool.shutdown(Duration::ZERO).await;
    let err = waiter.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PoolClosed);
    assert_eq!(report.forced, 1);

    drop(held);
    eventually(|| driver.open_sessions() == 0).await;
}
