//! End-to-end behaviour of the `Database` handle over the mock driver.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use ora_access::{
    Database, DatabaseConfig, ErrorKind, ExecutorConfig, PoolConfig, Query, RefreshPolicy,
    ScopeKey, SecurityAudit, SqlValue, StatementValidator,
};
use ora_testing::{
    MockCatalog, MockColumn, MockDriver, MockResponse, MockTable, init_tracing, test_config,
};
use tokio_test::{assert_err, assert_ok};

fn config(min: u32, max: u32) -> DatabaseConfig {
    DatabaseConfig::new(test_config()).pool(
        PoolConfig::new()
            .min_connections(min)
            .max_connections(max)
            .acquire_timeout(Duration::from_secs(2))
            .sweep_interval(None),
    )
}

async fn connect(driver: &MockDriver, config: DatabaseConfig) -> Database {
    init_tracing();
    Database::connect(driver.arc(), config).await.unwrap()
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
async fn connect_warms_and_shutdown_closes() {
    let driver = MockDriver::new();
    let db = connect(&driver, config(2, 5)).await;
    assert_eq!(db.status().total, 2);
    assert_eq!(driver.opened(), 2);

    let report = db.shutdown(Duration::from_millis(100)).await;
    assert_eq!(report.idle_closed, 2);
    assert_eq!(report.forced, 0);
    assert!(db.is_closed());
    assert_eq!(driver.open_sessions(), 0);

    let err = assert_err!(db.execute("SELECT 1 FROM DUAL").await);
    assert_eq!(err.kind(), ErrorKind::PoolClosed);
    let err = assert_err!(db.acquire(Duration::from_millis(10)).await);
    assert_eq!(err.kind(), ErrorKind::PoolClosed);
}

#[tokio::test]
async fn invalid_config_opens_nothing() {
    init_tracing();
    let driver = MockDriver::new();
    let config = config(1, 2).executor(ExecutorConfig::new().statement_timeout(Duration::ZERO));

    let err = assert_err!(Database::connect(driver.arc(), config).await);
    assert_eq!(err.kind(), ErrorKind::Config);
    assert_eq!(driver.opened(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_executes_settle_back_to_min() {
    let driver = MockDriver::new();
    driver.on(
        "FROM SALES.ORDERS",
        MockResponse::rows(&["ORDER_ID"], vec![vec![SqlValue::Int(1)]])
            .delayed(Duration::from_millis(100)),
    );
    let pool = PoolConfig::new()
        .min_connections(2)
        .max_connections(5)
        .idle_timeout(Duration::from_millis(50))
        .sweep_interval(Some(Duration::from_millis(20)));
    let db = connect(&driver, DatabaseConfig::new(test_config()).pool(pool)).await;

    let results = join_all(
        (0..5).map(|_| db.execute("SELECT ORDER_ID FROM SALES.ORDERS WHERE ROWNUM = 1")),
    )
    .await;
    for result in results {
        let rows = assert_ok!(result);
        assert_eq!(rows.len(), 1);
    }
    assert_eq!(driver.peak_sessions(), 5);

    eventually(|| {
        let status = db.status();
        status.total == 2 && status.available == 2
    })
    .await;
    assert!(db.metrics().idle_evictions >= 3);

    db.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn statement_error_leaves_the_slot_usable() {
    let driver = MockDriver::new();
    driver.on(
        "INSERT INTO SALES.CUSTOMERS",
        MockResponse::ora_error(1, "unique constraint (SALES.PK_CUSTOMERS) violated"),
    );
    let db = connect(&driver, config(1, 1)).await;
    let timeout = Duration::from_secs(1);

    let mut conn = db.acquire(timeout).await.unwrap();
    let id = conn.id();
    let err = assert_err!(
        db.executor()
            .execute_on(
                &mut conn,
                Query::new("INSERT INTO SALES.CUSTOMERS (ID) VALUES (:1)").bind(&7),
                timeout
            )
            .await
    );
    assert_eq!(err.kind(), ErrorKind::Statement);
    assert_ok!(
        db.executor()
            .execute_on(&mut conn, "SELECT SYSDATE FROM DUAL", timeout)
            .await
    );
    assert_eq!(conn.id(), id);
    db.release(conn).await;

    assert_ok!(db.execute("SELECT SYSDATE FROM DUAL").await);
    assert_eq!(driver.opened(), 1);
}

#[tokio::test]
async fn hooks_are_installed_in_order() {
    let driver = MockDriver::new();
    let audit = Arc::new(SecurityAudit::new(16).deny_destructive_ddl());
    init_tracing();
    let db = Database::builder(driver.arc())
        .config(config(1, 2))
        .hook(Arc::new(StatementValidator::new()))
        .hook(audit.clone())
        .build()
        .await
        .unwrap();

    assert_eq!(
        db.executor().hooks().names().collect::<Vec<_>>(),
        vec!["statement-validator", "security-audit"]
    );

    let err = assert_err!(db.execute("DROP TABLE SALES.ORDERS").await);
    assert_eq!(err.kind(), ErrorKind::Rejected);
    assert_eq!(driver.count_statements("DROP TABLE"), 0);

    let err = assert_err!(db.execute(Query::new("SELECT * FROM DUAL WHERE 1 = :1")).await);
    assert_eq!(err.kind(), ErrorKind::Rejected);
    assert_eq!(audit.records().len(), 1);
}

#[tokio::test]
async fn metadata_goes_through_the_pool() {
    let driver = MockDriver::new();
    let catalog = MockCatalog::new();
    catalog.add_table(
        MockTable::new("SALES", "ORDERS")
            .column(MockColumn::number("ORDER_ID", 10, 0).not_null())
            .column(MockColumn::varchar2("STATUS", 20)),
    );
    catalog.install(&driver);
    let db = connect(&driver, config(1, 2)).await;

    let orders = db
        .get_table("sales", "orders", RefreshPolicy::PreferCache)
        .await
        .unwrap();
    assert_eq!(orders.qualified_name(), "SALES.ORDERS");
    assert_eq!(db.status().in_use, 0);

    let schema = db
        .get_schema("SALES", RefreshPolicy::PreferCache)
        .await
        .unwrap();
    assert_eq!(schema.table_names().collect::<Vec<_>>(), vec!["ORDERS"]);

    assert!(db.invalidate(&ScopeKey::table("SALES", "ORDERS").unwrap()));
    assert!(!db.invalidate(&ScopeKey::table("SALES", "ORDERS").unwrap()));
    assert_eq!(db.invalidate_schema("SALES").unwrap(), 0);

    let stats = db.cache_stats();
    assert_eq!(stats.fetches, 2);
    assert_eq!(stats.entries, 0);

    db.shutdown(Duration::ZERO).await;
    assert!(db.metadata().is_empty());
}

#[tokio::test]
async fn direct_acquire_counts_as_in_use() {
    let driver = MockDriver::new();
    let db = connect(&driver, config(1, 2)).await;

    let conn = db.acquire(Duration::from_secs(1)).await.unwrap();
    let status = db.status();
    assert_eq!(status.in_use, 1);
    assert_eq!(status.available, 0);

    db.release(conn).await;
    let status = db.status();
    assert_eq!(status.in_use, 0);
    assert_eq!(status.available, 1);
}
