//! Metadata cache behaviour against the mock catalog.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use ora_client::{ErrorKind, SqlValue};
use ora_metadata::{
    CacheConfig, ConstraintKind, DeleteRule, MetadataCache, RefreshPolicy, ScopeKey,
};
use ora_pool::{Pool, PoolConfig};
use ora_query::Executor;
use ora_testing::{
    MockCatalog, MockColumn, MockConstraint, MockDriver, MockResponse, MockTable, init_tracing,
    test_config,
};
use ora_types::DataType;
use tokio_test::{assert_err, assert_ok};

struct Fixture {
    driver: MockDriver,
    catalog: MockCatalog,
    cache: MetadataCache,
}

fn orders() -> MockTable {
    MockTable::new("SALES", "ORDERS")
        .column(MockColumn::number("ORDER_ID", 10, 0).not_null())
        .column(MockColumn::number("CUSTOMER_ID", 10, 0))
        .column(MockColumn::varchar2("STATUS", 20).default_expr("'NEW' "))
        .constraint(MockConstraint::primary_key("PK_ORDERS", &["ORDER_ID"]))
        .constraint(
            MockConstraint::foreign_key(
                "FK_ORDERS_CUSTOMER",
                &["CUSTOMER_ID"],
                "SALES",
                "CUSTOMERS",
                &["ID"],
            )
            .on_delete("CASCADE"),
        )
        .constraint(MockConstraint::system_not_null("SYS_C0011", "CUSTOMER_ID"))
        .constraint(MockConstraint::check("CK_ORDERS_STATUS", "STATUS IN ('NEW', 'PAID')"))
}

fn customers() -> MockTable {
    MockTable::new("SALES", "CUSTOMERS")
        .column(MockColumn::number("ID", 10, 0).not_null())
        .column(MockColumn::varchar2("NAME", 100).char_semantics())
        .constraint(MockConstraint::primary_key("PK_CUSTOMERS", &["ID"]))
}

async fn fixture_with(driver: MockDriver, config: CacheConfig) -> Fixture {
    init_tracing();
    let catalog = MockCatalog::new();
    catalog.add_table(orders());
    catalog.add_table(customers());
    catalog.install(&driver);

    let pool_config = PoolConfig::new()
        .min_connections(0)
        .max_connections(4)
        .acquire_timeout(Duration::from_secs(2))
        .sweep_interval(None);
    let pool = Pool::new(driver.arc(), test_config(), pool_config)
        .await
        .unwrap();
    let cache = MetadataCache::new(Executor::new(pool), config).unwrap();

    Fixture {
        driver,
        catalog,
        cache,
    }
}

async fn fixture(config: CacheConfig) -> Fixture {
    fixture_with(MockDriver::new(), config).await
}

#[tokio::test]
async fn force_refresh_reads_contiguous_ordinals() {
    let fx = fixture(CacheConfig::default()).await;

    let orders = assert_ok!(
        fx.cache
            .get_table("SALES", "ORDERS", RefreshPolicy::ForceRefresh)
            .await
    );
    let columns: Vec<_> = orders
        .columns
        .iter()
        .map(|c| (c.ordinal, c.name.as_str()))
        .collect();
    assert_eq!(
        columns,
        vec![(1, "ORDER_ID"), (2, "CUSTOMER_ID"), (3, "STATUS")]
    );
    assert!(!orders.is_stale());
}

#[tokio::test]
async fn descriptors_carry_types_and_constraints() {
    let fx = fixture(CacheConfig::default()).await;
    let orders = fx
        .cache
        .get_table("sales", "orders", RefreshPolicy::PreferCache)
        .await
        .unwrap();

    let status = orders.column("status").unwrap();
    assert_eq!(
        status.data_type,
        DataType::Varchar2 {
            length: 20,
            char_semantics: false
        }
    );
    assert_eq!(status.default.as_deref(), Some("'NEW'"));
    assert!(!orders.column("ORDER_ID").unwrap().nullable);
    // folded from the generated NOT NULL check
    assert!(!orders.column("CUSTOMER_ID").unwrap().nullable);

    let names: Vec<_> = orders.constraints.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["CK_ORDERS_STATUS", "FK_ORDERS_CUSTOMER", "PK_ORDERS"]);
    assert_eq!(orders.primary_key().unwrap().columns, vec!["ORDER_ID"]);

    let fk = orders.foreign_keys().next().unwrap();
    assert_eq!(
        fk.kind,
        ConstraintKind::ForeignKey {
            referenced_schema: "SALES".into(),
            referenced_table: "CUSTOMERS".into(),
            referenced_columns: vec!["ID".into()],
            on_delete: DeleteRule::Cascade,
        }
    );

    let ddl = orders.to_ddl();
    assert!(ddl.starts_with("CREATE TABLE SALES.ORDERS ("));
    assert!(ddl.contains("CUSTOMER_ID NUMBER(10) NOT NULL"));
    assert!(ddl.contains("STATUS VARCHAR2(20) DEFAULT 'NEW'"));
    assert!(ddl.contains("REFERENCES CUSTOMERS (ID) ON DELETE CASCADE"));
    assert!(!ddl.contains("SYS_C0011"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_lookups_share_one_fetch() {
    let driver = MockDriver::new();
    driver.set_connect_delay(Duration::from_millis(50));
    let fx = fixture_with(driver, CacheConfig::default()).await;

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let cache = fx.cache.clone();
            tokio::spawn(async move {
                cache
                    .get_schema("SALES", RefreshPolicy::PreferCache)
                    .await
                    .map(|s| s.into_inner())
            })
        })
        .collect();

    let mut schemas = Vec::new();
    for task in tasks {
        schemas.push(task.await.unwrap().unwrap());
    }

    assert_eq!(fx.driver.count_statements("FROM ALL_USERS"), 1);
    let stats = fx.cache.stats();
    assert_eq!(stats.fetches, 1);
    assert_eq!(stats.hits + stats.misses, 16);
    assert!(schemas.iter().all(|s| Arc::ptr_eq(s, &schemas[0])));
    assert_eq!(
        schemas[0].table_names().collect::<Vec<_>>(),
        vec!["CUSTOMERS", "ORDERS"]
    );
}

#[tokio::test]
async fn invalidate_then_refetch_is_independent() {
    let fx = fixture(CacheConfig::default()).await;
    let first = fx
        .cache
        .get_table("SALES", "ORDERS", RefreshPolicy::PreferCache)
        .await
        .unwrap();

    fx.catalog.alter_table("SALES", "ORDERS", |t| {
        t.add_column(MockColumn::new("SHIPPED_AT", "DATE"));
    });

    let cached = fx
        .cache
        .get_table("SALES", "ORDERS", RefreshPolicy::PreferCache)
        .await
        .unwrap();
    assert!(Arc::ptr_eq(cached.as_arc(), first.as_arc()));
    assert_eq!(cached.columns.len(), 3);

    assert!(fx.cache.invalidate(&ScopeKey::table("sales", "orders").unwrap()));
    let fresh = fx
        .cache
        .get_table("SALES", "ORDERS", RefreshPolicy::PreferCache)
        .await
        .unwrap();
    assert!(!Arc::ptr_eq(fresh.as_arc(), first.as_arc()));
    assert_eq!(fresh.columns.len(), 4);
    assert_eq!(fresh.columns[3].ordinal, 4);
    assert_eq!(first.columns.len(), 3);
    assert_eq!(fx.cache.stats().fetches, 2);
}

#[tokio::test]
async fn schema_fetch_populates_tables() {
    let fx = fixture(CacheConfig::default()).await;
    let schema = fx
        .cache
        .get_schema("SALES", RefreshPolicy::PreferCache)
        .await
        .unwrap();
    assert_eq!(schema.tables.len(), 2);
    let column_queries = fx.driver.count_statements("FROM ALL_TAB_COLUMNS");

    let customers = fx
        .cache
        .get_table("SALES", "CUSTOMERS", RefreshPolicy::PreferCache)
        .await
        .unwrap();
    assert_eq!(customers.columns.len(), 2);
    assert_eq!(fx.driver.count_statements("FROM ALL_TAB_COLUMNS"), column_queries);
    assert_eq!(fx.cache.stats().fetches, 1);
    assert_eq!(fx.cache.len(), 3);

    assert_eq!(fx.cache.invalidate_schema("sales").unwrap(), 3);
    assert!(fx.cache.is_empty());
}

#[tokio::test]
async fn expired_entries_are_refetched() {
    let fx = fixture(CacheConfig::new().ttl(Duration::from_millis(40))).await;
    fx.cache
        .get_schema("SALES", RefreshPolicy::PreferCache)
        .await
        .unwrap();
    fx.cache
        .get_schema("SALES", RefreshPolicy::PreferCache)
        .await
        .unwrap();
    assert_eq!(fx.cache.stats().fetches, 1);

    tokio::time::sleep(Duration::from_millis(80)).await;
    let refreshed = fx
        .cache
        .get_schema("SALES", RefreshPolicy::PreferCache)
        .await
        .unwrap();
    assert!(!refreshed.is_stale());
    assert!(refreshed.age() < Duration::from_millis(40));
    assert_eq!(fx.cache.stats().fetches, 2);
}

#[tokio::test]
async fn force_refresh_bypasses_fresh_entries() {
    let fx = fixture(CacheConfig::default()).await;
    let first = fx
        .cache
        .get_table("SALES", "CUSTOMERS", RefreshPolicy::PreferCache)
        .await
        .unwrap();
    let second = fx
        .cache
        .get_table("SALES", "CUSTOMERS", RefreshPolicy::ForceRefresh)
        .await
        .unwrap();
    assert!(!Arc::ptr_eq(first.as_arc(), second.as_arc()));
    assert_eq!(fx.cache.stats().fetches, 2);
}

#[tokio::test]
async fn stale_if_error_serves_expired_entry() {
    let fx = fixture(CacheConfig::new().ttl(Duration::from_millis(30))).await;
    let original = fx
        .cache
        .get_schema("SALES", RefreshPolicy::PreferCache)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(60)).await;
    fx.driver.on(
        "FROM ALL_USERS",
        MockResponse::ora_error(1031, "insufficient privileges"),
    );

    let stale = assert_ok!(
        fx.cache
            .get_schema("SALES", RefreshPolicy::StaleIfError)
            .await
    );
    assert!(stale.is_stale());
    assert!(Arc::ptr_eq(stale.as_arc(), original.as_arc()));

    let err = assert_err!(
        fx.cache
            .get_schema("SALES", RefreshPolicy::PreferCache)
            .await
    );
    assert_eq!(err.kind(), ErrorKind::MetadataFetchFailed);
    assert_eq!(err.driver_error().unwrap().code(), Some(1031));

    let stats = fx.cache.stats();
    assert_eq!(stats.stale_served, 1);
    assert_eq!(stats.fetch_failures, 2);
}

#[tokio::test]
async fn stale_if_error_without_entry_fails() {
    let fx = fixture(CacheConfig::default()).await;
    fx.driver.on("FROM ALL_USERS", MockResponse::ora_error(1031, "insufficient privileges"));

    let err = assert_err!(
        fx.cache
            .get_schema("SALES", RefreshPolicy::StaleIfError)
            .await
    );
    assert_eq!(err.kind(), ErrorKind::MetadataFetchFailed);
    assert!(err.to_string().contains("SALES"));
}

#[tokio::test]
async fn missing_objects_are_not_found_and_evicted() {
    let fx = fixture(CacheConfig::default()).await;

    let err = assert_err!(
        fx.cache
            .get_table("SALES", "NOPE", RefreshPolicy::PreferCache)
            .await
    );
    assert_eq!(err.kind(), ErrorKind::ObjectNotFound);
    let err = assert_err!(
        fx.cache
            .get_schema("NOBODY", RefreshPolicy::PreferCache)
            .await
    );
    assert_eq!(err.kind(), ErrorKind::ObjectNotFound);

    fx.cache
        .get_table("SALES", "ORDERS", RefreshPolicy::PreferCache)
        .await
        .unwrap();
    fx.catalog.drop_table("SALES", "ORDERS");
    // a fresh entry is still served until it is refreshed
    assert_ok!(
        fx.cache
            .get_table("SALES", "ORDERS", RefreshPolicy::PreferCache)
            .await
    );

    let err = assert_err!(
        fx.cache
            .get_table("SALES", "ORDERS", RefreshPolicy::ForceRefresh)
            .await
    );
    assert_eq!(err.kind(), ErrorKind::ObjectNotFound);
    assert!(fx.cache.is_empty());
}

#[tokio::test]
async fn entries_are_bounded_by_lru() {
    let fx = fixture(CacheConfig::new().max_entries(2)).await;
    for name in ["T1", "T2", "T3"] {
        fx.catalog
            .add_table(MockTable::new("SALES", name).column(MockColumn::new("ID", "NUMBER")));
    }

    for name in ["T1", "T2", "T3"] {
        fx.cache
            .get_table("SALES", name, RefreshPolicy::PreferCache)
            .await
            .unwrap();
    }
    assert_eq!(fx.cache.len(), 2);

    fx.cache
        .get_table("SALES", "T3", RefreshPolicy::PreferCache)
        .await
        .unwrap();
    assert_eq!(fx.cache.stats().fetches, 3);
    fx.cache
        .get_table("SALES", "T1", RefreshPolicy::PreferCache)
        .await
        .unwrap();
    assert_eq!(fx.cache.stats().fetches, 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn slow_fetch_does_not_block_other_keys() {
    let fx = fixture(CacheConfig::default()).await;
    fx.driver.on_query("FROM ALL_TABLES", |_, params| {
        let table = params.get(1).and_then(SqlValue::as_str).unwrap_or_default();
        let rows = MockResponse::rows(&["TABLE_NAME"], vec![vec![SqlValue::from(table)]]);
        if table == "ORDERS" {
            rows.delayed(Duration::from_millis(400))
        } else {
            rows
        }
    });

    let slow = {
        let cache = fx.cache.clone();
        tokio::spawn(async move {
            cache
                .get_table("SALES", "ORDERS", RefreshPolicy::PreferCache)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let start = Instant::now();
    fx.cache
        .get_table("SALES", "CUSTOMERS", RefreshPolicy::PreferCache)
        .await
        .unwrap();
    assert!(start.elapsed() < Duration::from_millis(300));
    assert!(!slow.is_finished());

    assert_ok!(slow.await.unwrap());
}

#[tokio::test]
async fn clear_drops_everything() {
    let fx = fixture(CacheConfig::default()).await;
    fx.cache
        .get_schema("SALES", RefreshPolicy::PreferCache)
        .await
        .unwrap();
    assert!(!fx.cache.is_empty());
    fx.cache.clear();
    assert!(fx.cache.is_empty());
    assert!(fx.cache.invalidate_schema("1bad").is_err());
}
