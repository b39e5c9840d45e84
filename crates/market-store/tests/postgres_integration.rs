//! PostgreSQL integration tests.
//!
//! These tests share one PostgreSQL container. Run with:
//!
//! ```bash
//! cargo test -p market-store --test postgres_integration
//! ```

use std::sync::Arc;

use chrono::{Days, Utc};
use market_store::{
    AddressId, CartLine, ConsumerId, InMemoryMarketStore, MarketStore, Money, NewOrder,
    NewOrderLine, OrderStatus, PostgresMarketStore, Product, ProductId, StoreError, VendorId, Week,
};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();
            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_marketplace_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Fresh store with its own pool and cleared tables.
async fn get_test_store() -> PostgresMarketStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE cart_lines, order_lines, orders, products")
        .execute(&pool)
        .await
        .unwrap();

    PostgresMarketStore::new(pool)
}

fn valid_product(stock: u32, price_cents: i64) -> Product {
    let today = Utc::now().date_naive();
    Product {
        id: ProductId::new(),
        vendor_id: VendorId::new(),
        name: "Pão de fermentação natural".to_string(),
        image_url: Some("https://example.org/pao.jpg".to_string()),
        price: Money::from_cents(price_cents),
        stock,
        active: true,
        week: Week::current(),
        expires_on: today.checked_add_days(Days::new(5)).unwrap(),
    }
}

fn order_for(product: &Product, quantity: u32) -> NewOrder {
    NewOrder {
        number: format!("FEI-TEST-{}", ProductId::new()),
        vendor_id: product.vendor_id,
        address_id: AddressId::new(),
        notes: None,
        lines: vec![NewOrderLine {
            product_id: product.id,
            product_name: product.name.clone(),
            unit_price: product.price,
            quantity,
        }],
    }
}

#[tokio::test]
#[serial]
async fn product_and_cart_roundtrip() {
    let store = get_test_store().await;
    let consumer = ConsumerId::new();
    let product = valid_product(10, 1200);
    store.put_product(product.clone()).await.unwrap();

    let loaded = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(loaded, product);

    store
        .upsert_cart_line(CartLine::new(consumer, product.id, 2, product.price))
        .await
        .unwrap();

    let cart = store.cart_with_products(consumer).await.unwrap();
    assert_eq!(cart.len(), 1);
    assert_eq!(cart[0].0.quantity, 2);
    assert_eq!(cart[0].1.as_ref().unwrap().id, product.id);

    assert!(store.delete_cart_line(consumer, product.id).await.unwrap());
    assert!(!store.delete_cart_line(consumer, product.id).await.unwrap());
}

#[tokio::test]
#[serial]
async fn checkout_commit_creates_orders_and_clears_cart() {
    let store = get_test_store().await;
    let consumer = ConsumerId::new();
    let product = valid_product(10, 1000);
    store.put_product(product.clone()).await.unwrap();
    store
        .upsert_cart_line(CartLine::new(consumer, product.id, 2, product.price))
        .await
        .unwrap();

    let orders = store
        .commit_checkout(consumer, vec![order_for(&product, 2)])
        .await
        .unwrap();

    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].status, OrderStatus::Pending);
    assert_eq!(orders[0].total, Money::from_cents(2000));
    assert_eq!(orders[0].consumer_id, consumer);

    let lines = store.get_order_lines(orders[0].id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, 2);
    assert_eq!(lines[0].subtotal, Money::from_cents(2000));

    let live = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(live.stock, 8);
    assert!(store.cart_with_products(consumer).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn failed_vendor_group_rolls_back_the_whole_checkout() {
    let store = get_test_store().await;
    let consumer = ConsumerId::new();
    let plenty = valid_product(10, 1000);
    let scarce = valid_product(1, 500);
    store.put_product(plenty.clone()).await.unwrap();
    store.put_product(scarce.clone()).await.unwrap();
    store
        .upsert_cart_line(CartLine::new(consumer, plenty.id, 2, plenty.price))
        .await
        .unwrap();

    let err = store
        .commit_checkout(consumer, vec![order_for(&plenty, 2), order_for(&scarce, 2)])
        .await
        .unwrap_err();

    match err {
        StoreError::StockConflict {
            product_id,
            requested,
            available,
        } => {
            assert_eq!(product_id, scarce.id);
            assert_eq!(requested, 2);
            assert_eq!(available, 1);
        }
        other => panic!("unexpected error: {other}"),
    }

    // The first vendor's order and decrement were rolled back too.
    assert!(store.orders_for_consumer(consumer).await.unwrap().is_empty());
    let live = store.get_product(plenty.id).await.unwrap().unwrap();
    assert_eq!(live.stock, 10);
    assert_eq!(store.cart_with_products(consumer).await.unwrap().len(), 1);
}

#[tokio::test]
#[serial]
async fn concurrent_checkouts_for_last_unit_yield_one_winner() {
    let store = get_test_store().await;
    let product = valid_product(1, 800);
    store.put_product(product.clone()).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..6 {
        let store = store.clone();
        let product = product.clone();
        handles.push(tokio::spawn(async move {
            store
                .commit_checkout(ConsumerId::new(), vec![order_for(&product, 1)])
                .await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(StoreError::StockConflict { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(successes, 1);

    let live = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(live.stock, 0);
}

#[tokio::test]
#[serial]
async fn write_time_check_rejects_deactivated_product() {
    let store = get_test_store().await;
    let consumer = ConsumerId::new();
    let mut product = valid_product(5, 600);
    store.put_product(product.clone()).await.unwrap();

    // Vendor deactivates between validation and the write.
    product.active = false;
    store.put_product(product.clone()).await.unwrap();

    let err = store
        .commit_checkout(consumer, vec![order_for(&product, 1)])
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ProductUnavailable { product_id } if product_id == product.id));
}

#[tokio::test]
#[serial]
async fn cancellation_restores_stock_and_appends_reason() {
    let store = get_test_store().await;
    let consumer = ConsumerId::new();
    let product = valid_product(10, 1000);
    store.put_product(product.clone()).await.unwrap();

    let orders = store
        .commit_checkout(consumer, vec![order_for(&product, 3)])
        .await
        .unwrap();
    let id = orders[0].id;

    store
        .transition_order(id, OrderStatus::Confirmed, None)
        .await
        .unwrap();
    let cancelled = store
        .transition_order(id, OrderStatus::Cancelled, Some("cancelado: sem entrega".into()))
        .await
        .unwrap();

    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.notes.as_deref(), Some("cancelado: sem entrega"));

    let live = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(live.stock, 10);

    // Terminal: no further transition, no double restore.
    let err = store
        .transition_order(id, OrderStatus::Delivered, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::InvalidTransition {
            current: OrderStatus::Cancelled,
            attempted: OrderStatus::Delivered,
        }
    ));
    let live = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(live.stock, 10);
}

#[tokio::test]
#[serial]
async fn illegal_forward_jump_is_rejected() {
    let store = get_test_store().await;
    let consumer = ConsumerId::new();
    let product = valid_product(5, 1000);
    store.put_product(product.clone()).await.unwrap();

    let orders = store
        .commit_checkout(consumer, vec![order_for(&product, 1)])
        .await
        .unwrap();

    let err = store
        .transition_order(orders[0].id, OrderStatus::Delivered, None)
        .await
        .unwrap_err();
    assert_eq!(
        err.allowed_transitions(),
        &[OrderStatus::Confirmed, OrderStatus::Cancelled]
    );
}

/// The in-memory store must agree with Postgres on checkout semantics so
/// the domain tests that run against it stay meaningful.
#[tokio::test]
#[serial]
async fn memory_store_matches_postgres_on_rollback_semantics() {
    let pg = get_test_store().await;
    let mem = InMemoryMarketStore::new();

    for store in [&pg as &dyn MarketStore, &mem as &dyn MarketStore] {
        let consumer = ConsumerId::new();
        let product = valid_product(2, 500);
        store.put_product(product.clone()).await.unwrap();
        store
            .upsert_cart_line(CartLine::new(consumer, product.id, 2, product.price))
            .await
            .unwrap();

        let err = store
            .commit_checkout(consumer, vec![order_for(&product, 3)])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::StockConflict { available: 2, .. }));
        assert_eq!(
            store.get_product(product.id).await.unwrap().unwrap().stock,
            2
        );
        assert_eq!(store.cart_with_products(consumer).await.unwrap().len(), 1);
    }
}
