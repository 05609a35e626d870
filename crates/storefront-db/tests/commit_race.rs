//! Concurrency test for the order commit path.
//!
//! Two services on separate connection pools race to commit drafts that
//! both want the last unit of stock. The BEGIN IMMEDIATE transaction
//! must let exactly one through; the loser sees either the stock
//! rejection (it got the lock after the winner) or a lock timeout (the
//! winner held the lock past its busy_timeout). Either way the shelf
//! never goes negative.

use std::time::Duration;

use storefront_core::catalog::StaticCatalog;
use storefront_core::{
    Address, Carrier, Cart, CheckoutConfig, CheckoutError, Customer, DisplayStatus, Money,
    OrderStatus, Product, ProductClass, Rounding, TaxRate, TaxRule,
};
use storefront_db::{CheckoutService, Database, DbConfig, FailurePolicy, StoreError};

fn catalog() -> StaticCatalog {
    StaticCatalog::new()
        .with_carrier(Carrier {
            id: 1,
            name: "Standard".to_string(),
            product_type_id: 1,
        })
        .with_fee(1, 13, Money::from_minor(500))
        .with_default_tax_rule(TaxRule {
            rule_id: 1,
            rate: TaxRate::from_bps(1000),
            rounding: Rounding::HalfUp,
        })
}

fn customer(id: &str) -> Customer {
    Customer {
        id: Some(id.to_string()),
        name: format!("Shopper {id}"),
        email: format!("{id}@example.com"),
        phone: "03-0000-0000".to_string(),
        address: Address {
            zip: "100-0001".to_string(),
            prefecture_id: 13,
            prefecture: "Tokyo".to_string(),
            street: "1-1 Chiyoda".to_string(),
        },
        ..Customer::default()
    }
}

async fn open(path: &std::path::Path) -> Database {
    Database::new(
        DbConfig::new(path)
            .max_connections(2)
            .busy_timeout(Duration::from_millis(500)),
    )
    .await
    .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn last_unit_goes_to_exactly_one_committer() {
    // RUST_LOG=storefront_db=debug shows the interleaving when this flakes.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storefront.db");

    // Two independent pools over the same file, like two server workers.
    let db_a = open(&path).await;
    let db_b = open(&path).await;

    let product = Product {
        id: "p-1".to_string(),
        name: "Limited teapot".to_string(),
        status: DisplayStatus::Visible,
    };
    let class = ProductClass {
        id: "pc-1".to_string(),
        product_id: "p-1".to_string(),
        code: "SKU-1".to_string(),
        price: Money::from_minor(8000),
        product_type_id: 1,
        delivery_fee: Money::zero(),
        sale_limit: None,
        stock_unlimited: false,
    };
    db_a.products().insert_product(&product).await.unwrap();
    db_a.products().insert_class(&class).await.unwrap();
    db_a.products().set_stock("pc-1", 1).await.unwrap();
    db_a.customers().insert(&customer("c-a")).await.unwrap();
    db_a.customers().insert(&customer("c-b")).await.unwrap();

    let svc_a = CheckoutService::new(db_a.clone(), catalog(), CheckoutConfig::new());
    let svc_b = CheckoutService::new(db_b.clone(), catalog(), CheckoutConfig::new());

    // Both drafts persist fine: assembly never touches stock.
    let mut cart_a = Cart::new();
    cart_a.add_line(&product, &class, 1).unwrap();
    let draft_a = svc_a
        .assemble_order(&mut cart_a, Some(&customer("c-a")))
        .await
        .unwrap();

    let mut cart_b = Cart::new();
    cart_b.add_line(&product, &class, 1).unwrap();
    let draft_b = svc_b
        .assemble_order(&mut cart_b, Some(&customer("c-b")))
        .await
        .unwrap();

    let (result_a, result_b) = tokio::join!(
        svc_a.commit(&mut cart_a, &draft_a.id, FailurePolicy::KeepDraft),
        svc_b.commit(&mut cart_b, &draft_b.id, FailurePolicy::KeepDraft),
    );

    let winners = [result_a.is_ok(), result_b.is_ok()]
        .iter()
        .filter(|ok| **ok)
        .count();
    assert_eq!(winners, 1, "exactly one commit must win the last unit");

    for result in [result_a, result_b] {
        match result {
            Ok(order) => assert_eq!(order.status, OrderStatus::Confirmed),
            Err(StoreError::Checkout(CheckoutError::InsufficientStock {
                available,
                requested,
                ..
            })) => {
                assert_eq!(available, 0);
                assert_eq!(requested, 1);
            }
            Err(StoreError::Checkout(CheckoutError::LockTimeout)) => {}
            Err(other) => panic!("unexpected commit failure: {other}"),
        }
    }

    assert_eq!(db_a.products().get_stock("pc-1").await.unwrap(), Some(0));

    db_a.close().await;
    db_b.close().await;
}
