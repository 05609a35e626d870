//! # Order Commit
//!
//! The inventory-guarded transition from draft to confirmed order.
//!
//! ## Commit Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     commit_order(order_id)                              │
//! │                                                                         │
//! │  acquire connection                                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN IMMEDIATE ← takes SQLite's write lock NOW, so no other          │
//! │       │            committer can read stale stock underneath us.       │
//! │       │            A lock stall past busy_timeout → LockTimeout.       │
//! │       ▼                                                                 │
//! │  load draft order row (must still be 'draft')                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  guard rows: details ⋈ classes ⋈ products ⋈ stocks,                    │
//! │              ordered by product_class_id                               │
//! │       │                                                                 │
//! │       ├── pass 1: every product still visible?                         │
//! │       ├── pass 2: quantities within sale limits?                       │
//! │       └── pass 3: enough stock for every tracked class?                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  decrement stocks                                                      │
//! │  update customer statistics (registered customers only)                │
//! │  status → 'confirmed', confirmed_at = now                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT          (any failure above → ROLLBACK, draft untouched)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All guards run before any write, so a rejection leaves stock and
//! statistics exactly as they were.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use storefront_core::{CheckoutError, DisplayStatus, OrderStatus};

/// Minimal order columns needed inside the transaction.
#[derive(Debug, sqlx::FromRow)]
struct CommitOrderRow {
    id: String,
    customer_id: Option<String>,
    status: OrderStatus,
    total_minor: i64,
}

/// One order line joined to the live catalog state it must be checked
/// against. `stock` is NULL for classes without a stocks row.
#[derive(Debug, sqlx::FromRow)]
struct GuardRow {
    product_class_id: String,
    product_name: String,
    product_code: String,
    quantity: i64,
    product_status: DisplayStatus,
    sale_limit: Option<i64>,
    stock_unlimited: bool,
    stock: Option<i64>,
}

/// Commits a draft order: verifies every line against the live catalog,
/// reserves stock, updates customer statistics, and confirms the order,
/// all inside one immediate write transaction.
///
/// ## Errors
/// - [`CheckoutError::ProductUnpublished`] - a product was hidden since assembly
/// - [`CheckoutError::SaleLimitExceeded`] - a quantity now exceeds its cap
/// - [`CheckoutError::InsufficientStock`] - a concurrent commit got the units first
/// - [`CheckoutError::LockTimeout`] - could not take the write lock in time
///
/// Every error path rolls back; the draft survives untouched.
pub async fn commit_order(pool: &SqlitePool, order_id: &str) -> StoreResult<String> {
    let mut conn = pool.acquire().await?;

    // IMMEDIATE grabs the write lock before the first read. A plain
    // deferred transaction would let two committers both read the same
    // stock count and upgrade later, and one of them would confirm an
    // order the shelf can't cover.
    sqlx::query("BEGIN IMMEDIATE")
        .execute(&mut *conn)
        .await
        .map_err(StoreError::from)?;

    match commit_in_tx(&mut conn, order_id).await {
        Ok(order_id) => {
            sqlx::query("COMMIT").execute(&mut *conn).await?;
            info!(order_id = %order_id, "Order confirmed");
            Ok(order_id)
        }
        Err(e) => {
            if let Err(rollback_err) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
                warn!(error = %rollback_err, "Rollback after failed commit also failed");
            }
            Err(e)
        }
    }
}

/// The body of the commit transaction. Runs entirely on one connection
/// holding the write lock; returning an error triggers a rollback.
async fn commit_in_tx(conn: &mut SqliteConnection, order_id: &str) -> StoreResult<String> {
    let order: Option<CommitOrderRow> = sqlx::query_as(
        "SELECT id, customer_id, status, total_minor FROM orders WHERE id = ?1",
    )
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?;

    let order = order.ok_or_else(|| StoreError::not_found("Order", order_id))?;
    if order.status != OrderStatus::Draft {
        return Err(StoreError::not_found("Order (draft)", order_id));
    }

    // Deterministic ordering keeps multi-class commits touching classes
    // in the same sequence on every connection.
    let guards: Vec<GuardRow> = sqlx::query_as(
        r#"
        SELECT d.product_class_id,
               d.product_name,
               d.product_code,
               SUM(d.quantity) AS quantity,
               p.status AS product_status,
               pc.sale_limit,
               pc.stock_unlimited,
               s.stock
        FROM order_details d
        JOIN product_classes pc ON pc.id = d.product_class_id
        JOIN products p ON p.id = pc.product_id
        LEFT JOIN stocks s ON s.product_class_id = pc.id
        WHERE d.order_id = ?1
        GROUP BY d.product_class_id
        ORDER BY d.product_class_id ASC
        "#,
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    // Pass 1: still published?
    for guard in &guards {
        if guard.product_status != DisplayStatus::Visible {
            return Err(CheckoutError::ProductUnpublished {
                product_code: guard.product_code.clone(),
                product_name: guard.product_name.clone(),
            }
            .into());
        }
    }

    // Pass 2: within sale limits?
    for guard in &guards {
        if let Some(limit) = guard.sale_limit {
            if guard.quantity > limit {
                return Err(CheckoutError::SaleLimitExceeded {
                    product_code: guard.product_code.clone(),
                    limit,
                    requested: guard.quantity,
                }
                .into());
            }
        }
    }

    // Pass 3: enough stock? Untracked classes (unlimited) never block.
    for guard in &guards {
        if guard.stock_unlimited {
            continue;
        }
        let available = guard.stock.unwrap_or(0);
        if available < guard.quantity {
            return Err(CheckoutError::InsufficientStock {
                product_code: guard.product_code.clone(),
                available,
                requested: guard.quantity,
            }
            .into());
        }
    }

    // All guards passed: now mutate, in the same class order.
    for guard in &guards {
        if guard.stock_unlimited {
            continue;
        }
        debug!(
            product_class_id = %guard.product_class_id,
            quantity = guard.quantity,
            "Decrementing stock"
        );
        sqlx::query("UPDATE stocks SET stock = stock - ?2 WHERE product_class_id = ?1")
            .bind(&guard.product_class_id)
            .bind(guard.quantity)
            .execute(&mut *conn)
            .await?;
    }

    let now = Utc::now();

    if let Some(customer_id) = &order.customer_id {
        update_customer_stats(conn, customer_id, order.total_minor, now).await?;
    }

    let result = sqlx::query(
        r#"
        UPDATE orders SET status = 'confirmed', confirmed_at = ?2, updated_at = ?2
        WHERE id = ?1 AND status = 'draft'
        "#,
    )
    .bind(order_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::not_found("Order (draft)", order_id));
    }

    Ok(order.id)
}

/// Rolls the confirmed order's total into the customer's purchase
/// statistics. First purchase date is written once and never moves.
async fn update_customer_stats(
    conn: &mut SqliteConnection,
    customer_id: &str,
    total_minor: i64,
    now: DateTime<Utc>,
) -> StoreResult<()> {
    debug!(customer_id = %customer_id, "Updating purchase statistics");

    let result = sqlx::query(
        r#"
        UPDATE customers SET
            first_purchase_at = COALESCE(first_purchase_at, ?2),
            last_purchase_at = ?2,
            purchase_count = purchase_count + 1,
            lifetime_spend_minor = lifetime_spend_minor + ?3
        WHERE id = ?1
        "#,
    )
    .bind(customer_id)
    .bind(now)
    .bind(total_minor)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::not_found("Customer", customer_id));
    }

    Ok(())
}
