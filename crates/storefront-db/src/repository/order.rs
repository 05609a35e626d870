//! # Order Repository
//!
//! Database operations for draft orders and their child rows.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. PERSIST DRAFT                                                      │
//! │     └── insert_draft() → orders + order_details + shippings            │
//! │         + shipment_items in one transaction                            │
//! │                                                                         │
//! │  2. REPRICE / EDIT                                                     │
//! │     └── update_shipping() → destination or carrier changed             │
//! │     └── update_totals()   → money columns + payment selection          │
//! │                             (draft rows only, guarded by status)       │
//! │                                                                         │
//! │  3. COMMIT (commit module, not here)                                   │
//! │     └── status → 'confirmed' inside the inventory transaction          │
//! │                                                                         │
//! │  4. (ON FAILURE) mark_rejected() → status → 'rejected'                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use storefront_core::{
    Address, CheckoutError, Money, Order, OrderDetail, OrderStatus, Rounding, ShipmentItem,
    Shipping, TaxRate,
};

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    pre_order_token: String,
    customer_id: Option<String>,
    name: String,
    email: String,
    phone: String,
    zip: String,
    prefecture_id: i64,
    prefecture: String,
    street: String,
    status: OrderStatus,
    subtotal_minor: i64,
    tax_minor: i64,
    delivery_fee_total_minor: i64,
    charge_minor: i64,
    total_minor: i64,
    payment_total_minor: i64,
    payment_id: Option<i64>,
    payment_method: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    confirmed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, sqlx::FromRow)]
struct DetailRow {
    id: String,
    product_id: String,
    product_class_id: String,
    product_name: String,
    product_code: String,
    price_minor: i64,
    quantity: i64,
    tax_rule_id: i64,
    tax_rate_bps: i64,
    tax_rounding: Rounding,
    product_type_id: i64,
    unit_delivery_fee_minor: i64,
}

impl From<DetailRow> for OrderDetail {
    fn from(row: DetailRow) -> Self {
        OrderDetail {
            id: row.id,
            product_id: row.product_id,
            product_class_id: row.product_class_id,
            product_name: row.product_name,
            product_code: row.product_code,
            price: Money::from_minor(row.price_minor),
            quantity: row.quantity,
            tax_rule_id: row.tax_rule_id,
            tax_rate: TaxRate::from_bps(row.tax_rate_bps as u32),
            tax_rounding: row.tax_rounding,
            product_type_id: row.product_type_id,
            unit_delivery_fee: Money::from_minor(row.unit_delivery_fee_minor),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ShippingRow {
    id: String,
    carrier_id: i64,
    carrier_name: String,
    product_type_id: i64,
    name: String,
    zip: String,
    prefecture_id: i64,
    prefecture: String,
    street: String,
    fee_minor: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: String,
    shipping_id: String,
    order_detail_id: String,
    product_name: String,
    product_code: String,
    price_minor: i64,
    quantity: i64,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order persistence.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Persists a complete draft order in one transaction.
    ///
    /// ## Token Collisions
    /// `pre_order_token` carries a UNIQUE index. A collision rolls the
    /// whole insert back and surfaces as
    /// [`CheckoutError::PreOrderTokenCollision`], which is transient:
    /// the caller assembles again with a fresh token.
    pub async fn insert_draft(&self, order: &Order) -> StoreResult<()> {
        debug!(id = %order.id, details = order.details.len(), "Persisting draft order");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO orders (
                id, pre_order_token, customer_id,
                name, email, phone,
                zip, prefecture_id, prefecture, street,
                status,
                subtotal_minor, tax_minor, delivery_fee_total_minor,
                charge_minor, total_minor, payment_total_minor,
                payment_id, payment_method,
                created_at, updated_at, confirmed_at
            ) VALUES (
                ?1, ?2, ?3,
                ?4, ?5, ?6,
                ?7, ?8, ?9, ?10,
                ?11,
                ?12, ?13, ?14,
                ?15, ?16, ?17,
                ?18, ?19,
                ?20, ?21, ?22
            )
            "#,
        )
        .bind(&order.id)
        .bind(&order.pre_order_token)
        .bind(&order.customer_id)
        .bind(&order.name)
        .bind(&order.email)
        .bind(&order.phone)
        .bind(&order.address.zip)
        .bind(order.address.prefecture_id)
        .bind(&order.address.prefecture)
        .bind(&order.address.street)
        .bind(order.status)
        .bind(order.subtotal.minor())
        .bind(order.tax.minor())
        .bind(order.delivery_fee_total.minor())
        .bind(order.charge.minor())
        .bind(order.total.minor())
        .bind(order.payment_total.minor())
        .bind(order.payment_id)
        .bind(&order.payment_method)
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(order.confirmed_at)
        .execute(&mut *tx)
        .await;

        if let Err(e) = result {
            let store_err = StoreError::from(e);
            // The token index is the only UNIQUE constraint on orders.
            return Err(match store_err {
                StoreError::UniqueViolation { field, .. }
                    if field.contains("pre_order_token") =>
                {
                    StoreError::Checkout(CheckoutError::PreOrderTokenCollision {
                        token: order.pre_order_token.clone(),
                    })
                }
                other => other,
            });
        }

        for detail in &order.details {
            sqlx::query(
                r#"
                INSERT INTO order_details (
                    id, order_id, product_id, product_class_id,
                    product_name, product_code, price_minor, quantity,
                    tax_rule_id, tax_rate_bps, tax_rounding,
                    product_type_id, unit_delivery_fee_minor
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                "#,
            )
            .bind(&detail.id)
            .bind(&order.id)
            .bind(&detail.product_id)
            .bind(&detail.product_class_id)
            .bind(&detail.product_name)
            .bind(&detail.product_code)
            .bind(detail.price.minor())
            .bind(detail.quantity)
            .bind(detail.tax_rule_id)
            .bind(detail.tax_rate.bps() as i64)
            .bind(detail.tax_rounding)
            .bind(detail.product_type_id)
            .bind(detail.unit_delivery_fee.minor())
            .execute(&mut *tx)
            .await?;
        }

        for shipping in &order.shippings {
            sqlx::query(
                r#"
                INSERT INTO shippings (
                    id, order_id, carrier_id, carrier_name, product_type_id,
                    name, zip, prefecture_id, prefecture, street, fee_minor
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
            )
            .bind(&shipping.id)
            .bind(&order.id)
            .bind(shipping.carrier_id)
            .bind(&shipping.carrier_name)
            .bind(shipping.product_type_id)
            .bind(&shipping.name)
            .bind(&shipping.address.zip)
            .bind(shipping.address.prefecture_id)
            .bind(&shipping.address.prefecture)
            .bind(&shipping.address.street)
            .bind(shipping.fee.minor())
            .execute(&mut *tx)
            .await?;

            for item in &shipping.items {
                sqlx::query(
                    r#"
                    INSERT INTO shipment_items (
                        id, shipping_id, order_detail_id,
                        product_name, product_code, price_minor, quantity
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    "#,
                )
                .bind(&item.id)
                .bind(&shipping.id)
                .bind(&item.order_detail_id)
                .bind(&item.product_name)
                .bind(&item.product_code)
                .bind(item.price.minor())
                .bind(item.quantity)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    /// Gets a full order aggregate by ID.
    pub async fn get_by_id(&self, id: &str) -> StoreResult<Order> {
        let row: Option<OrderRow> = sqlx::query_as(
            r#"
            SELECT id, pre_order_token, customer_id,
                   name, email, phone,
                   zip, prefecture_id, prefecture, street,
                   status,
                   subtotal_minor, tax_minor, delivery_fee_total_minor,
                   charge_minor, total_minor, payment_total_minor,
                   payment_id, payment_method,
                   created_at, updated_at, confirmed_at
            FROM orders
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or_else(|| StoreError::not_found("Order", id))?;
        self.load_aggregate(row).await
    }

    /// Finds the draft order bound to a cart's pre-order token.
    ///
    /// Confirmed and rejected orders never match: once a token's order
    /// has left the draft state, the cart no longer owns an order.
    pub async fn find_draft_by_token(&self, token: &str) -> StoreResult<Option<Order>> {
        let row: Option<OrderRow> = sqlx::query_as(
            r#"
            SELECT id, pre_order_token, customer_id,
                   name, email, phone,
                   zip, prefecture_id, prefecture, street,
                   status,
                   subtotal_minor, tax_minor, delivery_fee_total_minor,
                   charge_minor, total_minor, payment_total_minor,
                   payment_id, payment_method,
                   created_at, updated_at, confirmed_at
            FROM orders
            WHERE pre_order_token = ?1 AND status = 'draft'
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.load_aggregate(row).await?)),
            None => Ok(None),
        }
    }

    /// Writes recomputed money columns and the payment selection back
    /// to a draft order, along with each shipment group's fee.
    ///
    /// Totals on a confirmed or rejected order are immutable; the draft
    /// status guard enforces that here.
    pub async fn update_totals(&self, order: &Order) -> StoreResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                subtotal_minor = ?2,
                tax_minor = ?3,
                delivery_fee_total_minor = ?4,
                charge_minor = ?5,
                total_minor = ?6,
                payment_total_minor = ?7,
                payment_id = ?8,
                payment_method = ?9,
                updated_at = ?10
            WHERE id = ?1 AND status = 'draft'
            "#,
        )
        .bind(&order.id)
        .bind(order.subtotal.minor())
        .bind(order.tax.minor())
        .bind(order.delivery_fee_total.minor())
        .bind(order.charge.minor())
        .bind(order.total.minor())
        .bind(order.payment_total.minor())
        .bind(order.payment_id)
        .bind(&order.payment_method)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Order (draft)", &order.id));
        }

        for shipping in &order.shippings {
            sqlx::query("UPDATE shippings SET fee_minor = ?3 WHERE id = ?1 AND order_id = ?2")
                .bind(&shipping.id)
                .bind(&order.id)
                .bind(shipping.fee.minor())
                .execute(&self.pool)
                .await?;
        }

        Ok(())
    }

    /// Updates a shipment group's recipient, destination, and carrier.
    pub async fn update_shipping(&self, order_id: &str, shipping: &Shipping) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE shippings SET
                carrier_id = ?3,
                carrier_name = ?4,
                name = ?5,
                zip = ?6,
                prefecture_id = ?7,
                prefecture = ?8,
                street = ?9,
                fee_minor = ?10
            WHERE id = ?1 AND order_id = ?2
            "#,
        )
        .bind(&shipping.id)
        .bind(order_id)
        .bind(shipping.carrier_id)
        .bind(&shipping.carrier_name)
        .bind(&shipping.name)
        .bind(&shipping.address.zip)
        .bind(shipping.address.prefecture_id)
        .bind(&shipping.address.prefecture)
        .bind(&shipping.address.street)
        .bind(shipping.fee.minor())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Shipping", &shipping.id));
        }

        Ok(())
    }

    /// Marks a draft order rejected.
    ///
    /// No-op result error when the order is already confirmed or gone.
    pub async fn mark_rejected(&self, order_id: &str) -> StoreResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE orders SET status = 'rejected', updated_at = ?2
            WHERE id = ?1 AND status = 'draft'
            "#,
        )
        .bind(order_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Order (draft)", order_id));
        }

        Ok(())
    }

    /// Loads child rows and assembles the full aggregate.
    async fn load_aggregate(&self, row: OrderRow) -> StoreResult<Order> {
        let details: Vec<DetailRow> = sqlx::query_as(
            r#"
            SELECT id, product_id, product_class_id,
                   product_name, product_code, price_minor, quantity,
                   tax_rule_id, tax_rate_bps, tax_rounding,
                   product_type_id, unit_delivery_fee_minor
            FROM order_details
            WHERE order_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(&row.id)
        .fetch_all(&self.pool)
        .await?;

        let shippings: Vec<ShippingRow> = sqlx::query_as(
            r#"
            SELECT id, carrier_id, carrier_name, product_type_id,
                   name, zip, prefecture_id, prefecture, street, fee_minor
            FROM shippings
            WHERE order_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(&row.id)
        .fetch_all(&self.pool)
        .await?;

        let items: Vec<ItemRow> = sqlx::query_as(
            r#"
            SELECT i.id, i.shipping_id, i.order_detail_id,
                   i.product_name, i.product_code, i.price_minor, i.quantity
            FROM shipment_items i
            JOIN shippings s ON i.shipping_id = s.id
            WHERE s.order_id = ?1
            ORDER BY i.rowid
            "#,
        )
        .bind(&row.id)
        .fetch_all(&self.pool)
        .await?;

        let shippings = shippings
            .into_iter()
            .map(|s| Shipping {
                items: items
                    .iter()
                    .filter(|i| i.shipping_id == s.id)
                    .map(|i| ShipmentItem {
                        id: i.id.clone(),
                        order_detail_id: i.order_detail_id.clone(),
                        product_name: i.product_name.clone(),
                        product_code: i.product_code.clone(),
                        price: Money::from_minor(i.price_minor),
                        quantity: i.quantity,
                    })
                    .collect(),
                id: s.id,
                carrier_id: s.carrier_id,
                carrier_name: s.carrier_name,
                product_type_id: s.product_type_id,
                name: s.name,
                address: Address {
                    zip: s.zip,
                    prefecture_id: s.prefecture_id,
                    prefecture: s.prefecture,
                    street: s.street,
                },
                fee: Money::from_minor(s.fee_minor),
            })
            .collect();

        Ok(Order {
            id: row.id,
            pre_order_token: row.pre_order_token,
            customer_id: row.customer_id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            address: Address {
                zip: row.zip,
                prefecture_id: row.prefecture_id,
                prefecture: row.prefecture,
                street: row.street,
            },
            status: row.status,
            details: details.into_iter().map(OrderDetail::from).collect(),
            shippings,
            subtotal: Money::from_minor(row.subtotal_minor),
            tax: Money::from_minor(row.tax_minor),
            delivery_fee_total: Money::from_minor(row.delivery_fee_total_minor),
            charge: Money::from_minor(row.charge_minor),
            total: Money::from_minor(row.total_minor),
            payment_total: Money::from_minor(row.payment_total_minor),
            payment_id: row.payment_id,
            payment_method: row.payment_method,
            created_at: row.created_at,
            updated_at: row.updated_at,
            confirmed_at: row.confirmed_at,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
