//! # Product Repository
//!
//! Database operations for products, product classes, and stock.
//!
//! Stock lives in its own table, one row per tracked product class; a
//! class with `stock_unlimited` set has no stocks row and never blocks
//! a commit.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::StoreResult;
use storefront_core::{DisplayStatus, Money, Product, ProductClass};

/// Raw product_classes row; money columns stay integer until the edge.
#[derive(Debug, sqlx::FromRow)]
struct ClassRow {
    id: String,
    product_id: String,
    code: String,
    price_minor: i64,
    product_type_id: i64,
    delivery_fee_minor: i64,
    sale_limit: Option<i64>,
    stock_unlimited: bool,
}

impl From<ClassRow> for ProductClass {
    fn from(row: ClassRow) -> Self {
        ProductClass {
            id: row.id,
            product_id: row.product_id,
            code: row.code,
            price: Money::from_minor(row.price_minor),
            product_type_id: row.product_type_id,
            delivery_fee: Money::from_minor(row.delivery_fee_minor),
            sale_limit: row.sale_limit,
            stock_unlimited: row.stock_unlimited,
        }
    }
}

/// Repository for product and stock operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a product.
    pub async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        debug!(id = %product.id, "Inserting product");
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO products (id, name, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.status)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a product by ID.
    pub async fn get_product(&self, id: &str) -> StoreResult<Option<Product>> {
        let row: Option<(String, String, DisplayStatus)> =
            sqlx::query_as("SELECT id, name, status FROM products WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(id, name, status)| Product { id, name, status }))
    }

    /// Sets a product's display status.
    pub async fn set_status(&self, product_id: &str, status: DisplayStatus) -> StoreResult<()> {
        let now = Utc::now();

        sqlx::query("UPDATE products SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(product_id)
            .bind(status)
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Inserts a product class (a purchasable SKU).
    pub async fn insert_class(&self, class: &ProductClass) -> StoreResult<()> {
        debug!(id = %class.id, code = %class.code, "Inserting product class");

        sqlx::query(
            r#"
            INSERT INTO product_classes (
                id, product_id, code, price_minor,
                product_type_id, delivery_fee_minor, sale_limit, stock_unlimited
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&class.id)
        .bind(&class.product_id)
        .bind(&class.code)
        .bind(class.price.minor())
        .bind(class.product_type_id)
        .bind(class.delivery_fee.minor())
        .bind(class.sale_limit)
        .bind(class.stock_unlimited)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a product class by ID.
    pub async fn get_class(&self, id: &str) -> StoreResult<Option<ProductClass>> {
        let row: Option<ClassRow> = sqlx::query_as(
            r#"
            SELECT id, product_id, code, price_minor,
                   product_type_id, delivery_fee_minor, sale_limit, stock_unlimited
            FROM product_classes
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ProductClass::from))
    }

    /// Upserts the stock count for a product class.
    pub async fn set_stock(&self, product_class_id: &str, stock: i64) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO stocks (product_class_id, stock)
            VALUES (?1, ?2)
            ON CONFLICT (product_class_id) DO UPDATE SET stock = excluded.stock
            "#,
        )
        .bind(product_class_id)
        .bind(stock)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets the stock count for a product class.
    ///
    /// `None` means no stock row exists (untracked / unlimited classes).
    pub async fn get_stock(&self, product_class_id: &str) -> StoreResult<Option<i64>> {
        let stock: Option<i64> =
            sqlx::query_scalar("SELECT stock FROM stocks WHERE product_class_id = ?1")
                .bind(product_class_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(stock)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
