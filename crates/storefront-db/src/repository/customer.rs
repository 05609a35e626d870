//! # Customer Repository
//!
//! Database operations for registered customers and their purchase
//! statistics. Guests never reach this table.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use storefront_core::{Address, Customer, Money};

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: String,
    name: String,
    email: String,
    phone: String,
    zip: String,
    prefecture_id: i64,
    prefecture: String,
    street: String,
    first_purchase_at: Option<DateTime<Utc>>,
    last_purchase_at: Option<DateTime<Utc>>,
    purchase_count: i64,
    lifetime_spend_minor: i64,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: Some(row.id),
            name: row.name,
            email: row.email,
            phone: row.phone,
            address: Address {
                zip: row.zip,
                prefecture_id: row.prefecture_id,
                prefecture: row.prefecture,
                street: row.street,
            },
            first_purchase_at: row.first_purchase_at,
            last_purchase_at: row.last_purchase_at,
            purchase_count: row.purchase_count,
            lifetime_spend: Money::from_minor(row.lifetime_spend_minor),
        }
    }
}

/// Repository for customer operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Inserts a registered customer.
    ///
    /// The customer must carry an ID; a guest profile has nothing to store.
    pub async fn insert(&self, customer: &Customer) -> StoreResult<()> {
        let id = customer
            .id
            .as_deref()
            .ok_or_else(|| StoreError::Internal("customer without id".to_string()))?;

        debug!(id = %id, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, name, email, phone,
                zip, prefecture_id, prefecture, street,
                first_purchase_at, last_purchase_at, purchase_count, lifetime_spend_minor
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.address.zip)
        .bind(customer.address.prefecture_id)
        .bind(&customer.address.prefecture)
        .bind(&customer.address.street)
        .bind(customer.first_purchase_at)
        .bind(customer.last_purchase_at)
        .bind(customer.purchase_count)
        .bind(customer.lifetime_spend.minor())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a customer by ID.
    pub async fn get(&self, id: &str) -> StoreResult<Option<Customer>> {
        let row: Option<CustomerRow> = sqlx::query_as(
            r#"
            SELECT id, name, email, phone,
                   zip, prefecture_id, prefecture, street,
                   first_purchase_at, last_purchase_at,
                   purchase_count, lifetime_spend_minor
            FROM customers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Customer::from))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
