//! # storefront-db: Persistence Layer for Storefront Checkout
//!
//! SQLite storage and transactional orchestration for the checkout flow.
//! The pure rules (shipment splitting, pricing, payment eligibility) live
//! in storefront-core; this crate persists drafts and runs the
//! inventory-guarded commit.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Checkout Data Flow                                  │
//! │                                                                         │
//! │  Caller (HTTP handler, CLI, test)                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  storefront-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌────────────────┐   ┌──────────────┐   │   │
//! │  │   │ CheckoutService│   │  Repositories  │   │  Migrations  │   │   │
//! │  │   │ (service.rs)  │──►│ (repository/)  │   │  (embedded)  │   │   │
//! │  │   │               │   │                │   │              │   │   │
//! │  │   │ assemble      │   │ OrderRepo      │   │ 001_init.sql │   │   │
//! │  │   │ reprice       │   │ ProductRepo    │   └──────────────┘   │   │
//! │  │   │ commit ───────┼──►│ CustomerRepo   │                      │   │
//! │  │   └───────────────┘   └────────────────┘                      │   │
//! │  │         │                                                      │   │
//! │  │         ▼                                                      │   │
//! │  │   commit.rs ← BEGIN IMMEDIATE inventory transaction            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL mode, busy_timeout-bounded write lock)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Storage error types
//! - [`repository`] - Repository implementations (order, product, customer)
//! - [`commit`] - The inventory-guarded order commit transaction
//! - [`service`] - The checkout orchestrator
//!
//! ## Usage
//!
//! ```rust,ignore
//! use storefront_core::{catalog::StaticCatalog, Cart, CheckoutConfig};
//! use storefront_db::{CheckoutService, Database, DbConfig, FailurePolicy};
//!
//! let db = Database::new(DbConfig::new("path/to/storefront.db")).await?;
//! let service = CheckoutService::new(db, catalog, CheckoutConfig::new());
//!
//! let draft = service.assemble_order(&mut cart, Some(&customer)).await?;
//! let confirmed = service
//!     .commit(&mut cart, &draft.id, FailurePolicy::MarkRejected)
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod commit;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{StoreError, StoreResult};
pub use pool::{Database, DbConfig};
pub use service::{CheckoutService, FailurePolicy};

// Repository re-exports for convenience
pub use repository::customer::CustomerRepository;
pub use repository::order::OrderRepository;
pub use repository::product::ProductRepository;
