//! # Repository Module
//!
//! Database repository implementations for the checkout flow.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Checkout service / caller                                              │
//! │       │                                                                 │
//! │       │  db.orders().insert_draft(&order)                               │
//! │       ▼                                                                 │
//! │  OrderRepository ── SQL isolated here ──► SQLite                        │
//! │                                                                         │
//! │  Rows carry raw column types (INTEGER minor units, TEXT enums);         │
//! │  repositories convert them to the storefront-core value types at        │
//! │  the boundary so nothing above this layer touches SQL shapes.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Products, product classes, stock
//! - [`customer::CustomerRepository`] - Customers and purchase statistics
//! - [`order::OrderRepository`] - Draft order persistence and lookup

pub mod customer;
pub mod order;
pub mod product;
