//! # storefront-core: Pure Checkout Logic
//!
//! This crate is the **heart** of Storefront checkout. It turns an
//! in-progress cart into a fully-priced draft order as pure functions with
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Storefront Architecture                        │
//! │                                                                     │
//! │  ┌───────────────────────────────────────────────────────────────┐ │
//! │  │                 Caller (web layer, CLI, tests)                │ │
//! │  └──────────────────────────────┬────────────────────────────────┘ │
//! │                                 │                                   │
//! │  ┌──────────────────────────────▼────────────────────────────────┐ │
//! │  │              ★ storefront-core (THIS CRATE) ★                 │ │
//! │  │                                                               │ │
//! │  │  ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌─────────┐ ┌────────┐ │ │
//! │  │  │  money  │ │ pricing │ │ shipment │ │ payment │ │assemble│ │ │
//! │  │  │  Money  │ │ totals  │ │ splitter │ │ filter  │ │ draft  │ │ │
//! │  │  │ TaxRate │ │free-ship│ │ carriers │ │ min/max │ │ orders │ │ │
//! │  │  └─────────┘ └─────────┘ └──────────┘ └─────────┘ └────────┘ │ │
//! │  │                                                               │ │
//! │  │  NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │ │
//! │  └──────────────────────────────┬────────────────────────────────┘ │
//! │                                 │                                   │
//! │  ┌──────────────────────────────▼────────────────────────────────┐ │
//! │  │            storefront-db (persistence + commit)               │ │
//! │  │   draft persistence, stock reservation, checkout orchestrator │ │
//! │  └───────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Order, ProductClass, Shipping, Cart, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`config`] - Explicit checkout configuration (no ambient state)
//! - [`catalog`] - Master-data collaborator trait + static implementation
//! - [`shipment`] - Shipment splitter (carrier per product type)
//! - [`pricing`] - Subtotal, tax, delivery fees, free-shipping overrides
//! - [`payment`] - Payment eligibility filter
//! - [`assemble`] - Order assembler (cart + customer → draft aggregate)
//! - [`error`] - Checkout error taxonomy
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same cart + catalog + config = same draft order
//! 2. **No I/O**: stock is never touched here; only the commit phase in
//!    storefront-db reserves inventory, under a transaction
//! 3. **Integer Money**: all monetary values are i64 minor units
//! 4. **Snapshots over references**: orders copy product and customer data
//!    by value so later master-data edits never corrupt history

pub mod assemble;
pub mod catalog;
pub mod config;
pub mod error;
pub mod money;
pub mod payment;
pub mod pricing;
pub mod shipment;
pub mod types;

pub use config::CheckoutConfig;
pub use error::{CheckoutError, CheckoutResult};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single cart.
///
/// Prevents runaway carts and keeps draft assembly bounded.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity of a single line in the cart.
///
/// Guards against accidental over-ordering (typing 1000 instead of 10).
/// Per-product sale limits are checked separately at commit time.
pub const MAX_LINE_QUANTITY: i64 = 999;
