//! # Error Types
//!
//! Domain-specific error taxonomy for the checkout core.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                 │
//! │                                                                     │
//! │  storefront-core errors (this file)                                 │
//! │  └── CheckoutError   - assembly and commit rejections               │
//! │                                                                     │
//! │  storefront-db errors (separate crate)                              │
//! │  └── StoreError      - storage failures; carries CheckoutError      │
//! │                        through commit verbatim                      │
//! │                                                                     │
//! │  Assembly-time errors abort before any persistence.                 │
//! │  Commit-time errors abort the whole transaction: no partial stock   │
//! │  decrement, no partial customer-stats update.                       │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Carry enough structured detail (offending product code, limit
//!    values) to render a user-facing message — never swallow silently
//! 3. Errors are enum variants, never strings

use thiserror::Error;

/// Checkout rejections and rule violations.
///
/// `LockTimeout` is transient and safe to retry by re-invoking commit; all
/// other commit rejections require the caller to alter the cart or
/// quantities before retrying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    /// Assembly was requested for a cart with no lines.
    #[error("cart is empty")]
    EmptyCart,

    /// No carrier supports a required product-type combination.
    ///
    /// Raised by the shipment splitter before anything is persisted.
    #[error("no carrier available for product types {product_type_ids:?}")]
    NoCarrierAvailable { product_type_ids: Vec<i64> },

    /// A freshly generated pre-order token already correlates another
    /// draft. Retried with a new token, never silently overwritten.
    #[error("pre-order token collision: {token}")]
    PreOrderTokenCollision { token: String },

    /// The underlying product is no longer publicly visible.
    #[error("product {product_code} ({product_name}) is not published")]
    ProductUnpublished {
        product_code: String,
        product_name: String,
    },

    /// Ordered quantity exceeds the product class's per-order sale limit.
    #[error("sale limit exceeded for {product_code}: limit {limit}, requested {requested}")]
    SaleLimitExceeded {
        product_code: String,
        limit: i64,
        requested: i64,
    },

    /// Not enough stock at commit time.
    #[error("insufficient stock for {product_code}: available {available}, requested {requested}")]
    InsufficientStock {
        product_code: String,
        available: i64,
        requested: i64,
    },

    /// The stock lock could not be acquired within the transaction's
    /// timeout. Contention is treated as unavailability, never retried
    /// silently inside the guard.
    #[error("timed out waiting for the stock lock")]
    LockTimeout,

    /// Cart has exceeded the maximum number of distinct lines.
    #[error("cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// Line quantity exceeds the maximum allowed.
    #[error("quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },
}

impl CheckoutError {
    /// True for rejections the caller may retry without changing the cart.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CheckoutError::LockTimeout | CheckoutError::PreOrderTokenCollision { .. }
        )
    }
}

/// Convenience type alias for Results with CheckoutError.
pub type CheckoutResult<T> = Result<T, CheckoutError>;

// =============================================================================
// Unit Tests
// =============================================================================
