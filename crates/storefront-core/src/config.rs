//! # Checkout Configuration
//!
//! Shop-wide options that drive pricing and shipment splitting.
//!
//! These were ambient "base info" state in older shop systems; here they
//! are an explicit value passed into the pricing rules and the shipment
//! splitter, which keeps both deterministic under test.

use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Shop-wide checkout options.
///
/// ## Example
/// ```rust
/// use storefront_core::{CheckoutConfig, Money};
///
/// let config = CheckoutConfig::new()
///     .multi_shipment(true)
///     .free_shipping_amount(Money::from_minor(5000));
/// assert!(config.multi_shipment);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutConfig {
    /// When true, carts mixing product types split into one shipment group
    /// per product type. When false, the whole cart ships as one group.
    pub multi_shipment: bool,

    /// When true, each product class's per-unit delivery fee is added to
    /// its group's fee (`unit_delivery_fee × quantity`).
    pub per_product_delivery_fee: bool,

    /// Zero all delivery fees once the subtotal reaches this amount
    /// (boundary inclusive). Unset disables the rule.
    pub free_shipping_amount: Option<Money>,

    /// Zero all delivery fees once the total quantity reaches this count
    /// (boundary inclusive). Unset disables the rule.
    pub free_shipping_quantity: Option<i64>,
}

impl CheckoutConfig {
    /// Creates a configuration with every option off.
    pub fn new() -> Self {
        CheckoutConfig::default()
    }

    /// Enables or disables multi-shipment splitting.
    pub fn multi_shipment(mut self, enabled: bool) -> Self {
        self.multi_shipment = enabled;
        self
    }

    /// Enables or disables per-product delivery fees.
    pub fn per_product_delivery_fee(mut self, enabled: bool) -> Self {
        self.per_product_delivery_fee = enabled;
        self
    }

    /// Sets the free-shipping amount threshold.
    pub fn free_shipping_amount(mut self, amount: Money) -> Self {
        self.free_shipping_amount = Some(amount);
        self
    }

    /// Sets the free-shipping quantity threshold.
    pub fn free_shipping_quantity(mut self, quantity: i64) -> Self {
        self.free_shipping_quantity = Some(quantity);
        self
    }
}
