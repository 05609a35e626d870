//! # Pricing Rules
//!
//! Pure functions computing order totals: subtotal, tax, delivery fees,
//! free-shipping overrides and the grand total. No external state.
//!
//! ## Rule Ordering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  subtotal = Σ(price × quantity)                                     │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  delivery_fee_total = Σ(group fees)                                 │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  free-shipping overrides (amount OR quantity threshold met          │
//! │  → zero every group fee and the fee total; idempotent, both         │
//! │  conditions only ever zero the same field)                          │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  total = subtotal + charge + delivery_fee_total                     │
//! │  payment_total = total                                              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `apply_totals` re-runs safely any number of times from the current
//! order state; every address/carrier/payment edit re-invokes it.

use crate::config::CheckoutConfig;
use crate::money::Money;
use crate::types::{Order, OrderDetail, Shipping};

/// Subtotal over order lines: Σ(price × quantity).
pub fn subtotal(details: &[OrderDetail]) -> Money {
    details.iter().map(|d| d.line_total()).sum()
}

/// Total tax over order lines, each computed under its captured tax rule.
/// This only sums; rates are never reinterpreted here.
pub fn total_tax(details: &[OrderDetail]) -> Money {
    details.iter().map(|d| d.tax_amount()).sum()
}

/// Sum of shipment-group delivery fees, before any free-shipping override.
pub fn delivery_fee_total(shippings: &[Shipping]) -> Money {
    shippings.iter().map(|s| s.fee).sum()
}

/// Zeroes all delivery fees if the configured amount threshold is met
/// (boundary inclusive: subtotal equal to the threshold qualifies).
fn apply_free_shipping_by_amount(order: &mut Order, config: &CheckoutConfig) {
    if let Some(threshold) = config.free_shipping_amount {
        if order.subtotal >= threshold {
            zero_delivery_fees(order);
        }
    }
}

/// Zeroes all delivery fees if the configured quantity threshold is met
/// (boundary inclusive).
fn apply_free_shipping_by_quantity(order: &mut Order, config: &CheckoutConfig) {
    if let Some(threshold) = config.free_shipping_quantity {
        if order.total_quantity() >= threshold {
            zero_delivery_fees(order);
        }
    }
}

fn zero_delivery_fees(order: &mut Order) {
    order.delivery_fee_total = Money::zero();
    for shipping in &mut order.shippings {
        shipping.fee = Money::zero();
    }
}

/// Recomputes the fee total, free-shipping overrides and grand total from
/// the order's current lines, groups and selected payment.
///
/// Subtotal and tax are not re-derived here; they change only when lines
/// change, and the assembler sets them. Safe to re-run any number of
/// times with no intervening state change.
pub fn apply_totals(order: &mut Order, config: &CheckoutConfig) {
    order.delivery_fee_total = delivery_fee_total(&order.shippings);

    // Either threshold zeroes the same field; applying both is idempotent
    // and evaluation order does not matter.
    apply_free_shipping_by_amount(order, config);
    apply_free_shipping_by_quantity(order, config);

    let total = order.subtotal + order.charge + order.delivery_fee_total;
    order.total = total;
    order.payment_total = total;
}

// =============================================================================
// Unit Tests
// =============================================================================
