//! # Payment Eligibility Filter
//!
//! Filters payment-method candidates by their minimum/maximum order-amount
//! rules. A candidate is eligible iff `subtotal ≥ rule_min` and
//! (`rule_max` unset or `subtotal ≤ rule_max`) — both boundaries inclusive.
//! Input order is preserved; `None` entries (dangling master rows) are
//! skipped, not errors.

use crate::money::Money;
use crate::types::PaymentMethod;

/// Returns the eligible payment methods for the given subtotal, in the
/// candidates' original order.
pub fn eligible_payments(
    candidates: &[Option<PaymentMethod>],
    subtotal: Money,
) -> Vec<PaymentMethod> {
    candidates
        .iter()
        .flatten()
        .filter(|p| subtotal >= p.rule_min && p.rule_max.map_or(true, |max| subtotal <= max))
        .cloned()
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
