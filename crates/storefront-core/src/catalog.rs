//! # Master-Data Catalog
//!
//! The collaborator trait through which checkout resolves master data:
//! eligible carriers, delivery-fee tables, tax rules and allowed payment
//! methods. The core never owns this data — it is maintained elsewhere —
//! so the seam is a trait, and pricing/assembly stay deterministic under
//! test by injecting a [`StaticCatalog`].

use std::collections::HashMap;

use crate::money::Money;
use crate::types::{Carrier, PaymentMethod, ProductClass, TaxRule};

/// Master-data lookups consumed by the checkout core.
///
/// Implementations must be cheap to call repeatedly: pricing re-runs on
/// every address/carrier/payment edit.
pub trait Catalog {
    /// Carriers able to ship at least one of the given product types, in
    /// the master table's order. The splitter picks the first match per
    /// product type.
    fn eligible_carriers(&self, product_type_ids: &[i64]) -> Vec<Carrier>;

    /// Delivery fee for one carrier shipping to one prefecture, if a fee
    /// row is configured.
    fn delivery_fee(&self, carrier_id: i64, prefecture_id: i64) -> Option<Money>;

    /// The tax rule applicable to a product class. Resolution happens once
    /// at detail creation; the result is frozen onto the order line.
    fn tax_rule(&self, product_class: &ProductClass) -> TaxRule;

    /// Payment-method candidates usable with every one of the given
    /// carriers, in display order. Entries may be `None` for dangling
    /// master rows; the eligibility filter skips them.
    fn payment_candidates(&self, carrier_ids: &[i64]) -> Vec<Option<PaymentMethod>>;
}

/// In-memory catalog backed by plain vectors and maps.
///
/// Serves tests and small single-shop deployments; larger installations
/// would implement [`Catalog`] over their master-data store.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    carriers: Vec<Carrier>,
    /// (carrier_id, prefecture_id) → fee
    fees: HashMap<(i64, i64), Money>,
    /// Fallback fee per carrier when no prefecture row matches.
    default_fees: HashMap<i64, Money>,
    payments: Vec<Option<PaymentMethod>>,
    /// product_class_id → rule; falls back to `default_tax_rule`.
    tax_rules: HashMap<String, TaxRule>,
    default_tax_rule: TaxRule,
}

impl StaticCatalog {
    pub fn new() -> Self {
        StaticCatalog {
            default_tax_rule: TaxRule {
                rule_id: 0,
                rate: crate::types::TaxRate::zero(),
                rounding: crate::types::Rounding::HalfUp,
            },
            ..StaticCatalog::default()
        }
    }

    pub fn with_carrier(mut self, carrier: Carrier) -> Self {
        self.carriers.push(carrier);
        self
    }

    /// Registers a fee for a specific (carrier, prefecture) pair.
    pub fn with_fee(mut self, carrier_id: i64, prefecture_id: i64, fee: Money) -> Self {
        self.fees.insert((carrier_id, prefecture_id), fee);
        self
    }

    /// Registers a carrier-wide fallback fee for any prefecture.
    pub fn with_default_fee(mut self, carrier_id: i64, fee: Money) -> Self {
        self.default_fees.insert(carrier_id, fee);
        self
    }

    pub fn with_payment(mut self, payment: PaymentMethod) -> Self {
        self.payments.push(Some(payment));
        self
    }

    /// Registers a dangling candidate slot, as a deleted master row would
    /// leave behind.
    pub fn with_missing_payment(mut self) -> Self {
        self.payments.push(None);
        self
    }

    pub fn with_tax_rule(mut self, product_class_id: &str, rule: TaxRule) -> Self {
        self.tax_rules.insert(product_class_id.to_string(), rule);
        self
    }

    pub fn with_default_tax_rule(mut self, rule: TaxRule) -> Self {
        self.default_tax_rule = rule;
        self
    }
}

impl Catalog for StaticCatalog {
    fn eligible_carriers(&self, product_type_ids: &[i64]) -> Vec<Carrier> {
        self.carriers
            .iter()
            .filter(|c| product_type_ids.contains(&c.product_type_id))
            .cloned()
            .collect()
    }

    fn delivery_fee(&self, carrier_id: i64, prefecture_id: i64) -> Option<Money> {
        self.fees
            .get(&(carrier_id, prefecture_id))
            .or_else(|| self.default_fees.get(&carrier_id))
            .copied()
    }

    fn tax_rule(&self, product_class: &ProductClass) -> TaxRule {
        self.tax_rules
            .get(&product_class.id)
            .copied()
            .unwrap_or(self.default_tax_rule)
    }

    fn payment_candidates(&self, carrier_ids: &[i64]) -> Vec<Option<PaymentMethod>> {
        if carrier_ids.is_empty() {
            return Vec::new();
        }
        self.payments.clone()
    }
}
