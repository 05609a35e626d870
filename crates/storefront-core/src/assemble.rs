//! # Order Assembler
//!
//! Builds a complete draft [`Order`] aggregate from a cart and a customer
//! (or guest) profile. The result is a plain value — nothing is persisted
//! and no inventory is touched here; storefront-db persists the draft
//! atomically and reserves stock only at commit.
//!
//! ## Assembly Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  1. fresh pre-order token (crypto-random, 244 bits)                 │
//! │  2. order shell, customer fields copied by value                    │
//! │  3. shipment split → one Shipping per group, fee lookup snapshot    │
//! │  4. one OrderDetail per cart line (product snapshot + tax rule)     │
//! │     + one ShipmentItem routed to the matching group                 │
//! │     + per-product delivery fees accumulated when enabled            │
//! │  5. pricing rules → subtotal, tax, fees, free-shipping, payment     │
//! │     pre-selection (first eligible), totals                          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use tracing::debug;
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::config::CheckoutConfig;
use crate::error::{CheckoutError, CheckoutResult};
use crate::money::Money;
use crate::payment::eligible_payments;
use crate::pricing;
use crate::shipment::split_shipments;
use crate::types::{Cart, Order, OrderDetail, Customer, ShipmentItem, Shipping};

/// Generates a new unpredictable pre-order token.
///
/// Two v4 UUIDs in simple hex form: 244 random bits, comfortably above the
/// 128-bit floor. Collisions are still treated as fatal by the draft
/// persistence layer and retried with a fresh token.
pub fn new_pre_order_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// Assembles draft orders from carts.
///
/// An explicit builder over immutable-until-committed values: the returned
/// [`Order`] is complete and priced, and persistence is a separate step.
#[derive(Debug)]
pub struct OrderAssembler<'a, C: Catalog> {
    catalog: &'a C,
    config: &'a CheckoutConfig,
}

impl<'a, C: Catalog> OrderAssembler<'a, C> {
    pub fn new(catalog: &'a C, config: &'a CheckoutConfig) -> Self {
        OrderAssembler { catalog, config }
    }

    /// Builds a complete draft order from the cart.
    ///
    /// `customer` is `None` for guests not yet identified; their identity
    /// fields stay blank for later population.
    pub fn assemble(&self, cart: &Cart, customer: Option<&Customer>) -> CheckoutResult<Order> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let mut order = Order::new(new_pre_order_token());
        order.copy_from_customer(customer);

        // Shipment groups, with the carrier and fee snapshotted per group.
        let groups = split_shipments(&cart.lines, self.config.multi_shipment, self.catalog)?;
        for group in groups {
            let fee = self
                .catalog
                .delivery_fee(group.carrier.id, order.address.prefecture_id)
                .unwrap_or_else(Money::zero);
            order.shippings.push(Shipping {
                id: Uuid::new_v4().to_string(),
                carrier_id: group.carrier.id,
                carrier_name: group.carrier.name.clone(),
                product_type_id: group.carrier.product_type_id,
                name: order.name.clone(),
                address: order.address.clone(),
                fee,
                items: Vec::new(),
            });
        }

        // One detail per line, routed to the group carrying its type.
        for line in &cart.lines {
            let tax_rule = self.catalog.tax_rule(&line.product_class);
            let detail = OrderDetail {
                id: Uuid::new_v4().to_string(),
                product_id: line.product.id.clone(),
                product_class_id: line.product_class.id.clone(),
                product_name: line.product.name.clone(),
                product_code: line.product_class.code.clone(),
                price: line.product_class.price,
                quantity: line.quantity,
                tax_rule_id: tax_rule.rule_id,
                tax_rate: tax_rule.rate,
                tax_rounding: tax_rule.rounding,
                product_type_id: line.product_class.product_type_id,
                unit_delivery_fee: line.product_class.delivery_fee,
            };

            let group_idx = self.route_to_group(&order.shippings, detail.product_type_id);
            let shipping = &mut order.shippings[group_idx];
            shipping.items.push(ShipmentItem {
                id: Uuid::new_v4().to_string(),
                order_detail_id: detail.id.clone(),
                product_name: detail.product_name.clone(),
                product_code: detail.product_code.clone(),
                price: detail.price,
                quantity: detail.quantity,
            });
            if self.config.per_product_delivery_fee {
                shipping.fee += detail.unit_delivery_fee * detail.quantity;
            }

            order.details.push(detail);
        }

        // Pricing: subtotal and tax first, then the initial payment pick
        // (charge feeds the total), then fees/overrides/total.
        order.subtotal = pricing::subtotal(&order.details);
        order.tax = pricing::total_tax(&order.details);

        let carrier_ids: Vec<i64> = order.shippings.iter().map(|s| s.carrier_id).collect();
        let payments = eligible_payments(
            &self.catalog.payment_candidates(&carrier_ids),
            order.subtotal,
        );
        if let Some(payment) = payments.first() {
            order.payment_id = Some(payment.id);
            order.payment_method = Some(payment.name.clone());
            order.charge = payment.charge;
        } else {
            order.charge = Money::zero();
        }

        pricing::apply_totals(&mut order, self.config);

        debug!(
            order_id = %order.id,
            details = order.details.len(),
            shipments = order.shippings.len(),
            total = %order.total,
            "draft order assembled"
        );
        Ok(order)
    }

    /// Index of the shipment group carrying the given product type.
    ///
    /// A single group carries everything; with multiple groups the split
    /// has already guaranteed a matching group exists.
    fn route_to_group(&self, shippings: &[Shipping], product_type_id: i64) -> usize {
        if shippings.len() == 1 {
            return 0;
        }
        shippings
            .iter()
            .position(|s| s.product_type_id == product_type_id)
            .unwrap_or(0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;
    use crate::types::{
        Address, Carrier, DisplayStatus, PaymentMethod, Product, ProductClass, Rounding, TaxRate,
        TaxRule,
    };

    fn cart_line(cart: &mut Cart, class_id: &str, price: i64, product_type_id: i64, qty: i64) {
        let product = Product {
            id: format!("p-{class_id}"),
            name: format!("Product {class_id}"),
            status: DisplayStatus::Visible,
        };
        let class = ProductClass {
            id: class_id.to_string(),
            product_id: product.id.clone(),
            code: format!("SKU-{class_id}"),
            price: Money::from_minor(price),
            product_type_id,
            delivery_fee: Money::from_minor(100),
            sale_limit: None,
            stock_unlimited: false,
        };
        cart.add_line(&product, &class, qty).unwrap();
    }

    fn customer() -> Customer {
        Customer {
            id: Some("c1".to_string()),
            name: "Aoi Sato".to_string(),
            email: "aoi@example.com".to_string(),
            phone: "03-0000-0000".to_string(),
            address: Address {
                zip: "100-0001".to_string(),
                prefecture_id: 13,
                prefecture: "Tokyo".to_string(),
                street: "1-1 Chiyoda".to_string(),
            },
            ..Customer::default()
        }
    }

    fn ten_percent_catalog() -> StaticCatalog {
        StaticCatalog::new()
            .with_carrier(Carrier {
                id: 1,
                name: "Standard".to_string(),
                product_type_id: 1,
            })
            .with_fee(1, 13, Money::from_minor(500))
            .with_default_tax_rule(TaxRule {
                rule_id: 1,
                rate: TaxRate::from_bps(1000),
                rounding: Rounding::HalfUp,
            })
    }

    #[test]
    fn test_token_is_long_and_unique() {
        let a = new_pre_order_token();
        let b = new_pre_order_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }

    #[test]
    fn test_reference_scenario() {
        // cart = [{qty 2, price 1000}], 10% tax, fee 500, no thresholds
        let catalog = ten_percent_catalog().with_payment(PaymentMethod {
            id: 1,
            name: "Bank transfer".to_string(),
            charge: Money::zero(),
            rule_min: Money::zero(),
            rule_max: None,
        });
        let config = CheckoutConfig::new();
        let mut cart = Cart::new();
        cart_line(&mut cart, "1", 1000, 1, 2);

        let order = OrderAssembler::new(&catalog, &config)
            .assemble(&cart, Some(&customer()))
            .unwrap();

        assert_eq!(order.subtotal.minor(), 2000);
        assert_eq!(order.tax.minor(), 200);
        assert_eq!(order.delivery_fee_total.minor(), 500);
        assert_eq!(order.charge.minor(), 0);
        assert_eq!(order.total.minor(), 2500);
        assert_eq!(order.payment_total.minor(), 2500);
        assert_eq!(order.payment_id, Some(1));
    }

    #[test]
    fn test_reference_scenario_with_amount_threshold() {
        let catalog = ten_percent_catalog();
        let config = CheckoutConfig::new().free_shipping_amount(Money::from_minor(1500));
        let mut cart = Cart::new();
        cart_line(&mut cart, "1", 1000, 1, 2);

        let order = OrderAssembler::new(&catalog, &config)
            .assemble(&cart, Some(&customer()))
            .unwrap();

        assert_eq!(order.delivery_fee_total.minor(), 0);
        assert_eq!(order.total.minor(), 2000);
    }

    #[test]
    fn test_every_detail_has_exactly_one_shipment_item() {
        let catalog = ten_percent_catalog().with_carrier(Carrier {
            id: 2,
            name: "Chilled".to_string(),
            product_type_id: 2,
        });
        let config = CheckoutConfig::new().multi_shipment(true);
        let mut cart = Cart::new();
        cart_line(&mut cart, "1", 1000, 1, 2);
        cart_line(&mut cart, "2", 800, 2, 1);
        cart_line(&mut cart, "3", 200, 1, 3);

        let order = OrderAssembler::new(&catalog, &config)
            .assemble(&cart, Some(&customer()))
            .unwrap();

        assert_eq!(order.shippings.len(), 2);
        for detail in &order.details {
            let referencing: Vec<&ShipmentItem> = order
                .shippings
                .iter()
                .flat_map(|s| &s.items)
                .filter(|i| i.order_detail_id == detail.id)
                .collect();
            assert_eq!(referencing.len(), 1, "detail {} items", detail.id);
        }
        // Items only land in the group whose type matches.
        for shipping in &order.shippings {
            for item in &shipping.items {
                let detail = order
                    .details
                    .iter()
                    .find(|d| d.id == item.order_detail_id)
                    .unwrap();
                assert_eq!(detail.product_type_id, shipping.product_type_id);
            }
        }
    }

    #[test]
    fn test_per_product_delivery_fee_accumulates() {
        let catalog = ten_percent_catalog();
        let config = CheckoutConfig::new().per_product_delivery_fee(true);
        let mut cart = Cart::new();
        cart_line(&mut cart, "1", 1000, 1, 2); // unit fee 100 × 2

        let order = OrderAssembler::new(&catalog, &config)
            .assemble(&cart, Some(&customer()))
            .unwrap();

        // base 500 + 100 × 2
        assert_eq!(order.delivery_fee_total.minor(), 700);
    }

    #[test]
    fn test_no_eligible_payment_leaves_charge_zero() {
        let catalog = ten_percent_catalog().with_payment(PaymentMethod {
            id: 9,
            name: "High roller".to_string(),
            charge: Money::from_minor(300),
            rule_min: Money::from_minor(100_000),
            rule_max: None,
        });
        let config = CheckoutConfig::new();
        let mut cart = Cart::new();
        cart_line(&mut cart, "1", 1000, 1, 2);

        let order = OrderAssembler::new(&catalog, &config)
            .assemble(&cart, Some(&customer()))
            .unwrap();

        assert!(order.payment_id.is_none());
        assert!(order.payment_method.is_none());
        assert_eq!(order.charge.minor(), 0);
    }

    #[test]
    fn test_payment_surcharge_feeds_total() {
        let catalog = ten_percent_catalog().with_payment(PaymentMethod {
            id: 2,
            name: "Cash on delivery".to_string(),
            charge: Money::from_minor(330),
            rule_min: Money::zero(),
            rule_max: None,
        });
        let config = CheckoutConfig::new();
        let mut cart = Cart::new();
        cart_line(&mut cart, "1", 1000, 1, 2);

        let order = OrderAssembler::new(&catalog, &config)
            .assemble(&cart, Some(&customer()))
            .unwrap();

        assert_eq!(order.charge.minor(), 330);
        assert_eq!(order.total.minor(), 2000 + 330 + 500);
    }

    #[test]
    fn test_guest_assembly_leaves_identity_blank() {
        let catalog = ten_percent_catalog();
        let config = CheckoutConfig::new();
        let mut cart = Cart::new();
        cart_line(&mut cart, "1", 1000, 1, 1);

        let order = OrderAssembler::new(&catalog, &config)
            .assemble(&cart, None)
            .unwrap();

        assert!(order.customer_id.is_none());
        assert!(order.name.is_empty());
        // Unknown destination: no fee row matches, fee defaults to zero
        // until the address is populated and totals recompute.
        assert_eq!(order.shippings[0].fee.minor(), 0);
    }

    #[test]
    fn test_empty_cart_rejected() {
        let catalog = ten_percent_catalog();
        let config = CheckoutConfig::new();
        let err = OrderAssembler::new(&catalog, &config)
            .assemble(&Cart::new(), None)
            .unwrap_err();
        assert_eq!(err, CheckoutError::EmptyCart);
    }
}
