//! # Domain Types
//!
//! Core domain types used throughout Storefront checkout.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                │
//! │                                                                     │
//! │  ┌───────────────┐    ┌────────────────┐    ┌──────────────────┐   │
//! │  │ ProductClass  │    │     Order      │    │    Shipping      │   │
//! │  │ ────────────  │    │ ─────────────  │    │ ───────────────  │   │
//! │  │ id (UUID)     │    │ id (UUID)      │    │ id (UUID)        │   │
//! │  │ price         │    │ pre_order_token│    │ carrier snapshot │   │
//! │  │ product_type  │    │ status         │    │ destination      │   │
//! │  │ sale_limit    │    │ totals         │    │ fee              │   │
//! │  └───────┬───────┘    └───────┬────────┘    └────────┬─────────┘   │
//! │          │                    │                      │             │
//! │  ┌───────▼───────┐    ┌───────▼────────┐    ┌────────▼─────────┐   │
//! │  │  StockRecord  │    │  OrderDetail   │    │  ShipmentItem    │   │
//! │  │  stock ≥ 0    │    │  line snapshot │    │  one per detail  │   │
//! │  └───────────────┘    └────────────────┘    └──────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! Orders never reference live product or customer rows for display data:
//! name, code, price, tax rule and destination are copied by value when the
//! draft is assembled. Editing a product or a customer profile afterwards
//! must not retroactively alter past orders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::Money;
use crate::{MAX_CART_LINES, MAX_LINE_QUANTITY};

// =============================================================================
// Tax Rate & Tax Rule
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01% = 1/10000, so 1000 bps = 10%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

/// Rounding mode applied when a tax amount lands between minor units.
///
/// Captured from the tax rule at detail-creation time; historical orders
/// keep rounding the way they were originally calculated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum Rounding {
    /// Round half away from zero (the common retail default).
    #[default]
    HalfUp,
    /// Always round down.
    Floor,
    /// Always round up.
    Ceiling,
}

/// A resolved tax rule for one product class.
///
/// Supplied by the master-data collaborator at detail-creation time; the
/// pricing rules only apply it, they never reinterpret rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TaxRule {
    /// Master tax-rule id, kept on the order line for auditability.
    pub rule_id: i64,
    pub rate: TaxRate,
    pub rounding: Rounding,
}

// =============================================================================
// Product & ProductClass
// =============================================================================

/// Publish state of a product. Only visible products can be purchased.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum DisplayStatus {
    /// Publicly visible and purchasable.
    Visible,
    /// Hidden from the shop; commit attempts are rejected.
    Hidden,
}

/// A product as the customer sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,
    /// Display name, snapshotted onto order lines.
    pub name: String,
    /// Publish state, checked (fresh from storage) at commit time.
    pub status: DisplayStatus,
}

/// A purchasable SKU variant of a [`Product`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductClass {
    /// Unique identifier (UUID v4).
    pub id: String,
    /// Owning product.
    pub product_id: String,
    /// Business code (SKU), snapshotted onto order lines.
    pub code: String,
    /// Unit price in minor units.
    pub price: Money,
    /// Classification driving carrier eligibility.
    pub product_type_id: i64,
    /// Per-unit delivery fee, applied when the per-product fee option is on.
    pub delivery_fee: Money,
    /// Maximum purchasable quantity per order, if configured.
    pub sale_limit: Option<i64>,
    /// When true, no stock record is kept and quantity is never checked.
    pub stock_unlimited: bool,
}

/// Mutable counter of available units for a [`ProductClass`].
///
/// ## Invariant
/// `stock >= 0` whenever `stock_unlimited` is false. Concurrent decrements
/// must never drive it negative; the commit transaction in storefront-db
/// guarantees this with a pessimistic lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockRecord {
    pub product_class_id: String,
    pub stock: i64,
}

// =============================================================================
// Customer & Address
// =============================================================================

/// A shipping/billing destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub zip: String,
    /// Prefecture/region code, the key for delivery-fee lookup.
    pub prefecture_id: i64,
    pub prefecture: String,
    pub street: String,
}

/// A customer: registered account or ephemeral guest profile.
///
/// Guests have `id == None` and no purchase statistics; their contact
/// fields live only in session state for the duration of checkout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Customer {
    /// `None` for guests.
    pub id: Option<String>,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: Address,
    /// Set on the first successful commit, then never changed.
    pub first_purchase_at: Option<DateTime<Utc>>,
    pub last_purchase_at: Option<DateTime<Utc>>,
    pub purchase_count: i64,
    pub lifetime_spend: Money,
}

// =============================================================================
// Carrier & Payment
// =============================================================================

/// A delivery carrier, eligible for exactly one product type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Carrier {
    pub id: i64,
    pub name: String,
    pub product_type_id: i64,
}

/// A payment method with order-amount eligibility rules and a surcharge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: i64,
    pub name: String,
    /// Surcharge added to the order total when this method is selected.
    pub charge: Money,
    /// Minimum subtotal for eligibility (inclusive).
    pub rule_min: Money,
    /// Maximum subtotal for eligibility (inclusive); unset means no cap.
    pub rule_max: Option<Money>,
}

// =============================================================================
// Cart
// =============================================================================

/// One line of an in-progress cart.
///
/// Holds snapshots of the product and class so the cart displays consistent
/// data even if master data changes while the customer is browsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub product: Product,
    pub product_class: ProductClass,
    pub quantity: i64,
}

impl CartLine {
    /// Line total (unit price × quantity).
    pub fn line_total(&self) -> Money {
        self.product_class.price * self.quantity
    }
}

/// The shopping cart: transient, owned by the active checkout session,
/// cleared only after a successful commit.
///
/// ## Invariants
/// - Lines are unique by product-class id (adding merges quantities)
/// - Quantity per line is in `1..=MAX_LINE_QUANTITY`
/// - At most `MAX_CART_LINES` distinct lines
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    pub lines: Vec<CartLine>,
    /// Token correlating this session with its persisted draft order.
    pub pre_order_token: Option<String>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart::default()
    }

    /// Adds a product class to the cart or increases quantity if present.
    pub fn add_line(
        &mut self,
        product: &Product,
        product_class: &ProductClass,
        quantity: i64,
    ) -> Result<(), crate::CheckoutError> {
        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|l| l.product_class.id == product_class.id)
        {
            let new_qty = line.quantity + quantity;
            if new_qty > MAX_LINE_QUANTITY {
                return Err(crate::CheckoutError::QuantityTooLarge {
                    requested: new_qty,
                    max: MAX_LINE_QUANTITY,
                });
            }
            line.quantity = new_qty;
            return Ok(());
        }

        if self.lines.len() >= MAX_CART_LINES {
            return Err(crate::CheckoutError::CartTooLarge { max: MAX_CART_LINES });
        }
        if quantity <= 0 || quantity > MAX_LINE_QUANTITY {
            return Err(crate::CheckoutError::QuantityTooLarge {
                requested: quantity,
                max: MAX_LINE_QUANTITY,
            });
        }

        self.lines.push(CartLine {
            product: product.clone(),
            product_class: product_class.clone(),
            quantity,
        });
        Ok(())
    }

    /// Distinct product-type ids present, in first-seen order.
    pub fn product_type_ids(&self) -> Vec<i64> {
        let mut ids = Vec::new();
        for line in &self.lines {
            let id = line.product_class.product_type_id;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    /// Total quantity across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Clears all lines and drops the draft correlation token.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.pre_order_token = None;
    }
}

// =============================================================================
// Order Aggregate
// =============================================================================

/// The status of an order.
///
/// `Draft → Confirmed` (terminal, success) or `Draft → Rejected` (terminal,
/// failure) are the only transitions in this core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created by the assembler; address/carrier/payment edits re-trigger
    /// pricing.
    #[default]
    Draft,
    /// Stock reserved, cart cleared. Terminal.
    Confirmed,
    /// Commit rejected under a hard-fail policy. Terminal.
    Rejected,
}

/// One order line — a frozen snapshot of the purchased product class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetail {
    /// Unique identifier (UUID v4).
    pub id: String,
    /// Product reference for commit-time publish/stock checks.
    pub product_id: String,
    pub product_class_id: String,
    /// Name at order time (frozen).
    pub product_name: String,
    /// SKU code at order time (frozen).
    pub product_code: String,
    /// Unit price at order time (frozen).
    pub price: Money,
    pub quantity: i64,
    /// Tax rule captured at detail creation; never reinterpreted.
    pub tax_rule_id: i64,
    pub tax_rate: TaxRate,
    pub tax_rounding: Rounding,
    /// Product type, used to route this line to a shipment group.
    pub product_type_id: i64,
    /// Per-unit delivery fee at order time (frozen), applied when the
    /// per-product fee option is on.
    pub unit_delivery_fee: Money,
}

impl OrderDetail {
    /// Line total (unit price × quantity).
    pub fn line_total(&self) -> Money {
        self.price * self.quantity
    }

    /// Tax on this line under its captured rule.
    pub fn tax_amount(&self) -> Money {
        self.line_total().tax(self.tax_rate, self.tax_rounding)
    }
}

/// One product routed to a shipment group. Exactly one per [`OrderDetail`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentItem {
    /// Unique identifier (UUID v4).
    pub id: String,
    /// The order line this item ships.
    pub order_detail_id: String,
    pub product_name: String,
    pub product_code: String,
    pub price: Money,
    pub quantity: i64,
}

/// A shipment group: one destination + carrier pairing with its own
/// delivery fee and item subset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shipping {
    /// Unique identifier (UUID v4).
    pub id: String,
    /// Carrier selected for this group.
    pub carrier_id: i64,
    /// Carrier name at order time (frozen).
    pub carrier_name: String,
    /// Product type this group carries; every item must match.
    pub product_type_id: i64,
    /// Recipient name, copied from the customer by value.
    pub name: String,
    /// Destination, copied from the customer by value and editable per
    /// group afterwards.
    pub address: Address,
    /// Group delivery fee (base carrier fee + per-product fees), zeroed by
    /// a free-shipping override.
    pub fee: Money,
    pub items: Vec<ShipmentItem>,
}

/// The order aggregate under construction.
///
/// Built in memory by the assembler, persisted as a draft, and promoted to
/// `Confirmed` by the checkout orchestrator. Identity fields are copied
/// from the customer at creation time — by value, not by reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Unique identifier (UUID v4).
    pub id: String,
    /// Opaque random token correlating the draft with the active session.
    pub pre_order_token: String,
    /// `None` for guest checkouts.
    pub customer_id: Option<String>,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: Address,
    pub status: OrderStatus,
    pub details: Vec<OrderDetail>,
    pub shippings: Vec<Shipping>,
    /// Σ(price × quantity) over details.
    pub subtotal: Money,
    /// Σ per-line tax under each line's captured rule.
    pub tax: Money,
    /// Σ group fees, after any free-shipping override.
    pub delivery_fee_total: Money,
    /// Selected payment method's surcharge; zero when none selected.
    pub charge: Money,
    /// subtotal + charge + delivery_fee_total.
    pub total: Money,
    /// Currently always equal to `total`; kept distinct for future
    /// partial-payment support.
    pub payment_total: Money,
    /// Selected payment method, if any is eligible.
    pub payment_id: Option<i64>,
    /// Payment method name at selection time (frozen).
    pub payment_method: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Creates an empty draft shell with zeroed totals.
    pub fn new(pre_order_token: String) -> Self {
        let now = Utc::now();
        Order {
            id: Uuid::new_v4().to_string(),
            pre_order_token,
            customer_id: None,
            name: String::new(),
            email: String::new(),
            phone: String::new(),
            address: Address::default(),
            status: OrderStatus::Draft,
            details: Vec::new(),
            shippings: Vec::new(),
            subtotal: Money::zero(),
            tax: Money::zero(),
            delivery_fee_total: Money::zero(),
            charge: Money::zero(),
            total: Money::zero(),
            payment_total: Money::zero(),
            payment_id: None,
            payment_method: None,
            created_at: now,
            updated_at: now,
            confirmed_at: None,
        }
    }

    /// Copies customer identity fields by value. Guests not yet identified
    /// leave the fields blank for later population.
    pub fn copy_from_customer(&mut self, customer: Option<&Customer>) {
        let Some(customer) = customer else {
            return;
        };
        self.customer_id = customer.id.clone();
        self.name = customer.name.clone();
        self.email = customer.email.clone();
        self.phone = customer.phone.clone();
        self.address = customer.address.clone();
    }

    /// Total quantity across all order lines.
    pub fn total_quantity(&self) -> i64 {
        self.details.iter().map(|d| d.quantity).sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Product {id}"),
            status: DisplayStatus::Visible,
        }
    }

    fn product_class(id: &str, product_id: &str, price: i64, product_type_id: i64) -> ProductClass {
        ProductClass {
            id: id.to_string(),
            product_id: product_id.to_string(),
            code: format!("SKU-{id}"),
            price: Money::from_minor(price),
            product_type_id,
            delivery_fee: Money::zero(),
            sale_limit: None,
            stock_unlimited: false,
        }
    }

    #[test]
    fn test_cart_add_line_merges_quantities() {
        let mut cart = Cart::new();
        let p = product("1");
        let pc = product_class("1", "1", 1000, 1);

        cart.add_line(&p, &pc, 2).unwrap();
        cart.add_line(&p, &pc, 3).unwrap();

        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.total_quantity(), 5);
    }

    #[test]
    fn test_cart_quantity_cap() {
        let mut cart = Cart::new();
        let p = product("1");
        let pc = product_class("1", "1", 1000, 1);

        assert!(cart.add_line(&p, &pc, MAX_LINE_QUANTITY + 1).is_err());
        cart.add_line(&p, &pc, MAX_LINE_QUANTITY).unwrap();
        assert!(cart.add_line(&p, &pc, 1).is_err());
    }

    #[test]
    fn test_cart_product_type_ids_first_seen_order() {
        let mut cart = Cart::new();
        cart.add_line(&product("1"), &product_class("1", "1", 100, 2), 1)
            .unwrap();
        cart.add_line(&product("2"), &product_class("2", "2", 100, 1), 1)
            .unwrap();
        cart.add_line(&product("3"), &product_class("3", "3", 100, 2), 1)
            .unwrap();

        assert_eq!(cart.product_type_ids(), vec![2, 1]);
    }

    #[test]
    fn test_detail_line_total_and_tax() {
        let detail = OrderDetail {
            id: "d1".to_string(),
            product_id: "1".to_string(),
            product_class_id: "1".to_string(),
            product_name: "Tea".to_string(),
            product_code: "TEA-01".to_string(),
            price: Money::from_minor(1000),
            quantity: 2,
            tax_rule_id: 1,
            tax_rate: TaxRate::from_bps(1000),
            tax_rounding: Rounding::HalfUp,
            product_type_id: 1,
            unit_delivery_fee: Money::zero(),
        };

        assert_eq!(detail.line_total().minor(), 2000);
        assert_eq!(detail.tax_amount().minor(), 200);
    }

    #[test]
    fn test_copy_from_customer_by_value() {
        let customer = Customer {
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
        };

        let mut order = Order::new("token".to_string());
        order.copy_from_customer(Some(&customer));

        assert_eq!(order.customer_id.as_deref(), Some("c1"));
        assert_eq!(order.name, "Aoi Sato");
        assert_eq!(order.address.prefecture_id, 13);
    }

    #[test]
    fn test_copy_from_customer_guest_leaves_blanks() {
        let mut order = Order::new("token".to_string());
        order.copy_from_customer(None);

        assert!(order.customer_id.is_none());
        assert!(order.name.is_empty());
    }

    #[test]
    fn test_order_status_default() {
        assert_eq!(OrderStatus::default(), OrderStatus::Draft);
    }
}
