//! # Checkout Service
//!
//! Orchestrates the checkout flow over the pure storefront-core logic
//! and the repositories.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Checkout Flow                                      │
//! │                                                                         │
//! │  1. ASSEMBLE                                                           │
//! │     └── assemble_order(cart, customer)                                 │
//! │         → OrderAssembler builds the priced draft                       │
//! │         → insert_draft persists it                                     │
//! │         → token stored on the cart (retried on collision)              │
//! │                                                                         │
//! │  2. EDIT (repeatable, in any order)                                    │
//! │     └── update_shipping() → new destination/carrier, then reprice      │
//! │     └── select_payment()  → eligible method, surcharge into total      │
//! │     └── recompute_totals() → fees + totals from current state          │
//! │                                                                         │
//! │  3. COMMIT                                                             │
//! │     └── commit(cart, order_id, policy)                                 │
//! │         → inventory-guarded transaction (commit module)                │
//! │         → success: cart cleared, order confirmed                       │
//! │         → lock timeout: draft kept, shopper retries                    │
//! │         → other rejection: policy decides draft's fate                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tracing::{info, warn};

use crate::commit;
use crate::error::{StoreError, StoreResult};
use crate::pool::Database;
use storefront_core::assemble::OrderAssembler;
use storefront_core::catalog::Catalog;
use storefront_core::payment::eligible_payments;
use storefront_core::pricing;
use storefront_core::{
    Address, Cart, CheckoutConfig, CheckoutError, Customer, Money, Order, OrderStatus,
};

/// How many fresh tokens to try when draft persistence hits a token
/// collision. With 244 random bits per token, attempt two is already
/// vanishingly unlikely.
const MAX_TOKEN_ATTEMPTS: u32 = 3;

/// What to do with the draft when a commit is rejected.
///
/// A lock timeout always keeps the draft regardless of policy: nothing
/// about the order itself was found wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Mark the draft rejected so the shopper starts over.
    #[default]
    MarkRejected,
    /// Keep the draft for the shopper to amend and retry.
    KeepDraft,
}

/// The checkout orchestrator.
///
/// Pure decisions (splitting, pricing, eligibility) live in
/// storefront-core; this type sequences them against the database.
#[derive(Debug)]
pub struct CheckoutService<C: Catalog> {
    db: Database,
    catalog: C,
    config: CheckoutConfig,
}

impl<C: Catalog> CheckoutService<C> {
    pub fn new(db: Database, catalog: C, config: CheckoutConfig) -> Self {
        CheckoutService {
            db,
            catalog,
            config,
        }
    }

    /// Access to the underlying database handle.
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Assembles and persists a draft order for the cart, binding the
    /// draft's pre-order token to the cart on success.
    ///
    /// Token collisions are retried with a freshly assembled draft, up
    /// to [`MAX_TOKEN_ATTEMPTS`] times.
    pub async fn assemble_order(
        &self,
        cart: &mut Cart,
        customer: Option<&Customer>,
    ) -> StoreResult<Order> {
        let assembler = OrderAssembler::new(&self.catalog, &self.config);
        let mut last_err = None;

        for attempt in 1..=MAX_TOKEN_ATTEMPTS {
            let order = assembler.assemble(cart, customer)?;
            match self.db.orders().insert_draft(&order).await {
                Ok(()) => {
                    cart.pre_order_token = Some(order.pre_order_token.clone());
                    info!(order_id = %order.id, attempt, "Draft order persisted");
                    return Ok(order);
                }
                Err(e @ StoreError::Checkout(CheckoutError::PreOrderTokenCollision { .. })) => {
                    warn!(attempt, "Pre-order token collided, reassembling");
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err
            .unwrap_or_else(|| StoreError::Internal("token retry loop exhausted".to_string())))
    }

    /// Finds the draft order currently bound to the cart, if any.
    pub async fn current_order(&self, cart: &Cart) -> StoreResult<Option<Order>> {
        match &cart.pre_order_token {
            Some(token) => self.db.orders().find_draft_by_token(token).await,
            None => Ok(None),
        }
    }

    /// Recomputes a draft order's fees and totals from its current
    /// destination, carrier, and payment state, and persists the result.
    ///
    /// Idempotent: recomputing an unchanged order writes the same
    /// numbers again.
    pub async fn recompute_totals(&self, order_id: &str) -> StoreResult<Order> {
        let mut order = self.load_draft(order_id).await?;
        self.reprice(&mut order);
        self.db.orders().update_totals(&order).await?;
        Ok(order)
    }

    /// Moves a shipment group to a new destination (optionally a new
    /// carrier), then reprices the order against it.
    ///
    /// A carrier override must come from the carriers eligible for the
    /// group's product type.
    pub async fn update_shipping(
        &self,
        order_id: &str,
        shipping_id: &str,
        address: Address,
        carrier_id: Option<i64>,
    ) -> StoreResult<Order> {
        let mut order = self.load_draft(order_id).await?;

        let shipping = order
            .shippings
            .iter_mut()
            .find(|s| s.id == shipping_id)
            .ok_or_else(|| StoreError::not_found("Shipping", shipping_id))?;

        if let Some(carrier_id) = carrier_id {
            let carrier = self
                .catalog
                .eligible_carriers(&[shipping.product_type_id])
                .into_iter()
                .find(|c| c.id == carrier_id)
                .ok_or_else(|| {
                    StoreError::Checkout(CheckoutError::NoCarrierAvailable {
                        product_type_ids: vec![shipping.product_type_id],
                    })
                })?;
            shipping.carrier_id = carrier.id;
            shipping.carrier_name = carrier.name;
        }
        shipping.address = address;

        self.reprice(&mut order);
        let shipping = order
            .shippings
            .iter()
            .find(|s| s.id == shipping_id)
            .ok_or_else(|| StoreError::not_found("Shipping", shipping_id))?;
        self.db.orders().update_shipping(order_id, shipping).await?;
        self.db.orders().update_totals(&order).await?;
        Ok(order)
    }

    /// Selects a payment method for a draft order and folds its
    /// surcharge into the totals.
    ///
    /// The method must be eligible for the order's carriers and
    /// subtotal right now; an ineligible ID is a not-found.
    pub async fn select_payment(&self, order_id: &str, payment_id: i64) -> StoreResult<Order> {
        let mut order = self.load_draft(order_id).await?;

        let carrier_ids: Vec<i64> = order.shippings.iter().map(|s| s.carrier_id).collect();
        let payment = eligible_payments(
            &self.catalog.payment_candidates(&carrier_ids),
            order.subtotal,
        )
        .into_iter()
        .find(|p| p.id == payment_id)
        .ok_or_else(|| StoreError::not_found("Payment", payment_id.to_string()))?;

        order.payment_id = Some(payment.id);
        order.payment_method = Some(payment.name);
        order.charge = payment.charge;

        self.reprice(&mut order);
        self.db.orders().update_totals(&order).await?;
        Ok(order)
    }

    /// Commits a draft order.
    ///
    /// On success the cart is cleared and the confirmed order returned.
    /// On rejection the error is returned verbatim; the draft is kept
    /// for transient errors (lock contention), otherwise `policy`
    /// decides whether it is marked rejected.
    pub async fn commit(
        &self,
        cart: &mut Cart,
        order_id: &str,
        policy: FailurePolicy,
    ) -> StoreResult<Order> {
        match commit::commit_order(self.db.pool(), order_id).await {
            Ok(_) => {
                cart.clear();
                self.db.orders().get_by_id(order_id).await
            }
            Err(e) => {
                if e.is_transient() {
                    return Err(e);
                }
                if policy == FailurePolicy::MarkRejected
                    && matches!(e, StoreError::Checkout(_))
                {
                    if let Err(mark_err) = self.db.orders().mark_rejected(order_id).await {
                        warn!(order_id, error = %mark_err, "Could not mark draft rejected");
                    }
                }
                Err(e)
            }
        }
    }

    async fn load_draft(&self, order_id: &str) -> StoreResult<Order> {
        let order = self.db.orders().get_by_id(order_id).await?;
        if order.status != OrderStatus::Draft {
            return Err(StoreError::not_found("Order (draft)", order_id));
        }
        Ok(order)
    }

    /// Re-derives every money column from the order's own lines and
    /// shipment state. The snapshots on the detail rows make this a
    /// pure function of the order.
    fn reprice(&self, order: &mut Order) {
        let details = order.details.clone();
        for shipping in &mut order.shippings {
            let mut fee = self
                .catalog
                .delivery_fee(shipping.carrier_id, shipping.address.prefecture_id)
                .unwrap_or_else(Money::zero);
            if self.config.per_product_delivery_fee {
                for item in &shipping.items {
                    if let Some(detail) = details.iter().find(|d| d.id == item.order_detail_id) {
                        fee += detail.unit_delivery_fee * detail.quantity;
                    }
                }
            }
            shipping.fee = fee;
        }

        order.subtotal = pricing::subtotal(&order.details);
        order.tax = pricing::total_tax(&order.details);
        pricing::apply_totals(order, &self.config);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;
    use storefront_core::catalog::StaticCatalog;
    use storefront_core::{
        Carrier, DisplayStatus, PaymentMethod, Product, ProductClass, Rounding, TaxRate, TaxRule,
    };

    fn catalog() -> StaticCatalog {
        StaticCatalog::new()
            .with_carrier(Carrier {
                id: 1,
                name: "Standard".to_string(),
                product_type_id: 1,
            })
            .with_fee(1, 13, Money::from_minor(500))
            .with_fee(1, 27, Money::from_minor(800))
            .with_default_tax_rule(TaxRule {
                rule_id: 1,
                rate: TaxRate::from_bps(1000),
                rounding: Rounding::HalfUp,
            })
            .with_payment(PaymentMethod {
                id: 1,
                name: "Bank transfer".to_string(),
                charge: Money::zero(),
                rule_min: Money::zero(),
                rule_max: None,
            })
            .with_payment(PaymentMethod {
                id: 2,
                name: "Cash on delivery".to_string(),
                charge: Money::from_minor(330),
                rule_min: Money::zero(),
                rule_max: Some(Money::from_minor(30_000)),
            })
    }

    fn tokyo() -> Address {
        Address {
            zip: "100-0001".to_string(),
            prefecture_id: 13,
            prefecture: "Tokyo".to_string(),
            street: "1-1 Chiyoda".to_string(),
        }
    }

    fn customer() -> Customer {
        Customer {
            id: Some("c-1".to_string()),
            name: "Aoi Sato".to_string(),
            email: "aoi@example.com".to_string(),
            phone: "03-0000-0000".to_string(),
            address: tokyo(),
            ..Customer::default()
        }
    }

    async fn seed(db: &Database, stock: i64, sale_limit: Option<i64>) -> (Product, ProductClass) {
        let product = Product {
            id: "p-1".to_string(),
            name: "Green tea".to_string(),
            status: DisplayStatus::Visible,
        };
        let class = ProductClass {
            id: "pc-1".to_string(),
            product_id: "p-1".to_string(),
            code: "SKU-1".to_string(),
            price: Money::from_minor(1000),
            product_type_id: 1,
            delivery_fee: Money::from_minor(100),
            sale_limit,
            stock_unlimited: false,
        };
        db.products().insert_product(&product).await.unwrap();
        db.products().insert_class(&class).await.unwrap();
        db.products().set_stock(&class.id, stock).await.unwrap();
        db.customers().insert(&customer()).await.unwrap();
        (product, class)
    }

    async fn service() -> CheckoutService<StaticCatalog> {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        CheckoutService::new(db, catalog(), CheckoutConfig::new())
    }

    #[tokio::test]
    async fn test_assemble_commit_happy_path() {
        let svc = service().await;
        let (product, class) = seed(svc.db(), 10, None).await;

        let mut cart = Cart::new();
        cart.add_line(&product, &class, 2).unwrap();

        let draft = svc.assemble_order(&mut cart, Some(&customer())).await.unwrap();
        assert_eq!(cart.pre_order_token.as_deref(), Some(draft.pre_order_token.as_str()));
        assert_eq!(draft.total, Money::from_minor(2500));

        let confirmed = svc
            .commit(&mut cart, &draft.id, FailurePolicy::MarkRejected)
            .await
            .unwrap();
        assert_eq!(confirmed.status, OrderStatus::Confirmed);
        assert!(confirmed.confirmed_at.is_some());
        assert!(cart.is_empty());

        // Stock reserved, statistics rolled up.
        assert_eq!(svc.db().products().get_stock("pc-1").await.unwrap(), Some(8));
        let stats = svc.db().customers().get("c-1").await.unwrap().unwrap();
        assert_eq!(stats.purchase_count, 1);
        assert_eq!(stats.lifetime_spend, Money::from_minor(2500));
        assert!(stats.first_purchase_at.is_some());
        assert_eq!(stats.first_purchase_at, stats.last_purchase_at);
    }

    #[tokio::test]
    async fn test_current_order_follows_token() {
        let svc = service().await;
        let (product, class) = seed(svc.db(), 10, None).await;

        let mut cart = Cart::new();
        cart.add_line(&product, &class, 1).unwrap();
        assert!(svc.current_order(&cart).await.unwrap().is_none());

        let draft = svc.assemble_order(&mut cart, Some(&customer())).await.unwrap();
        let found = svc.current_order(&cart).await.unwrap().unwrap();
        assert_eq!(found.id, draft.id);
    }

    #[tokio::test]
    async fn test_insufficient_stock_keeps_everything_untouched() {
        let svc = service().await;
        let (product, class) = seed(svc.db(), 1, None).await;

        let mut cart = Cart::new();
        cart.add_line(&product, &class, 3).unwrap();
        let draft = svc.assemble_order(&mut cart, Some(&customer())).await.unwrap();

        let err = svc
            .commit(&mut cart, &draft.id, FailurePolicy::MarkRejected)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Checkout(CheckoutError::InsufficientStock {
                available: 1,
                requested: 3,
                ..
            })
        ));

        // Draft marked rejected, nothing else moved.
        assert!(!cart.is_empty());
        assert_eq!(svc.db().products().get_stock("pc-1").await.unwrap(), Some(1));
        let order = svc.db().orders().get_by_id(&draft.id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Rejected);
        let stats = svc.db().customers().get("c-1").await.unwrap().unwrap();
        assert_eq!(stats.purchase_count, 0);
    }

    #[tokio::test]
    async fn test_keep_draft_policy() {
        let svc = service().await;
        let (product, class) = seed(svc.db(), 1, None).await;

        let mut cart = Cart::new();
        cart.add_line(&product, &class, 2).unwrap();
        let draft = svc.assemble_order(&mut cart, Some(&customer())).await.unwrap();

        let err = svc
            .commit(&mut cart, &draft.id, FailurePolicy::KeepDraft)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Checkout(CheckoutError::InsufficientStock { .. })
        ));

        let order = svc.db().orders().get_by_id(&draft.id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Draft);
    }

    #[tokio::test]
    async fn test_sale_limit_enforced_at_commit() {
        let svc = service().await;
        let (product, class) = seed(svc.db(), 10, Some(2)).await;

        let mut cart = Cart::new();
        cart.add_line(&product, &class, 3).unwrap();
        let draft = svc.assemble_order(&mut cart, Some(&customer())).await.unwrap();

        let err = svc
            .commit(&mut cart, &draft.id, FailurePolicy::MarkRejected)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Checkout(CheckoutError::SaleLimitExceeded {
                limit: 2,
                requested: 3,
                ..
            })
        ));
        assert_eq!(svc.db().products().get_stock("pc-1").await.unwrap(), Some(10));
    }

    #[tokio::test]
    async fn test_unpublished_product_rejected_at_commit() {
        let svc = service().await;
        let (product, class) = seed(svc.db(), 10, None).await;

        let mut cart = Cart::new();
        cart.add_line(&product, &class, 1).unwrap();
        let draft = svc.assemble_order(&mut cart, Some(&customer())).await.unwrap();

        // Hidden between assembly and commit.
        svc.db()
            .products()
            .set_status("p-1", DisplayStatus::Hidden)
            .await
            .unwrap();

        let err = svc
            .commit(&mut cart, &draft.id, FailurePolicy::MarkRejected)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Checkout(CheckoutError::ProductUnpublished { .. })
        ));
    }

    #[tokio::test]
    async fn test_committed_order_cannot_commit_again() {
        let svc = service().await;
        let (product, class) = seed(svc.db(), 10, None).await;

        let mut cart = Cart::new();
        cart.add_line(&product, &class, 1).unwrap();
        let draft = svc.assemble_order(&mut cart, Some(&customer())).await.unwrap();

        svc.commit(&mut cart, &draft.id, FailurePolicy::MarkRejected)
            .await
            .unwrap();
        let err = svc
            .commit(&mut cart, &draft.id, FailurePolicy::MarkRejected)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));

        // Stock was only reserved once.
        assert_eq!(svc.db().products().get_stock("pc-1").await.unwrap(), Some(9));
    }

    #[tokio::test]
    async fn test_guest_commit_skips_statistics() {
        let svc = service().await;
        let (product, class) = seed(svc.db(), 10, None).await;

        let mut cart = Cart::new();
        cart.add_line(&product, &class, 1).unwrap();
        let draft = svc.assemble_order(&mut cart, None).await.unwrap();

        let confirmed = svc
            .commit(&mut cart, &draft.id, FailurePolicy::MarkRejected)
            .await
            .unwrap();
        assert_eq!(confirmed.status, OrderStatus::Confirmed);

        let stats = svc.db().customers().get("c-1").await.unwrap().unwrap();
        assert_eq!(stats.purchase_count, 0);
    }

    #[tokio::test]
    async fn test_update_shipping_reprices_fee() {
        let svc = service().await;
        let (product, class) = seed(svc.db(), 10, None).await;

        let mut cart = Cart::new();
        cart.add_line(&product, &class, 2).unwrap();
        let draft = svc.assemble_order(&mut cart, Some(&customer())).await.unwrap();
        assert_eq!(draft.delivery_fee_total, Money::from_minor(500));

        let osaka = Address {
            zip: "530-0001".to_string(),
            prefecture_id: 27,
            prefecture: "Osaka".to_string(),
            street: "1-1 Umeda".to_string(),
        };
        let updated = svc
            .update_shipping(&draft.id, &draft.shippings[0].id, osaka, None)
            .await
            .unwrap();
        assert_eq!(updated.delivery_fee_total, Money::from_minor(800));
        assert_eq!(updated.total, Money::from_minor(2800));

        // Persisted, not just returned.
        let reloaded = svc.db().orders().get_by_id(&draft.id).await.unwrap();
        assert_eq!(reloaded.total, Money::from_minor(2800));
        assert_eq!(reloaded.shippings[0].fee, Money::from_minor(800));
    }

    #[tokio::test]
    async fn test_select_payment_folds_surcharge() {
        let svc = service().await;
        let (product, class) = seed(svc.db(), 10, None).await;

        let mut cart = Cart::new();
        cart.add_line(&product, &class, 2).unwrap();
        let draft = svc.assemble_order(&mut cart, Some(&customer())).await.unwrap();

        let updated = svc.select_payment(&draft.id, 2).await.unwrap();
        assert_eq!(updated.payment_method.as_deref(), Some("Cash on delivery"));
        assert_eq!(updated.charge, Money::from_minor(330));
        assert_eq!(updated.total, Money::from_minor(2830));

        // Ineligible/unknown IDs are rejected.
        assert!(svc.select_payment(&draft.id, 99).await.is_err());
    }

    #[tokio::test]
    async fn test_recompute_totals_is_idempotent() {
        let svc = service().await;
        let (product, class) = seed(svc.db(), 10, None).await;

        let mut cart = Cart::new();
        cart.add_line(&product, &class, 2).unwrap();
        let draft = svc.assemble_order(&mut cart, Some(&customer())).await.unwrap();

        let once = svc.recompute_totals(&draft.id).await.unwrap();
        let twice = svc.recompute_totals(&draft.id).await.unwrap();
        assert_eq!(once.total, draft.total);
        assert_eq!(twice.total, draft.total);
        assert_eq!(twice.delivery_fee_total, draft.delivery_fee_total);
    }

    #[tokio::test]
    async fn test_free_shipping_threshold_survives_reprice() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let config = CheckoutConfig::new().free_shipping_amount(Money::from_minor(1500));
        let svc = CheckoutService::new(db, catalog(), config);
        let (product, class) = seed(svc.db(), 10, None).await;

        let mut cart = Cart::new();
        cart.add_line(&product, &class, 2).unwrap();
        let draft = svc.assemble_order(&mut cart, Some(&customer())).await.unwrap();
        assert_eq!(draft.delivery_fee_total, Money::zero());

        let repriced = svc.recompute_totals(&draft.id).await.unwrap();
        assert_eq!(repriced.delivery_fee_total, Money::zero());
        assert_eq!(repriced.total, Money::from_minor(2000));
    }
}
