//! # Shipment Splitter
//!
//! Groups cart lines into shipment groups based on product-type-to-carrier
//! compatibility and the multi-shipment mode switch.
//!
//! ## Splitting Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  multi_shipment OFF, or a single product type in the cart           │
//! │      └── exactly ONE group: first carrier eligible for the full     │
//! │          type set (a multi-type cart with the switch off has no     │
//! │          such carrier → NoCarrierAvailable)                         │
//! │                                                                     │
//! │  multi_shipment ON and ≥2 product types                             │
//! │      └── one group per distinct product type that has an eligible   │
//! │          carrier, de-duplicated by type id in first-seen order;     │
//! │          the FIRST eligible carrier per type is picked — user       │
//! │          choice among alternates is not offered here                │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use tracing::debug;

use crate::catalog::Catalog;
use crate::error::{CheckoutError, CheckoutResult};
use crate::types::{Carrier, CartLine};

/// A planned shipment group: one carrier and the product types it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipmentGroup {
    pub carrier: Carrier,
    /// Product types routed to this group, in first-seen cart order.
    pub product_type_ids: Vec<i64>,
}

/// Splits cart lines into shipment groups.
///
/// Pure apart from catalog lookups; no inventory or session state is
/// touched. Fails with [`CheckoutError::NoCarrierAvailable`] when any
/// required product type has no supporting carrier.
pub fn split_shipments<C: Catalog>(
    lines: &[CartLine],
    multi_shipment: bool,
    catalog: &C,
) -> CheckoutResult<Vec<ShipmentGroup>> {
    let mut type_ids: Vec<i64> = Vec::new();
    for line in lines {
        let id = line.product_class.product_type_id;
        if !type_ids.contains(&id) {
            type_ids.push(id);
        }
    }
    if type_ids.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let carriers = catalog.eligible_carriers(&type_ids);

    if !multi_shipment || type_ids.len() == 1 {
        // Single group: the carrier must cover every type present. With
        // one carrier per product type, a mixed-type cart cannot ship as
        // one group.
        let carrier = carriers
            .iter()
            .find(|c| type_ids.iter().all(|t| *t == c.product_type_id))
            .cloned()
            .ok_or_else(|| CheckoutError::NoCarrierAvailable {
                product_type_ids: type_ids.clone(),
            })?;

        debug!(carrier = %carrier.name, "single shipment group");
        return Ok(vec![ShipmentGroup {
            carrier,
            product_type_ids: type_ids,
        }]);
    }

    // One group per distinct product type, first eligible carrier each,
    // de-duplicated in first-seen order.
    let mut groups: Vec<ShipmentGroup> = Vec::new();
    for carrier in &carriers {
        if groups
            .iter()
            .any(|g| g.product_type_ids[0] == carrier.product_type_id)
        {
            continue;
        }
        groups.push(ShipmentGroup {
            carrier: carrier.clone(),
            product_type_ids: vec![carrier.product_type_id],
        });
    }

    // Every type in the cart needs a group.
    let missing: Vec<i64> = type_ids
        .iter()
        .copied()
        .filter(|t| !groups.iter().any(|g| g.product_type_ids.contains(t)))
        .collect();
    if !missing.is_empty() {
        return Err(CheckoutError::NoCarrierAvailable {
            product_type_ids: missing,
        });
    }

    // Present groups in the cart's first-seen type order, not master order.
    groups.sort_by_key(|g| {
        type_ids
            .iter()
            .position(|t| *t == g.product_type_ids[0])
            .unwrap_or(usize::MAX)
    });

    debug!(groups = groups.len(), "multi shipment split");
    Ok(groups)
}

// =============================================================================
// Unit Tests
// =============================================================================
