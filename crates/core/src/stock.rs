//! Stock validation against current inventory counts.
//!
//! Validation is a read-only check; nothing is reserved. Shortfalls are data,
//! not errors, so callers decide how to surface them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::ProductId;

/// A requested quantity of one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockRequest {
    /// Product being requested.
    pub product_id: ProductId,
    /// Units requested by this line.
    pub quantity: u32,
}

/// One product whose requested quantity exceeds what is on hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockShortfall {
    /// Offending product.
    pub product_id: ProductId,
    /// Total units requested across all lines for this product.
    pub requested: u32,
    /// Units on hand (0 when the product is unknown).
    pub available: u32,
}

/// Result of a stock check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockCheck {
    /// Every request can be satisfied.
    Ok,
    /// At least one product is short. Lists every offending product.
    Failed(Vec<StockShortfall>),
}

impl StockCheck {
    /// Whether every request can be satisfied.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// Check `requests` against the stock reported by `available`.
///
/// Lines for the same product (e.g. two variants) are summed, since stock is
/// counted per product. Shortfalls come back ordered by product ID so the
/// result is stable for a given input.
#[must_use]
pub fn validate<I, F>(requests: I, available: F) -> StockCheck
where
    I: IntoIterator<Item = StockRequest>,
    F: Fn(ProductId) -> Option<u32>,
{
    let mut totals: BTreeMap<ProductId, u32> = BTreeMap::new();
    for request in requests {
        let total = totals.entry(request.product_id).or_insert(0);
        *total = total.saturating_add(request.quantity);
    }

    let shortfalls: Vec<StockShortfall> = totals
        .into_iter()
        .filter_map(|(product_id, requested)| {
            let on_hand = available(product_id).unwrap_or(0);
            (requested > on_hand).then_some(StockShortfall {
                product_id,
                requested,
                available: on_hand,
            })
        })
        .collect();

    if shortfalls.is_empty() {
        StockCheck::Ok
    } else {
        StockCheck::Failed(shortfalls)
    }
}
