//! Effective unit price resolution.
//!
//! [`resolve_price`] is the only place a line-item price is derived. It is
//! pure: the storefront calls it at every write (cart add/update/sync and
//! order assembly) and never stores a client-supplied price.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::catalog::Product;
use crate::types::{Money, VariantId};

/// Resolve the unit price of `product` with an optional variant at `now`.
///
/// 1. Start from the base price.
/// 2. Add the selected option's `additional_price`. An unknown option adds
///    nothing; stale references never fail pricing.
/// 3. If a flash sale is active at `now` (window inclusive on both ends), the
///    result becomes `base x (1 - pct/100)` rounded to cents.
/// 4. Clamp at zero.
///
/// # Example
///
/// ```
/// use chrono::{Duration, Utc};
/// use cartwright_core::{FlashSale, Money, Product, ProductId, resolve_price};
///
/// let now = Utc::now();
/// let product = Product {
///     id: ProductId::generate(),
///     name: "Lamp".into(),
///     image: None,
///     price: Money::from_units(100),
///     compare_at_price: None,
///     variants: vec![],
///     stock: 1,
///     flash_sale: Some(FlashSale {
///         is_on_flash_sale: true,
///         discount_percentage: 20,
///         flash_sale_start_date: now - Duration::hours(1),
///         flash_sale_end_date: now + Duration::hours(1),
///     }),
/// };
/// assert_eq!(resolve_price(&product, None, now), Money::from_units(80));
/// ```
#[must_use]
pub fn resolve_price(product: &Product, variant: Option<VariantId>, now: DateTime<Utc>) -> Money {
    let delta = variant
        .and_then(|id| product.find_variant(id))
        .map_or(Money::ZERO, |(_, option)| option.additional_price);

    let base = product.price + delta;

    let price = match &product.flash_sale {
        Some(sale) if sale.is_active_at(now) => {
            let factor = Decimal::ONE - Decimal::from(sale.discount_percentage) / Decimal::ONE_HUNDRED;
            Money::new(base.amount() * factor).round_cents()
        }
        _ => base,
    };

    price.non_negative()
}

/// Whether a flash sale discount applies to `product` at `now`.
#[must_use]
pub fn flash_sale_active(product: &Product, now: DateTime<Utc>) -> bool {
    product
        .flash_sale
        .as_ref()
        .is_some_and(|sale| sale.is_active_at(now))
}

/// The "was" price to display next to the resolved price.
///
/// Only returned when it is above the current resolved price, so a stale
/// compare-at value never advertises a markup.
#[must_use]
pub fn compare_at_price(product: &Product, variant: Option<VariantId>, now: DateTime<Utc>) -> Option<Money> {
    let current = resolve_price(product, variant, now);
    product
        .compare_at_price
        .filter(|was| *was > current)
}
