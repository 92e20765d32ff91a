//! Catalog types: products, variant groups and flash sales.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Money, ProductId, VariantId};

/// A sellable product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Product ID.
    pub id: ProductId,
    /// Display name, copied into order snapshots.
    pub name: String,
    /// Primary image URL, copied into order snapshots.
    #[serde(default)]
    pub image: Option<String>,
    /// Base unit price.
    pub price: Money,
    /// Display-only "was" price. Never used for pricing.
    #[serde(default)]
    pub compare_at_price: Option<Money>,
    /// Variant axes (e.g. Color, Size).
    #[serde(default)]
    pub variants: Vec<VariantGroup>,
    /// Units on hand.
    pub stock: u32,
    /// Time-windowed percentage discount.
    #[serde(default)]
    pub flash_sale: Option<FlashSale>,
}

/// A named axis of product differentiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantGroup {
    /// Axis name, e.g. "Color".
    pub name: String,
    /// Selectable options.
    pub options: Vec<VariantOption>,
}

/// One selectable option within a [`VariantGroup`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantOption {
    /// Option ID referenced by cart lines.
    pub id: VariantId,
    /// Option name, e.g. "Red".
    pub name: String,
    /// Option value, e.g. a hex code or SKU suffix.
    #[serde(default)]
    pub value: String,
    /// Price delta added to the base price. May be negative.
    #[serde(default)]
    pub additional_price: Money,
}

/// A time-windowed percentage discount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashSale {
    /// Master switch.
    pub is_on_flash_sale: bool,
    /// Discount in percent, valid range 1..=99.
    pub discount_percentage: u8,
    /// First instant the sale applies (inclusive).
    pub flash_sale_start_date: DateTime<Utc>,
    /// Last instant the sale applies (inclusive).
    pub flash_sale_end_date: DateTime<Utc>,
}

impl FlashSale {
    /// Valid discount range.
    pub const DISCOUNT_RANGE: core::ops::RangeInclusive<u8> = 1..=99;

    /// Whether the sale applies at `now`.
    ///
    /// Out-of-range percentages never apply.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.is_on_flash_sale
            && Self::DISCOUNT_RANGE.contains(&self.discount_percentage)
            && self.flash_sale_start_date <= now
            && now <= self.flash_sale_end_date
    }
}

impl Product {
    /// Find a variant option by ID across all groups.
    #[must_use]
    pub fn find_variant(&self, id: VariantId) -> Option<(&VariantGroup, &VariantOption)> {
        self.variants.iter().find_map(|group| {
            group
                .options
                .iter()
                .find(|option| option.id == id)
                .map(|option| (group, option))
        })
    }

    /// Human-readable label for a variant, e.g. "Color: Red".
    #[must_use]
    pub fn variant_label(&self, id: VariantId) -> Option<String> {
        self.find_variant(id)
            .map(|(group, option)| format!("{}: {}", group.name, option.name))
    }

    /// Check catalog-level constraints before a product is stored.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violated constraint.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("product name cannot be empty".to_owned());
        }
        if self.price.is_negative() {
            return Err("product price cannot be negative".to_owned());
        }
        if let Some(sale) = &self.flash_sale {
            if !FlashSale::DISCOUNT_RANGE.contains(&sale.discount_percentage) {
                return Err("flash sale discount must be between 1 and 99".to_owned());
            }
            if sale.flash_sale_end_date < sale.flash_sale_start_date {
                return Err("flash sale ends before it starts".to_owned());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn sample() -> Product {
        Product {
            id: ProductId::generate(),
            name: "Tee".to_owned(),
            image: None,
            price: Money::from_units(20),
            compare_at_price: None,
            variants: vec![VariantGroup {
                name: "Color".to_owned(),
                options: vec![VariantOption {
                    id: VariantId::generate(),
                    name: "Red".to_owned(),
                    value: "#f00".to_owned(),
                    additional_price: Money::from_units(2),
                }],
            }],
            stock: 5,
            flash_sale: None,
        }
    }

    #[test]
    fn test_find_variant_and_label() {
        let product = sample();
        let id = product.variants.first().unwrap().options.first().unwrap().id;
        assert!(product.find_variant(id).is_some());
        assert_eq!(product.variant_label(id).as_deref(), Some("Color: Red"));
        assert!(product.find_variant(VariantId::generate()).is_none());
    }

    #[test]
    fn test_validate_rejects_bad_discount() {
        let mut product = sample();
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        product.flash_sale = Some(FlashSale {
            is_on_flash_sale: true,
            discount_percentage: 100,
            flash_sale_start_date: start,
            flash_sale_end_date: start,
        });
        assert!(product.validate().is_err());
    }

    #[test]
    fn test_deserialize_camel_case_document() {
        let json = serde_json::json!({
            "id": ProductId::generate(),
            "name": "Mug",
            "price": "12.50",
            "stock": 3
        });
        let product: Product = serde_json::from_value(json).unwrap();
        assert_eq!(product.price, Money::from_cents(1250));
        assert!(product.variants.is_empty());
        assert!(product.flash_sale.is_none());
    }
}
