//! # Pricing Engine
//!
//! Pure derivation of cart totals from line items. The cart store calls
//! [`compute_totals`] after every mutation; derived fields are never
//! written directly.
//!
//! Tax is computed on the subtotal, not the post-discount amount. The
//! discount here is display-level savings (original vs. current price), and
//! the current price already carries it, so the tax base stays the
//! undiscounted subtotal. Changing this order changes literal totals.

use crate::cart::{CartItem, CartTotals};
use crate::money::Currency;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Shipping rule applied to the cart subtotal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "policy")]
pub enum ShippingPolicy {
    /// Fixed shipping amount (zero in the baseline)
    Flat { rate: Decimal },
    /// Flat rate waived once the subtotal reaches a threshold
    FreeOver { threshold: Decimal, rate: Decimal },
}

impl ShippingPolicy {
    /// Shipping charge for a given subtotal
    pub fn charge_for(&self, subtotal: Decimal) -> Decimal {
        match self {
            ShippingPolicy::Flat { rate } => *rate,
            ShippingPolicy::FreeOver { threshold, rate } => {
                if subtotal >= *threshold {
                    Decimal::ZERO
                } else {
                    *rate
                }
            }
        }
    }
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        ShippingPolicy::Flat {
            rate: Decimal::ZERO,
        }
    }
}

/// Pricing configuration for a storefront
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Currency all cart amounts are denominated in
    #[serde(default)]
    pub currency: Currency,

    /// Flat tax rate applied to the subtotal
    pub tax_rate: Decimal,

    /// Shipping rule
    #[serde(default)]
    pub shipping: ShippingPolicy,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            currency: Currency::USD,
            // 8.5%
            tax_rate: Decimal::new(85, 3),
            shipping: ShippingPolicy::default(),
        }
    }
}

/// Subtotal contribution of a single line item
pub fn line_subtotal(item: &CartItem) -> Decimal {
    item.unit_price * Decimal::from(item.quantity)
}

/// Savings contribution of a single line item (zero unless it carries a
/// higher original price)
pub fn line_discount(item: &CartItem) -> Decimal {
    match item.original_unit_price {
        Some(original) => {
            (original - item.unit_price).max(Decimal::ZERO) * Decimal::from(item.quantity)
        }
        None => Decimal::ZERO,
    }
}

/// Derive all cart totals from the item list.
///
/// Amounts stay unrounded; rounding happens only at presentation and
/// payment boundaries (`Money::display`, `Money::to_minor_units`).
pub fn compute_totals(items: &[CartItem], config: &PricingConfig) -> CartTotals {
    let subtotal: Decimal = items.iter().map(line_subtotal).sum();
    let discount: Decimal = items.iter().map(line_discount).sum();
    let shipping = config.shipping.charge_for(subtotal);
    let tax = subtotal * config.tax_rate;
    let total = subtotal - discount + shipping + tax;

    CartTotals {
        subtotal,
        discount,
        shipping,
        tax,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn item(id: u64, price: &str, original: Option<&str>, quantity: u32) -> CartItem {
        CartItem {
            id,
            name: format!("product-{id}"),
            unit_price: dec(price),
            original_unit_price: original.map(dec),
            quantity,
            image_url: None,
            variant: None,
        }
    }

    #[test]
    fn test_discounted_single_item_totals() {
        let items = vec![item(2, "439.00", Some("549.00"), 1)];
        let totals = compute_totals(&items, &PricingConfig::default());

        assert_eq!(totals.subtotal, dec("439.00"));
        assert_eq!(totals.discount, dec("110.00"));
        assert_eq!(totals.shipping, Decimal::ZERO);
        // Tax on the subtotal, before discount
        assert_eq!(totals.tax, dec("37.31500"));
        assert_eq!(totals.total, dec("366.31500"));
    }

    #[test]
    fn test_discount_never_negative() {
        // Original price below the current price contributes no savings
        let items = vec![item(1, "50.00", Some("40.00"), 2)];
        let totals = compute_totals(&items, &PricingConfig::default());

        assert_eq!(totals.subtotal, dec("100.00"));
        assert_eq!(totals.discount, Decimal::ZERO);
    }

    #[test]
    fn test_multi_item_subtotal() {
        let items = vec![
            item(2, "439.00", Some("549.00"), 1),
            item(3, "289.99", None, 1),
            item(5, "159.99", None, 2),
        ];
        let totals = compute_totals(&items, &PricingConfig::default());

        assert_eq!(totals.subtotal, dec("1048.97"));
        assert_eq!(totals.discount, dec("110.00"));
        assert_eq!(totals.tax, dec("1048.97") * dec("0.085"));
    }

    #[test]
    fn test_free_shipping_threshold() {
        let config = PricingConfig {
            shipping: ShippingPolicy::FreeOver {
                threshold: dec("50.00"),
                rate: dec("5.99"),
            },
            ..PricingConfig::default()
        };

        let below = compute_totals(&[item(1, "20.00", None, 1)], &config);
        assert_eq!(below.shipping, dec("5.99"));

        let at_threshold = compute_totals(&[item(1, "50.00", None, 1)], &config);
        assert_eq!(at_threshold.shipping, Decimal::ZERO);
    }

    #[test]
    fn test_empty_cart_is_all_zero() {
        let totals = compute_totals(&[], &PricingConfig::default());
        assert_eq!(totals.subtotal, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::ZERO);
    }
}
