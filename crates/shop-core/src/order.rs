//! # Order Types
//!
//! Persisted order records and the draft built from a cart snapshot at
//! checkout. An order's items are an immutable copy of the cart at the
//! moment of successful payment — later catalog price changes never touch
//! a persisted order.

use crate::cart::CartState;
use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shipping destination captured at checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub line1: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

/// One line of a persisted order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    pub quantity: u32,
    /// Unit price at the moment of purchase
    pub price: Decimal,
}

/// A persisted order with its line items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,

    /// Unique human-readable reference, e.g. `ORDER-1738173000123-9f2b41c7`
    pub order_number: String,

    /// Owning user, when the purchase was authenticated
    pub user_id: Option<i64>,

    /// Total actually charged, at display precision
    pub total: Decimal,

    pub payment_method: String,

    /// Status-style field; the only part of an order updated in place
    pub status: String,

    /// Provider payment confirmation reference; unique across orders and
    /// the idempotency key for finalization
    pub payment_ref: Option<String>,

    pub shipping_address: ShippingAddress,

    pub created_at: DateTime<Utc>,

    pub items: Vec<OrderItem>,
}

/// Compact order shape for history listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: Uuid,
    pub order_number: String,
    pub total: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// An order ready to be inserted: everything except the storage-assigned
/// id, status, and timestamp
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub order_number: String,
    pub user_id: Option<i64>,
    pub payment_ref: Option<String>,
    pub payment_method: String,
    pub total: Decimal,
    pub shipping_address: ShippingAddress,
    pub items: Vec<OrderItem>,
}

impl OrderDraft {
    /// Build a draft from explicit parts, validating the snapshot shape.
    ///
    /// The total is rounded to two decimal places here: this is the charged
    /// amount, a presentation/persistence boundary.
    pub fn from_parts(
        user_id: Option<i64>,
        payment_ref: Option<String>,
        payment_method: impl Into<String>,
        items: Vec<OrderItem>,
        total: Decimal,
        shipping_address: ShippingAddress,
    ) -> StoreResult<Self> {
        if items.is_empty() {
            return Err(StoreError::Validation("order has no items".to_string()));
        }
        for item in &items {
            if item.quantity == 0 {
                return Err(StoreError::Validation(format!(
                    "order item '{}' has zero quantity",
                    item.name
                )));
            }
            if item.price < Decimal::ZERO {
                return Err(StoreError::Validation(format!(
                    "order item '{}' has a negative price",
                    item.name
                )));
            }
        }
        if total < Decimal::ZERO {
            return Err(StoreError::Validation("order total is negative".to_string()));
        }

        Ok(Self {
            order_number: generate_order_number(),
            user_id,
            payment_ref,
            payment_method: payment_method.into(),
            total: total.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
            shipping_address,
            items,
        })
    }

    /// Build a draft from a cart snapshot, copying each line item
    pub fn from_cart(
        user_id: Option<i64>,
        payment_ref: Option<String>,
        payment_method: impl Into<String>,
        snapshot: &CartState,
        shipping_address: ShippingAddress,
    ) -> StoreResult<Self> {
        let items = snapshot
            .items
            .iter()
            .map(|item| OrderItem {
                name: item.name.clone(),
                quantity: item.quantity,
                price: item.unit_price,
            })
            .collect();

        Self::from_parts(
            user_id,
            payment_ref,
            payment_method,
            items,
            snapshot.totals.total,
            shipping_address,
        )
    }
}

/// Generate a globally unique, human-readable order number.
///
/// Timestamp plus 8 chars of a v4 UUID — enough entropy that concurrent
/// checkouts in the same millisecond cannot collide in practice, unlike a
/// counter.
pub fn generate_order_number() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("ORDER-{}-{}", Utc::now().timestamp_millis(), &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::{CartItem, CartStore};

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            line1: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            postal_code: "62701".to_string(),
        }
    }

    #[test]
    fn test_order_number_shape_and_uniqueness() {
        let a = generate_order_number();
        let b = generate_order_number();

        assert!(a.starts_with("ORDER-"));
        assert_eq!(a.split('-').count(), 3);
        assert_eq!(a.split('-').nth(2).unwrap().len(), 8);
        assert_ne!(a, b);
    }

    #[test]
    fn test_draft_snapshots_cart_items() {
        let mut cart = CartStore::default();
        cart.add_item(CartItem {
            id: 2,
            name: "Airpods Max".to_string(),
            unit_price: dec("439.00"),
            original_unit_price: Some(dec("549.00")),
            quantity: 1,
            image_url: None,
            variant: None,
        });

        let draft = OrderDraft::from_cart(
            Some(7),
            Some("pi_123".to_string()),
            "Stripe",
            &cart.snapshot(),
            address(),
        )
        .unwrap();

        assert_eq!(draft.items.len(), 1);
        assert_eq!(draft.items[0].name, "Airpods Max");
        assert_eq!(draft.items[0].price, dec("439.00"));
        // Unrounded 366.315 becomes the charged 366.32
        assert_eq!(draft.total, dec("366.32"));

        // Mutating the cart afterwards must not affect the draft
        cart.update_quantity(2, 5);
        assert_eq!(draft.items[0].quantity, 1);
    }

    #[test]
    fn test_draft_rejects_bad_shapes() {
        let empty = OrderDraft::from_parts(None, None, "Stripe", vec![], dec("10.00"), address());
        assert!(matches!(empty, Err(StoreError::Validation(_))));

        let zero_qty = OrderDraft::from_parts(
            None,
            None,
            "Stripe",
            vec![OrderItem {
                name: "x".to_string(),
                quantity: 0,
                price: dec("1.00"),
            }],
            dec("1.00"),
            address(),
        );
        assert!(matches!(zero_qty, Err(StoreError::Validation(_))));
    }
}
