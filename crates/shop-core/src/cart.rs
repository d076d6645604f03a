//! # Cart Store
//!
//! Session-scoped cart state: an ordered list of line items (unique by
//! product id) plus totals derived by the pricing engine. The store is an
//! explicitly owned object — callers create one per session and pass it
//! where needed; there is no ambient global cart.
//!
//! Every mutation recomputes the derived totals from the item list.
//! Rehydration from storage replays items through [`CartStore::add_item`]
//! for the same reason: totals are always recomputed, never trusted from
//! stale storage.

use crate::pricing::{self, PricingConfig};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One product entry in the cart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Product reference
    pub id: u64,

    /// Product name (denormalized for display and order snapshots)
    pub name: String,

    /// Unit price copied from the catalog at add time
    pub unit_price: Decimal,

    /// Pre-discount unit price, used only for savings display
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_unit_price: Option<Decimal>,

    /// Quantity, always >= 1 while stored
    pub quantity: u32,

    /// Optional image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// Optional variant label (e.g., "Color: Red")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

/// Totals derived from the item list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

/// Serializable cart snapshot: items plus the totals derived from them
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartState {
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub totals: CartTotals,
}

/// Session-scoped cart store
#[derive(Debug, Clone)]
pub struct CartStore {
    items: Vec<CartItem>,
    totals: CartTotals,
    pricing: PricingConfig,
}

impl CartStore {
    /// Create an empty cart
    pub fn new(pricing: PricingConfig) -> Self {
        let totals = pricing::compute_totals(&[], &pricing);
        Self {
            items: Vec::new(),
            totals,
            pricing,
        }
    }

    /// Rebuild a cart from a persisted snapshot.
    ///
    /// Stored items are replayed through `add_item`, so invalid entries are
    /// dropped and totals are recomputed rather than read back.
    pub fn hydrate(state: CartState, pricing: PricingConfig) -> Self {
        let mut store = Self::new(pricing);
        for item in state.items {
            store.add_item(item);
        }
        store
    }

    /// Add an item, merging quantities when the product is already present.
    ///
    /// A zero quantity or negative price makes the call a no-op; adding
    /// never fails.
    pub fn add_item(&mut self, item: CartItem) {
        if item.quantity == 0 || item.unit_price < Decimal::ZERO {
            tracing::debug!(id = item.id, "ignoring invalid cart item");
            return;
        }

        match self.items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => existing.quantity += item.quantity,
            None => self.items.push(item),
        }
        self.recompute();
    }

    /// Remove the item with this product id; no-op if absent
    pub fn remove_item(&mut self, id: u64) {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        if self.items.len() != before {
            self.recompute();
        }
    }

    /// Set an item's quantity verbatim; zero removes the item entirely
    pub fn update_quantity(&mut self, id: u64, quantity: u32) {
        if quantity == 0 {
            self.remove_item(id);
            return;
        }
        if let Some(item) = self.items.iter_mut().find(|item| item.id == id) {
            item.quantity = quantity;
            self.recompute();
        }
    }

    /// Empty the cart and reset totals to zero
    pub fn clear(&mut self) {
        self.items.clear();
        self.recompute();
    }

    /// Line items, in insertion order
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Derived totals for the current item list
    pub fn totals(&self) -> &CartTotals {
        &self.totals
    }

    /// Pricing configuration this cart was built with
    pub fn pricing(&self) -> &PricingConfig {
        &self.pricing
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total unit count across all lines
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Immutable snapshot for persistence or checkout
    pub fn snapshot(&self) -> CartState {
        CartState {
            items: self.items.clone(),
            totals: self.totals,
        }
    }

    fn recompute(&mut self) {
        self.totals = pricing::compute_totals(&self.items, &self.pricing);
    }
}

impl Default for CartStore {
    fn default() -> Self {
        Self::new(PricingConfig::default())
    }
}
