//! # Product Catalog
//!
//! Read-only catalog collaborator, loaded from `config/products.toml`.
//! The catalog is the source of prices at add-to-cart time: prices are
//! copied into the cart item and never re-fetched live, so a later catalog
//! price change cannot alter a cart mid-session.

use crate::cart::CartItem;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A product in the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Numeric product id, referenced by cart items
    pub id: u64,

    /// Display name
    pub name: String,

    /// Current unit price
    pub price: Decimal,

    /// Pre-discount price, shown struck through when higher than `price`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<Decimal>,

    /// Optional image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// Optional variant label (e.g., "Color: Red")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,

    /// Whether this product is available for purchase
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

impl Product {
    /// Snapshot this product into a cart line item, copying prices
    pub fn to_cart_item(&self, quantity: u32) -> CartItem {
        CartItem {
            id: self.id,
            name: self.name.clone(),
            unit_price: self.price,
            original_unit_price: self.original_price,
            quantity,
            image_url: self.image_url.clone(),
            variant: self.variant.clone(),
        }
    }
}

/// Product catalog (loaded from config)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductCatalog {
    pub products: Vec<Product>,
}

impl ProductCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self {
            products: Vec::new(),
        }
    }

    /// Find a product by id
    pub fn get(&self, id: u64) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// All active products
    pub fn active_products(&self) -> impl Iterator<Item = &Product> {
        self.products.iter().filter(|p| p.active)
    }

    /// Load catalog from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_from_toml() {
        let catalog = ProductCatalog::from_toml(
            r#"
            [[products]]
            id = 2
            name = "Airpods Max"
            price = "439.00"
            original_price = "549.00"
            variant = "Color: Red"

            [[products]]
            id = 3
            name = "Bose Headphones"
            price = "289.99"
            active = false
            "#,
        )
        .unwrap();

        assert_eq!(catalog.products.len(), 2);
        assert_eq!(catalog.active_products().count(), 1);
        assert_eq!(catalog.get(2).unwrap().name, "Airpods Max");
        assert!(catalog.get(99).is_none());
    }

    #[test]
    fn test_price_copied_into_cart_item() {
        let product = Product {
            id: 2,
            name: "Airpods Max".to_string(),
            price: "439.00".parse().unwrap(),
            original_price: Some("549.00".parse().unwrap()),
            image_url: None,
            variant: Some("Color: Red".to_string()),
            active: true,
        };

        let item = product.to_cart_item(1);
        assert_eq!(item.id, 2);
        assert_eq!(item.unit_price, "439.00".parse().unwrap());
        assert_eq!(item.original_unit_price, Some("549.00".parse().unwrap()));
        assert_eq!(item.quantity, 1);
    }
}
