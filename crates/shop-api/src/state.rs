//! # Application State
//!
//! Shared state for the axum application: payment gateways, pricing
//! configuration, the order service, and the product catalog.

use crate::db::{self, PgOrderRepository};
use rust_decimal::Decimal;
use shop_core::{
    BoxedGateway, GatewaySelector, MemoryOrderRepository, OrderService, PricingConfig,
    ProductCatalog,
};
use shop_paypal::PayPalGateway;
use shop_stripe::StripeGateway;
use std::sync::Arc;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Postgres connection string; orders fall back to an in-memory store
    /// when unset
    pub database_url: Option<String>,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            database_url: std::env::var("DATABASE_URL").ok(),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Payment gateway registry
    pub gateways: GatewaySelector,
    /// Storefront pricing rules
    pub pricing: PricingConfig,
    /// Order finalization and lookup
    pub orders: OrderService,
    /// Product catalog (price source at add-to-cart time)
    pub catalog: ProductCatalog,
    /// Stripe publishable key handed to browser clients
    pub stripe_publishable_key: Option<String>,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Build state from the environment: Stripe is required, PayPal and
    /// Postgres are optional with logged fallbacks.
    pub async fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();

        let stripe = StripeGateway::from_env()
            .map_err(|e| anyhow::anyhow!("failed to initialize Stripe: {e}"))?;
        let stripe_publishable_key = stripe.publishable_key().map(String::from);

        let mut gateways = GatewaySelector::new("stripe");
        gateways.register(Arc::new(stripe) as BoxedGateway);

        match PayPalGateway::from_env() {
            Ok(paypal) => gateways.register(Arc::new(paypal) as BoxedGateway),
            Err(e) => tracing::warn!("PayPal disabled: {e}"),
        }

        let orders = match config.database_url.as_deref() {
            Some(url) => {
                let pool = db::connect(url).await?;
                tracing::info!("connected to Postgres");
                OrderService::new(Arc::new(PgOrderRepository::new(pool)))
            }
            None => {
                tracing::warn!("DATABASE_URL not set, orders use an in-memory store");
                OrderService::new(Arc::new(MemoryOrderRepository::new()))
            }
        };

        Ok(Self {
            gateways,
            pricing: pricing_from_env(),
            orders,
            catalog: load_product_catalog(),
            stripe_publishable_key,
            config,
        })
    }
}

/// Pricing rules, with an optional tax-rate override from the environment
fn pricing_from_env() -> PricingConfig {
    let mut pricing = PricingConfig::default();
    if let Some(rate) = std::env::var("TAX_RATE")
        .ok()
        .and_then(|raw| raw.parse::<Decimal>().ok())
    {
        pricing.tax_rate = rate;
    }
    pricing
}

/// Load product catalog from config file
fn load_product_catalog() -> ProductCatalog {
    let config_paths = [
        "config/products.toml",
        "../config/products.toml",
        "../../config/products.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            match ProductCatalog::from_toml(&content) {
                Ok(catalog) => {
                    tracing::info!("loaded {} products from {}", catalog.products.len(), path);
                    return catalog;
                }
                Err(e) => tracing::warn!("failed to parse {path}: {e}"),
            }
        }
    }

    tracing::warn!("no product catalog found, using empty catalog");
    ProductCatalog::new()
}
