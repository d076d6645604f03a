//! # shop-paypal
//!
//! PayPal payment gateway for shopcart-rs, built on the Orders v2 API.
//!
//! The gateway maps PayPal's order lifecycle onto the shared
//! [`shop_core::PaymentGateway`] seam: creating an intent creates a
//! CAPTURE-intent order, the shopper approves it in PayPal's UI, and
//! confirmation captures the approved order.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shop_paypal::PayPalGateway;
//! use shop_core::{Currency, PaymentGateway};
//!
//! let gateway = PayPalGateway::from_env()?;
//!
//! let intent = gateway.create_intent(36632, Currency::USD).await?;
//! // ... shopper approves intent.client_secret (the PayPal order id) ...
//! let confirmation = gateway.confirm_intent(&intent.client_secret, None).await?;
//! ```

pub mod config;
pub mod orders;

// Re-exports
pub use config::PayPalConfig;
pub use orders::PayPalGateway;
