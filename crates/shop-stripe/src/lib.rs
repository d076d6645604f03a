//! # shop-stripe
//!
//! Stripe payment gateway for shopcart-rs, built on the PaymentIntents
//! API:
//!
//! 1. An intent is created for the cart total (integer minor units)
//! 2. The client secret drives confirmation — server-side via
//!    [`StripeGateway::confirm_intent`], or in the browser via Stripe.js
//! 3. `payment_intent.succeeded` webhooks cover completions that happen
//!    out-of-band (e.g. after the shopper navigated away)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shop_stripe::StripeGateway;
//! use shop_core::{Currency, PaymentGateway, PaymentMethod};
//!
//! let gateway = StripeGateway::from_env()?;
//!
//! let intent = gateway.create_intent(36632, Currency::USD).await?;
//! let confirmation = gateway
//!     .confirm_intent(&intent.client_secret, Some(&PaymentMethod::new("pm_card")))
//!     .await?;
//! ```

pub mod config;
pub mod intents;
pub mod webhook;

// Re-exports
pub use config::StripeConfig;
pub use intents::StripeGateway;
pub use webhook::{
    dispatch_payment_event, LoggingWebhookHandler, WebhookHandler, REQUIRED_WEBHOOK_EVENTS,
};
