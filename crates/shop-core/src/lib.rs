//! # shop-core
//!
//! Core types and logic for the shopcart checkout pipeline.
//!
//! This crate provides:
//! - `CartStore` — session-scoped cart state with derived totals
//! - `compute_totals` — pure pricing over line items
//! - `PaymentGateway` trait + `CheckoutAttempt` state machine for driving
//!   a payment to a terminal outcome
//! - `OrderService`/`OrderRepository` — atomic, idempotent order
//!   finalization
//! - `CartStorage` — durable cart snapshots across sessions
//! - `StoreError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use shop_core::{CartStore, CheckoutAttempt, Money, OrderDraft, PaymentMethod};
//!
//! let mut cart = CartStore::default();
//! cart.add_item(catalog.get(2).unwrap().to_cart_item(1));
//!
//! let mut attempt = CheckoutAttempt::new(gateway);
//! let total = Money::new(cart.totals().total, cart.pricing().currency);
//! attempt.create_intent(&total).await?;
//!
//! if let Confirmation::Succeeded { payment_ref } =
//!     attempt.confirm(&PaymentMethod::new("pm_card")).await?
//! {
//!     let draft = OrderDraft::from_cart(
//!         Some(user_id), Some(payment_ref), "Stripe", &cart.snapshot(), address,
//!     )?;
//!     let order = orders.finalize(draft).await?;
//!     cart.clear();
//! }
//! ```

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod error;
pub mod finalize;
pub mod gateway;
pub mod money;
pub mod order;
pub mod pricing;
pub mod storage;

// Re-exports for convenience
pub use cart::{CartItem, CartState, CartStore, CartTotals};
pub use catalog::{Product, ProductCatalog};
pub use checkout::{AttemptState, CheckoutAttempt, Confirmation};
pub use error::{StoreError, StoreResult};
pub use finalize::{InsertOutcome, MemoryOrderRepository, OrderRepository, OrderService};
pub use gateway::{
    BillingDetails, BoxedGateway, GatewaySelector, IntentConfirmation, IntentStatus,
    PaymentEvent, PaymentEventKind, PaymentGateway, PaymentIntent, PaymentMethod,
};
pub use money::{Currency, Money};
pub use order::{Order, OrderDraft, OrderItem, OrderSummary, ShippingAddress};
pub use pricing::{compute_totals, PricingConfig, ShippingPolicy};
pub use storage::{CartStorage, JsonFileStorage, MemoryStorage};
