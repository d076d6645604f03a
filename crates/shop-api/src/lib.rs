//! # shop-api
//!
//! HTTP API and persistence layer for shopcart-rs.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - REST endpoints for payments, checkout, and order history
//! - Postgres order repository (sqlx) with an in-memory fallback
//! - Stripe webhook endpoint
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/api/v1/payments/intent` | Create Stripe payment intent |
//! | POST | `/api/v1/paypal/orders` | Create PayPal order |
//! | POST | `/api/v1/paypal/orders/{id}/capture` | Capture PayPal order |
//! | POST | `/api/v1/checkout` | Server-driven checkout |
//! | POST | `/api/v1/orders` | Create pre-payment order |
//! | POST | `/api/v1/orders/finalize` | Finalize order after payment |
//! | GET | `/api/v1/orders` | Order history |
//! | GET | `/api/v1/orders/{id}` | Get order |
//! | GET | `/api/v1/products` | List products |
//! | POST | `/webhook/stripe` | Stripe webhook |

pub mod auth;
pub mod db;
pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
