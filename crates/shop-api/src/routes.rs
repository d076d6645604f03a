//! # Routes
//!
//! Axum router configuration for the storefront API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - Payments:
///   - POST /api/v1/payments/intent - Create a Stripe payment intent
///   - POST /api/v1/paypal/orders - Create a PayPal order
///   - POST /api/v1/paypal/orders/{order_id}/capture - Capture after approval
///   - POST /api/v1/checkout - Server-driven checkout (authenticated)
///
/// - Orders:
///   - POST /api/v1/orders - Create pre-payment order (authenticated)
///   - POST /api/v1/orders/finalize - Finalize after payment (authenticated)
///   - GET  /api/v1/orders - Order history (authenticated)
///   - GET  /api/v1/orders/{order_id} - Get order by id
///
/// - Catalog:
///   - GET  /api/v1/products - List products
///   - GET  /api/v1/products/{product_id} - Get product
///
/// - Webhooks:
///   - POST /webhook/stripe - Stripe webhook handler
pub fn create_router(state: AppState) -> Router {
    // CORS: the storefront frontend is served from a different origin in
    // development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let payment_routes = Router::new()
        .route("/payments/intent", post(handlers::create_payment_intent))
        .route("/paypal/orders", post(handlers::create_paypal_order))
        .route(
            "/paypal/orders/{order_id}/capture",
            post(handlers::capture_paypal_order),
        )
        .route("/checkout", post(handlers::checkout));

    let order_routes = Router::new()
        .route(
            "/orders",
            get(handlers::list_orders).post(handlers::create_order),
        )
        .route("/orders/finalize", post(handlers::finalize_order))
        .route("/orders/{order_id}", get(handlers::get_order));

    let catalog_routes = Router::new()
        .route("/products", get(handlers::list_products))
        .route("/products/{product_id}", get(handlers::get_product));

    let api_routes = Router::new()
        .merge(payment_routes)
        .merge(order_routes)
        .merge(catalog_routes);

    // Webhook routes stay outside CORS and must accept the raw body
    let webhook_routes = Router::new().route("/stripe", post(handlers::stripe_webhook));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .nest("/api/v1", api_routes)
        .nest("/webhook", webhook_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
