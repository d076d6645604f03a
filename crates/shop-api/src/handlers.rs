//! # Request Handlers
//!
//! Axum request handlers for the storefront API. Request and response
//! bodies are explicit schemas validated at the boundary; nothing loosely
//! typed crosses into the domain crates.

use crate::auth::AuthUser;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use shop_core::{
    CartItem, CartStore, CheckoutAttempt, Confirmation, Currency, Money, Order, OrderDraft,
    OrderItem, OrderSummary, PaymentMethod, ShippingAddress, StoreError,
};
use shop_stripe::{dispatch_payment_event, LoggingWebhookHandler};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

// =============================================================================
// Request/Response Types
// =============================================================================

/// One cart line as submitted by the client
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItemPayload {
    pub id: u64,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub original_price: Option<Decimal>,
    pub quantity: u32,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub variant: Option<String>,
}

impl CheckoutItemPayload {
    fn into_cart_item(self) -> CartItem {
        CartItem {
            id: self.id,
            name: self.name,
            unit_price: self.price,
            original_unit_price: self.original_price,
            quantity: self.quantity,
            image_url: self.image_url,
            variant: self.variant,
        }
    }
}

/// Payment method reference for server-driven checkout
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodPayload {
    /// Provider-side payment method token
    pub id: String,
    /// Provider name; defaults to the configured default gateway
    #[serde(default)]
    pub provider: Option<String>,
}

/// Server-driven checkout: cart snapshot + destination + payment method
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutItemPayload>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethodPayload,
}

/// Checkout suspended for interactive verification
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPendingResponse {
    pub status: &'static str,
    pub client_secret: String,
}

/// Pre-payment order creation
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub items: Vec<CheckoutItemPayload>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub total: Decimal,
}

/// Post-payment finalization request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeOrderRequest {
    /// Payment confirmation reference observed by the client
    pub payment_intent_id: String,
    pub order_data: OrderData,
}

/// The cart snapshot and checkout data finalization records
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderData {
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub total: Decimal,
}

/// Canonical order shape returned to clients
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub date: String,
    pub total: Decimal,
    pub payment_method: String,
    pub status: String,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            order_number: order.order_number,
            date: order.created_at.to_rfc3339(),
            total: order.total,
            payment_method: order.payment_method,
            status: order.status,
            items: order.items,
            shipping_address: order.shipping_address,
        }
    }
}

/// Order history entry
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummaryResponse {
    pub id: Uuid,
    pub order_number: String,
    pub date: String,
    pub total: Decimal,
    pub status: String,
}

impl From<OrderSummary> for OrderSummaryResponse {
    fn from(summary: OrderSummary) -> Self {
        Self {
            id: summary.id,
            order_number: summary.order_number,
            date: summary.created_at.to_rfc3339(),
            total: summary.total,
            status: summary.status,
        }
    }
}

/// Payment intent creation (client-driven confirmation flow)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentRequest {
    /// Amount in minor units (cents)
    pub amount: i64,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentResponse {
    pub client_secret: String,
}

/// PayPal order creation
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayPalOrderRequest {
    pub total: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PayPalOrderResponse {
    #[serde(rename = "orderID")]
    pub order_id: String,
}

#[derive(Debug, Serialize)]
pub struct PayPalCaptureResponse {
    pub success: bool,
    #[serde(rename = "captureID", skip_serializing_if = "Option::is_none")]
    pub capture_id: Option<String>,
    pub message: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

/// Map a domain error to an HTTP response.
///
/// The details line keeps "you were not charged" and "you were charged but
/// the order record is pending" unambiguous for the shopper.
fn store_error_to_response(err: StoreError) -> HandlerError {
    let code = err.status_code();
    let mut response = ErrorResponse::new(err.to_string(), code);

    if err.charge_may_exist() {
        response = response.with_details(
            "Payment succeeded but the order could not be recorded. Retry finalization \
             with the same payment reference; you will not be charged again.",
        );
    } else if matches!(
        err,
        StoreError::PaymentDeclined { .. }
            | StoreError::ProviderUnavailable { .. }
            | StoreError::ProviderError { .. }
    ) {
        response = response.with_details("You were not charged.");
    }

    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

fn bad_request(message: impl Into<String>) -> HandlerError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(message, 400)),
    )
}

/// Reject malformed cart lines before they reach the (forgiving) cart store
fn validate_item_payloads(items: &[CheckoutItemPayload]) -> Result<(), HandlerError> {
    if items.is_empty() {
        return Err(bad_request("No items in request"));
    }
    for item in items {
        if item.quantity == 0 {
            return Err(bad_request(format!(
                "Item '{}' has zero quantity",
                item.name
            )));
        }
        if item.price < Decimal::ZERO {
            return Err(bad_request(format!(
                "Item '{}' has a negative price",
                item.name
            )));
        }
    }
    Ok(())
}

/// Human-readable payment method label for a provider
fn payment_method_label(provider: &str) -> &'static str {
    match provider {
        "stripe" => "Stripe",
        "paypal" => "PayPal",
        _ => "Card",
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "shopcart",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// List active products
pub async fn list_products(State(state): State<AppState>) -> impl IntoResponse {
    let products: Vec<_> = state.catalog.active_products().collect();
    Json(serde_json::json!({
        "products": products,
        "count": products.len()
    }))
}

/// Get a single product
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<u64>,
) -> Result<impl IntoResponse, HandlerError> {
    let product = state.catalog.get(product_id).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(
                format!("Product not found: {product_id}"),
                404,
            )),
        )
    })?;
    Ok(Json(product.clone()))
}

/// Create a payment intent for a client-driven confirmation flow
#[instrument(skip(state, request), fields(amount = request.amount))]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    Json(request): Json<CreateIntentRequest>,
) -> Result<Json<CreateIntentResponse>, HandlerError> {
    if request.amount <= 0 {
        return Err(bad_request("Amount must be a positive number of cents"));
    }
    let currency = match request.currency.as_deref() {
        Some(code) => Currency::parse(code).map_err(store_error_to_response)?,
        None => state.pricing.currency,
    };

    let gateway = state.gateways.get("stripe").ok_or_else(|| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("Stripe not configured", 500)),
        )
    })?;

    let intent = gateway
        .create_intent(request.amount, currency)
        .await
        .map_err(|e| {
            error!("failed to create payment intent: {e}");
            store_error_to_response(e)
        })?;

    Ok(Json(CreateIntentResponse {
        client_secret: intent.client_secret,
    }))
}

/// Create a PayPal order for client-side approval
#[instrument(skip(state, request))]
pub async fn create_paypal_order(
    State(state): State<AppState>,
    Json(request): Json<PayPalOrderRequest>,
) -> Result<Json<PayPalOrderResponse>, HandlerError> {
    let currency = match request.currency.as_deref() {
        Some(code) => Currency::parse(code).map_err(store_error_to_response)?,
        None => state.pricing.currency,
    };
    let amount_minor = Money::new(request.total, currency)
        .to_minor_units()
        .map_err(store_error_to_response)?;
    if amount_minor <= 0 {
        return Err(bad_request("Order total must be positive"));
    }

    let gateway = state.gateways.get("paypal").ok_or_else(|| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("PayPal not configured", 500)),
        )
    })?;

    let intent = gateway
        .create_intent(amount_minor, currency)
        .await
        .map_err(store_error_to_response)?;

    Ok(Json(PayPalOrderResponse {
        order_id: intent.intent_id,
    }))
}

/// Capture an approved PayPal order
#[instrument(skip(state), fields(order_id = %order_id))]
pub async fn capture_paypal_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Response, HandlerError> {
    let gateway = state.gateways.get("paypal").ok_or_else(|| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("PayPal not configured", 500)),
        )
    })?;

    let confirmation = gateway
        .confirm_intent(&order_id, None)
        .await
        .map_err(store_error_to_response)?;

    match confirmation.payment_ref {
        Some(capture_id) => Ok(Json(PayPalCaptureResponse {
            success: true,
            capture_id: Some(capture_id),
            message: "Payment captured successfully".to_string(),
        })
        .into_response()),
        None => Ok((
            StatusCode::ACCEPTED,
            Json(PayPalCaptureResponse {
                success: false,
                capture_id: None,
                message: "Payer approval still pending".to_string(),
            }),
        )
            .into_response()),
    }
}

/// Server-driven checkout: price the cart, drive the payment state machine,
/// and finalize the order on success.
#[instrument(skip(state, auth, request), fields(user_id = auth.user_id, items = request.items.len()))]
pub async fn checkout(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CheckoutRequest>,
) -> Result<Response, HandlerError> {
    validate_item_payloads(&request.items)?;

    // Session-scoped cart rebuilt from the submitted snapshot; totals are
    // recomputed here, never trusted from the client
    let mut cart = CartStore::new(state.pricing.clone());
    for item in request.items {
        cart.add_item(item.into_cart_item());
    }
    if cart.is_empty() {
        return Err(bad_request("Cart is empty"));
    }

    let gateway = state
        .gateways
        .get_or_default(request.payment_method.provider.as_deref())
        .ok_or_else(|| {
            bad_request(format!(
                "Unknown payment provider: {:?}",
                request.payment_method.provider
            ))
        })?
        .clone();
    let provider = gateway.provider_name();

    let total = Money::new(cart.totals().total, state.pricing.currency);
    info!(
        provider,
        total = %total.display(),
        "starting checkout attempt"
    );

    let mut attempt = CheckoutAttempt::new(gateway);
    attempt
        .create_intent(&total)
        .await
        .map_err(store_error_to_response)?;

    let confirmation = attempt
        .confirm(&PaymentMethod::new(request.payment_method.id))
        .await
        .map_err(store_error_to_response)?;

    match confirmation {
        Confirmation::Succeeded { payment_ref } => {
            let draft = OrderDraft::from_cart(
                Some(auth.user_id),
                Some(payment_ref),
                payment_method_label(provider),
                &cart.snapshot(),
                request.shipping_address,
            )
            .map_err(store_error_to_response)?;

            let order = state
                .orders
                .finalize(draft)
                .await
                .map_err(store_error_to_response)?;

            cart.clear();
            Ok((StatusCode::CREATED, Json(OrderResponse::from(order))).into_response())
        }
        Confirmation::RequiresAction { client_secret } => Ok((
            StatusCode::ACCEPTED,
            Json(CheckoutPendingResponse {
                status: "requires_action",
                client_secret,
            }),
        )
            .into_response()),
    }
}

/// Create a pre-payment order directly
#[instrument(skip(state, auth, request), fields(user_id = auth.user_id))]
pub async fn create_order(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), HandlerError> {
    validate_item_payloads(&request.items)?;

    // Recompute the total from the submitted lines; a client total that
    // disagrees is rejected before anything is written
    let mut cart = CartStore::new(state.pricing.clone());
    for item in request.items {
        cart.add_item(item.into_cart_item());
    }
    let recomputed = Money::new(cart.totals().total, state.pricing.currency).rounded();
    let submitted = Money::new(request.total, state.pricing.currency).rounded();
    if recomputed != submitted {
        return Err(bad_request(format!(
            "Total mismatch: submitted {submitted}, computed {recomputed}"
        )));
    }

    let draft = OrderDraft::from_cart(
        Some(auth.user_id),
        None,
        request.payment_method,
        &cart.snapshot(),
        request.shipping_address,
    )
    .map_err(store_error_to_response)?;

    let order = state
        .orders
        .create(draft)
        .await
        .map_err(store_error_to_response)?;

    Ok((StatusCode::CREATED, Json(OrderResponse::from(order))))
}

/// Finalize an order after the client observed payment success.
///
/// Idempotent per payment intent: a retry returns the already-created
/// order. A persistence failure returns 500 with a retry hint — the
/// payment is never rolled back here.
#[instrument(skip(state, auth, request), fields(user_id = auth.user_id, payment_intent = %request.payment_intent_id))]
pub async fn finalize_order(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<FinalizeOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), HandlerError> {
    if request.payment_intent_id.trim().is_empty() {
        return Err(bad_request("paymentIntentId must not be empty"));
    }

    let data = request.order_data;

    // The charge already happened for data.total; drift against the item
    // lines is recorded, not rejected
    let line_total: Decimal = data
        .items
        .iter()
        .map(|item| item.price * Decimal::from(item.quantity))
        .sum();
    if (data.total - line_total).abs() > line_total * Decimal::new(25, 2) {
        warn!(
            %line_total,
            total = %data.total,
            "finalize total drifts far from its line items"
        );
    }

    let draft = OrderDraft::from_parts(
        Some(auth.user_id),
        Some(request.payment_intent_id),
        data.payment_method,
        data.items,
        data.total,
        data.shipping_address,
    )
    .map_err(store_error_to_response)?;

    let order = state
        .orders
        .finalize(draft)
        .await
        .map_err(store_error_to_response)?;

    Ok((StatusCode::CREATED, Json(OrderResponse::from(order))))
}

/// Fetch one order for confirmation/history display
#[instrument(skip(state))]
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, HandlerError> {
    let order = state
        .orders
        .get(order_id)
        .await
        .map_err(store_error_to_response)?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new(
                    format!("Order not found: {order_id}"),
                    404,
                )),
            )
        })?;

    Ok(Json(OrderResponse::from(order)))
}

/// Order history for the authenticated user, newest first
#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn list_orders(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<OrderSummaryResponse>>, HandlerError> {
    let summaries = state
        .orders
        .history_for_user(auth.user_id)
        .await
        .map_err(store_error_to_response)?;

    Ok(Json(
        summaries.into_iter().map(OrderSummaryResponse::from).collect(),
    ))
}

/// Handle Stripe webhook
#[instrument(skip(state, headers, body))]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, HandlerError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| bad_request("Missing Stripe-Signature header"))?;

    let gateway = state.gateways.get("stripe").ok_or_else(|| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("Stripe not configured", 500)),
        )
    })?;

    let event = gateway
        .verify_webhook(&body, signature)
        .await
        .map_err(|e| {
            error!("webhook verification failed: {e}");
            store_error_to_response(e)
        })?;

    info!(
        event_id = %event.event_id,
        kind = ?event.kind,
        "received Stripe webhook"
    );

    dispatch_payment_event(&LoggingWebhookHandler, &event).map_err(|e| {
        error!("webhook handler error: {e}");
        store_error_to_response(e)
    })?;

    Ok(StatusCode::OK)
}
