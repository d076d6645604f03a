//! End-to-end API tests against an in-memory order store and a scripted
//! payment gateway.

use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};
use shop_api::state::{AppConfig, AppState};
use shop_api::create_router;
use shop_core::{
    Currency, GatewaySelector, IntentConfirmation, IntentStatus, MemoryOrderRepository,
    OrderService, PaymentGateway, PaymentIntent, PaymentMethod, PricingConfig, ProductCatalog,
    StoreError, StoreResult,
};
use std::sync::{Arc, Mutex};

/// Gateway that pops one scripted confirmation result per confirm call
struct ScriptedGateway {
    confirmations: Mutex<Vec<StoreResult<IntentConfirmation>>>,
}

impl ScriptedGateway {
    fn new(confirmations: Vec<StoreResult<IntentConfirmation>>) -> Arc<Self> {
        Arc::new(Self {
            confirmations: Mutex::new(confirmations),
        })
    }

    fn succeeding() -> Arc<Self> {
        Self::new(vec![Ok(IntentConfirmation {
            status: IntentStatus::Succeeded,
            payment_ref: Some("pi_scripted".to_string()),
        })])
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: Currency,
    ) -> StoreResult<PaymentIntent> {
        Ok(PaymentIntent {
            intent_id: "pi_scripted".to_string(),
            client_secret: "pi_scripted_secret_xyz".to_string(),
            amount_minor,
            currency,
            status: IntentStatus::RequiresConfirmation,
        })
    }

    async fn confirm_intent(
        &self,
        _client_secret: &str,
        _method: Option<&PaymentMethod>,
    ) -> StoreResult<IntentConfirmation> {
        self.confirmations.lock().unwrap().remove(0)
    }

    fn provider_name(&self) -> &'static str {
        "stripe"
    }
}

fn test_server(gateway: Arc<ScriptedGateway>) -> TestServer {
    let state = AppState {
        gateways: GatewaySelector::new("stripe").with_gateway(gateway),
        pricing: PricingConfig::default(),
        orders: OrderService::new(Arc::new(MemoryOrderRepository::new())),
        catalog: ProductCatalog::from_toml(
            r#"
            [[products]]
            id = 2
            name = "Airpods Max"
            price = "439.00"
            original_price = "549.00"
            "#,
        )
        .unwrap(),
        stripe_publishable_key: None,
        config: AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "test".to_string(),
            database_url: None,
        },
    };
    TestServer::new(create_router(state)).unwrap()
}

fn user_header() -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-user-id"),
        HeaderValue::from_static("7"),
    )
}

fn airpods_item() -> Value {
    json!({
        "id": 2,
        "name": "Airpods Max",
        "price": "439.00",
        "originalPrice": "549.00",
        "quantity": 1
    })
}

fn shipping_address() -> Value {
    json!({
        "line1": "1 Main St",
        "city": "Springfield",
        "state": "IL",
        "postal_code": "62701"
    })
}

fn finalize_body(payment_intent_id: &str) -> Value {
    json!({
        "paymentIntentId": payment_intent_id,
        "orderData": {
            "items": [{ "name": "Airpods Max", "quantity": 1, "price": "439.00" }],
            "shippingAddress": shipping_address(),
            "paymentMethod": "Stripe",
            "total": "366.32"
        }
    })
}

#[tokio::test]
async fn test_health() {
    let server = test_server(ScriptedGateway::succeeding());
    let response = server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "healthy");
}

#[tokio::test]
async fn test_finalize_creates_order_and_is_idempotent() {
    let server = test_server(ScriptedGateway::succeeding());
    let (name, value) = user_header();

    let first = server
        .post("/api/v1/orders/finalize")
        .add_header(name.clone(), value.clone())
        .json(&finalize_body("pi_123"))
        .await;
    first.assert_status(StatusCode::CREATED);

    let body: Value = first.json();
    assert!(body["orderNumber"].as_str().unwrap().starts_with("ORDER-"));
    assert_eq!(body["total"], "366.32");
    assert_eq!(body["paymentMethod"], "Stripe");
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["shippingAddress"]["postal_code"], "62701");

    // Client retry with the same payment intent gets the same order back
    let retry = server
        .post("/api/v1/orders/finalize")
        .add_header(name.clone(), value.clone())
        .json(&finalize_body("pi_123"))
        .await;
    retry.assert_status(StatusCode::CREATED);
    assert_eq!(retry.json::<Value>()["id"], body["id"]);

    // Exactly one order exists
    let history = server
        .get("/api/v1/orders")
        .add_header(name, value)
        .await;
    history.assert_status_ok();
    assert_eq!(history.json::<Value>().as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_finalize_requires_authentication() {
    let server = test_server(ScriptedGateway::succeeding());
    let response = server
        .post("/api/v1/orders/finalize")
        .json(&finalize_body("pi_123"))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_get_order_round_trip_and_404() {
    let server = test_server(ScriptedGateway::succeeding());
    let (name, value) = user_header();

    let created: Value = server
        .post("/api/v1/orders/finalize")
        .add_header(name, value)
        .json(&finalize_body("pi_123"))
        .await
        .json();

    let fetched = server
        .get(&format!("/api/v1/orders/{}", created["id"].as_str().unwrap()))
        .await;
    fetched.assert_status_ok();
    assert_eq!(fetched.json::<Value>()["orderNumber"], created["orderNumber"]);

    let missing = server
        .get("/api/v1/orders/00000000-0000-4000-8000-000000000000")
        .await;
    missing.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_order_history_is_newest_first() {
    let server = test_server(ScriptedGateway::succeeding());
    let (name, value) = user_header();

    for payment_ref in ["pi_1", "pi_2", "pi_3"] {
        server
            .post("/api/v1/orders/finalize")
            .add_header(name.clone(), value.clone())
            .json(&finalize_body(payment_ref))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let history: Value = server
        .get("/api/v1/orders")
        .add_header(name, value)
        .await
        .json();
    let entries = history.as_array().unwrap();
    assert_eq!(entries.len(), 3);
    for pair in entries.windows(2) {
        assert!(pair[0]["date"].as_str().unwrap() >= pair[1]["date"].as_str().unwrap());
    }
}

#[tokio::test]
async fn test_checkout_success_finalizes_order() {
    let server = test_server(ScriptedGateway::succeeding());
    let (name, value) = user_header();

    let response = server
        .post("/api/v1/checkout")
        .add_header(name.clone(), value.clone())
        .json(&json!({
            "items": [airpods_item()],
            "shippingAddress": shipping_address(),
            "paymentMethod": { "id": "pm_card" }
        }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let body: Value = response.json();
    // 439.00 - 110.00 + 439.00 * 0.085, rounded at the boundary
    assert_eq!(body["total"], "366.32");
    assert_eq!(body["paymentMethod"], "Stripe");

    let history = server.get("/api/v1/orders").add_header(name, value).await;
    assert_eq!(history.json::<Value>().as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_checkout_decline_creates_no_order() {
    let server = test_server(ScriptedGateway::new(vec![Err(StoreError::PaymentDeclined {
        reason: "card_declined".to_string(),
    })]));
    let (name, value) = user_header();

    let response = server
        .post("/api/v1/checkout")
        .add_header(name.clone(), value.clone())
        .json(&json!({
            "items": [airpods_item()],
            "shippingAddress": shipping_address(),
            "paymentMethod": { "id": "pm_card" }
        }))
        .await;
    response.assert_status(StatusCode::PAYMENT_REQUIRED);
    // The shopper must know no money moved
    assert_eq!(response.json::<Value>()["details"], "You were not charged.");

    let history = server.get("/api/v1/orders").add_header(name, value).await;
    assert_eq!(history.json::<Value>().as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_checkout_requires_action_suspends() {
    let server = test_server(ScriptedGateway::new(vec![Ok(IntentConfirmation {
        status: IntentStatus::RequiresAction,
        payment_ref: None,
    })]));
    let (name, value) = user_header();

    let response = server
        .post("/api/v1/checkout")
        .add_header(name, value)
        .json(&json!({
            "items": [airpods_item()],
            "shippingAddress": shipping_address(),
            "paymentMethod": { "id": "pm_card" }
        }))
        .await;
    response.assert_status(StatusCode::ACCEPTED);

    let body: Value = response.json();
    assert_eq!(body["status"], "requires_action");
    assert_eq!(body["clientSecret"], "pi_scripted_secret_xyz");
}

#[tokio::test]
async fn test_checkout_rejects_invalid_items() {
    let server = test_server(ScriptedGateway::succeeding());
    let (name, value) = user_header();

    let response = server
        .post("/api/v1/checkout")
        .add_header(name, value)
        .json(&json!({
            "items": [{ "id": 2, "name": "Airpods Max", "price": "439.00", "quantity": 0 }],
            "shippingAddress": shipping_address(),
            "paymentMethod": { "id": "pm_card" }
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_payment_intent() {
    let server = test_server(ScriptedGateway::succeeding());

    let response = server
        .post("/api/v1/payments/intent")
        .json(&json!({ "amount": 36632 }))
        .await;
    response.assert_status_ok();
    assert_eq!(
        response.json::<Value>()["clientSecret"],
        "pi_scripted_secret_xyz"
    );

    let rejected = server
        .post("/api/v1/payments/intent")
        .json(&json!({ "amount": 0 }))
        .await;
    rejected.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_order_rejects_total_mismatch() {
    let server = test_server(ScriptedGateway::succeeding());
    let (name, value) = user_header();

    let response = server
        .post("/api/v1/orders")
        .add_header(name.clone(), value.clone())
        .json(&json!({
            "items": [airpods_item()],
            "shippingAddress": shipping_address(),
            "paymentMethod": "Cash on Delivery",
            "total": "999.99"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    // The recomputed total is accepted
    let accepted = server
        .post("/api/v1/orders")
        .add_header(name, value)
        .json(&json!({
            "items": [airpods_item()],
            "shippingAddress": shipping_address(),
            "paymentMethod": "Cash on Delivery",
            "total": "366.32"
        }))
        .await;
    accepted.assert_status(StatusCode::CREATED);
    assert!(accepted.json::<Value>()["id"].as_str().is_some());
}

#[tokio::test]
async fn test_webhook_requires_signature_header() {
    let server = test_server(ScriptedGateway::succeeding());
    let response = server
        .post("/webhook/stripe")
        .json(&json!({ "id": "evt_1" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_products_listing() {
    let server = test_server(ScriptedGateway::succeeding());

    let response = server.get("/api/v1/products").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["count"], 1);

    let product = server.get("/api/v1/products/2").await;
    product.assert_status_ok();
    assert_eq!(product.json::<Value>()["name"], "Airpods Max");

    let missing = server.get("/api/v1/products/99").await;
    missing.assert_status(StatusCode::NOT_FOUND);
}
