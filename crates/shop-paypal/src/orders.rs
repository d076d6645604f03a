//! # PayPal Orders
//!
//! [`PaymentGateway`] implementation over the PayPal Orders v2 API. The
//! PayPal order id doubles as the intent handle: creating an intent
//! creates a CAPTURE-intent order, and confirming captures it. The shopper
//! approves the order in PayPal's own UI between the two calls, which is
//! why a fresh order confirms to `PAYER_ACTION_REQUIRED` until approval —
//! the same suspension point as a 3-D Secure challenge.

use crate::config::PayPalConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use shop_core::{
    Currency, IntentConfirmation, IntentStatus, Money, PaymentGateway, PaymentIntent,
    PaymentMethod, StoreError, StoreResult,
};
use tracing::{debug, error, info, instrument};

/// PayPal Orders gateway
pub struct PayPalGateway {
    config: PayPalConfig,
    client: Client,
}

impl PayPalGateway {
    /// Create a new gateway
    pub fn new(config: PayPalConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| StoreError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> StoreResult<Self> {
        Self::new(PayPalConfig::from_env()?)
    }

    /// Fetch a client-credentials access token
    async fn access_token(&self) -> StoreResult<String> {
        let url = format!("{}/v1/oauth2/token", self.config.api_base_url);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| StoreError::ProviderUnavailable {
                provider: "paypal".to_string(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(StoreError::ProviderError {
                provider: "paypal".to_string(),
                message: format!("token request failed: HTTP {}", response.status()),
            });
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            StoreError::Serialization(format!("failed to parse token response: {e}"))
        })?;
        Ok(token.access_token)
    }

    async fn post_json(
        &self,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> StoreResult<PayPalOrderResponse> {
        let token = self.access_token().await?;
        let url = format!("{}{}", self.config.api_base_url, path);

        let mut request = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header("Content-Type", "application/json");
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StoreError::ProviderUnavailable {
                provider: "paypal".to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::ProviderUnavailable {
                provider: "paypal".to_string(),
                message: e.to_string(),
            })?;

        if !status.is_success() {
            error!("PayPal API error: status={}, body={}", status, body);
            return Err(parse_paypal_error(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            StoreError::Serialization(format!("failed to parse PayPal response: {e}"))
        })
    }
}

#[async_trait]
impl PaymentGateway for PayPalGateway {
    #[instrument(skip(self), fields(amount_minor))]
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: Currency,
    ) -> StoreResult<PaymentIntent> {
        let body = json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "amount": {
                    "currency_code": currency.as_str().to_uppercase(),
                    "value": amount_value(amount_minor, currency),
                }
            }]
        });

        debug!("creating PayPal order");
        let response = self.post_json("/v2/checkout/orders", Some(body)).await?;
        info!(order_id = %response.id, "created PayPal order");

        Ok(PaymentIntent {
            // The PayPal order id is both the intent id and the handle the
            // client approves against
            intent_id: response.id.clone(),
            client_secret: response.id,
            amount_minor,
            currency,
            status: IntentStatus::RequiresConfirmation,
        })
    }

    #[instrument(skip(self, client_secret, _method))]
    async fn confirm_intent(
        &self,
        client_secret: &str,
        _method: Option<&PaymentMethod>,
    ) -> StoreResult<IntentConfirmation> {
        let response = self
            .post_json(
                &format!("/v2/checkout/orders/{client_secret}/capture"),
                None,
            )
            .await?;

        match response.status.as_str() {
            "COMPLETED" => {
                let payment_ref = response
                    .capture_id()
                    .unwrap_or_else(|| response.id.clone());
                info!(capture_id = %payment_ref, "captured PayPal order");
                Ok(IntentConfirmation {
                    status: IntentStatus::Succeeded,
                    payment_ref: Some(payment_ref),
                })
            }
            "PAYER_ACTION_REQUIRED" | "CREATED" | "APPROVED" => Ok(IntentConfirmation {
                status: IntentStatus::RequiresAction,
                payment_ref: None,
            }),
            other => Err(StoreError::ProviderError {
                provider: "paypal".to_string(),
                message: format!("unexpected order status after capture: {other}"),
            }),
        }
    }

    fn provider_name(&self) -> &'static str {
        "paypal"
    }
}

/// Format minor units as PayPal's decimal string (e.g. `36632` → `"366.32"`)
fn amount_value(amount_minor: i64, currency: Currency) -> String {
    let money = Money::from_minor_units(amount_minor, currency);
    if currency.decimal_places() == 0 {
        format!("{:.0}", money.amount)
    } else {
        format!("{:.2}", money.amount)
    }
}

fn parse_paypal_error(http_status: u16, body: &str) -> StoreError {
    if let Ok(response) = serde_json::from_str::<PayPalErrorResponse>(body) {
        if response
            .details
            .iter()
            .any(|d| d.issue == "INSTRUMENT_DECLINED")
        {
            return StoreError::PaymentDeclined {
                reason: "INSTRUMENT_DECLINED".to_string(),
            };
        }
        return StoreError::ProviderError {
            provider: "paypal".to_string(),
            message: response
                .message
                .unwrap_or_else(|| format!("HTTP {http_status}")),
        };
    }

    StoreError::ProviderError {
        provider: "paypal".to_string(),
        message: format!("HTTP {http_status}: {body}"),
    }
}

// =============================================================================
// PayPal API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct PayPalOrderResponse {
    id: String,
    status: String,
    #[serde(default)]
    purchase_units: Vec<PurchaseUnit>,
}

impl PayPalOrderResponse {
    /// Capture id of the first completed capture, if any
    fn capture_id(&self) -> Option<String> {
        self.purchase_units
            .first()?
            .payments
            .as_ref()?
            .captures
            .first()
            .map(|c| c.id.clone())
    }
}

#[derive(Debug, Deserialize)]
struct PurchaseUnit {
    #[serde(default)]
    payments: Option<Payments>,
}

#[derive(Debug, Deserialize)]
struct Payments {
    #[serde(default)]
    captures: Vec<Capture>,
}

#[derive(Debug, Deserialize)]
struct Capture {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PayPalErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Vec<PayPalErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct PayPalErrorDetail {
    issue: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway(base_url: &str) -> PayPalGateway {
        PayPalGateway::new(PayPalConfig::new("client", "secret").with_api_base_url(base_url))
            .unwrap()
    }

    async fn mount_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/v1/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "A21AAtest",
                "token_type": "Bearer",
                "expires_in": 32400
            })))
            .mount(server)
            .await;
    }

    #[test]
    fn test_amount_value_formatting() {
        assert_eq!(amount_value(36632, Currency::USD), "366.32");
        assert_eq!(amount_value(100, Currency::USD), "1.00");
        assert_eq!(amount_value(1500, Currency::JPY), "1500");
    }

    #[tokio::test]
    async fn test_create_order() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("POST"))
            .and(path("/v2/checkout/orders"))
            .and(body_string_contains("366.32"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": "5O190127TN364715T",
                "status": "CREATED"
            })))
            .mount(&server)
            .await;

        let intent = gateway(&server.uri())
            .create_intent(36632, Currency::USD)
            .await
            .unwrap();

        assert_eq!(intent.intent_id, "5O190127TN364715T");
        assert_eq!(intent.client_secret, intent.intent_id);
        assert_eq!(intent.status, IntentStatus::RequiresConfirmation);
    }

    #[tokio::test]
    async fn test_capture_completed() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("POST"))
            .and(path("/v2/checkout/orders/5O190127TN364715T/capture"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": "5O190127TN364715T",
                "status": "COMPLETED",
                "purchase_units": [{
                    "payments": { "captures": [{ "id": "3C679366HH908993F" }] }
                }]
            })))
            .mount(&server)
            .await;

        let confirmation = gateway(&server.uri())
            .confirm_intent("5O190127TN364715T", None)
            .await
            .unwrap();

        assert_eq!(confirmation.status, IntentStatus::Succeeded);
        assert_eq!(
            confirmation.payment_ref.as_deref(),
            Some("3C679366HH908993F")
        );
    }

    #[tokio::test]
    async fn test_capture_before_approval_suspends() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("POST"))
            .and(path("/v2/checkout/orders/5O190127TN364715T/capture"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "5O190127TN364715T",
                "status": "PAYER_ACTION_REQUIRED"
            })))
            .mount(&server)
            .await;

        let confirmation = gateway(&server.uri())
            .confirm_intent("5O190127TN364715T", None)
            .await
            .unwrap();

        assert_eq!(confirmation.status, IntentStatus::RequiresAction);
        assert!(confirmation.payment_ref.is_none());
    }

    #[tokio::test]
    async fn test_instrument_declined() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("POST"))
            .and(path("/v2/checkout/orders/5O190127TN364715T/capture"))
            .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
                "name": "UNPROCESSABLE_ENTITY",
                "message": "The requested action could not be performed.",
                "details": [{ "issue": "INSTRUMENT_DECLINED" }]
            })))
            .mount(&server)
            .await;

        let err = gateway(&server.uri())
            .confirm_intent("5O190127TN364715T", None)
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::PaymentDeclined { .. }));
    }
}
