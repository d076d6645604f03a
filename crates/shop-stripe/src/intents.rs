//! # Stripe PaymentIntents
//!
//! [`PaymentGateway`] implementation over Stripe's PaymentIntents API:
//! an intent is created for the cart total, the client secret goes to the
//! caller, and confirmation is driven server-side against
//! `/v1/payment_intents/{id}/confirm`. Card declines map to
//! `PaymentDeclined`; `requires_action` statuses surface the 3-D Secure
//! suspension point to the checkout state machine.

use crate::config::StripeConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use shop_core::{
    Currency, IntentConfirmation, IntentStatus, PaymentEvent, PaymentEventKind, PaymentGateway,
    PaymentIntent, PaymentMethod, StoreError, StoreResult,
};
use tracing::{debug, error, info, instrument};

/// Stripe PaymentIntents gateway
pub struct StripeGateway {
    config: StripeConfig,
    client: Client,
}

impl StripeGateway {
    /// Create a new gateway
    pub fn new(config: StripeConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| StoreError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> StoreResult<Self> {
        Self::new(StripeConfig::from_env()?)
    }

    /// Publishable key for browser clients, when configured
    pub fn publishable_key(&self) -> Option<&str> {
        self.config.publishable_key.as_deref()
    }

    async fn post_form(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> StoreResult<StripeIntentResponse> {
        let url = format!("{}{}", self.config.api_base_url, path);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .form(form)
            .send()
            .await
            .map_err(|e| StoreError::ProviderUnavailable {
                provider: "stripe".to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::ProviderUnavailable {
                provider: "stripe".to_string(),
                message: e.to_string(),
            })?;

        if !status.is_success() {
            error!("Stripe API error: status={}, body={}", status, body);
            return Err(parse_stripe_error(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            StoreError::Serialization(format!("failed to parse Stripe response: {e}"))
        })
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self), fields(amount_minor))]
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: Currency,
    ) -> StoreResult<PaymentIntent> {
        let form = vec![
            ("amount".to_string(), amount_minor.to_string()),
            ("currency".to_string(), currency.as_str().to_string()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];

        debug!("creating Stripe payment intent");
        let response = self.post_form("/v1/payment_intents", &form).await?;

        let client_secret = response.client_secret.ok_or_else(|| {
            StoreError::ProviderError {
                provider: "stripe".to_string(),
                message: "payment intent response missing client_secret".to_string(),
            }
        })?;

        info!(intent_id = %response.id, "created Stripe payment intent");

        Ok(PaymentIntent {
            intent_id: response.id,
            client_secret,
            amount_minor: response.amount,
            currency,
            status: parse_intent_status(&response.status)?,
        })
    }

    #[instrument(skip(self, client_secret, method))]
    async fn confirm_intent(
        &self,
        client_secret: &str,
        method: Option<&PaymentMethod>,
    ) -> StoreResult<IntentConfirmation> {
        let intent_id = intent_id_from_secret(client_secret)?;

        let mut form = vec![("client_secret".to_string(), client_secret.to_string())];
        if let Some(method) = method {
            form.push(("payment_method".to_string(), method.id.clone()));
        }

        let response = self
            .post_form(&format!("/v1/payment_intents/{intent_id}/confirm"), &form)
            .await?;

        let status = parse_intent_status(&response.status)?;
        debug!(intent_id = %response.id, ?status, "Stripe confirmation result");

        Ok(IntentConfirmation {
            payment_ref: matches!(status, IntentStatus::Succeeded).then_some(response.id),
            status,
        })
    }

    #[instrument(skip(self, payload, signature))]
    async fn verify_webhook(&self, payload: &[u8], signature: &str) -> StoreResult<PaymentEvent> {
        let sig = parse_signature_header(signature)?;

        // Reject replayed events outside the 5 minute tolerance window
        let now = Utc::now().timestamp();
        if (now - sig.timestamp).abs() > 300 {
            return Err(StoreError::WebhookVerificationFailed(
                "timestamp outside tolerance".to_string(),
            ));
        }

        let signed_payload = format!("{}.{}", sig.timestamp, String::from_utf8_lossy(payload));
        let expected = compute_hmac_sha256(&self.config.webhook_secret, &signed_payload);

        let valid = sig
            .signatures
            .iter()
            .any(|candidate| constant_time_compare(candidate, &expected));
        if !valid {
            return Err(StoreError::WebhookVerificationFailed(
                "signature mismatch".to_string(),
            ));
        }

        let event: StripeWebhookEvent = serde_json::from_slice(payload)
            .map_err(|e| StoreError::WebhookParseError(format!("failed to parse webhook: {e}")))?;

        let kind = match event.event_type.as_str() {
            "payment_intent.succeeded" => PaymentEventKind::IntentSucceeded,
            "payment_intent.payment_failed" => PaymentEventKind::IntentFailed,
            other => PaymentEventKind::Unknown(other.to_string()),
        };

        let payment_ref = event
            .data
            .object
            .get("id")
            .and_then(|v| v.as_str())
            .map(String::from);
        let amount_minor = event.data.object.get("amount").and_then(|v| v.as_i64());

        debug!(event_id = %event.id, "verified Stripe webhook");

        Ok(PaymentEvent {
            event_id: event.id,
            kind,
            provider: "stripe".to_string(),
            payment_ref,
            amount_minor,
            raw: Some(serde_json::Value::Object(event.data.object)),
            timestamp: DateTime::from_timestamp(event.created, 0).unwrap_or_else(Utc::now),
        })
    }

    fn provider_name(&self) -> &'static str {
        "stripe"
    }
}

/// Derive the intent id from a client secret (`pi_..._secret_...`)
fn intent_id_from_secret(client_secret: &str) -> StoreResult<&str> {
    match client_secret.split_once("_secret") {
        Some((id, _)) if !id.is_empty() => Ok(id),
        _ => Err(StoreError::Validation(format!(
            "malformed client secret: {client_secret}"
        ))),
    }
}

fn parse_intent_status(status: &str) -> StoreResult<IntentStatus> {
    match status {
        "requires_payment_method" => Ok(IntentStatus::RequiresPaymentMethod),
        "requires_confirmation" => Ok(IntentStatus::RequiresConfirmation),
        "requires_action" => Ok(IntentStatus::RequiresAction),
        "processing" => Ok(IntentStatus::Processing),
        "succeeded" => Ok(IntentStatus::Succeeded),
        "canceled" => Ok(IntentStatus::Canceled),
        other => Err(StoreError::ProviderError {
            provider: "stripe".to_string(),
            message: format!("unknown intent status: {other}"),
        }),
    }
}

fn parse_stripe_error(http_status: u16, body: &str) -> StoreError {
    if let Ok(response) = serde_json::from_str::<StripeErrorResponse>(body) {
        let err = response.error;
        if err.error_type.as_deref() == Some("card_error") {
            return StoreError::PaymentDeclined {
                reason: err
                    .decline_code
                    .or(err.code)
                    .unwrap_or_else(|| err.message.clone()),
            };
        }
        return StoreError::ProviderError {
            provider: "stripe".to_string(),
            message: err.message,
        };
    }

    StoreError::ProviderError {
        provider: "stripe".to_string(),
        message: format!("HTTP {http_status}: {body}"),
    }
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeIntentResponse {
    id: String,
    #[serde(default)]
    client_secret: Option<String>,
    amount: i64,
    status: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    decline_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeWebhookEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    created: i64,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: serde_json::Map<String, serde_json::Value>,
}

// =============================================================================
// Webhook Signature Verification
// =============================================================================

struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<String>,
}

fn parse_signature_header(header: &str) -> StoreResult<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        match part.split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => signatures.push(value.to_string()),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        StoreError::WebhookVerificationFailed("missing timestamp in signature".to_string())
    })?;

    if signatures.is_empty() {
        return Err(StoreError::WebhookVerificationFailed(
            "no v1 signature found".to_string(),
        ));
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

fn compute_hmac_sha256(secret: &str, message: &str) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}
