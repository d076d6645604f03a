//! # Payment Gateway Trait
//!
//! Strategy seam for payment providers. Each provider (Stripe, PayPal)
//! implements [`PaymentGateway`]; the checkout state machine and the API
//! layer only ever see the trait, so providers can be swapped at runtime
//! via [`GatewaySelector`].
//!
//! A provider is two opaque capabilities: create a payment intent for an
//! amount in minor units, and confirm that intent with a payment method.
//! Everything else (3-D Secure redirects, hosted pages) is surfaced to the
//! caller through [`IntentStatus::RequiresAction`].

use crate::error::{StoreError, StoreResult};
use crate::money::Currency;
use crate::order::ShippingAddress;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Provider-side status of a payment intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    Succeeded,
    Canceled,
}

/// Ephemeral provider-scoped record of one attempted charge.
///
/// Owned by a checkout attempt for its duration and discarded after the
/// terminal outcome; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Provider's intent identifier
    pub intent_id: String,

    /// Opaque handle the client needs to drive confirmation
    pub client_secret: String,

    /// Amount in smallest currency units
    pub amount_minor: i64,

    pub currency: Currency,

    pub status: IntentStatus,
}

/// Card/billing details submitted for confirmation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BillingDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<ShippingAddress>,
}

/// A tokenized payment method reference plus optional billing details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethod {
    /// Provider-side payment method token (e.g., `pm_...`)
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing: Option<BillingDetails>,
}

impl PaymentMethod {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            billing: None,
        }
    }
}

/// Result of a confirmation round trip
#[derive(Debug, Clone)]
pub struct IntentConfirmation {
    pub status: IntentStatus,

    /// Terminal payment reference, present once the intent succeeded; this
    /// is the value order finalization is keyed on
    pub payment_ref: Option<String>,
}

/// Webhook event kinds this core reacts to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentEventKind {
    IntentSucceeded,
    IntentFailed,
    Unknown(String),
}

/// A verified, parsed provider webhook event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub event_id: String,
    pub kind: PaymentEventKind,
    pub provider: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_ref: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_minor: Option<i64>,

    /// Raw event payload for handlers that need provider-specific fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,

    pub timestamp: DateTime<Utc>,
}

/// Core trait for payment provider implementations
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment intent for an amount in minor units, returning the
    /// opaque handle the caller needs for confirmation
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: Currency,
    ) -> StoreResult<PaymentIntent>;

    /// Confirm an intent. `method` is `None` when resuming after an
    /// interactive verification step, where the provider already holds the
    /// payment method.
    async fn confirm_intent(
        &self,
        client_secret: &str,
        method: Option<&PaymentMethod>,
    ) -> StoreResult<IntentConfirmation>;

    /// Verify a webhook signature and parse the event. Providers without a
    /// webhook channel keep the default.
    async fn verify_webhook(&self, _payload: &[u8], _signature: &str) -> StoreResult<PaymentEvent> {
        Err(StoreError::Configuration(format!(
            "{} does not support webhooks",
            self.provider_name()
        )))
    }

    /// Provider name (for logging and routing)
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a shared, dynamically dispatched gateway
pub type BoxedGateway = Arc<dyn PaymentGateway>;

/// Registry of payment gateways with a default provider
#[derive(Clone, Default)]
pub struct GatewaySelector {
    gateways: std::collections::HashMap<String, BoxedGateway>,
    default_provider: String,
}

impl GatewaySelector {
    /// Create a new selector with a default provider name
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            gateways: std::collections::HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a gateway under its own provider name
    pub fn register(&mut self, gateway: BoxedGateway) {
        self.gateways
            .insert(gateway.provider_name().to_string(), gateway);
    }

    /// Register with builder pattern
    pub fn with_gateway(mut self, gateway: BoxedGateway) -> Self {
        self.register(gateway);
        self
    }

    /// Get the default gateway
    pub fn default_gateway(&self) -> Option<&BoxedGateway> {
        self.gateways.get(&self.default_provider)
    }

    /// Get a gateway by provider name
    pub fn get(&self, provider: &str) -> Option<&BoxedGateway> {
        self.gateways.get(provider)
    }

    /// Get by name or fall back to the default
    pub fn get_or_default(&self, provider: Option<&str>) -> Option<&BoxedGateway> {
        match provider {
            Some(name) => self.get(name).or_else(|| self.default_gateway()),
            None => self.default_gateway(),
        }
    }

    /// List registered provider names
    pub fn providers(&self) -> Vec<&str> {
        self.gateways.keys().map(|s| s.as_str()).collect()
    }
}
