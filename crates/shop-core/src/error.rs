//! # Error Types
//!
//! Typed error handling for the shopcart checkout core.
//! Cart, payment, and order operations return `Result<T, StoreError>`.

use thiserror::Error;

/// Core error type for cart, payment, and order operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Bad input, rejected at the boundary before any side effect
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Product not found in catalog
    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: String },

    /// Amount could not be converted or is out of range
    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },

    /// Currency not supported
    #[error("Unsupported currency: {currency}")]
    UnsupportedCurrency { currency: String },

    /// Payment provider could not be reached (transport failure)
    #[error("Provider unavailable [{provider}]: {message}")]
    ProviderUnavailable { provider: String, message: String },

    /// Payment provider API reported an error
    #[error("Provider error [{provider}]: {message}")]
    ProviderError { provider: String, message: String },

    /// Payment was declined; terminal for the attempt, cart is preserved
    #[error("Payment declined: {reason}")]
    PaymentDeclined { reason: String },

    /// Webhook signature verification failed
    #[error("Webhook verification failed: {0}")]
    WebhookVerificationFailed(String),

    /// Webhook payload parsing error
    #[error("Webhook parse error: {0}")]
    WebhookParseError(String),

    /// Payment intent expired or not found
    #[error("Payment intent not found: {intent_id}")]
    IntentNotFound { intent_id: String },

    /// Checkout state machine was driven out of order
    #[error("Invalid checkout state: {0}")]
    InvalidState(String),

    /// Order not found
    #[error("Order not found: {order_id}")]
    OrderNotFound { order_id: String },

    /// Order write failed after payment already succeeded; the payment is
    /// never rolled back — finalization must be retried against the same
    /// payment reference
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Returns true if the operation can be retried as-is
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::ProviderUnavailable { .. }
                | StoreError::ProviderError { .. }
                | StoreError::Persistence(_)
        )
    }

    /// Returns true if money may already have moved when this error surfaced.
    ///
    /// `Persistence` only arises after a successful payment confirmation, so
    /// user-facing copy must say "charged, confirming your order" rather
    /// than "you were not charged".
    pub fn charge_may_exist(&self) -> bool {
        matches!(self, StoreError::Persistence(_))
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            StoreError::Configuration(_) => 500,
            StoreError::Validation(_) => 400,
            StoreError::ProductNotFound { .. } => 404,
            StoreError::InvalidAmount { .. } => 400,
            StoreError::UnsupportedCurrency { .. } => 400,
            StoreError::ProviderUnavailable { .. } => 503,
            StoreError::ProviderError { .. } => 502,
            StoreError::PaymentDeclined { .. } => 402,
            StoreError::WebhookVerificationFailed(_) => 401,
            StoreError::WebhookParseError(_) => 400,
            StoreError::IntentNotFound { .. } => 404,
            StoreError::InvalidState(_) => 409,
            StoreError::OrderNotFound { .. } => 404,
            StoreError::Persistence(_) => 500,
            StoreError::Serialization(_) => 500,
            StoreError::Internal(_) => 500,
        }
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
