//! # PayPal Configuration
//!
//! Credentials and environment selection for the PayPal REST API.

use shop_core::StoreError;
use std::env;

const SANDBOX_BASE_URL: &str = "https://api-m.sandbox.paypal.com";
const LIVE_BASE_URL: &str = "https://api-m.paypal.com";

/// PayPal API configuration
#[derive(Debug, Clone)]
pub struct PayPalConfig {
    /// REST app client id
    pub client_id: String,

    /// REST app client secret
    pub client_secret: String,

    /// API base URL (sandbox by default, overridable for testing)
    pub api_base_url: String,
}

impl PayPalConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `PAYPAL_CLIENT_ID`
    /// - `PAYPAL_CLIENT_SECRET`
    ///
    /// Optional:
    /// - `PAYPAL_ENV` — `live` or `sandbox` (default sandbox)
    pub fn from_env() -> Result<Self, StoreError> {
        dotenvy::dotenv().ok();

        let client_id = env::var("PAYPAL_CLIENT_ID")
            .map_err(|_| StoreError::Configuration("PAYPAL_CLIENT_ID not set".to_string()))?;
        let client_secret = env::var("PAYPAL_CLIENT_SECRET")
            .map_err(|_| StoreError::Configuration("PAYPAL_CLIENT_SECRET not set".to_string()))?;

        let api_base_url = match env::var("PAYPAL_ENV").as_deref() {
            Ok("live") => LIVE_BASE_URL.to_string(),
            Ok("sandbox") | Err(_) => SANDBOX_BASE_URL.to_string(),
            Ok(other) => {
                return Err(StoreError::Configuration(format!(
                    "PAYPAL_ENV must be live or sandbox, got {other}"
                )))
            }
        };

        Ok(Self {
            client_id,
            client_secret,
            api_base_url,
        })
    }

    /// Create config with explicit values (for testing)
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            api_base_url: SANDBOX_BASE_URL.to_string(),
        }
    }

    /// Check if pointed at the live environment
    pub fn is_live(&self) -> bool {
        self.api_base_url == LIVE_BASE_URL
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_sandbox() {
        let config = PayPalConfig::new("client", "secret");
        assert!(!config.is_live());
        assert_eq!(config.api_base_url, SANDBOX_BASE_URL);
    }

    #[test]
    fn test_base_url_override() {
        let config = PayPalConfig::new("client", "secret").with_api_base_url("http://localhost:9");
        assert_eq!(config.api_base_url, "http://localhost:9");
    }
}
