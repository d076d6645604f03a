//! # Money Types
//!
//! Decimal-safe monetary amounts for shopcart-rs.
//!
//! Cart math runs on [`rust_decimal::Decimal`] so repeated
//! add/remove/update cycles never accumulate floating-point drift; amounts
//! are converted to integer minor units (cents) only at the payment-provider
//! boundary, and rounded to display precision only at presentation
//! boundaries.

use crate::error::{StoreError, StoreResult};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Supported currencies (ISO 4217)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    USD,
    EUR,
    GBP,
    JPY,
}

impl Currency {
    /// Returns the ISO 4217 currency code
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::USD => "usd",
            Currency::EUR => "eur",
            Currency::GBP => "gbp",
            Currency::JPY => "jpy",
        }
    }

    /// Parse an ISO 4217 code (case-insensitive)
    pub fn parse(code: &str) -> StoreResult<Self> {
        match code.to_lowercase().as_str() {
            "usd" => Ok(Currency::USD),
            "eur" => Ok(Currency::EUR),
            "gbp" => Ok(Currency::GBP),
            "jpy" => Ok(Currency::JPY),
            other => Err(StoreError::UnsupportedCurrency {
                currency: other.to_string(),
            }),
        }
    }

    /// Number of decimal places for this currency (JPY has 0, others 2)
    pub fn decimal_places(&self) -> u32 {
        match self {
            Currency::JPY => 0,
            _ => 2,
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::JPY => "¥",
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::USD
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

/// A decimal amount in a specific currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Exact decimal amount (unrounded)
    pub amount: Decimal,
    /// Currency
    pub currency: Currency,
}

impl Money {
    /// Create a new amount
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Zero in the given currency
    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    /// Convert to the smallest currency unit (cents for USD).
    ///
    /// Deterministic `round(amount * 10^places)`, midpoint away from zero —
    /// this is the amount handed to payment providers, so the same cart
    /// total always produces the same charge.
    pub fn to_minor_units(&self) -> StoreResult<i64> {
        let scale = Decimal::from(10_i64.pow(self.currency.decimal_places()));
        (self.amount * scale)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or_else(|| StoreError::InvalidAmount {
                message: format!("amount out of range: {}", self.amount),
            })
    }

    /// Build from smallest currency units
    pub fn from_minor_units(minor: i64, currency: Currency) -> Self {
        Self {
            amount: Decimal::new(minor, currency.decimal_places()),
            currency,
        }
    }

    /// Round to display precision (a presentation boundary)
    pub fn rounded(&self) -> Decimal {
        self.amount.round_dp_with_strategy(
            self.currency.decimal_places(),
            RoundingStrategy::MidpointAwayFromZero,
        )
    }

    /// Format for display (e.g., "$366.32")
    pub fn display(&self) -> String {
        let rounded = self.rounded();
        if self.currency.decimal_places() == 0 {
            format!("{}{}", self.currency.symbol(), rounded)
        } else {
            format!("{}{:.2}", self.currency.symbol(), rounded)
        }
    }
}
