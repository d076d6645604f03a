//! # Checkout State Machine
//!
//! Drives one payment attempt to a terminal outcome:
//!
//! ```text
//! Idle → IntentCreated → Confirming → (RequiresAction → Confirming)* → Succeeded
//!                                                                    ↘ Failed
//! ```
//!
//! `RequiresAction` is a suspension point: the provider wants interactive
//! verification (3-D Secure and friends), so control returns to the caller
//! for however long the human takes. The attempt is plain owned state —
//! nothing is locked while suspended, and dropping the attempt abandons it:
//! no order is created and the provider's own expiry reclaims the intent.
//! An abandoned intent is never assumed failed; the provider may still
//! complete it out-of-band.

use crate::error::{StoreError, StoreResult};
use crate::gateway::{BoxedGateway, IntentStatus, PaymentIntent, PaymentMethod};
use crate::money::Money;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Attempt lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptState {
    Idle,
    IntentCreated,
    Confirming,
    RequiresAction,
    Succeeded,
    Failed,
}

/// Non-error outcome of a confirmation round
#[derive(Debug, Clone)]
pub enum Confirmation {
    /// Terminal success; `payment_ref` keys order finalization
    Succeeded { payment_ref: String },

    /// Suspension: the caller must complete interactive verification with
    /// this handle, then call [`CheckoutAttempt::resume`]
    RequiresAction { client_secret: String },
}

/// One checkout attempt against a single payment gateway
pub struct CheckoutAttempt {
    gateway: BoxedGateway,
    state: AttemptState,
    intent: Option<PaymentIntent>,
}

impl CheckoutAttempt {
    /// Start a fresh attempt
    pub fn new(gateway: BoxedGateway) -> Self {
        Self {
            gateway,
            state: AttemptState::Idle,
            intent: None,
        }
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }

    /// The intent created for this attempt, if any
    pub fn intent(&self) -> Option<&PaymentIntent> {
        self.intent.as_ref()
    }

    /// Handle for client-side confirmation, once an intent exists
    pub fn client_secret(&self) -> Option<&str> {
        self.intent.as_ref().map(|i| i.client_secret.as_str())
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, AttemptState::Succeeded | AttemptState::Failed)
    }

    /// Request a payment intent for the cart total.
    ///
    /// The total converts to minor units deterministically
    /// (`Money::to_minor_units`). A provider failure surfaces the error
    /// with no side effects: the attempt stays `Idle` and can retry.
    pub async fn create_intent(&mut self, total: &Money) -> StoreResult<&PaymentIntent> {
        if self.state != AttemptState::Idle {
            return Err(StoreError::InvalidState(format!(
                "create_intent from {:?}",
                self.state
            )));
        }

        let amount_minor = total.to_minor_units()?;
        if amount_minor <= 0 {
            return Err(StoreError::Validation(
                "payment amount must be positive".to_string(),
            ));
        }

        debug!(
            provider = self.gateway.provider_name(),
            amount_minor, "creating payment intent"
        );

        let intent = self.gateway.create_intent(amount_minor, total.currency).await?;
        info!(
            provider = self.gateway.provider_name(),
            intent_id = %intent.intent_id,
            "payment intent created"
        );

        self.state = AttemptState::IntentCreated;
        Ok(self.intent.insert(intent))
    }

    /// Submit a payment method for confirmation
    pub async fn confirm(&mut self, method: &PaymentMethod) -> StoreResult<Confirmation> {
        if !matches!(
            self.state,
            AttemptState::IntentCreated | AttemptState::RequiresAction
        ) {
            return Err(StoreError::InvalidState(format!(
                "confirm from {:?}",
                self.state
            )));
        }
        self.run_confirmation(Some(method)).await
    }

    /// Re-confirm after the caller completed the interactive step
    pub async fn resume(&mut self) -> StoreResult<Confirmation> {
        if self.state != AttemptState::RequiresAction {
            return Err(StoreError::InvalidState(format!(
                "resume from {:?}",
                self.state
            )));
        }
        self.run_confirmation(None).await
    }

    async fn run_confirmation(
        &mut self,
        method: Option<&PaymentMethod>,
    ) -> StoreResult<Confirmation> {
        let client_secret = self
            .client_secret()
            .ok_or_else(|| StoreError::Internal("confirming without an intent".to_string()))?
            .to_string();

        self.state = AttemptState::Confirming;

        let confirmation = match self.gateway.confirm_intent(&client_secret, method).await {
            Ok(confirmation) => confirmation,
            Err(err) => {
                warn!(
                    provider = self.gateway.provider_name(),
                    error = %err,
                    "payment confirmation failed"
                );
                self.state = AttemptState::Failed;
                return Err(err);
            }
        };

        match confirmation.status {
            IntentStatus::Succeeded => match confirmation.payment_ref {
                Some(payment_ref) => {
                    info!(payment_ref = %payment_ref, "payment confirmed");
                    self.state = AttemptState::Succeeded;
                    Ok(Confirmation::Succeeded { payment_ref })
                }
                None => {
                    self.state = AttemptState::Failed;
                    Err(StoreError::Internal(
                        "provider reported success without a payment reference".to_string(),
                    ))
                }
            },
            IntentStatus::RequiresAction => {
                debug!("confirmation suspended for interactive verification");
                self.state = AttemptState::RequiresAction;
                Ok(Confirmation::RequiresAction { client_secret })
            }
            other => {
                self.state = AttemptState::Failed;
                Err(StoreError::ProviderError {
                    provider: self.gateway.provider_name().to_string(),
                    message: format!("unexpected intent status after confirmation: {other:?}"),
                })
            }
        }
    }
}
