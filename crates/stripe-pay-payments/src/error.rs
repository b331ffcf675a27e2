//! Payment Error Types

use stripe_pay_core::PayError;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Stripe API error
    #[error("Stripe error: {0}")]
    Stripe(String),

    /// Webhook signature verification failed
    #[error("Webhook signature invalid: {0}")]
    WebhookSignature(String),

    /// Webhook payload parsing failed
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// Request refused by business rules
    #[error("{0}")]
    Validation(String),

    /// Method is not whitelisted
    #[error("Method not found: {0}")]
    UnknownMethod(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Document load/save failure
    #[error(transparent)]
    Document(#[from] PayError),
}

impl PaymentError {
    /// Check if this error is retryable
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Stripe(_) => true,
            Self::Document(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Stripe(msg) => format!("Stripe request failed: {msg}"),
            Self::Validation(msg) => msg.clone(),
            Self::UnknownMethod(name) => format!("Method {name} is not whitelisted."),
            Self::Config(_) => "Payments are not configured.".into(),
            Self::Document(e) => e.user_message(),
            _ => "An error occurred processing your request.".into(),
        }
    }
}

impl From<stripe::StripeError> for PaymentError {
    fn from(err: stripe::StripeError) -> Self {
        Self::Stripe(err.to_string())
    }
}
