//! Application State

use std::sync::Arc;

use stripe_pay_core::DocumentStore;
use stripe_pay_payments::PaymentMethods;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Document store backing the resource API and the payment methods
    pub store: Arc<dyn DocumentStore>,

    /// Whitelisted payment methods (None if Stripe is not configured)
    pub methods: Option<Arc<PaymentMethods>>,

    /// Webhook signing secret (None if Stripe is not configured)
    pub webhook_secret: Option<String>,
}
