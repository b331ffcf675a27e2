//! Stripe Webhook Handling
//!
//! Reconciles Collective Invoices with Checkout outcomes. Card payments settle
//! on `checkout.session.completed`; bank debits settle later through the
//! `async_payment_*` events.

use std::sync::Arc;
use stripe::{CheckoutSessionPaymentStatus, Event, EventObject, EventType, Webhook};

use stripe_pay_core::store::{self, DocumentStore};
use stripe_pay_core::{CollectiveInvoice, DocumentKind, InvoiceStatus};

use crate::error::{PaymentError, Result};

/// Parsed webhook event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookEvent {
    /// Checkout finished; `paid` is false while an async payment is pending
    CheckoutCompleted {
        session_id: String,
        payment_intent_id: Option<String>,
        paid: bool,
    },

    /// Delayed payment (ACH/bank) settled
    AsyncPaymentSucceeded {
        session_id: String,
        payment_intent_id: Option<String>,
    },

    /// Delayed payment (ACH/bank) failed
    AsyncPaymentFailed {
        session_id: String,
        payment_intent_id: Option<String>,
    },

    PaymentSucceeded {
        payment_intent_id: String,
        amount: i64,
    },

    PaymentFailed {
        payment_intent_id: String,
        error: Option<String>,
    },

    /// Unhandled event type
    Other {
        event_type: String,
    },
}

/// Webhook handler
pub struct WebhookHandler {
    store: Arc<dyn DocumentStore>,
}

impl WebhookHandler {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Verify webhook signature and parse event
    pub fn parse_event(&self, payload: &str, signature: &str, secret: &str) -> Result<Event> {
        Webhook::construct_event(payload, signature, secret)
            .map_err(|e| PaymentError::WebhookSignature(e.to_string()))
    }

    /// Process a verified webhook event
    pub async fn handle(&self, event: Event) -> Result<WebhookEvent> {
        tracing::info!(event_id = %event.id, event_type = ?event.type_, "Processing Stripe webhook");

        let parsed = Self::classify(&event)?;
        self.apply(&parsed).await?;

        Ok(parsed)
    }

    /// Apply a classified event to the invoices
    pub async fn apply(&self, event: &WebhookEvent) -> Result<()> {
        match event {
            WebhookEvent::CheckoutCompleted { session_id, payment_intent_id, paid } => {
                if !*paid {
                    tracing::info!(session_id = %session_id, "Checkout completed unpaid - waiting for async payment");
                    return Ok(());
                }
                self.update_by_session(session_id, payment_intent_id.as_deref(), InvoiceStatus::Paid)
                    .await
            }

            WebhookEvent::AsyncPaymentSucceeded { session_id, payment_intent_id } => {
                self.update_by_session(session_id, payment_intent_id.as_deref(), InvoiceStatus::Paid)
                    .await
            }

            WebhookEvent::AsyncPaymentFailed { session_id, payment_intent_id } => {
                self.update_by_session(session_id, payment_intent_id.as_deref(), InvoiceStatus::Failed)
                    .await
            }

            WebhookEvent::PaymentSucceeded { payment_intent_id, amount } => {
                tracing::info!(payment_intent_id = %payment_intent_id, amount, "Payment succeeded");
                Ok(())
            }

            WebhookEvent::PaymentFailed { payment_intent_id, error } => {
                tracing::warn!(payment_intent_id = %payment_intent_id, error = ?error, "Payment failed");

                let names = self
                    .store
                    .find(DocumentKind::CollectiveInvoice, "custom_stripe_payment_intent_id", payment_intent_id)
                    .await?;
                let Some(name) = names.first() else {
                    return Ok(());
                };

                let mut invoice: CollectiveInvoice = store::load_existing(self.store.as_ref(), name).await?;
                invoice.status = InvoiceStatus::Failed;
                store::save(self.store.as_ref(), &invoice).await?;

                tracing::info!(invoice = %invoice.name, "Updated invoice to Failed status");
                Ok(())
            }

            WebhookEvent::Other { event_type } => {
                tracing::debug!(event_type = %event_type, "Unhandled webhook event");
                Ok(())
            }
        }
    }

    async fn update_by_session(
        &self,
        session_id: &str,
        payment_intent_id: Option<&str>,
        status: InvoiceStatus,
    ) -> Result<()> {
        let names = self
            .store
            .find(DocumentKind::CollectiveInvoice, "custom_stripe_session_id", session_id)
            .await?;

        let Some(name) = names.first() else {
            tracing::warn!(session_id = %session_id, "No invoice found for session");
            return Ok(());
        };

        let mut invoice: CollectiveInvoice = store::load_existing(self.store.as_ref(), name).await?;
        let old_status = std::mem::replace(&mut invoice.status, status);
        if let Some(pi) = payment_intent_id {
            invoice.custom_stripe_payment_intent_id = Some(pi.to_string());
        }
        store::save(self.store.as_ref(), &invoice).await?;

        tracing::info!(
            invoice = %invoice.name,
            old_status = old_status.as_str(),
            new_status = invoice.status.as_str(),
            payment_intent_id = ?invoice.custom_stripe_payment_intent_id,
            "Invoice updated from webhook"
        );
        Ok(())
    }

    /// Parse Stripe event into our event type
    fn classify(event: &Event) -> Result<WebhookEvent> {
        match event.type_ {
            EventType::CheckoutSessionCompleted
            | EventType::CheckoutSessionAsyncPaymentSucceeded
            | EventType::CheckoutSessionAsyncPaymentFailed => {
                let EventObject::CheckoutSession(session) = &event.data.object else {
                    return Err(PaymentError::WebhookParse("Invalid checkout session data".into()));
                };

                let session_id = session.id.to_string();
                let payment_intent_id = session.payment_intent.as_ref().map(|pi| pi.id().to_string());

                Ok(match event.type_ {
                    EventType::CheckoutSessionCompleted => WebhookEvent::CheckoutCompleted {
                        session_id,
                        payment_intent_id,
                        paid: matches!(session.payment_status, CheckoutSessionPaymentStatus::Paid),
                    },
                    EventType::CheckoutSessionAsyncPaymentSucceeded => {
                        WebhookEvent::AsyncPaymentSucceeded { session_id, payment_intent_id }
                    }
                    _ => WebhookEvent::AsyncPaymentFailed { session_id, payment_intent_id },
                })
            }

            EventType::PaymentIntentSucceeded | EventType::PaymentIntentPaymentFailed => {
                let EventObject::PaymentIntent(intent) = &event.data.object else {
                    return Err(PaymentError::WebhookParse("Invalid payment intent data".into()));
                };

                let payment_intent_id = intent.id.to_string();
                Ok(if matches!(event.type_, EventType::PaymentIntentSucceeded) {
                    WebhookEvent::PaymentSucceeded { payment_intent_id, amount: intent.amount }
                } else {
                    WebhookEvent::PaymentFailed {
                        payment_intent_id,
                        error: intent.last_payment_error.as_ref().and_then(|e| e.message.clone()),
                    }
                })
            }

            _ => Ok(WebhookEvent::Other {
                event_type: format!("{:?}", event.type_),
            }),
        }
    }
}
