//! # stripe-pay-payments
//!
//! Server side of the stripe-pay desk buttons.
//!
//! ## Flows
//!
//! ### Hosted Checkout
//!
//! ```text
//! ┌─────────────┐  create_stripe_url   ┌──────────────────┐
//! │  Desk form  │─────────────────────▶│ PaymentMethods   │──▶ Stripe Checkout
//! └─────────────┘◀──── {url, id} ──────└──────────────────┘     │
//!                                              ▲               │ webhook
//!                                              └─ WebhookHandler ◀┘
//! ```
//!
//! The session id is written onto the invoice so the webhook can find it
//! again, and so the desk can link to the session in the dashboard.
//!
//! ### Connect transfers
//!
//! `create_stripe_payment` moves an invoice total to the connected account
//! and pays it out, logging each step as a `Stripe Transfer Details` record.
//! The desk later polls `check_transfer_status` for those records.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stripe_pay_payments::{PaymentMethods, StripeClient};
//!
//! let stripe = Arc::new(StripeClient::from_env()?);
//! let methods = PaymentMethods::new(stripe, store, "https://erp.example.com");
//!
//! let reply = methods.create_stripe_url("ACC-SINV-2025-00001").await?;
//! // Redirect user to: reply.url
//! ```

mod error;
mod gateway;
mod methods;
mod webhook;

pub use error::{PaymentError, Result};
pub use gateway::{
    CheckoutRequest, CheckoutSession, StripeApi, StripeClient, StripeConfig, to_minor_units,
    transfer_status_label,
};
pub use methods::{PaymentMethods, PaymentReply};
pub use webhook::{WebhookEvent, WebhookHandler};
