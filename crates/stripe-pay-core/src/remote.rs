//! Remote Method Calls
//!
//! The desk talks to the payment server through whitelisted methods. A call
//! either fails in transport, or succeeds with an optional `message` payload
//! whose shape is checked by the caller.
//!
//! ```rust,ignore
//! let reply = remote
//!     .call(methods::CREATE_SALES_SESSION, json!({"sales_invoice": "INV-0001"}))
//!     .await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Whitelisted method names
pub mod methods {
    pub const CREATE_SALES_SESSION: &str = "stripe_pay.methods.stripe.create_stripe_url";
    pub const CREATE_COLLECTIVE_SESSION: &str =
        "stripe_pay.methods.stripe_collective.create_stripe_url_collective";
    pub const CHECK_TRANSFER_STATUS: &str = "stripe_pay.methods.stripe.check_transfer_status";
    pub const CREATE_STRIPE_PAYMENT: &str = "stripe_pay.methods.stripe.create_stripe_payment";
    pub const STRIPE_WEBHOOK: &str = "stripe_pay.api.stripe_webhook.stripe_payment_webhook";
}

/// Transport for whitelisted method calls
#[async_trait]
pub trait RemoteMethods: Send + Sync {
    /// Call `method` with keyword `args`.
    ///
    /// `Ok(None)` means the call succeeded without a payload.
    /// `Err(PayError::Transport)` means the call itself failed.
    async fn call(&self, method: &str, args: Value) -> Result<Option<Value>>;
}

/// Reply to a create-session call
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Reply to a transfer status query
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}
