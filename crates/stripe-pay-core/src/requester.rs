//! Payment Session Requester
//!
//! Asks the server for a Stripe Checkout session for one invoice and folds
//! the reply into a three-way outcome. No side effects happen here.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::document::DocumentKind;
use crate::remote::{RemoteMethods, methods};

/// Invoice types that can be paid through Checkout
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceKind {
    SalesInvoice,
    CollectiveInvoice,
}

impl InvoiceKind {
    /// Whitelisted method that creates the session
    pub const fn method(self) -> &'static str {
        match self {
            Self::SalesInvoice => methods::CREATE_SALES_SESSION,
            Self::CollectiveInvoice => methods::CREATE_COLLECTIVE_SESSION,
        }
    }

    /// Keyword the method expects the invoice name under
    pub const fn arg_name(self) -> &'static str {
        match self {
            Self::SalesInvoice => "sales_invoice",
            Self::CollectiveInvoice => "collective_invoice",
        }
    }

    pub const fn document_kind(self) -> DocumentKind {
        match self {
            Self::SalesInvoice => DocumentKind::SalesInvoice,
            Self::CollectiveInvoice => DocumentKind::CollectiveInvoice,
        }
    }
}

/// Request to create a payment session; never persisted
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSessionRequest {
    pub invoice: InvoiceKind,
    pub document: String,
}

impl PaymentSessionRequest {
    pub fn new(invoice: InvoiceKind, document: impl Into<String>) -> Self {
        Self {
            invoice,
            document: document.into(),
        }
    }
}

/// Outcome of a create-session call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Session exists; send the user to `url`
    Created {
        url: String,
        session_id: Option<String>,
    },

    /// Server answered but produced no checkout URL
    Declined,

    /// The call itself failed
    TransportError(String),
}

impl SessionOutcome {
    /// Fold a raw `message` payload into an outcome.
    ///
    /// Only a non-empty `url` decides success. The session id is read from
    /// `id`, falling back to `session_id`, and dropped if it is not a string.
    pub fn from_reply(reply: Option<Value>) -> Self {
        let Some(value) = reply else {
            return Self::Declined;
        };

        let text = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        match text("url") {
            Some(url) => Self::Created {
                url,
                session_id: text("id").or_else(|| text("session_id")),
            },
            None => {
                tracing::debug!(reply = %value, "Create-session reply carried no checkout URL");
                Self::Declined
            }
        }
    }
}

/// Issues create-session calls
pub struct SessionRequester {
    remote: Arc<dyn RemoteMethods>,
}

impl SessionRequester {
    pub fn new(remote: Arc<dyn RemoteMethods>) -> Self {
        Self { remote }
    }

    /// Request a checkout session for one invoice
    pub async fn create_session(&self, request: &PaymentSessionRequest) -> SessionOutcome {
        let method = request.invoice.method();
        let mut args = serde_json::Map::new();
        args.insert(request.invoice.arg_name().to_string(), json!(request.document));

        tracing::debug!(method, document = %request.document, "Requesting payment session");

        match self.remote.call(method, args.into()).await {
            Ok(reply) => SessionOutcome::from_reply(reply),
            Err(e) => {
                tracing::error!(method, document = %request.document, error = %e, "Stripe session request failed");
                SessionOutcome::TransportError(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRemote;

    #[tokio::test]
    async fn test_created_with_session_id() {
        let remote = Arc::new(ScriptedRemote::reply(json!({
            "url": "https://checkout.example/sess_1",
            "id": "sess_1",
        })));
        let requester = SessionRequester::new(remote.clone());

        let outcome = requester
            .create_session(&PaymentSessionRequest::new(InvoiceKind::SalesInvoice, "INV-0001"))
            .await;

        assert_eq!(
            outcome,
            SessionOutcome::Created {
                url: "https://checkout.example/sess_1".into(),
                session_id: Some("sess_1".into()),
            }
        );

        let calls = remote.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, methods::CREATE_SALES_SESSION);
        assert_eq!(calls[0].1, json!({"sales_invoice": "INV-0001"}));
    }

    #[tokio::test]
    async fn test_collective_uses_its_own_method() {
        let remote = Arc::new(ScriptedRemote::reply(json!({"url": "https://x"})));
        let requester = SessionRequester::new(remote.clone());

        let outcome = requester
            .create_session(&PaymentSessionRequest::new(InvoiceKind::CollectiveInvoice, "COL-7"))
            .await;

        assert_eq!(
            outcome,
            SessionOutcome::Created { url: "https://x".into(), session_id: None }
        );
        assert_eq!(remote.calls()[0].0, methods::CREATE_COLLECTIVE_SESSION);
        assert_eq!(remote.calls()[0].1, json!({"collective_invoice": "COL-7"}));
    }

    #[test]
    fn test_declined_shapes() {
        assert_eq!(SessionOutcome::from_reply(None), SessionOutcome::Declined);
        assert_eq!(SessionOutcome::from_reply(Some(json!({}))), SessionOutcome::Declined);
        assert_eq!(SessionOutcome::from_reply(Some(json!({"url": ""}))), SessionOutcome::Declined);
        assert_eq!(
            SessionOutcome::from_reply(Some(json!({"id": "sess_1"}))),
            SessionOutcome::Declined
        );
        // an error object in place of the payload is indistinguishable from a decline
        assert_eq!(
            SessionOutcome::from_reply(Some(json!("Stripe is down"))),
            SessionOutcome::Declined
        );
    }

    #[test]
    fn test_url_alone_decides_created() {
        let url = "https://checkout.example/sess_1";

        assert_eq!(
            SessionOutcome::from_reply(Some(json!({"url": url, "id": "sess_1", "session_id": "sess_1"}))),
            SessionOutcome::Created { url: url.into(), session_id: Some("sess_1".into()) }
        );
        assert_eq!(
            SessionOutcome::from_reply(Some(json!({"url": url, "id": 42}))),
            SessionOutcome::Created { url: url.into(), session_id: None }
        );
        assert_eq!(
            SessionOutcome::from_reply(Some(json!({"url": url, "id": 42, "session_id": "cs_1"}))),
            SessionOutcome::Created { url: url.into(), session_id: Some("cs_1".into()) }
        );
        assert_eq!(SessionOutcome::from_reply(Some(json!({"url": 7}))), SessionOutcome::Declined);
    }

    #[test]
    fn test_session_id_alias() {
        let outcome = SessionOutcome::from_reply(Some(json!({
            "url": "https://x",
            "session_id": "cs_test_1",
        })));
        assert_eq!(
            outcome,
            SessionOutcome::Created { url: "https://x".into(), session_id: Some("cs_test_1".into()) }
        );
    }

    #[tokio::test]
    async fn test_transport_error_is_distinct() {
        let remote = Arc::new(ScriptedRemote::fail("connection refused"));
        let requester = SessionRequester::new(remote);

        let outcome = requester
            .create_session(&PaymentSessionRequest::new(InvoiceKind::SalesInvoice, "INV-0001"))
            .await;

        assert!(matches!(outcome, SessionOutcome::TransportError(ref msg) if msg.contains("connection refused")));
    }
}
