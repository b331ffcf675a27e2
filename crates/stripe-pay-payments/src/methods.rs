//! Whitelisted Payment Methods
//!
//! Server side of the desk buttons. Each method loads the invoice, talks to
//! Stripe and writes whatever the desk needs later (session ids, transfer
//! logs) back to the document store.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use stripe_pay_core::store::{self, DocumentStore};
use stripe_pay_core::{
    CollectiveInvoice, SalesInvoice, SessionReply, StatusReply, TransferDetails, TransferStatus,
    methods,
};

use crate::error::{PaymentError, Result};
use crate::gateway::{CheckoutRequest, StripeApi, to_minor_units};

/// Reply of `create_stripe_payment`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReply {
    pub transfer_id: String,
    pub payout_id: String,
}

/// Whitelisted method service
pub struct PaymentMethods {
    stripe: Arc<dyn StripeApi>,
    store: Arc<dyn DocumentStore>,
    site_url: String,
}

impl PaymentMethods {
    pub fn new(stripe: Arc<dyn StripeApi>, store: Arc<dyn DocumentStore>, site_url: impl Into<String>) -> Self {
        Self {
            stripe,
            store,
            site_url: site_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Route a whitelisted method call. `Ok(None)` is a successful call with no payload.
    pub async fn dispatch(&self, method: &str, args: &Value) -> Result<Option<Value>> {
        tracing::debug!(method, "Dispatching whitelisted method");

        let reply = match method {
            methods::CREATE_SALES_SESSION => {
                serde_json::to_value(self.create_stripe_url(arg(args, "sales_invoice")?).await?)
            }
            methods::CREATE_COLLECTIVE_SESSION => serde_json::to_value(
                self.create_stripe_url_collective(arg(args, "collective_invoice")?).await?,
            ),
            methods::CHECK_TRANSFER_STATUS => serde_json::to_value(
                self.check_transfer_status(arg(args, "account")?, arg(args, "reference_id")?)
                    .await?,
            ),
            methods::CREATE_STRIPE_PAYMENT => {
                serde_json::to_value(self.create_stripe_payment(arg(args, "sales_invoice")?).await?)
            }
            other => return Err(PaymentError::UnknownMethod(other.to_string())),
        };

        let reply = reply.map_err(stripe_pay_core::PayError::from)?;
        Ok(Some(reply).filter(|value| !value.is_null()))
    }

    /// Create a Checkout session for a submitted Sales Invoice
    pub async fn create_stripe_url(&self, sales_invoice: &str) -> Result<SessionReply> {
        let mut invoice: SalesInvoice = store::load_existing(self.store.as_ref(), sales_invoice).await?;

        if !invoice.is_submitted() {
            return Err(PaymentError::Validation(
                "Sales Invoice must be submitted before creating a payment.".into(),
            ));
        }

        let request = self.checkout_request(&invoice.name, &invoice.customer, "sales_invoice", to_minor_units(invoice.grand_total)?);
        let session = self.stripe.create_checkout_session(request).await.inspect_err(|e| {
            tracing::error!(invoice = %invoice.name, error = %e, "Stripe Session Creation Failed");
        })?;

        invoice.stripe_session_id = Some(session.id.clone());
        if session.payment_intent_id.is_some() {
            invoice.stripe_payment_intent_id.clone_from(&session.payment_intent_id);
        }
        store::save(self.store.as_ref(), &invoice).await?;

        Ok(SessionReply {
            url: session.url,
            id: Some(session.id),
        })
    }

    /// Create a Checkout session for a Collective Invoice
    pub async fn create_stripe_url_collective(&self, collective_invoice: &str) -> Result<SessionReply> {
        let mut invoice: CollectiveInvoice =
            store::load_existing(self.store.as_ref(), collective_invoice).await?;

        let request = self.checkout_request(
            &invoice.name,
            &invoice.customer,
            "collective_invoice",
            to_minor_units(invoice.grand_total)?,
        );
        let session = self.stripe.create_checkout_session(request).await.inspect_err(|e| {
            tracing::error!(invoice = %invoice.name, error = %e, "Stripe Session Creation Failed");
        })?;

        // the webhook finds the invoice again through these ids
        invoice.custom_stripe_session_id = Some(session.id.clone());
        if session.payment_intent_id.is_some() {
            invoice.custom_stripe_payment_intent_id = session.payment_intent_id;
        }
        store::save(self.store.as_ref(), &invoice).await?;

        Ok(SessionReply { url: session.url, id: None })
    }

    /// Look up the current status of a transfer or payout
    pub async fn check_transfer_status(&self, account: &str, reference_id: &str) -> Result<StatusReply> {
        let status = self.stripe.transfer_status(account, reference_id).await?;
        tracing::info!(account, reference_id, status = %status, "Retrieved transfer status");
        Ok(StatusReply { status: Some(status) })
    }

    /// Transfer the invoice total to the connected account and pay it out.
    ///
    /// Every attempt is logged as a `Stripe Transfer Details` record.
    pub async fn create_stripe_payment(&self, sales_invoice: &str) -> Result<PaymentReply> {
        let invoice: SalesInvoice = store::load_existing(self.store.as_ref(), sales_invoice).await?;

        if !invoice.is_submitted() {
            return Err(PaymentError::Validation(
                "Sales Invoice must be submitted before creating a payment.".into(),
            ));
        }

        let amount = to_minor_units(invoice.grand_total)?;

        let transfer_id = match self
            .stripe
            .create_transfer(amount, &format!("Transfer for Sales Invoice {}", invoice.name))
            .await
        {
            Ok(id) => {
                self.log_transfer(&id, TransferStatus::Paid, &invoice.name).await?;
                id
            }
            Err(e) => {
                self.log_transfer("N/A", TransferStatus::Failed, &invoice.name).await?;
                return Err(PaymentError::Stripe(format!("Stripe Transfer failed: {e}")));
            }
        };

        let payout_id = match self
            .stripe
            .create_payout(amount, &format!("Payout for Sales Invoice {}", invoice.name))
            .await
        {
            Ok(id) => {
                self.log_transfer(&id, TransferStatus::Paid, &invoice.name).await?;
                id
            }
            Err(e) => {
                self.log_transfer("N/A", TransferStatus::Failed, &invoice.name).await?;
                return Err(PaymentError::Stripe(format!("Stripe Payout failed: {e}")));
            }
        };

        tracing::info!(invoice = %invoice.name, %transfer_id, %payout_id, "Stripe payment completed");

        Ok(PaymentReply { transfer_id, payout_id })
    }

    async fn log_transfer(&self, reference_id: &str, status: TransferStatus, sales_invoice: &str) -> Result<String> {
        let details = TransferDetails {
            name: transfer_log_name(),
            is_local: false,
            account: self.stripe.connected_account().unwrap_or_default().to_string(),
            reference_id: reference_id.to_string(),
            status,
            queried_at: Some(chrono::Utc::now()),
            reference_doc: "Sales Invoice".into(),
            reference_name: sales_invoice.to_string(),
        };
        store::save(self.store.as_ref(), &details).await?;

        tracing::info!(log = %details.name, reference_id, status = %details.status, "Stripe Transfer Log created");
        Ok(details.name)
    }

    fn checkout_request(&self, name: &str, customer: &str, metadata_key: &str, amount_cents: i64) -> CheckoutRequest {
        let mut metadata = HashMap::new();
        metadata.insert(metadata_key.to_string(), name.to_string());
        metadata.insert("customer".to_string(), customer.to_string());

        CheckoutRequest {
            product_name: format!("Payment for {name}"),
            amount_cents,
            success_url: format!("{}/success?invoice={name}", self.site_url),
            cancel_url: format!("{}/cancel?invoice={name}", self.site_url),
            metadata,
        }
    }
}

fn arg<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| PaymentError::Validation(format!("Missing argument: {key}")))
}

fn transfer_log_name() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string().to_uppercase();
    format!("STD-{}", &id[..10])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::CheckoutSession;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::sync::Mutex;
    use stripe_pay_core::{DocStatus, DocumentKind, MemoryDocumentStore};

    /// Stripe stand-in with canned answers
    #[derive(Default)]
    struct MockStripe {
        no_url: bool,
        fail_payout: bool,
        checkouts: Mutex<Vec<CheckoutRequest>>,
    }

    #[async_trait]
    impl StripeApi for MockStripe {
        async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession> {
            self.checkouts.lock().unwrap().push(request);
            Ok(CheckoutSession {
                id: "cs_test_1".into(),
                url: (!self.no_url).then(|| "https://checkout.stripe.com/c/pay/cs_test_1".into()),
                payment_intent_id: Some("pi_1".into()),
            })
        }

        async fn transfer_status(&self, _account: &str, reference_id: &str) -> Result<String> {
            if reference_id.starts_with("tr_") {
                Ok("paid".into())
            } else {
                Ok("in_transit".into())
            }
        }

        async fn create_transfer(&self, _amount_cents: i64, _description: &str) -> Result<String> {
            Ok("tr_1".into())
        }

        async fn create_payout(&self, _amount_cents: i64, _description: &str) -> Result<String> {
            if self.fail_payout {
                Err(PaymentError::Stripe("insufficient funds".into()))
            } else {
                Ok("po_1".into())
            }
        }

        fn connected_account(&self) -> Option<&str> {
            Some("acct_test")
        }
    }

    async fn setup(stripe: MockStripe) -> (Arc<MockStripe>, Arc<MemoryDocumentStore>, PaymentMethods) {
        let stripe = Arc::new(stripe);
        let store = Arc::new(MemoryDocumentStore::new());

        let mut submitted = SalesInvoice::new("INV-0001", "ACME", dec!(120.50));
        submitted.docstatus = DocStatus::Submitted;
        store::save(store.as_ref(), &submitted).await.unwrap();
        store::save(store.as_ref(), &SalesInvoice::new("INV-DRAFT", "ACME", dec!(10))).await.unwrap();
        store::save(store.as_ref(), &CollectiveInvoice::new("COL-0001", "ACME", dec!(75))).await.unwrap();

        let service = PaymentMethods::new(stripe.clone(), store.clone(), "https://erp.example/");
        (stripe, store, service)
    }

    #[tokio::test]
    async fn test_create_stripe_url_caches_session() {
        let (stripe, store, service) = setup(MockStripe::default()).await;

        let reply = service.create_stripe_url("INV-0001").await.unwrap();
        assert_eq!(reply.id.as_deref(), Some("cs_test_1"));
        assert!(reply.url.is_some());

        let invoice: SalesInvoice = store::load_existing(store.as_ref(), "INV-0001").await.unwrap();
        assert_eq!(invoice.stripe_session_id.as_deref(), Some("cs_test_1"));
        assert_eq!(invoice.stripe_payment_intent_id.as_deref(), Some("pi_1"));

        let request = stripe.checkouts.lock().unwrap()[0].clone();
        assert_eq!(request.amount_cents, 12050);
        assert_eq!(request.product_name, "Payment for INV-0001");
        assert_eq!(request.success_url, "https://erp.example/success?invoice=INV-0001");
        assert_eq!(request.cancel_url, "https://erp.example/cancel?invoice=INV-0001");
        assert_eq!(request.metadata.get("sales_invoice").map(String::as_str), Some("INV-0001"));
        assert_eq!(request.metadata.get("customer").map(String::as_str), Some("ACME"));
    }

    #[tokio::test]
    async fn test_draft_invoice_refused() {
        let (stripe, _store, service) = setup(MockStripe::default()).await;

        let err = service.create_stripe_url("INV-DRAFT").await.unwrap_err();
        assert!(matches!(err, PaymentError::Validation(_)));
        assert!(stripe.checkouts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_url_still_returns_reply() {
        let (_stripe, _store, service) = setup(MockStripe { no_url: true, ..Default::default() }).await;

        let reply = service
            .dispatch(methods::CREATE_COLLECTIVE_SESSION, &json!({"collective_invoice": "COL-0001"}))
            .await
            .unwrap();
        // desk classifies this as declined
        assert_eq!(reply, Some(json!({})));
    }

    #[tokio::test]
    async fn test_collective_session_stored_for_webhook() {
        let (_stripe, store, service) = setup(MockStripe::default()).await;

        let reply = service
            .dispatch(methods::CREATE_COLLECTIVE_SESSION, &json!({"collective_invoice": "COL-0001"}))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply, json!({"url": "https://checkout.stripe.com/c/pay/cs_test_1"}));

        let found = store
            .find(DocumentKind::CollectiveInvoice, "custom_stripe_session_id", "cs_test_1")
            .await
            .unwrap();
        assert_eq!(found, vec!["COL-0001".to_string()]);
    }

    #[tokio::test]
    async fn test_check_transfer_status_dispatch() {
        let (_stripe, _store, service) = setup(MockStripe::default()).await;

        let reply = service
            .dispatch(
                methods::CHECK_TRANSFER_STATUS,
                &json!({"account": "acct_test", "reference_id": "po_1"}),
            )
            .await
            .unwrap();
        assert_eq!(reply, Some(json!({"status": "in_transit"})));

        let err = service
            .dispatch(methods::CHECK_TRANSFER_STATUS, &json!({"account": "acct_test"}))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let (_stripe, _store, service) = setup(MockStripe::default()).await;
        let err = service.dispatch("frappe.client.delete", &json!({})).await.unwrap_err();
        assert!(matches!(err, PaymentError::UnknownMethod(_)));
    }

    #[tokio::test]
    async fn test_create_stripe_payment_logs_each_step() {
        let (_stripe, store, service) = setup(MockStripe::default()).await;

        let reply = service.create_stripe_payment("INV-0001").await.unwrap();
        assert_eq!(reply, PaymentReply { transfer_id: "tr_1".into(), payout_id: "po_1".into() });

        let mut logged = Vec::new();
        for reference in ["tr_1", "po_1"] {
            logged.extend(
                store
                    .find(DocumentKind::TransferDetails, "reference_id", reference)
                    .await
                    .unwrap(),
            );
        }
        assert_eq!(logged.len(), 2);

        let log: TransferDetails = store::load_existing(store.as_ref(), &logged[0]).await.unwrap();
        assert_eq!(log.status, TransferStatus::Paid);
        assert_eq!(log.account, "acct_test");
        assert_eq!(log.reference_name, "INV-0001");
    }

    #[tokio::test]
    async fn test_failed_payout_is_logged() {
        let (_stripe, store, service) = setup(MockStripe { fail_payout: true, ..Default::default() }).await;

        let err = service.create_stripe_payment("INV-0001").await.unwrap_err();
        assert!(err.to_string().contains("Stripe Payout failed"));

        let failed = store
            .find(DocumentKind::TransferDetails, "reference_id", "N/A")
            .await
            .unwrap();
        assert_eq!(failed.len(), 1);
        let log: TransferDetails = store::load_existing(store.as_ref(), &failed[0]).await.unwrap();
        assert_eq!(log.status, TransferStatus::Failed);
    }
}
