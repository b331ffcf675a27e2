//! Router

use axum::{
    Router,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use stripe_pay_core::methods;

use crate::handlers::{
    call_method, get_resource, health_check, list_resource, put_resource, stripe_webhook,
};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health
        .route("/health", get(health_check))
        // Webhook (static path wins over the method route below)
        .route(&format!("/api/method/{}", methods::STRIPE_WEBHOOK), post(stripe_webhook))
        // Whitelisted methods
        .route("/api/method/{method}", post(call_method))
        // Documents
        .route("/api/resource/{doctype}", get(list_resource))
        .route("/api/resource/{doctype}/{name}", get(get_resource).put(put_resource))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use rust_decimal_macros::dec;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use stripe_pay_core::{DocStatus, MemoryDocumentStore, SalesInvoice, store};
    use stripe_pay_payments::{CheckoutRequest, CheckoutSession, PaymentMethods, Result, StripeApi};
    use tower::ServiceExt;

    struct FakeStripe;

    #[async_trait]
    impl StripeApi for FakeStripe {
        async fn create_checkout_session(&self, _request: CheckoutRequest) -> Result<CheckoutSession> {
            Ok(CheckoutSession {
                id: "cs_test_srv".into(),
                url: Some("https://checkout.stripe.com/c/pay/cs_test_srv".into()),
                payment_intent_id: None,
            })
        }

        async fn transfer_status(&self, _account: &str, _reference_id: &str) -> Result<String> {
            Ok("paid".into())
        }

        async fn create_transfer(&self, _amount_cents: i64, _description: &str) -> Result<String> {
            Ok("tr_srv".into())
        }

        async fn create_payout(&self, _amount_cents: i64, _description: &str) -> Result<String> {
            Ok("po_srv".into())
        }

        fn connected_account(&self) -> Option<&str> {
            Some("acct_srv")
        }
    }

    async fn app(with_payments: bool) -> Router {
        let store = Arc::new(MemoryDocumentStore::new());

        let mut invoice = SalesInvoice::new("INV-0001", "ACME", dec!(42));
        invoice.docstatus = DocStatus::Submitted;
        store::save(store.as_ref(), &invoice).await.unwrap();
        store::save(store.as_ref(), &SalesInvoice::new("INV-DRAFT", "ACME", dec!(1))).await.unwrap();

        let methods = with_payments
            .then(|| Arc::new(PaymentMethods::new(Arc::new(FakeStripe), store.clone(), "http://erp.test")));

        router(AppState {
            store,
            methods,
            webhook_secret: with_payments.then(|| "whsec_test".to_string()),
        })
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_create_stripe_url_round_trip() {
        let app = app(true).await;

        let (status, body) = send(
            app.clone(),
            "POST",
            "/api/method/stripe_pay.methods.stripe.create_stripe_url",
            Some(json!({"sales_invoice": "INV-0001"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"]["url"], "https://checkout.stripe.com/c/pay/cs_test_srv");
        assert_eq!(body["message"]["id"], "cs_test_srv");

        let (status, body) = send(app, "GET", "/api/resource/Sales%20Invoice/INV-0001", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["stripe_session_id"], "cs_test_srv");
    }

    #[tokio::test]
    async fn test_validation_error_is_417() {
        let (status, body) = send(
            app(true).await,
            "POST",
            "/api/method/stripe_pay.methods.stripe.create_stripe_url",
            Some(json!({"sales_invoice": "INV-DRAFT"})),
        )
        .await;
        assert_eq!(status, StatusCode::EXPECTATION_FAILED);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_unknown_method_and_disabled_payments() {
        let (status, _) = send(app(true).await, "POST", "/api/method/frappe.client.delete", Some(json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            app(false).await,
            "POST",
            "/api/method/stripe_pay.methods.stripe.check_transfer_status",
            Some(json!({"account": "acct_1", "reference_id": "tr_1"})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "PAYMENTS_DISABLED");
    }

    #[tokio::test]
    async fn test_resource_put_and_find() {
        let app = app(false).await;

        let (status, body) = send(
            app.clone(),
            "PUT",
            "/api/resource/Stripe%20Transfer%20Details/STD-1",
            Some(json!({"account": "acct_1", "reference_id": "po_1", "status": "pending", "__islocal": true})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "STD-1");
        assert!(body["data"].get("__islocal").is_none());

        let (status, body) = send(
            app.clone(),
            "GET",
            "/api/resource/Stripe%20Transfer%20Details?field=reference_id&value=po_1",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!(["STD-1"]));

        let (status, _) = send(app.clone(), "GET", "/api/resource/Stripe%20Transfer%20Details/STD-404", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(app, "GET", "/api/resource/Customer/C-1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_webhook_requires_signature() {
        let (status, body) = send(
            app(true).await,
            "POST",
            "/api/method/stripe_pay.api.stripe_webhook.stripe_payment_webhook",
            Some(json!({"type": "checkout.session.completed"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "MISSING_SIGNATURE");
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(app(false).await, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stripe_configured"], false);
    }
}
