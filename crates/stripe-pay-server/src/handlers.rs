//! HTTP Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

use stripe_pay_core::{DocumentKind, PayError};
use stripe_pay_payments::{PaymentError, PaymentMethods, WebhookHandler};

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub stripe_configured: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct FindQuery {
    pub field: String,
    pub value: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>, code: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.into(),
        }),
    )
}

fn payments_disabled() -> ApiError {
    api_error(StatusCode::SERVICE_UNAVAILABLE, "Payments not configured", "PAYMENTS_DISABLED")
}

fn doctype(name: &str) -> Result<DocumentKind, ApiError> {
    DocumentKind::from_doctype(name)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("DocType {name} not found"), "DOCTYPE_NOT_FOUND"))
}

fn store_error(e: &PayError) -> ApiError {
    tracing::error!("Document store error: {}", e);
    api_error(StatusCode::INTERNAL_SERVER_ERROR, e.user_message(), "STORE_ERROR")
}

/// Map a method failure to the status the desk sees.
///
/// 417 is what the desk framework uses for a thrown validation error.
fn method_error(e: &PaymentError) -> ApiError {
    match e {
        PaymentError::UnknownMethod(_) => api_error(StatusCode::NOT_FOUND, e.user_message(), "METHOD_NOT_FOUND"),
        PaymentError::Document(PayError::NotFound { .. }) => {
            api_error(StatusCode::NOT_FOUND, e.user_message(), "DOCUMENT_NOT_FOUND")
        }
        PaymentError::Validation(_) | PaymentError::Document(PayError::Validation(_)) => {
            api_error(StatusCode::EXPECTATION_FAILED, e.user_message(), "VALIDATION_ERROR")
        }
        PaymentError::Stripe(_) => {
            tracing::error!("Stripe error: {}", e);
            api_error(StatusCode::EXPECTATION_FAILED, e.user_message(), "STRIPE_ERROR")
        }
        PaymentError::Config(_) => {
            tracing::error!("Payment configuration error: {}", e);
            api_error(StatusCode::SERVICE_UNAVAILABLE, e.user_message(), "PAYMENTS_DISABLED")
        }
        _ => {
            tracing::error!("Method error: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, e.user_message(), "INTERNAL_ERROR")
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        stripe_configured: state.methods.is_some(),
    })
}

/// Whitelisted method call: `{"message": <reply or null>}`
pub async fn call_method(
    State(state): State<AppState>,
    Path(method): Path<String>,
    Json(args): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let methods: &Arc<PaymentMethods> = state.methods.as_ref().ok_or_else(payments_disabled)?;

    let message = methods.dispatch(&method, &args).await.map_err(|e| method_error(&e))?;

    Ok(Json(json!({ "message": message })))
}

/// Fetch one document
pub async fn get_resource(
    State(state): State<AppState>,
    Path((doctype_name, name)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let kind = doctype(&doctype_name)?;

    match state.store.get(kind, &name).await {
        Ok(Some(doc)) => Ok(Json(json!({ "data": doc }))),
        Ok(None) => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("{doctype_name} {name} not found"),
            "DOCUMENT_NOT_FOUND",
        )),
        Err(e) => Err(store_error(&e)),
    }
}

/// Insert or overwrite one document
pub async fn put_resource(
    State(state): State<AppState>,
    Path((doctype_name, name)): Path<(String, String)>,
    Json(mut doc): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let kind = doctype(&doctype_name)?;

    let Some(fields) = doc.as_object_mut() else {
        return Err(api_error(StatusCode::BAD_REQUEST, "Document must be a JSON object", "INVALID_DOCUMENT"));
    };
    fields.insert("name".into(), Value::String(name.clone()));
    fields.remove("__islocal");

    state.store.put(kind, &name, doc.clone()).await.map_err(|e| store_error(&e))?;
    tracing::debug!(doctype = %kind, name = %name, "Saved document");

    Ok(Json(json!({ "data": doc })))
}

/// Names of documents with `field == value`
pub async fn list_resource(
    State(state): State<AppState>,
    Path(doctype_name): Path<String>,
    Query(query): Query<FindQuery>,
) -> Result<Json<Value>, ApiError> {
    let kind = doctype(&doctype_name)?;

    let names = state
        .store
        .find(kind, &query.field, &query.value)
        .await
        .map_err(|e| store_error(&e))?;

    Ok(Json(json!({ "data": names })))
}

/// Stripe webhook handler
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<Value>, ApiError> {
    let secret = state.webhook_secret.as_deref().ok_or_else(|| {
        tracing::error!("Stripe webhook secret not configured");
        payments_disabled()
    })?;

    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Missing Stripe signature", "MISSING_SIGNATURE"))?;

    let handler = WebhookHandler::new(state.store.clone());

    let event = handler.parse_event(&body, signature, secret).map_err(|e| {
        tracing::warn!("Webhook signature failed: {}", e);
        api_error(StatusCode::BAD_REQUEST, "Invalid signature", "INVALID_SIGNATURE")
    })?;

    handler.handle(event).await.map_err(|e| {
        tracing::error!("Webhook processing error: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Webhook processing failed", "WEBHOOK_ERROR")
    })?;

    Ok(Json(json!({ "status": "success" })))
}
