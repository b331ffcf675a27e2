//! stripe-pay HTTP Server
//!
//! Serves the whitelisted payment methods, the document resources the desk
//! reads and writes, and the Stripe webhook.

mod handlers;
mod routes;
mod state;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stripe_pay_core::{DocumentStore, MemoryDocumentStore, methods};
use stripe_pay_payments::{PaymentMethods, StripeClient};

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
    let site_url = std::env::var("SITE_URL").unwrap_or_else(|_| "http://localhost:8000".into());

    // Initialize payments
    let (methods, webhook_secret) = match StripeClient::from_env() {
        Ok(client) => {
            tracing::info!("✓ Stripe configured");
            let secret = client.webhook_secret().to_string();
            let service = PaymentMethods::new(Arc::new(client), store.clone(), site_url.as_str());
            (Some(Arc::new(service)), Some(secret))
        }
        Err(e) => {
            tracing::warn!("⚠ Stripe not configured - payments disabled: {}", e);
            tracing::warn!("  Set STRIPE_SECRET_KEY and STRIPE_WEBHOOK_SECRET in .env");
            (None, None)
        }
    };

    let app = routes::router(AppState {
        store,
        methods,
        webhook_secret,
    });

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 stripe-pay server running on http://{}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("Site URL: {}", site_url);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health");
    tracing::info!("  POST /api/method/{}", methods::CREATE_SALES_SESSION);
    tracing::info!("  POST /api/method/{}", methods::CREATE_COLLECTIVE_SESSION);
    tracing::info!("  POST /api/method/{}", methods::CHECK_TRANSFER_STATUS);
    tracing::info!("  POST /api/method/{}", methods::CREATE_STRIPE_PAYMENT);
    tracing::info!("  POST /api/method/{}", methods::STRIPE_WEBHOOK);
    tracing::info!("  GET  /api/resource/{{doctype}}?field=&value=");
    tracing::info!("  GET  /api/resource/{{doctype}}/{{name}}");
    tracing::info!("  PUT  /api/resource/{{doctype}}/{{name}}");

    axum::serve(listener, app).await?;

    Ok(())
}
