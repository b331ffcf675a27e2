//! Stripe Gateway
//!
//! Thin wrapper over async-stripe for the calls the payment methods need:
//! hosted Checkout sessions, Connect transfers/payouts and their status.

use async_trait::async_trait;
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use stripe::{
    AccountId, CheckoutSession as StripeCheckoutSession, CheckoutSessionMode, Client,
    CreateCheckoutSession, CreateCheckoutSessionLineItems,
    CreateCheckoutSessionLineItemsPriceData,
    CreateCheckoutSessionLineItemsPriceDataProductData,
    CreateCheckoutSessionPaymentMethodTypes, CreatePayout, CreateTransfer, Currency, Payout,
    PayoutId, Transfer, TransferId,
};

use crate::error::{PaymentError, Result};

/// Stripe operations used by the payment methods (Strategy pattern)
///
/// [`StripeClient`] talks to the real API; tests script their own.
#[async_trait]
pub trait StripeApi: Send + Sync {
    /// Create a hosted Checkout session
    async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession>;

    /// Current status of a transfer (`tr_...`) or a payout on `account`
    async fn transfer_status(&self, account: &str, reference_id: &str) -> Result<String>;

    /// Move `amount_cents` to the connected account; returns the transfer id
    async fn create_transfer(&self, amount_cents: i64, description: &str) -> Result<String>;

    /// Pay out `amount_cents` from the connected account; returns the payout id
    async fn create_payout(&self, amount_cents: i64, description: &str) -> Result<String>;

    /// Connected account that receives transfers
    fn connected_account(&self) -> Option<&str>;
}

/// Stripe settings
#[derive(Clone, Debug)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    pub connected_account: Option<String>,
    /// ISO currency code, lowercase
    pub currency: String,
}

impl StripeConfig {
    /// Read from environment variables
    pub fn from_env() -> Result<Self> {
        let secret_key = std::env::var("STRIPE_SECRET_KEY")
            .map_err(|_| PaymentError::Config("STRIPE_SECRET_KEY not set".into()))?;
        let webhook_secret = std::env::var("STRIPE_WEBHOOK_SECRET")
            .map_err(|_| PaymentError::Config("STRIPE_WEBHOOK_SECRET not set".into()))?;
        let connected_account = std::env::var("STRIPE_CONNECTED_ACCOUNT")
            .ok()
            .filter(|s| !s.is_empty());
        let currency = std::env::var("STRIPE_CURRENCY").unwrap_or_else(|_| "usd".into());

        Ok(Self {
            secret_key,
            webhook_secret,
            connected_account,
            currency: currency.to_lowercase(),
        })
    }
}

/// Stripe client wrapper
pub struct StripeClient {
    client: Client,
    webhook_secret: String,
    connected_account: Option<String>,
    currency: Currency,
}

impl StripeClient {
    /// Create a new Stripe client
    pub fn new(config: StripeConfig) -> Result<Self> {
        let currency = parse_currency(&config.currency)?;

        Ok(Self {
            client: Client::new(config.secret_key),
            webhook_secret: config.webhook_secret,
            connected_account: config.connected_account,
            currency,
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(StripeConfig::from_env()?)
    }

    /// Get the webhook secret
    pub fn webhook_secret(&self) -> &str {
        &self.webhook_secret
    }

    /// Client acting on behalf of a connected account
    fn for_account(&self, account: &str) -> Result<Client> {
        let account: AccountId = account
            .parse()
            .map_err(|e| PaymentError::Validation(format!("Invalid Stripe account {account}: {e}")))?;
        Ok(self.client.clone().with_stripe_account(account))
    }

    fn require_connected_account(&self) -> Result<&str> {
        self.connected_account
            .as_deref()
            .ok_or_else(|| PaymentError::Config("STRIPE_CONNECTED_ACCOUNT not set".into()))
    }
}

#[async_trait]
impl StripeApi for StripeClient {
    async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession> {
        let mut params = CreateCheckoutSession::new();
        params.success_url = Some(&request.success_url);
        params.cancel_url = Some(&request.cancel_url);
        params.mode = Some(CheckoutSessionMode::Payment);
        params.payment_method_types = Some(vec![CreateCheckoutSessionPaymentMethodTypes::Card]);
        params.metadata = Some(request.metadata.clone());

        params.line_items = Some(vec![CreateCheckoutSessionLineItems {
            quantity: Some(1),
            price_data: Some(CreateCheckoutSessionLineItemsPriceData {
                currency: self.currency,
                unit_amount: Some(request.amount_cents),
                product_data: Some(CreateCheckoutSessionLineItemsPriceDataProductData {
                    name: request.product_name.clone(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }]);

        let session = StripeCheckoutSession::create(&self.client, params).await?;

        tracing::info!(session_id = %session.id, has_url = session.url.is_some(), "Created Stripe checkout session");

        Ok(CheckoutSession {
            id: session.id.to_string(),
            url: session.url,
            payment_intent_id: session.payment_intent.as_ref().map(|pi| pi.id().to_string()),
        })
    }

    async fn transfer_status(&self, account: &str, reference_id: &str) -> Result<String> {
        if reference_id.starts_with("tr_") {
            let id: TransferId = reference_id
                .parse()
                .map_err(|e| PaymentError::Validation(format!("Invalid transfer id {reference_id}: {e}")))?;
            let transfer = Transfer::retrieve(&self.client, &id, &[]).await?;
            return Ok(transfer_status_label(transfer.reversed, transfer.amount_reversed).to_string());
        }

        let id: PayoutId = reference_id
            .parse()
            .map_err(|e| PaymentError::Validation(format!("Could not retrieve payout status: {e}")))?;
        let client = self.for_account(account)?;
        let payout = Payout::retrieve(&client, &id, &[]).await?;
        Ok(payout.status.to_string())
    }

    async fn create_transfer(&self, amount_cents: i64, description: &str) -> Result<String> {
        let destination = self.require_connected_account()?;

        let mut params = CreateTransfer::new(self.currency, destination.to_string());
        params.amount = Some(amount_cents);
        params.description = Some(description);

        let transfer = Transfer::create(&self.client, params).await?;
        Ok(transfer.id.to_string())
    }

    async fn create_payout(&self, amount_cents: i64, description: &str) -> Result<String> {
        let client = self.for_account(self.require_connected_account()?)?;

        let mut params = CreatePayout::new(amount_cents, self.currency);
        params.description = Some(description);

        let payout = Payout::create(&client, params).await?;
        Ok(payout.id.to_string())
    }

    fn connected_account(&self) -> Option<&str> {
        self.connected_account.as_deref()
    }
}

/// Request to create a checkout session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// Line item label shown on the hosted page
    pub product_name: String,

    /// Amount in minor units
    pub amount_cents: i64,

    /// URL to redirect after successful payment
    pub success_url: String,

    /// URL to redirect if checkout is cancelled
    pub cancel_url: String,

    /// Tracking metadata (invoice name, customer)
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Result of creating a checkout session
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Stripe session ID
    pub id: String,

    /// Hosted page URL; absent when Stripe returned none
    pub url: Option<String>,

    pub payment_intent_id: Option<String>,
}

/// Convert an invoice total to minor units (half away from zero)
pub fn to_minor_units(amount: Decimal) -> Result<i64> {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| PaymentError::Validation(format!("Amount {amount} is out of range")))
}

/// Transfers carry no status of their own; derive one from reversals
pub const fn transfer_status_label(reversed: bool, amount_reversed: i64) -> &'static str {
    if reversed {
        "reversed"
    } else if amount_reversed > 0 {
        "partially_reversed"
    } else {
        "paid"
    }
}

fn parse_currency(code: &str) -> Result<Currency> {
    serde_json::from_value(serde_json::Value::String(code.to_lowercase()))
        .map_err(|_| PaymentError::Config(format!("Unsupported currency {code}")))
}
