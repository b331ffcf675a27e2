//! # stripe-pay-desk
//!
//! Desk-side runtime for the stripe-pay form bindings.
//!
//! - [`HttpRemote`]: method calls and document reads/writes against the
//!   stripe-pay server, via reqwest
//! - [`TerminalHost`]: a [`FormHost`](stripe_pay_core::FormHost) that prints
//!   to the terminal
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stripe_pay_desk::{DeskConfig, HttpRemote, TerminalHost, open_form};
//!
//! let config = DeskConfig::from_env();
//! let remote = Arc::new(HttpRemote::new(&config)?);
//! let ctx = DeskContext { remote: remote.clone(), store: remote.clone(), host, dashboard: config.dashboard };
//!
//! let doc = open_form(remote.as_ref(), DocumentKind::SalesInvoice, "INV-0001").await?;
//! ctx.view(doc).click(ButtonAction::PayWithStripe).await?;
//! ```

pub mod config;
pub mod http;
pub mod terminal;

pub use config::DeskConfig;
pub use http::HttpRemote;
pub use terminal::{TerminalHost, format_alert};

use stripe_pay_core::{
    CollectiveInvoice, DocumentKind, DocumentStore, FormDoc, Result, SalesInvoice, TransferDetails,
    store,
};

/// Fetch a document and wrap it for a form view
pub async fn open_form<S>(store: &S, kind: DocumentKind, name: &str) -> Result<FormDoc>
where
    S: DocumentStore + ?Sized,
{
    Ok(match kind {
        DocumentKind::SalesInvoice => FormDoc::SalesInvoice(store::load_existing::<SalesInvoice, _>(store, name).await?),
        DocumentKind::CollectiveInvoice => {
            FormDoc::CollectiveInvoice(store::load_existing::<CollectiveInvoice, _>(store, name).await?)
        }
        DocumentKind::TransferDetails => {
            FormDoc::TransferDetails(store::load_existing::<TransferDetails, _>(store, name).await?)
        }
    })
}
