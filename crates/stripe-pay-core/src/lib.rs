//! # stripe-pay-core
//!
//! Desk-side payment flows for invoice and transfer documents.
//!
//! ## Out-of-band reconciliation
//!
//! The user never pays inside the desk. A button asks the server for a
//! Stripe Checkout session, the browser is sent to Stripe's hosted page, and
//! the local record catches up later: by webhook on the server, or by an
//! explicit status poll from the form.
//!
//! ```text
//! ┌──────────────┐  create session  ┌──────────────┐     ┌─────────────────┐
//! │  Desk form   │─────────────────▶│ stripe-pay   │────▶│ Stripe Checkout │
//! │ (view.rs)    │◀──── {url,id} ───│   server     │     │  (hosted page)  │
//! └──────┬───────┘                  └──────▲───────┘     └────────┬────────┘
//!        │ check status                    │       webhook        │
//!        └─────────────────────────────────┴──────────────────────┘
//! ```
//!
//! Every remote call ends in one of three ways: a result, a business
//! "no" (declined / empty), or a transport failure. None of them is fatal.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stripe_pay_core::{ButtonAction, DeskContext, FormDoc};
//!
//! let mut view = ctx.view(FormDoc::SalesInvoice(invoice));
//! for button in view.refresh() {
//!     println!("{}", button.label);
//! }
//! view.click(ButtonAction::PayWithStripe).await?;
//! ```

pub mod document;
pub mod error;
pub mod host;
pub mod poller;
pub mod remote;
pub mod requester;
pub mod store;
pub mod view;

#[cfg(test)]
mod testing;

pub use document::{
    CollectiveInvoice, DocStatus, Document, DocumentKind, InvoiceStatus, SalesInvoice,
    TransferDetails, TransferStatus,
};
pub use error::{PayError, Result};
pub use host::{FormHost, Indicator};
pub use poller::{PollOutcome, StatusPoller, TransferStatusQuery};
pub use remote::{RemoteMethods, SessionReply, StatusReply, methods};
pub use requester::{InvoiceKind, PaymentSessionRequest, SessionOutcome, SessionRequester};
pub use store::{DocumentStore, MemoryDocumentStore};
pub use view::{ButtonAction, CustomButton, DashboardUrl, DeskContext, DocumentView, FormDoc};
