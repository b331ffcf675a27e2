//! Document View Binding
//!
//! Custom buttons for the payment-aware doctypes and what happens when they
//! are clicked.
//!
//! ```text
//!  click "Pay with Stripe"
//!      │  blue alert
//!      ▼
//!  SessionRequester ──► Created ──► green alert, open url, cache id, reload
//!                   ├─► Declined ──► red alert (declined)
//!                   └─► TransportError ──► red alert (connection)
//!
//!  click "Check Status"
//!      ▼
//!  StatusPoller ──► Updated ──► "Status: …" (record already saved)
//!               ├─► Empty ──► orange alert
//!               └─► TransportError ──► red alert
//! ```
//!
//! The open document is owned by its [`DocumentView`] and only changes inside
//! [`DocumentView::click`]. Clicks are not de-duplicated.

use std::sync::Arc;

use crate::document::{CollectiveInvoice, Document, SalesInvoice, TransferDetails};
use crate::error::{PayError, Result};
use crate::host::{FormHost, Indicator};
use crate::poller::{PollOutcome, StatusPoller};
use crate::remote::RemoteMethods;
use crate::requester::{InvoiceKind, PaymentSessionRequest, SessionOutcome, SessionRequester};
use crate::store::DocumentStore;

/// User-facing strings
pub mod messages {
    pub const CREATING_SESSION: &str = "Creating Stripe payment session...";
    pub const REDIRECTING: &str = "Redirecting to Stripe...";
    pub const SESSION_DECLINED: &str = "Failed to create Stripe payment link";
    pub const CONNECTION_ERROR: &str = "Error connecting to Stripe";
    pub const NO_STATUS: &str = "No status reported for this transfer";
    pub const STATUS_UNAVAILABLE: &str = "Could not retrieve transfer status";
    pub const STATUS_NOT_SAVED: &str = "Could not save transfer status";
}

/// Dashboard link used by "View Stripe Session"
///
/// `{session_id}` and `{account}` are substituted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DashboardUrl {
    pub template: String,
    pub account: String,
}

impl Default for DashboardUrl {
    fn default() -> Self {
        Self {
            template: "https://dashboard.stripe.com/test/checkouts/{session_id}".into(),
            account: String::new(),
        }
    }
}

impl DashboardUrl {
    pub fn render(&self, session_id: &str) -> String {
        self.template
            .replace("{account}", &self.account)
            .replace("{session_id}", session_id)
    }
}

/// Document open in a form
#[derive(Clone, Debug, PartialEq)]
pub enum FormDoc {
    SalesInvoice(SalesInvoice),
    CollectiveInvoice(CollectiveInvoice),
    TransferDetails(TransferDetails),
}

impl FormDoc {
    pub fn doctype(&self) -> &'static str {
        match self {
            Self::SalesInvoice(_) => SalesInvoice::KIND.doctype(),
            Self::CollectiveInvoice(_) => CollectiveInvoice::KIND.doctype(),
            Self::TransferDetails(_) => TransferDetails::KIND.doctype(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::SalesInvoice(doc) => doc.name(),
            Self::CollectiveInvoice(doc) => doc.name(),
            Self::TransferDetails(doc) => doc.name(),
        }
    }

    pub fn is_local(&self) -> bool {
        match self {
            Self::SalesInvoice(doc) => doc.is_local(),
            Self::CollectiveInvoice(doc) => doc.is_local(),
            Self::TransferDetails(doc) => doc.is_local(),
        }
    }

    /// Checkout session cached on an invoice, if any
    pub fn cached_session_id(&self) -> Option<&str> {
        let id = match self {
            Self::SalesInvoice(doc) => doc.stripe_session_id.as_deref(),
            Self::CollectiveInvoice(doc) => doc.custom_stripe_session_id.as_deref(),
            Self::TransferDetails(_) => None,
        };
        id.filter(|id| !id.is_empty())
    }

    const fn invoice_kind(&self) -> Option<InvoiceKind> {
        match self {
            Self::SalesInvoice(_) => Some(InvoiceKind::SalesInvoice),
            Self::CollectiveInvoice(_) => Some(InvoiceKind::CollectiveInvoice),
            Self::TransferDetails(_) => None,
        }
    }

    fn cache_session_id(&mut self, session_id: String) {
        match self {
            Self::SalesInvoice(doc) => doc.stripe_session_id = Some(session_id),
            Self::CollectiveInvoice(doc) => doc.custom_stripe_session_id = Some(session_id),
            Self::TransferDetails(_) => {}
        }
    }

    fn can_pay(&self) -> bool {
        match self {
            Self::SalesInvoice(doc) => !doc.is_local && doc.is_submitted(),
            Self::CollectiveInvoice(doc) => !doc.is_local,
            Self::TransferDetails(_) => false,
        }
    }
}

/// What a custom button does
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonAction {
    PayWithStripe,
    ViewStripeSession,
    CheckStatus,
}

/// A custom button as rendered in the form toolbar
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomButton {
    pub label: &'static str,
    pub group: Option<&'static str>,
    pub action: ButtonAction,
}

impl CustomButton {
    const fn pay() -> Self {
        Self { label: "Pay with Stripe", group: Some("Actions"), action: ButtonAction::PayWithStripe }
    }

    const fn view_session() -> Self {
        Self { label: "View Stripe Session", group: Some("Stripe"), action: ButtonAction::ViewStripeSession }
    }

    const fn check_status() -> Self {
        Self { label: "Check Status", group: None, action: ButtonAction::CheckStatus }
    }
}

/// Shared collaborators for every open view
#[derive(Clone)]
pub struct DeskContext {
    pub remote: Arc<dyn RemoteMethods>,
    pub store: Arc<dyn DocumentStore>,
    pub host: Arc<dyn FormHost>,
    pub dashboard: DashboardUrl,
}

impl DeskContext {
    pub fn view(&self, doc: FormDoc) -> DocumentView {
        DocumentView::new(doc, self)
    }
}

/// One open form
pub struct DocumentView {
    doc: FormDoc,
    requester: SessionRequester,
    poller: StatusPoller,
    host: Arc<dyn FormHost>,
    dashboard: DashboardUrl,
}

impl DocumentView {
    pub fn new(doc: FormDoc, ctx: &DeskContext) -> Self {
        Self {
            doc,
            requester: SessionRequester::new(ctx.remote.clone()),
            poller: StatusPoller::new(ctx.remote.clone(), ctx.store.clone()),
            host: ctx.host.clone(),
            dashboard: ctx.dashboard.clone(),
        }
    }

    pub const fn doc(&self) -> &FormDoc {
        &self.doc
    }

    /// Buttons visible for the document in its current state
    pub fn refresh(&self) -> Vec<CustomButton> {
        let mut buttons = Vec::new();

        match &self.doc {
            FormDoc::SalesInvoice(_) | FormDoc::CollectiveInvoice(_) => {
                if self.doc.can_pay() {
                    buttons.push(CustomButton::pay());
                }
                if self.doc.cached_session_id().is_some() {
                    buttons.push(CustomButton::view_session());
                }
            }
            FormDoc::TransferDetails(doc) => {
                if !doc.is_local {
                    buttons.push(CustomButton::check_status());
                }
            }
        }

        buttons
    }

    /// Dashboard URL for the cached session
    pub fn session_dashboard_url(&self) -> Option<String> {
        self.doc.cached_session_id().map(|id| self.dashboard.render(id))
    }

    /// Run a button's action.
    ///
    /// Remote outcomes are reported through the host and never returned as
    /// errors. `Err` means the button is not shown for this document, or the
    /// status write-back failed.
    pub async fn click(&mut self, action: ButtonAction) -> Result<()> {
        if !self.refresh().iter().any(|button| button.action == action) {
            return Err(PayError::Validation(format!(
                "{action:?} is not available for {} {}",
                self.doc.doctype(),
                self.doc.name()
            )));
        }

        match action {
            ButtonAction::PayWithStripe => {
                self.pay_with_stripe().await;
                Ok(())
            }
            ButtonAction::ViewStripeSession => {
                if let Some(url) = self.session_dashboard_url() {
                    self.host.open_window(&url);
                }
                Ok(())
            }
            ButtonAction::CheckStatus => self.check_status().await,
        }
    }

    async fn pay_with_stripe(&mut self) {
        let Some(invoice) = self.doc.invoice_kind() else {
            return;
        };

        self.host.show_alert(messages::CREATING_SESSION, Indicator::Blue);

        let request = PaymentSessionRequest::new(invoice, self.doc.name());
        match self.requester.create_session(&request).await {
            SessionOutcome::Created { url, session_id } => {
                self.host.show_alert(messages::REDIRECTING, Indicator::Green);
                self.host.open_window(&url);
                if let Some(id) = session_id {
                    self.doc.cache_session_id(id);
                }
                self.host.reload_doc(self.doc.doctype(), self.doc.name());
            }
            SessionOutcome::Declined => {
                self.host.show_alert(messages::SESSION_DECLINED, Indicator::Red);
            }
            SessionOutcome::TransportError(_) => {
                self.host.show_alert(messages::CONNECTION_ERROR, Indicator::Red);
            }
        }
    }

    async fn check_status(&mut self) -> Result<()> {
        let FormDoc::TransferDetails(record) = &mut self.doc else {
            return Ok(());
        };

        match self.poller.poll(record).await {
            Ok(PollOutcome::Updated { status, .. }) => {
                self.host.msgprint(&format!("Status: {status}"));
                Ok(())
            }
            Ok(PollOutcome::Empty) => {
                self.host.show_alert(messages::NO_STATUS, Indicator::Orange);
                Ok(())
            }
            Ok(PollOutcome::TransportError(_)) => {
                self.host.show_alert(messages::STATUS_UNAVAILABLE, Indicator::Red);
                Ok(())
            }
            Err(e) => {
                tracing::error!(transfer = %record.name, error = %e, "Failed to save transfer status");
                self.host.show_alert(messages::STATUS_NOT_SAVED, Indicator::Red);
                Err(e)
            }
        }
    }
}
