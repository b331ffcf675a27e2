//! Document Model
//!
//! Local records the payment flows read from and write back to. Field names
//! on the wire match the desk framework (`name`, `docstatus`, `__islocal`).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Supported document types
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    #[serde(rename = "Sales Invoice")]
    SalesInvoice,
    #[serde(rename = "Collective Invoices")]
    CollectiveInvoice,
    #[serde(rename = "Stripe Transfer Details")]
    TransferDetails,
}

impl DocumentKind {
    /// Doctype name as used in resource paths
    pub const fn doctype(self) -> &'static str {
        match self {
            Self::SalesInvoice => "Sales Invoice",
            Self::CollectiveInvoice => "Collective Invoices",
            Self::TransferDetails => "Stripe Transfer Details",
        }
    }

    pub fn from_doctype(doctype: &str) -> Option<Self> {
        match doctype {
            "Sales Invoice" => Some(Self::SalesInvoice),
            "Collective Invoices" => Some(Self::CollectiveInvoice),
            "Stripe Transfer Details" => Some(Self::TransferDetails),
            _ => None,
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.doctype())
    }
}

/// A record type that can be loaded from and saved to a [`DocumentStore`](crate::DocumentStore)
pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    const KIND: DocumentKind;

    /// Primary key
    fn name(&self) -> &str;

    /// True while the document has never been saved
    fn is_local(&self) -> bool;
}

/// Submission state of a submittable document
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DocStatus {
    #[default]
    Draft,
    Submitted,
    Cancelled,
}

impl From<DocStatus> for u8 {
    fn from(status: DocStatus) -> Self {
        match status {
            DocStatus::Draft => 0,
            DocStatus::Submitted => 1,
            DocStatus::Cancelled => 2,
        }
    }
}

impl TryFrom<u8> for DocStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Draft),
            1 => Ok(Self::Submitted),
            2 => Ok(Self::Cancelled),
            other => Err(format!("invalid docstatus {other}")),
        }
    }
}

/// Sales Invoice (submittable; payable once submitted)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesInvoice {
    pub name: String,

    #[serde(default)]
    pub docstatus: DocStatus,

    #[serde(rename = "__islocal", default, skip_serializing_if = "std::ops::Not::not")]
    pub is_local: bool,

    #[serde(default)]
    pub customer: String,

    #[serde(default)]
    pub grand_total: Decimal,

    /// Checkout session cached after a successful "Pay with Stripe"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stripe_session_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stripe_payment_intent_id: Option<String>,
}

impl SalesInvoice {
    pub fn new(name: impl Into<String>, customer: impl Into<String>, grand_total: Decimal) -> Self {
        Self {
            name: name.into(),
            customer: customer.into(),
            grand_total,
            ..Default::default()
        }
    }

    pub const fn is_submitted(&self) -> bool {
        matches!(self.docstatus, DocStatus::Submitted)
    }
}

impl Document for SalesInvoice {
    const KIND: DocumentKind = DocumentKind::SalesInvoice;

    fn name(&self) -> &str {
        &self.name
    }

    fn is_local(&self) -> bool {
        self.is_local
    }
}

/// Collective invoice lifecycle status
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Unpaid,
    Paid,
    Failed,
    Other(String),
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Draft => "Draft",
            Self::Unpaid => "Unpaid",
            Self::Paid => "Paid",
            Self::Failed => "Failed",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for InvoiceStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Draft" => Self::Draft,
            "Unpaid" => Self::Unpaid,
            "Paid" => Self::Paid,
            "Failed" => Self::Failed,
            _ => Self::Other(s),
        }
    }
}

impl From<InvoiceStatus> for String {
    fn from(status: InvoiceStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Collective Invoices (payable once saved)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectiveInvoice {
    pub name: String,

    #[serde(rename = "__islocal", default, skip_serializing_if = "std::ops::Not::not")]
    pub is_local: bool,

    #[serde(default)]
    pub status: InvoiceStatus,

    #[serde(default)]
    pub customer: String,

    #[serde(default)]
    pub grand_total: Decimal,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_stripe_session_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_stripe_payment_intent_id: Option<String>,
}

impl CollectiveInvoice {
    pub fn new(name: impl Into<String>, customer: impl Into<String>, grand_total: Decimal) -> Self {
        Self {
            name: name.into(),
            customer: customer.into(),
            grand_total,
            status: InvoiceStatus::Unpaid,
            ..Default::default()
        }
    }
}

impl Document for CollectiveInvoice {
    const KIND: DocumentKind = DocumentKind::CollectiveInvoice;

    fn name(&self) -> &str {
        &self.name
    }

    fn is_local(&self) -> bool {
        self.is_local
    }
}

/// Transfer/payout status as reported by Stripe
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransferStatus {
    Paid,
    #[default]
    Pending,
    InTransit,
    Canceled,
    Failed,
    Reversed,
    PartiallyReversed,
    Other(String),
}

impl TransferStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Paid => "paid",
            Self::Pending => "pending",
            Self::InTransit => "in_transit",
            Self::Canceled => "canceled",
            Self::Failed => "failed",
            Self::Reversed => "reversed",
            Self::PartiallyReversed => "partially_reversed",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for TransferStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "paid" => Self::Paid,
            "pending" => Self::Pending,
            "in_transit" => Self::InTransit,
            "canceled" => Self::Canceled,
            "failed" => Self::Failed,
            "reversed" => Self::Reversed,
            "partially_reversed" => Self::PartiallyReversed,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for TransferStatus {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<TransferStatus> for String {
    fn from(status: TransferStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stripe Transfer Details: a log of one transfer or payout
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferDetails {
    pub name: String,

    #[serde(rename = "__islocal", default, skip_serializing_if = "std::ops::Not::not")]
    pub is_local: bool,

    /// Connected account the transfer/payout belongs to
    #[serde(default)]
    pub account: String,

    /// Stripe object id (`tr_...` or `po_...`), or `N/A` for failed attempts
    #[serde(default)]
    pub reference_id: String,

    #[serde(default)]
    pub status: TransferStatus,

    /// When `status` was last fetched from Stripe
    #[serde(rename = "datetime", default, skip_serializing_if = "Option::is_none")]
    pub queried_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub reference_doc: String,

    #[serde(rename = "refrence_name", default)]
    pub reference_name: String,
}

impl TransferDetails {
    /// Record the outcome of a status query; both fields change together
    pub fn apply_status(&mut self, status: TransferStatus, queried_at: DateTime<Utc>) {
        self.status = status;
        self.queried_at = Some(queried_at);
    }
}

impl Document for TransferDetails {
    const KIND: DocumentKind = DocumentKind::TransferDetails;

    fn name(&self) -> &str {
        &self.name
    }

    fn is_local(&self) -> bool {
        self.is_local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_sales_invoice_wire_format() {
        let json = serde_json::json!({
            "name": "INV-0001",
            "docstatus": 1,
            "customer": "ACME",
            "grand_total": 120.5,
        });
        let invoice: SalesInvoice = serde_json::from_value(json).unwrap();
        assert!(invoice.is_submitted());
        assert!(!invoice.is_local);
        assert_eq!(invoice.grand_total, dec!(120.5));
        assert!(invoice.stripe_session_id.is_none());

        let local: SalesInvoice =
            serde_json::from_value(serde_json::json!({"name": "new-1", "__islocal": true})).unwrap();
        assert!(local.is_local());
        assert_eq!(local.docstatus, DocStatus::Draft);
    }

    #[test]
    fn test_invalid_docstatus_rejected() {
        let result: Result<SalesInvoice, _> =
            serde_json::from_value(serde_json::json!({"name": "INV-1", "docstatus": 7}));
        assert!(result.is_err());
    }

    #[test]
    fn test_transfer_status_keeps_unknown_values() {
        assert_eq!(TransferStatus::from("in_transit"), TransferStatus::InTransit);
        let odd = TransferStatus::from("held_for_review");
        assert_eq!(odd.as_str(), "held_for_review");
        assert_eq!(serde_json::to_value(&odd).unwrap(), "held_for_review");
    }

    #[test]
    fn test_transfer_details_field_names() {
        let details: TransferDetails = serde_json::from_value(serde_json::json!({
            "name": "STD-0001",
            "account": "acct_1",
            "reference_id": "tr_1",
            "status": "pending",
            "refrence_name": "INV-0001",
        }))
        .unwrap();
        assert_eq!(details.reference_name, "INV-0001");
        assert!(details.queried_at.is_none());

        let value = serde_json::to_value(&details).unwrap();
        assert_eq!(value["refrence_name"], "INV-0001");
        assert!(value.get("datetime").is_none());
    }

    #[test]
    fn test_doctype_round_trip() {
        for kind in [
            DocumentKind::SalesInvoice,
            DocumentKind::CollectiveInvoice,
            DocumentKind::TransferDetails,
        ] {
            assert_eq!(DocumentKind::from_doctype(kind.doctype()), Some(kind));
        }
        assert_eq!(DocumentKind::from_doctype("Customer"), None);
    }
}
