//! Transfer Status Poller
//!
//! Fetches the current status of a transfer or payout and writes it back to
//! the local `Stripe Transfer Details` record. One round trip per call; no
//! retries, no timers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::document::{TransferDetails, TransferStatus};
use crate::error::Result;
use crate::remote::{RemoteMethods, StatusReply, methods};
use crate::store::{self, DocumentStore};

/// Status query for a previously created transfer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferStatusQuery {
    pub account: String,
    pub reference_id: String,
}

impl From<&TransferDetails> for TransferStatusQuery {
    fn from(details: &TransferDetails) -> Self {
        Self {
            account: details.account.clone(),
            reference_id: details.reference_id.clone(),
        }
    }
}

/// Outcome of one poll
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// Record now carries `status`, stamped at `queried_at`
    Updated {
        status: TransferStatus,
        queried_at: DateTime<Utc>,
    },

    /// Server had nothing to report; record untouched
    Empty,

    /// The call itself failed; record untouched
    TransportError(String),
}

/// Issues status queries and reconciles the local record
pub struct StatusPoller {
    remote: Arc<dyn RemoteMethods>,
    store: Arc<dyn DocumentStore>,
}

impl StatusPoller {
    pub fn new(remote: Arc<dyn RemoteMethods>, store: Arc<dyn DocumentStore>) -> Self {
        Self { remote, store }
    }

    /// Ask the server for the current status. `Ok(None)` means nothing to report.
    pub async fn query(&self, query: &TransferStatusQuery) -> Result<Option<TransferStatus>> {
        let reply = self
            .remote
            .call(
                methods::CHECK_TRANSFER_STATUS,
                json!({
                    "account": query.account,
                    "reference_id": query.reference_id,
                }),
            )
            .await?;

        let status = reply
            .and_then(|value| serde_json::from_value::<StatusReply>(value).ok())
            .and_then(|reply| reply.status)
            .filter(|status| !status.is_empty())
            .map(TransferStatus::from);

        Ok(status)
    }

    /// Query, apply and persist.
    ///
    /// On `Updated` the record was saved exactly once. `Err` is only returned
    /// when that save fails; the in-memory record has been updated by then.
    pub async fn poll(&self, record: &mut TransferDetails) -> Result<PollOutcome> {
        let query = TransferStatusQuery::from(&*record);

        let status = match self.query(&query).await {
            Ok(Some(status)) => status,
            Ok(None) => {
                tracing::debug!(transfer = %record.name, "No status reported");
                return Ok(PollOutcome::Empty);
            }
            Err(e) => {
                tracing::error!(transfer = %record.name, reference_id = %query.reference_id, error = %e, "Transfer status query failed");
                return Ok(PollOutcome::TransportError(e.to_string()));
            }
        };

        let queried_at = Utc::now();
        record.apply_status(status.clone(), queried_at);
        store::save(self.store.as_ref(), &*record).await?;

        tracing::info!(
            transfer = %record.name,
            reference_id = %query.reference_id,
            status = %status,
            "Updated transfer status"
        );

        Ok(PollOutcome::Updated { status, queried_at })
    }
}
