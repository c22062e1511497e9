use borderless_client::{Dispatcher, Result};
use borderless_common::RequestSpec;
use bytes::Bytes;
use serde_json::Value;

const PDF: &str = "application/pdf";

/// Transfers, their funding and their documents.
#[derive(Debug, Clone, Copy)]
pub struct TransferService<'a> {
    dispatcher: &'a Dispatcher,
}

impl<'a> TransferService<'a> {
    /// Creates the service over `dispatcher`.
    #[must_use]
    pub const fn new(dispatcher: &'a Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Fetches the dynamic fields a transfer needs.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn requirements(&self, transfer: Value) -> Result<Value> {
        self.dispatcher
            .post("v1/transfer-requirements", Some(transfer))
            .await
    }

    /// Creates a transfer.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn create(&self, transfer: Value) -> Result<Value> {
        self.dispatcher.post("v1/transfers", Some(transfer)).await
    }

    /// Creates a transfer on behalf of a third party.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn create_third_party(&self, profile_id: u64, transfer: Value) -> Result<Value> {
        self.dispatcher
            .post(
                &format!("v2/profiles/{profile_id}/third-party-transfers"),
                Some(transfer),
            )
            .await
    }

    /// Fetches a transfer.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn get(&self, transfer_id: u64) -> Result<Value> {
        self.dispatcher
            .get(&format!("v1/transfers/{transfer_id}"), &[])
            .await
    }

    /// Fetches a third-party transfer.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn get_third_party(&self, profile_id: u64, transfer_id: u64) -> Result<Value> {
        self.dispatcher
            .get(
                &format!("v2/profiles/{profile_id}/third-party-transfers/{transfer_id}"),
                &[],
            )
            .await
    }

    /// Funds a transfer, e.g. with `{"type": "BALANCE"}`.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn fund(&self, profile_id: u64, transfer_id: u64, funding: Value) -> Result<Value> {
        self.dispatcher
            .post(
                &format!("v3/profiles/{profile_id}/transfers/{transfer_id}/payments"),
                Some(funding),
            )
            .await
    }

    /// Lists transfers matching `query` (`profile`, `status`, `limit`, ...).
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn list(&self, query: &[(&str, &str)]) -> Result<Value> {
        self.dispatcher.get("v1/transfers", query).await
    }

    /// Cancels a transfer that has not been funded yet.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn cancel(&self, transfer_id: u64) -> Result<Value> {
        self.dispatcher
            .put(&format!("v1/transfers/{transfer_id}/cancel"), None)
            .await
    }

    /// Downloads the transfer receipt as PDF bytes.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn receipt_pdf(&self, transfer_id: u64) -> Result<Bytes> {
        self.pdf(format!("v1/transfers/{transfer_id}/receipt.pdf"))
            .await
    }

    /// Downloads the no-objection certificate of an INR transfer as PDF bytes.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn noc_pdf(&self, transfer_id: u64) -> Result<Bytes> {
        self.pdf(format!("v1/transfers/{transfer_id}/documents/noc"))
            .await
    }

    async fn pdf(&self, endpoint: String) -> Result<Bytes> {
        self.dispatcher
            .execute_raw(RequestSpec::get(endpoint).with_header("Accept", PDF))
            .await
    }

    /// Lists completed payments for a transfer.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn payments(&self, transfer_id: u64) -> Result<Value> {
        self.dispatcher
            .get(&format!("v1/transfers/{transfer_id}/payments"), &[])
            .await
    }

    /// Fetches the banking partner's payout details.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn payout_information(&self, transfer_id: u64) -> Result<Value> {
        self.dispatcher
            .get(
                &format!("v2/transfers/{transfer_id}/invoices/bankingpartner"),
                &[],
            )
            .await
    }
}
