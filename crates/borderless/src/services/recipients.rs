use borderless_client::{Dispatcher, Result};
use serde_json::Value;

/// Recipient accounts.
#[derive(Debug, Clone, Copy)]
pub struct RecipientService<'a> {
    dispatcher: &'a Dispatcher,
}

impl<'a> RecipientService<'a> {
    /// Creates the service over `dispatcher`.
    #[must_use]
    pub const fn new(dispatcher: &'a Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Creates a recipient account.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn create(&self, account: Value) -> Result<Value> {
        self.dispatcher.post("v1/accounts", Some(account)).await
    }

    /// Creates an account that refunds are paid to.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn create_refund(&self, account: Value) -> Result<Value> {
        self.dispatcher
            .post("v1/refund-accounts", Some(account))
            .await
    }

    /// Lists recipient accounts matching `query` (`profile`, `currency`, ...).
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn list(&self, query: &[(&str, &str)]) -> Result<Value> {
        self.dispatcher.get("v2/accounts", query).await
    }

    /// Fetches a recipient account.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn get(&self, account_id: u64) -> Result<Value> {
        self.dispatcher
            .get(&format!("v2/accounts/{account_id}"), &[])
            .await
    }

    /// Deactivates a recipient account.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn deactivate(&self, account_id: u64) -> Result<Value> {
        self.dispatcher
            .delete(&format!("v2/accounts/{account_id}"))
            .await
    }

    /// Fields a recipient needs for the route of `quote_id`.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn requirements_for_quote(&self, quote_id: &str) -> Result<Value> {
        self.dispatcher
            .get(&format!("v1/quotes/{quote_id}/account-requirements"), &[])
            .await
    }

    /// Fields a recipient needs for a route, without a quote.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn account_requirements(
        &self,
        source: &str,
        target: &str,
        source_amount: u64,
    ) -> Result<Value> {
        let amount = source_amount.to_string();
        self.dispatcher
            .get(
                "v1/account-requirements",
                &[
                    ("source", source),
                    ("target", target),
                    ("sourceAmount", amount.as_str()),
                ],
            )
            .await
    }

    /// Validation rules for recipient fields.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn validation_rules(&self, profile_id: u64, query: &[(&str, &str)]) -> Result<Value> {
        self.dispatcher
            .get(
                &format!("v1/profiles/{profile_id}/recipient-validation-rules"),
                query,
            )
            .await
    }
}
