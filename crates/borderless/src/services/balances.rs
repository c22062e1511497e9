use std::fmt;

use borderless_client::cache::{DEFAULT_CACHE_TTL, balances_key};
use borderless_client::{Dispatcher, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Kind of balance account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BalanceType {
    /// Regular balance used for payments.
    #[default]
    Standard,
    /// Jar balance set aside for saving.
    Savings,
}

impl BalanceType {
    /// Wire name of the type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "STANDARD",
            Self::Savings => "SAVINGS",
        }
    }
}

impl fmt::Display for BalanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An amount of money in one currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amount {
    /// Numeric value.
    pub value: f64,
    /// ISO 4217 currency code.
    pub currency: String,
}

impl Amount {
    /// Creates an amount.
    pub fn new(value: f64, currency: impl Into<String>) -> Self {
        Self {
            value,
            currency: currency.into(),
        }
    }
}

/// Multi-currency balance accounts.
#[derive(Debug, Clone, Copy)]
pub struct BalanceService<'a> {
    dispatcher: &'a Dispatcher,
}

impl<'a> BalanceService<'a> {
    /// Creates the service over `dispatcher`.
    #[must_use]
    pub const fn new(dispatcher: &'a Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Lists balances, optionally only those of `balance_type`.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn list(&self, profile_id: u64, balance_type: Option<BalanceType>) -> Result<Value> {
        let endpoint = format!("v4/profiles/{profile_id}/balances");
        match balance_type {
            Some(balance_type) => {
                self.dispatcher
                    .get(&endpoint, &[("types", balance_type.as_str())])
                    .await
            }
            None => self.dispatcher.get(&endpoint, &[]).await,
        }
    }

    /// Lists the standard balances of a profile, served from the response
    /// cache for [`DEFAULT_CACHE_TTL`].
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call; failures are not cached.
    pub async fn cached_list(&self, profile_id: u64) -> Result<Value> {
        self.dispatcher
            .cache()
            .get_or_compute(&balances_key(profile_id), DEFAULT_CACHE_TTL, || {
                self.list(profile_id, Some(BalanceType::Standard))
            })
            .await
    }

    /// Finds the balance held in `currency`, using the cached listing.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the listing call.
    pub async fn by_currency(&self, profile_id: u64, currency: &str) -> Result<Option<Value>> {
        let balances = self.cached_list(profile_id).await?;
        let found = balances
            .as_array()
            .and_then(|balances| {
                balances
                    .iter()
                    .find(|balance| balance.get("currency").and_then(Value::as_str) == Some(currency))
            })
            .cloned();

        if found.is_none() {
            debug!("Profile {profile_id} holds no {currency} balance");
        }
        Ok(found)
    }

    /// Fetches one balance.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn get(&self, profile_id: u64, balance_id: u64) -> Result<Value> {
        self.dispatcher
            .get(&format!("v4/profiles/{profile_id}/balances/{balance_id}"), &[])
            .await
    }

    /// Opens a balance in `currency`.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn create(
        &self,
        profile_id: u64,
        currency: &str,
        balance_type: BalanceType,
        name: Option<&str>,
    ) -> Result<Value> {
        let mut body = json!({
            "currency": currency,
            "type": balance_type,
        });
        if let Some(name) = name {
            body["name"] = json!(name);
        }

        self.dispatcher
            .post(&format!("v4/profiles/{profile_id}/balances"), Some(body))
            .await
    }

    /// Closes a balance.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn remove(&self, profile_id: u64, balance_id: u64) -> Result<()> {
        self.dispatcher
            .delete(&format!("v4/profiles/{profile_id}/balances/{balance_id}"))
            .await
            .map(drop)
    }

    /// Converts between balances according to a quote.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn convert(&self, profile_id: u64, quote_id: &str) -> Result<Value> {
        self.dispatcher
            .post(
                &format!("v2/profiles/{profile_id}/balance-movements"),
                Some(json!({ "quoteId": quote_id })),
            )
            .await
    }

    /// Moves money between two balances of the same profile.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn move_money(
        &self,
        profile_id: u64,
        source_balance_id: u64,
        target_balance_id: u64,
        amount: &Amount,
        quote_id: Option<&str>,
    ) -> Result<Value> {
        let mut body = json!({
            "sourceBalanceId": source_balance_id,
            "targetBalanceId": target_balance_id,
            "amount": amount,
        });
        if let Some(quote_id) = quote_id {
            body["quoteId"] = json!(quote_id);
        }

        self.dispatcher
            .post(
                &format!("v2/profiles/{profile_id}/balance-movements"),
                Some(body),
            )
            .await
    }

    /// Fetches how much more can be deposited in `currency`.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn deposit_limits(&self, profile_id: u64, currency: &str) -> Result<Value> {
        self.dispatcher
            .get(
                &format!("v1/profiles/{profile_id}/balance-capacity"),
                &[("currency", currency)],
            )
            .await
    }

    /// Sets the recipient that receives money above the deposit limit.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn add_excess_money_account(&self, profile_id: u64, recipient_id: u64) -> Result<Value> {
        self.dispatcher
            .post(
                &format!("v1/profiles/{profile_id}/excess-money-account"),
                Some(json!({ "recipientId": recipient_id })),
            )
            .await
    }
}
