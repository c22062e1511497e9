use borderless_client::{Dispatcher, Result};
use serde::Serialize;
use serde_json::Value;
use typed_builder::TypedBuilder;

/// Body of a quote creation call.
///
/// Set exactly one of `source_amount` and `target_amount`; the API decides
/// which combinations it accepts.
///
/// # Examples
///
/// ```
/// use borderless::CreateQuoteRequest;
///
/// let quote = CreateQuoteRequest::builder()
///     .source_currency("GBP")
///     .target_currency("EUR")
///     .source_amount(Some(100.0))
///     .build();
/// assert_eq!(quote.target_amount, None);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuoteRequest {
    /// Currency the sender pays in.
    #[builder(setter(into))]
    pub source_currency: String,
    /// Currency the recipient receives.
    #[builder(setter(into))]
    pub target_currency: String,
    /// Amount in the source currency.
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_amount: Option<f64>,
    /// Amount in the target currency.
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_amount: Option<f64>,
    /// Recipient account, when already known.
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_account: Option<u64>,
    /// Payout method, e.g. `BANK_TRANSFER`.
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pay_out: Option<String>,
    /// Preferred pay-in method, e.g. `BALANCE`.
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_pay_in: Option<String>,
}

/// Quotes.
#[derive(Debug, Clone, Copy)]
pub struct QuoteService<'a> {
    dispatcher: &'a Dispatcher,
}

impl<'a> QuoteService<'a> {
    /// Creates the service over `dispatcher`.
    #[must_use]
    pub const fn new(dispatcher: &'a Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Creates an example quote that is not bound to a profile.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn create_unauthenticated(&self, quote: &CreateQuoteRequest) -> Result<Value> {
        self.dispatcher
            .post("v3/quotes", Some(serde_json::to_value(quote)?))
            .await
    }

    /// Creates a quote for a profile.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn create(&self, profile_id: u64, quote: &CreateQuoteRequest) -> Result<Value> {
        self.dispatcher
            .post(
                &format!("v3/profiles/{profile_id}/quotes"),
                Some(serde_json::to_value(quote)?),
            )
            .await
    }

    /// Fetches a quote.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn get(&self, profile_id: u64, quote_id: &str) -> Result<Value> {
        self.dispatcher
            .get(&format!("v3/profiles/{profile_id}/quotes/{quote_id}"), &[])
            .await
    }

    /// Updates a quote, e.g. to attach `{"targetAccount": ...}`.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn update(
        &self,
        profile_id: u64,
        quote_id: &str,
        changes: Option<Value>,
    ) -> Result<Value> {
        self.dispatcher
            .patch(
                &format!("v3/profiles/{profile_id}/quotes/{quote_id}"),
                changes,
            )
            .await
    }
}
