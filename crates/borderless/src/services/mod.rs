//! Resource services.
//!
//! Each service borrows the shared [`Dispatcher`](borderless_client::Dispatcher)
//! and maps one group of endpoints onto its verbs. Request and response
//! bodies are passed through as JSON without schema validation.

mod activities;
mod addresses;
mod balance_statements;
mod balances;
mod profiles;
mod quotes;
mod rates;
mod recipients;
mod transfers;

pub use activities::ActivityService;
pub use addresses::AddressService;
pub use balance_statements::{BalanceStatementService, StatementFormat};
pub use balances::{Amount, BalanceService, BalanceType};
pub use profiles::ProfileService;
pub use quotes::{CreateQuoteRequest, QuoteService};
pub use rates::{RateGroup, RateService};
pub use recipients::RecipientService;
pub use transfers::TransferService;

/// Header carrying a client-generated key that lets the API drop duplicate
/// creates.
pub(crate) const IDEMPOTENCE_HEADER: &str = "X-idempotence-uuid";

/// Appends `query` to `endpoint` for calls whose method sends a body and
/// therefore gets no query string from the dispatcher.
pub(crate) fn endpoint_with_query(endpoint: &str, query: &[(&str, &str)]) -> String {
    if query.is_empty() {
        return endpoint.to_string();
    }
    let encoded = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(query)
        .finish();
    format!("{endpoint}?{encoded}")
}
