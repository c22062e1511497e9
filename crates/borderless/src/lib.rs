//! # borderless
//!
//! A Rust client for the Wise REST API.
//!
//! The [`Wise`] facade owns one [`Dispatcher`] and hands out lightweight
//! services that borrow it. Services only format endpoints and parameters;
//! retries, decoding, caching and error classification all happen in the
//! dispatcher.
//!
//! ## Quick Start
//!
//! ```no_run
//! use borderless::{BalanceType, ClientConfig, Wise};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let wise = Wise::new(ClientConfig::new("api-token"))?;
//!
//! let profiles = wise.profiles().list().await?;
//! println!("{profiles:#}");
//!
//! let balances = wise.balances().list(42, Some(BalanceType::Standard)).await?;
//! println!("{balances:#}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Errors
//!
//! Every call returns [`ClientError`]. Non-2xx answers arrive as
//! [`ClientError::Api`] carrying an [`ApiError`] with the status and the raw
//! upstream payload:
//!
//! ```no_run
//! use borderless::{ApiErrorKind, ClientConfig, Wise};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let wise = Wise::new(ClientConfig::new("api-token"))?;
//! match wise.transfers().get(7).await {
//!     Ok(transfer) => println!("{transfer}"),
//!     Err(e) if e.kind() == Some(ApiErrorKind::NotFound) => println!("no such transfer"),
//!     Err(e) => return Err(e.into()),
//! }
//! # Ok(())
//! # }
//! ```

pub mod services;

pub use borderless_client::*;
pub use borderless_common::*;

pub use services::{
    ActivityService, AddressService, Amount, BalanceService, BalanceStatementService,
    BalanceType, CreateQuoteRequest, ProfileService, QuoteService, RateGroup, RateService,
    RecipientService, StatementFormat, TransferService,
};

/// Entry point owning the dispatcher shared by every service.
#[derive(Debug, Clone)]
pub struct Wise {
    dispatcher: Dispatcher,
}

impl Wise {
    /// Creates a client for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] if the configuration is invalid.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Ok(Self {
            dispatcher: Dispatcher::new(config)?,
        })
    }

    /// Creates a client from the `WISE_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] if the environment is
    /// incomplete or invalid.
    pub fn from_env() -> Result<Self> {
        let config =
            ClientConfig::from_env().map_err(|e| ClientError::Configuration(e.to_string()))?;
        Self::new(config)
    }

    /// Wraps an already-built dispatcher, e.g. one with a custom cache store.
    #[must_use]
    pub const fn from_dispatcher(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// The underlying dispatcher, for endpoints no service covers.
    #[must_use]
    pub const fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Profiles, directors and verification.
    #[must_use]
    pub const fn profiles(&self) -> ProfileService<'_> {
        ProfileService::new(&self.dispatcher)
    }

    /// Multi-currency balances.
    #[must_use]
    pub const fn balances(&self) -> BalanceService<'_> {
        BalanceService::new(&self.dispatcher)
    }

    /// Balance statements.
    #[must_use]
    pub const fn balance_statements(&self) -> BalanceStatementService<'_> {
        BalanceStatementService::new(&self.dispatcher)
    }

    /// Transfers and their documents.
    #[must_use]
    pub const fn transfers(&self) -> TransferService<'_> {
        TransferService::new(&self.dispatcher)
    }

    /// Quotes.
    #[must_use]
    pub const fn quotes(&self) -> QuoteService<'_> {
        QuoteService::new(&self.dispatcher)
    }

    /// Exchange rates.
    #[must_use]
    pub const fn rates(&self) -> RateService<'_> {
        RateService::new(&self.dispatcher)
    }

    /// Recipient accounts.
    #[must_use]
    pub const fn recipients(&self) -> RecipientService<'_> {
        RecipientService::new(&self.dispatcher)
    }

    /// Addresses.
    #[must_use]
    pub const fn addresses(&self) -> AddressService<'_> {
        AddressService::new(&self.dispatcher)
    }

    /// Profile activity feed.
    #[must_use]
    pub const fn activities(&self) -> ActivityService<'_> {
        ActivityService::new(&self.dispatcher)
    }
}
