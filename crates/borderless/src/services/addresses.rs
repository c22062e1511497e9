use borderless_client::{Dispatcher, Result};
use serde_json::Value;

/// Addresses attached to profiles.
#[derive(Debug, Clone, Copy)]
pub struct AddressService<'a> {
    dispatcher: &'a Dispatcher,
}

impl<'a> AddressService<'a> {
    /// Creates the service over `dispatcher`.
    #[must_use]
    pub const fn new(dispatcher: &'a Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Fetches an address.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn get(&self, address_id: u64) -> Result<Value> {
        self.dispatcher
            .get(&format!("v1/addresses/{address_id}"), &[])
            .await
    }

    /// Lists addresses.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn list(&self) -> Result<Value> {
        self.dispatcher.get("v1/addresses", &[]).await
    }

    /// Creates an address.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn create(&self, address: Value) -> Result<Value> {
        self.dispatcher.post("v1/addresses", Some(address)).await
    }

    /// Changes fields of an address.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn update(&self, address_id: u64, changes: Value) -> Result<Value> {
        self.dispatcher
            .patch(&format!("v1/addresses/{address_id}"), Some(changes))
            .await
    }

    /// Fetches the fields an address needs.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn requirements(&self, query: &[(&str, &str)]) -> Result<Value> {
        self.dispatcher
            .get("v1/addresses/requirements", query)
            .await
    }

    /// Fetches the fields an address needs given the values entered so far.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn refine_requirements(&self, partial: Value) -> Result<Value> {
        self.dispatcher
            .post("v1/addresses/requirements", Some(partial))
            .await
    }
}
