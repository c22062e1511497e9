use borderless_client::{Dispatcher, Result};
use serde_json::Value;

/// Activity feed of a profile.
#[derive(Debug, Clone, Copy)]
pub struct ActivityService<'a> {
    dispatcher: &'a Dispatcher,
}

impl<'a> ActivityService<'a> {
    /// Creates the service over `dispatcher`.
    #[must_use]
    pub const fn new(dispatcher: &'a Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Lists activities, filtered by `query` (`status`, `since`, `until`,
    /// `size`, `nextCursor`).
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn list(&self, profile_id: u64, query: &[(&str, &str)]) -> Result<Value> {
        self.dispatcher
            .get(&format!("v1/profiles/{profile_id}/activities"), query)
            .await
    }
}
