use borderless_client::{Dispatcher, Result};
use borderless_common::RequestSpec;
use serde_json::Value;
use uuid::Uuid;

use super::{IDEMPOTENCE_HEADER, endpoint_with_query};

/// Personal and business profiles, their owners and verification.
#[derive(Debug, Clone, Copy)]
pub struct ProfileService<'a> {
    dispatcher: &'a Dispatcher,
}

impl<'a> ProfileService<'a> {
    /// Creates the service over `dispatcher`.
    #[must_use]
    pub const fn new(dispatcher: &'a Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Creates a personal profile.
    ///
    /// Each call carries a fresh idempotence key, so a transport retry never
    /// creates a second profile.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn create_personal(&self, profile: Value) -> Result<Value> {
        self.create("v2/profiles/personal-profile", profile).await
    }

    /// Creates a business profile.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn create_business(&self, profile: Value) -> Result<Value> {
        self.create("v2/profiles/business-profile", profile).await
    }

    async fn create(&self, endpoint: &str, profile: Value) -> Result<Value> {
        let spec = RequestSpec::post(endpoint)
            .with_body(profile)
            .with_header(IDEMPOTENCE_HEADER, Uuid::new_v4().to_string());
        self.dispatcher.execute_json(spec).await
    }

    /// Updates a personal profile.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn update_personal(&self, profile_id: u64, profile: Value) -> Result<Value> {
        self.dispatcher
            .put(
                &format!("v2/profiles/{profile_id}/personal-profile"),
                Some(profile),
            )
            .await
    }

    /// Updates a business profile.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn update_business(&self, profile_id: u64, profile: Value) -> Result<Value> {
        self.dispatcher
            .put(
                &format!("v2/profiles/{profile_id}/business-profile"),
                Some(profile),
            )
            .await
    }

    /// Fetches one profile.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn get(&self, profile_id: u64) -> Result<Value> {
        self.dispatcher
            .get(&format!("v2/profiles/{profile_id}"), &[])
            .await
    }

    /// Lists the profiles of the authenticated user.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn list(&self) -> Result<Value> {
        self.dispatcher.get("v2/profiles", &[]).await
    }

    /// Uploads an identification document.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn create_identification_document(
        &self,
        profile_id: u64,
        document: Value,
    ) -> Result<Value> {
        self.dispatcher
            .post(
                &format!("v1/profiles/{profile_id}/verification-documents"),
                Some(document),
            )
            .await
    }

    /// Adds business directors.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn create_directors(&self, profile_id: u64, directors: Value) -> Result<Value> {
        self.dispatcher
            .post(
                &format!("v1/profiles/{profile_id}/directors"),
                Some(directors),
            )
            .await
    }

    /// Lists business directors.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn list_directors(&self, profile_id: u64) -> Result<Value> {
        self.dispatcher
            .get(&format!("v1/profiles/{profile_id}/directors"), &[])
            .await
    }

    /// Replaces the list of business directors.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn update_directors(&self, profile_id: u64, directors: Value) -> Result<Value> {
        self.dispatcher
            .put(
                &format!("v1/profiles/{profile_id}/directors"),
                Some(directors),
            )
            .await
    }

    /// Adds ultimate beneficial owners.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn create_ultimate_owners(&self, profile_id: u64, owners: Value) -> Result<Value> {
        self.dispatcher
            .post(&format!("v1/profiles/{profile_id}/ubos"), Some(owners))
            .await
    }

    /// Lists ultimate beneficial owners.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn list_ultimate_owners(&self, profile_id: u64) -> Result<Value> {
        self.dispatcher
            .get(&format!("v1/profiles/{profile_id}/ubos"), &[])
            .await
    }

    /// Replaces the list of ultimate beneficial owners.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn update_ultimate_owners(&self, profile_id: u64, owners: Value) -> Result<Value> {
        self.dispatcher
            .put(&format!("v1/profiles/{profile_id}/ubos"), Some(owners))
            .await
    }

    /// Removes trusted verification from a profile.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn remove_trusted_verification(&self, profile_id: u64) -> Result<()> {
        self.dispatcher
            .delete(&format!("v3/profiles/{profile_id}/trusted-verification"))
            .await
            .map(drop)
    }

    /// Opens an update window so profile details can be changed.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn open_update_window(&self, profile_id: u64) -> Result<Value> {
        self.dispatcher
            .post(&format!("v1/profiles/{profile_id}/update-window"), None)
            .await
    }

    /// Closes the update window.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn close_update_window(&self, profile_id: u64) -> Result<()> {
        self.dispatcher
            .delete(&format!("v1/profiles/{profile_id}/update-window"))
            .await
            .map(drop)
    }

    /// Fetches the extra fields the profile still needs.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn extension_requirements(&self, profile_id: u64) -> Result<Value> {
        self.dispatcher
            .get(
                &format!("v1/profiles/{profile_id}/extension-requirements"),
                &[],
            )
            .await
    }

    /// Submits profile extension fields.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn update_extensions(&self, profile_id: u64, extensions: Value) -> Result<Value> {
        self.dispatcher
            .post(
                &format!("v1/profiles/{profile_id}/extensions"),
                Some(extensions),
            )
            .await
    }

    /// Checks whether the profile may pay in by bank transfer from each of
    /// `source_currencies`.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error for the call.
    pub async fn verification_status(
        &self,
        profile_id: u64,
        source_currencies: &[&str],
    ) -> Result<Value> {
        let currencies = source_currencies.join(",");
        let endpoint = endpoint_with_query(
            &format!("v3/profiles/{profile_id}/verification-status/bank-transfer"),
            &[("source_currencies", currencies.as_str())],
        );
        self.dispatcher.post(&endpoint, None).await
    }
}
