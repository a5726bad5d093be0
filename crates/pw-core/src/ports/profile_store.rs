//! Profile store port.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ProfileStoreError;
use crate::identity::UserId;
use crate::profile::{NewProfile, Profile};

/// Capability exposed by the profile/user-record store.
#[async_trait]
pub trait ProfileStorePort: Send + Sync {
    /// Fetch the profile for an identity, or `NotFound` if none exists.
    async fn fetch_profile(&self, user_id: &UserId) -> Result<Profile, ProfileStoreError>;

    /// Create a profile. Used for lazy creation on first sign-in.
    async fn create_profile(&self, profile: NewProfile) -> Result<Profile, ProfileStoreError>;

    /// Apply a partial update to an existing profile.
    async fn update_profile(
        &self,
        user_id: &UserId,
        patch: Value,
    ) -> Result<Profile, ProfileStoreError>;
}
