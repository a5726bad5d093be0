//! Profile domain models.
//!
//! The application-level user record, distinct from the identity record.
//! Created lazily on first sign-in if the store has no row for the user.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::identity::{Identity, UserId};

/// Application-level user record keyed by identity id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: UserId,
    pub display_name: String,
    pub onboarding_complete: bool,
    /// Arbitrary user-chosen fields (dietary preferences, household size, …).
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Profile {
    /// Synthesize the minimal profile for a freshly signed-in identity.
    ///
    /// The display name is derived from the email local part; onboarding is
    /// not complete until the user finishes the flow.
    pub fn bootstrap_for(identity: &Identity) -> NewProfile {
        let display_name = identity
            .email
            .split('@')
            .next()
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| identity.id.to_string());

        NewProfile {
            user_id: identity.id.clone(),
            display_name,
            onboarding_complete: false,
        }
    }
}

/// Payload for lazily creating a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProfile {
    pub user_id: UserId,
    pub display_name: String,
    pub onboarding_complete: bool,
}
