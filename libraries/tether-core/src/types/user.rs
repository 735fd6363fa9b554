/// User domain types
use super::UserId;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// User account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user identifier, assigned at creation
    pub id: UserId,

    /// Display name reported by the identity provider
    pub name: Option<String>,

    /// Human-chosen handle
    pub username: Option<String>,

    /// Email address
    pub email: Option<String>,

    /// Linked identity providers, at most one entry per provider name
    pub providers: Vec<ProviderLink>,

    /// Account creation timestamp
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with a generated ID
    ///
    /// `created_at` has whole-second precision, matching what the store keeps.
    pub fn new(new_user: NewUser) -> Self {
        Self {
            id: UserId::generate(),
            name: new_user.name,
            username: new_user.username,
            email: new_user.email,
            providers: new_user.providers,
            created_at: Utc::now().trunc_subsecs(0),
        }
    }

    /// Whether a non-empty username is set
    pub fn has_username(&self) -> bool {
        self.username.as_deref().is_some_and(|u| !u.is_empty())
    }

    /// Find the link for the given provider
    pub fn provider(&self, name: &str) -> Option<&ProviderLink> {
        self.providers.iter().find(|p| p.name == name)
    }

    /// Providers list with every entry for `name` removed
    pub fn providers_without(&self, name: &str) -> Vec<ProviderLink> {
        self.providers
            .iter()
            .filter(|p| p.name != name)
            .cloned()
            .collect()
    }
}

/// One linked external identity
///
/// Provider-specific metadata is flattened into the JSON object, so a Google
/// link serializes as `{"name":"google","identifier":"…","googleSub":"…"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderLink {
    /// Provider identifier (e.g. "google")
    pub name: String,

    /// Provider-specific subject id
    pub identifier: String,

    /// Extra provider-specific fields
    #[serde(flatten)]
    pub metadata: BTreeMap<String, String>,
}

impl ProviderLink {
    /// Create a link without metadata
    pub fn new(name: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identifier: identifier.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Attach a metadata field
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Data needed to create a user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUser {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub providers: Vec<ProviderLink>,
}

impl NewUser {
    /// A user signing up through a single identity provider
    pub fn with_provider(name: Option<String>, email: Option<String>, link: ProviderLink) -> Self {
        Self {
            name,
            username: None,
            email,
            providers: vec![link],
        }
    }
}

/// Partial update applied by `UserStore::update_user`
///
/// `None` leaves a field untouched. For `email`, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<Option<String>>,
    pub providers: Option<Vec<ProviderLink>>,
}

impl UserUpdate {
    /// Replace the providers list
    #[must_use]
    pub fn providers(mut self, providers: Vec<ProviderLink>) -> Self {
        self.providers = Some(providers);
        self
    }

    /// Set the email address
    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(Some(email.into()));
        self
    }

    /// Clear the email address
    #[must_use]
    pub fn clear_email(mut self) -> Self {
        self.email = Some(None);
        self
    }

    /// Set the display name
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Whether applying this update would change nothing
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.providers.is_none()
    }
}
