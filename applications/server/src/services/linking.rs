/// Account linking - turns verified provider claims into a local account
use crate::error::{Result, ServerError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tether_core::{CoreError, NewUser, ProviderLink, User, UserId, UserStore, UserUpdate};

/// Profile claims reported by the identity provider
#[derive(Debug, Clone, Default)]
pub struct ProfileClaims {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Outcome of a link or sign-up, serialized as the HTTP body
///
/// `{"ok":true,"user":{…}}` on success, `{"ok":false,"error":"…"}` when a
/// business rule rejects the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkOutcome {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LinkOutcome {
    pub fn success(user: User) -> Self {
        Self {
            ok: true,
            user: Some(user),
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            user: None,
            error: Some(error.into()),
        }
    }
}

pub struct AccountLinkingService {
    store: Arc<dyn UserStore>,
}

impl AccountLinkingService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Attach a provider identity to an existing account
    ///
    /// An existing link for the same provider is replaced, so each provider
    /// appears at most once per user. Missing name and email are filled in
    /// from the claims; values already on the account are kept.
    pub async fn link_existing_user(
        &self,
        user_id: &UserId,
        claims: &ProfileClaims,
        provider: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<LinkOutcome> {
        let link = build_link(provider, metadata)?;

        let Some(user) = self.store.get_user(user_id).await? else {
            return Ok(LinkOutcome::rejected("User not found."));
        };

        if let Some(owner) = self
            .store
            .find_by_provider(provider, &link.identifier)
            .await?
        {
            if owner.id != user.id {
                return Ok(LinkOutcome::rejected(already_linked(provider)));
            }
        }

        let mut providers = user.providers.clone();
        match providers.iter_mut().find(|p| p.name == provider) {
            Some(existing) => *existing = link,
            None => providers.push(link),
        }

        let mut update = UserUpdate::default().providers(providers);
        if user.email.is_none() {
            if let Some(email) = &claims.email {
                update = update.email(email.clone());
            }
        }
        if user.name.is_none() {
            if let Some(name) = &claims.name {
                update = update.name(name.clone());
            }
        }

        match self.store.update_user(&user.id, update).await {
            Ok(updated) => {
                tracing::info!(user_id = %updated.id, provider, "Linked provider to existing user");
                Ok(LinkOutcome::success(updated))
            }
            // Lost a race against another account claiming the same identity
            Err(CoreError::Duplicate(_)) => Ok(LinkOutcome::rejected(already_linked(provider))),
            Err(e) => Err(e.into()),
        }
    }

    /// Create a new account signed up through `provider`
    pub async fn sign_up_new_user(
        &self,
        claims: &ProfileClaims,
        provider: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<LinkOutcome> {
        let link = build_link(provider, metadata)?;
        let identifier = link.identifier.clone();

        let new_user = NewUser::with_provider(claims.name.clone(), claims.email.clone(), link);

        match self.store.create_user(new_user).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, provider, "Signed up new user");
                Ok(LinkOutcome::success(user))
            }
            // A concurrent sign-in created the account first; return it
            Err(CoreError::Duplicate(msg)) => {
                match self.store.find_by_provider(provider, &identifier).await? {
                    Some(user) => Ok(LinkOutcome::success(user)),
                    None => Err(CoreError::Duplicate(msg).into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Metadata key holding the provider subject id, e.g. `googleSub`
pub fn subject_key(provider: &str) -> String {
    format!("{provider}Sub")
}

fn build_link(provider: &str, metadata: BTreeMap<String, String>) -> Result<ProviderLink> {
    let identifier = metadata
        .get(&subject_key(provider))
        .filter(|sub| !sub.is_empty())
        .cloned()
        .ok_or_else(|| {
            ServerError::BadRequest(format!("Missing {provider} subject identifier"))
        })?;

    Ok(ProviderLink {
        name: provider.to_string(),
        identifier,
        metadata,
    })
}

fn already_linked(provider: &str) -> String {
    format!("This {provider} account is already linked to another user.")
}
