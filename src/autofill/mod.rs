//! Host-facing autofill flow.
//!
//! Algorithm Structure:
//! 1. `handle_fill_request`: classify the screen, canonicalize the site,
//!    match vault entries and register one pending suggestion per match
//! 2. `authenticate_suggestion`: take the suggestion out of the pending map
//!    (single use), run the authenticator, and only on a grant decrypt the
//!    entry and hand back the fill values
//!
//! Only the latest request's suggestions stay pending: registering a new set
//! drops whatever an earlier request left unanswered.
//!
//! A request may carry a [`CancellationToken`]. Cancellation before
//! suggestions are returned yields no result and registers nothing; after a
//! grant it is checked once more right before decryption.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth_gate::{AuthPrompt, Authenticator, PendingSuggestion};
use crate::credential_matcher::{canonicalize, match_credentials, ChallengeToken, FillSuggestion, RequestNonce};
use crate::envelope::SecretString;
use crate::error::VaultResult;
use crate::field_classifier::{classify, FieldHandle, ScreenNode};
use crate::vault::{PasswordVault, SortOrder};

/// One fill request from the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillRequest {
    pub screen: ScreenNode,
    /// Web domain or URL the host reported, if any.
    #[serde(default)]
    pub site: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillResponse {
    NoResult,
    Suggestions(Vec<FillSuggestion>),
}

/// Plaintext values for the classified fields.
pub struct FillValues {
    pub entry_id: i64,
    pub username: Option<(FieldHandle, String)>,
    pub password: Option<(FieldHandle, SecretString)>,
}

impl std::fmt::Debug for FillValues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FillValues")
            .field("entry_id", &self.entry_id)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|(handle, _)| handle))
            .finish()
    }
}

#[derive(Debug)]
pub enum AuthenticationResult {
    Filled(FillValues),
    /// Nothing is filled. `message` is set for errors the user should see.
    NoResult { message: Option<String> },
}

impl AuthenticationResult {
    fn silent() -> Self {
        AuthenticationResult::NoResult { message: None }
    }
}

struct PendingEntry {
    suggestion: PendingSuggestion,
    cancel: CancellationToken,
}

/// Drives fill requests against a vault and an authenticator.
pub struct AutofillService {
    vault: Arc<PasswordVault>,
    authenticator: Arc<dyn Authenticator>,
    prompt: AuthPrompt,
    pending: Mutex<HashMap<ChallengeToken, PendingEntry>>,
}

impl AutofillService {
    pub fn new(vault: Arc<PasswordVault>, authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            vault,
            authenticator,
            prompt: AuthPrompt::autofill(),
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_prompt(mut self, prompt: AuthPrompt) -> Self {
        self.prompt = prompt;
        self
    }

    /// Number of suggestions waiting for authentication.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Drop every pending suggestion, e.g. when the host's screen goes away.
    pub async fn clear_pending(&self) {
        self.pending.lock().await.clear();
    }

    pub async fn handle_fill_request(
        &self,
        request: FillRequest,
        cancel: Option<CancellationToken>,
    ) -> VaultResult<FillResponse> {
        let cancel = cancel.unwrap_or_default();
        if cancel.is_cancelled() {
            return Ok(FillResponse::NoResult);
        }

        let site = request.site.as_deref();
        let classification = classify(&request.screen, site);
        if classification.is_empty() {
            debug!("no login fields on screen");
            return Ok(FillResponse::NoResult);
        }
        let domain = canonicalize(site);

        let entries = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("fill request cancelled during vault read");
                return Ok(FillResponse::NoResult);
            }
            entries = self.vault.entries(SortOrder::Name) => entries?,
        };

        let suggestions = match_credentials(&classification, domain.as_deref(), &entries, &RequestNonce::generate());
        if suggestions.is_empty() {
            return Ok(FillResponse::NoResult);
        }

        let mut pending = self.pending.lock().await;
        // Checked under the lock so a cancelled request never registers tokens.
        if cancel.is_cancelled() {
            return Ok(FillResponse::NoResult);
        }
        let superseded = pending.len();
        pending.clear();
        if superseded > 0 {
            debug!(superseded, "dropped suggestions from earlier request");
        }
        for suggestion in &suggestions {
            pending.insert(
                suggestion.token,
                PendingEntry {
                    suggestion: PendingSuggestion::new(suggestion.target.clone()),
                    cancel: cancel.clone(),
                },
            );
        }
        drop(pending);

        info!(suggestions = suggestions.len(), "offering fill suggestions");
        Ok(FillResponse::Suggestions(suggestions))
    }

    /// The user picked the suggestion identified by `token`.
    pub async fn authenticate_suggestion(&self, token: &ChallengeToken) -> VaultResult<AuthenticationResult> {
        let Some(PendingEntry { suggestion, cancel }) = self.pending.lock().await.remove(token) else {
            warn!("unknown or already used challenge token");
            return Ok(AuthenticationResult::silent());
        };
        if cancel.is_cancelled() {
            return Ok(AuthenticationResult::silent());
        }

        let authenticating = suggestion.begin();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("fill request cancelled during authentication");
                return Ok(AuthenticationResult::silent());
            }
            outcome = self.authenticator.challenge(&self.prompt) => outcome,
        };

        let granted = match authenticating.resolve(outcome) {
            Ok(granted) => granted,
            Err(denied) => {
                return Ok(AuthenticationResult::NoResult {
                    message: denied.user_message().map(str::to_string),
                });
            }
        };

        if cancel.is_cancelled() {
            debug!("fill request cancelled before decrypt");
            return Ok(AuthenticationResult::silent());
        }

        let Some((entry, password)) = self.vault.reveal_for_fill(&granted).await? else {
            return Ok(AuthenticationResult::silent());
        };

        let target = granted.target();
        info!(entry_id = entry.id, "filling credential");
        Ok(AuthenticationResult::Filled(FillValues {
            entry_id: entry.id,
            username: target.username_field.clone().map(|handle| (handle, entry.username)),
            password: target.password_field.clone().map(|handle| (handle, password)),
        }))
    }
}

#[cfg(test)]
mod tests;
