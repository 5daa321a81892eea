//! Per-suggestion authentication as a type-state.
//!
//! `PendingSuggestion -> AuthenticatingSuggestion -> GrantedSuggestion | DeniedSuggestion`
//!
//! Every step consumes its input, so a suggestion cannot be authenticated
//! twice, and a [`GrantedSuggestion`] can only be obtained from a successful
//! [`AuthOutcome`].

use tracing::debug;

use super::AuthOutcome;
use crate::credential_matcher::FillTarget;

/// Suggestion shown to the user, not yet selected.
#[derive(Debug)]
pub struct PendingSuggestion {
    target: FillTarget,
}

/// The user selected the suggestion and the platform prompt is up.
#[derive(Debug)]
pub struct AuthenticatingSuggestion {
    target: FillTarget,
}

/// Authentication succeeded. The only value the vault accepts for a fill decrypt.
#[derive(Debug)]
pub struct GrantedSuggestion {
    target: FillTarget,
}

/// Authentication ended without success.
#[derive(Debug)]
pub struct DeniedSuggestion {
    target: FillTarget,
    outcome: AuthOutcome,
}

impl PendingSuggestion {
    pub fn new(target: FillTarget) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &FillTarget {
        &self.target
    }

    /// Selected by the user.
    pub fn begin(self) -> AuthenticatingSuggestion {
        debug!(entry_id = self.target.entry_id, "suggestion authenticating");
        AuthenticatingSuggestion { target: self.target }
    }
}

impl AuthenticatingSuggestion {
    pub fn target(&self) -> &FillTarget {
        &self.target
    }

    /// Fold in the authenticator's outcome.
    pub fn resolve(self, outcome: AuthOutcome) -> Result<GrantedSuggestion, DeniedSuggestion> {
        match outcome {
            AuthOutcome::Success => {
                debug!(entry_id = self.target.entry_id, "suggestion granted");
                Ok(GrantedSuggestion { target: self.target })
            }
            outcome => {
                debug!(entry_id = self.target.entry_id, ?outcome, "suggestion denied");
                Err(DeniedSuggestion {
                    target: self.target,
                    outcome,
                })
            }
        }
    }
}

impl GrantedSuggestion {
    pub fn target(&self) -> &FillTarget {
        &self.target
    }
}

impl DeniedSuggestion {
    pub fn target(&self) -> &FillTarget {
        &self.target
    }

    pub fn outcome(&self) -> &AuthOutcome {
        &self.outcome
    }

    /// User-visible message; `None` for benign outcomes.
    pub fn user_message(&self) -> Option<&str> {
        self.outcome.user_message()
    }
}
