//! Authentication gating for secret release.
//!
//! Two independent state machines live here:
//! - [`SessionGate`] guards the interactive app (Locked, Authenticating, Unlocked).
//! - The per-suggestion type-state in [`suggestion`] guards each autofill fill.
//!
//! The platform authenticator (biometric / device credential prompt) is
//! abstracted behind the [`Authenticator`] trait; the gate only ever consumes
//! its [`AuthOutcome`].

mod passphrase;
mod suggestion;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{VaultError, VaultResult};

pub use passphrase::AppLockSecret;
pub use suggestion::{AuthenticatingSuggestion, DeniedSuggestion, GrantedSuggestion, PendingSuggestion};

// ═══════════════════════════════════════════════════════════════════════════════
// Authenticator contract
// ═══════════════════════════════════════════════════════════════════════════════

/// Error codes a platform authenticator can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthErrorCode {
    /// User dismissed the prompt.
    UserCancelled,
    /// User pressed the prompt's negative button.
    NegativeButton,
    /// No biometric or device credential is enrolled.
    NoneEnrolled,
    /// Too many failed attempts.
    Lockout,
    /// Sensor missing or busy.
    HardwareUnavailable,
    /// Prompt timed out.
    Timeout,
    /// Anything else, with the platform's raw code.
    Other(i32),
}

impl AuthErrorCode {
    /// Benign codes end the attempt without a user-visible error.
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            AuthErrorCode::UserCancelled | AuthErrorCode::NegativeButton | AuthErrorCode::NoneEnrolled
        )
    }
}

/// What the platform authenticator reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthOutcome {
    Success,
    Cancelled,
    Error { code: AuthErrorCode, message: String },
}

impl AuthOutcome {
    /// Message to show the user, if any.
    pub fn user_message(&self) -> Option<&str> {
        match self {
            AuthOutcome::Error { code, message } if !code.is_benign() => Some(message.as_str()),
            _ => None,
        }
    }
}

/// Text shown on the platform prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthPrompt {
    pub title: String,
    pub subtitle: String,
}

impl AuthPrompt {
    /// Prompt used before releasing an autofill credential.
    pub fn autofill() -> Self {
        Self {
            title: "Unlock OpenPass to Autofill".to_string(),
            subtitle: "Confirm your identity to continue".to_string(),
        }
    }

    /// Prompt used to unlock the app.
    pub fn unlock() -> Self {
        Self {
            title: "Unlock with Biometrics".to_string(),
            subtitle: "Confirm your identity to access your vault".to_string(),
        }
    }
}

/// Platform authenticator (biometric or device credential prompt).
///
/// Implementations present `prompt` and resolve once the user is done.
/// They must not panic; any failure is reported as [`AuthOutcome::Error`].
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn challenge(&self, prompt: &AuthPrompt) -> AuthOutcome;
}

// ═══════════════════════════════════════════════════════════════════════════════
// Session gate
// ═══════════════════════════════════════════════════════════════════════════════

/// State of the interactive session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Locked,
    Authenticating,
    Unlocked,
}

impl SessionState {
    fn name(self) -> &'static str {
        match self {
            SessionState::Locked => "locked",
            SessionState::Authenticating => "authenticating",
            SessionState::Unlocked => "unlocked",
        }
    }
}

/// Gate in front of the vault UI.
#[derive(Debug, Clone)]
pub struct SessionGate {
    state: SessionState,
    app_lock_enabled: bool,
}

impl SessionGate {
    /// Starts locked iff app-lock is enabled.
    pub fn new(app_lock_enabled: bool) -> Self {
        let state = if app_lock_enabled {
            SessionState::Locked
        } else {
            SessionState::Unlocked
        };
        Self {
            state,
            app_lock_enabled,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_unlocked(&self) -> bool {
        self.state == SessionState::Unlocked
    }

    /// Fail with [`VaultError::Locked`] unless the session is unlocked.
    pub fn ensure_unlocked(&self) -> VaultResult<()> {
        if self.is_unlocked() {
            Ok(())
        } else {
            Err(VaultError::Locked)
        }
    }

    fn transition(&mut self, to: SessionState) {
        debug!(from = self.state.name(), to = to.name(), "session transition");
        self.state = to;
    }

    fn invalid(&self, to: SessionState) -> VaultError {
        VaultError::InvalidTransition {
            from: self.state.name(),
            to: to.name(),
        }
    }

    /// Locked -> Authenticating, when an external prompt is shown.
    pub fn begin_authentication(&mut self) -> VaultResult<()> {
        match self.state {
            SessionState::Locked => {
                self.transition(SessionState::Authenticating);
                Ok(())
            }
            _ => Err(self.invalid(SessionState::Authenticating)),
        }
    }

    /// Authenticating -> Unlocked on success, back to Locked otherwise.
    ///
    /// Returns whether the session is now unlocked.
    pub fn complete_authentication(&mut self, outcome: &AuthOutcome) -> VaultResult<bool> {
        if self.state != SessionState::Authenticating {
            let to = if *outcome == AuthOutcome::Success {
                SessionState::Unlocked
            } else {
                SessionState::Locked
            };
            return Err(self.invalid(to));
        }

        if *outcome == AuthOutcome::Success {
            self.transition(SessionState::Unlocked);
            info!("session unlocked by authenticator");
            Ok(true)
        } else {
            self.transition(SessionState::Locked);
            Ok(false)
        }
    }

    /// Run one full authenticator round trip.
    pub async fn unlock_with(&mut self, authenticator: &dyn Authenticator) -> VaultResult<AuthOutcome> {
        self.begin_authentication()?;
        let outcome = authenticator.challenge(&AuthPrompt::unlock()).await;
        self.complete_authentication(&outcome)?;
        Ok(outcome)
    }

    /// Check the app-lock passphrase.
    ///
    /// Allowed from Locked or Authenticating. On failure the session stays
    /// (or falls back to) Locked and only `false` is reported.
    pub fn verify_passphrase(&mut self, secret: Option<&AppLockSecret>, candidate: &str) -> VaultResult<bool> {
        if self.state == SessionState::Unlocked {
            return Err(self.invalid(SessionState::Unlocked));
        }

        let ok = secret.map(|s| s.verify(candidate)).unwrap_or(false);
        if ok {
            self.transition(SessionState::Unlocked);
            info!("session unlocked by passphrase");
        } else {
            self.transition(SessionState::Locked);
        }
        Ok(ok)
    }

    /// Re-lock, e.g. when the app goes to the background.
    ///
    /// A no-op while app-lock is disabled.
    pub fn lock(&mut self) {
        if self.app_lock_enabled {
            self.transition(SessionState::Locked);
        }
    }

    /// Apply an app-lock setting change.
    ///
    /// Disabling forces Unlocked. Enabling leaves the current session alone;
    /// the next [`SessionGate::lock`] takes effect.
    pub fn set_app_lock_enabled(&mut self, enabled: bool) {
        self.app_lock_enabled = enabled;
        if !enabled && self.state != SessionState::Unlocked {
            self.transition(SessionState::Unlocked);
        }
    }
}
