//! Credential matching for autofill.
//!
//! Turns a classified screen plus an optional site domain into fill
//! suggestions. Each suggestion names one vault entry and the field handles
//! it would populate, and carries an unforgeable challenge token. Secrets are
//! never attached; they are only decrypted after the suggestion's token
//! passes authentication.
//!
//! Algorithm Structure:
//! 1. Abort on an empty classification
//! 2. Candidate set: service name contains the domain (case-insensitive), or
//!    the whole vault when there is no domain
//! 3. Default order: pinned first, then service name ascending
//! 4. One suggestion per candidate, token = SHA-256(request nonce ‖ entry id)

mod domain;

use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::field_classifier::{ClassificationResult, FieldHandle};
use crate::vault::{sort_entries, CredentialEntry, SortOrder};

pub use domain::{base_domain, canonicalize};

const TOKEN_LEN: usize = 32;

/// Random per-fill-request value mixed into every challenge token.
#[derive(Clone)]
pub struct RequestNonce([u8; TOKEN_LEN]);

impl RequestNonce {
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; TOKEN_LEN]) -> Self {
        Self(bytes)
    }

    /// Token binding this request to `entry_id`.
    pub fn challenge_for(&self, entry_id: i64) -> ChallengeToken {
        let mut hasher = Sha256::new();
        hasher.update(self.0);
        hasher.update(entry_id.to_be_bytes());
        ChallengeToken(hasher.finalize().into())
    }
}

impl fmt::Debug for RequestNonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RequestNonce(..)")
    }
}

/// Authentication-challenge token of one suggestion. Shown to hosts as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChallengeToken([u8; TOKEN_LEN]);

impl ChallengeToken {
    pub fn as_bytes(&self) -> &[u8; TOKEN_LEN] {
        &self.0
    }

    /// Parse the hex form produced by `Display`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != TOKEN_LEN * 2 {
            return None;
        }
        let mut bytes = [0u8; TOKEN_LEN];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(hex.get(i * 2..i * 2 + 2)?, 16).ok()?;
        }
        Some(Self(bytes))
    }
}

impl fmt::Display for ChallengeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ChallengeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChallengeToken({})", self)
    }
}

impl Serialize for ChallengeToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ChallengeToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        ChallengeToken::from_hex(&hex).ok_or_else(|| serde::de::Error::custom("invalid challenge token"))
    }
}

/// Entry id plus the field handles a fill would populate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillTarget {
    pub entry_id: i64,
    pub username_field: Option<FieldHandle>,
    pub password_field: Option<FieldHandle>,
}

/// One entry offered to the user. Carries no secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillSuggestion {
    pub token: ChallengeToken,
    pub target: FillTarget,
    pub service_name: String,
    pub username: String,
}

/// Case-insensitive substring test used for domain filtering.
pub fn service_matches_domain(service_name: &str, domain: &str) -> bool {
    service_name.to_lowercase().contains(&domain.to_lowercase())
}

/// Build suggestions for one fill request.
///
/// # Arguments
/// * `classification` - Field handles from the classifier
/// * `site_domain` - Canonicalized domain, if the host reported one
/// * `vault_snapshot` - Current entries, in any order
/// * `nonce` - Fresh per request
pub fn match_credentials(
    classification: &ClassificationResult,
    site_domain: Option<&str>,
    vault_snapshot: &[CredentialEntry],
    nonce: &RequestNonce,
) -> Vec<FillSuggestion> {
    if classification.is_empty() {
        return vec![];
    }

    let mut candidates: Vec<CredentialEntry> = match site_domain {
        Some(domain) => vault_snapshot
            .iter()
            .filter(|entry| service_matches_domain(&entry.service_name, domain))
            .cloned()
            .collect(),
        None => vault_snapshot.to_vec(),
    };
    sort_entries(&mut candidates, SortOrder::Name);

    debug!(
        site_domain = site_domain.unwrap_or(""),
        candidates = candidates.len(),
        "matched credentials"
    );

    candidates
        .into_iter()
        .map(|entry| FillSuggestion {
            token: nonce.challenge_for(entry.id),
            target: FillTarget {
                entry_id: entry.id,
                username_field: classification.username.clone(),
                password_field: classification.password.clone(),
            },
            service_name: entry.service_name,
            username: entry.username,
        })
        .collect()
}
