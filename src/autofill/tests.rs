//! Tests for the autofill flow.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::*;
use crate::auth_gate::{AuthErrorCode, AuthOutcome};
use crate::envelope::{InstallationCipher, MemoryKeyStore, SecretCipher};
use crate::field_classifier::{AutofillHint, FieldHints, NodeKind, Rect};
use crate::vault::{MemoryVaultStore, NewCredential};

/// Wraps the real cipher and counts decryptions.
struct CountingCipher {
    inner: InstallationCipher,
    decrypts: AtomicUsize,
}

impl SecretCipher for CountingCipher {
    fn encrypt_secret(&self, plaintext: &str) -> VaultResult<String> {
        self.inner.encrypt_secret(plaintext)
    }

    fn decrypt_secret(&self, blob: &str) -> VaultResult<SecretString> {
        self.decrypts.fetch_add(1, Ordering::SeqCst);
        self.inner.decrypt_secret(blob)
    }
}

/// Returns a fixed outcome and counts prompts.
struct ScriptedAuthenticator {
    outcome: AuthOutcome,
    prompts: AtomicUsize,
    on_prompt: Option<CancellationToken>,
}

#[async_trait]
impl Authenticator for ScriptedAuthenticator {
    async fn challenge(&self, _prompt: &AuthPrompt) -> AuthOutcome {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        if let Some(cancel) = &self.on_prompt {
            cancel.cancel();
        }
        self.outcome.clone()
    }
}

struct Harness {
    service: AutofillService,
    cipher: Arc<CountingCipher>,
    authenticator: Arc<ScriptedAuthenticator>,
    vault: Arc<PasswordVault>,
}

impl Harness {
    fn decrypts(&self) -> usize {
        self.cipher.decrypts.load(Ordering::SeqCst)
    }

    fn prompts(&self) -> usize {
        self.authenticator.prompts.load(Ordering::SeqCst)
    }
}

async fn harness_with(outcome: AuthOutcome, on_prompt: Option<CancellationToken>) -> Harness {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let cipher = Arc::new(CountingCipher {
        inner: InstallationCipher::new(Arc::new(MemoryKeyStore::generate())),
        decrypts: AtomicUsize::new(0),
    });
    let vault = Arc::new(PasswordVault::new(Arc::new(MemoryVaultStore::new()), cipher.clone()));
    vault
        .insert_entry(&NewCredential::new("example.com", "alice", "alice-pw"))
        .await
        .unwrap();
    vault
        .insert_entry(&NewCredential::new("Example.com (work)", "bob", "bob-pw"))
        .await
        .unwrap();
    vault
        .insert_entry(&NewCredential::new("other.org", "carol", "carol-pw"))
        .await
        .unwrap();

    let authenticator = Arc::new(ScriptedAuthenticator {
        outcome,
        prompts: AtomicUsize::new(0),
        on_prompt,
    });
    let service = AutofillService::new(vault.clone(), authenticator.clone());
    Harness {
        service,
        cipher,
        authenticator,
        vault,
    }
}

async fn harness(outcome: AuthOutcome) -> Harness {
    harness_with(outcome, None).await
}

fn field(id: &str, top: f32, hint: AutofillHint) -> ScreenNode {
    ScreenNode {
        handle: Some(FieldHandle::new(id)),
        kind: NodeKind::Editable,
        bounds: Rect::new(0.0, top, 500.0, 80.0),
        hints: FieldHints {
            autofill_hints: vec![hint],
            ..Default::default()
        },
        ..Default::default()
    }
}

fn login_request(site: Option<&str>) -> FillRequest {
    FillRequest {
        screen: ScreenNode {
            children: vec![
                field("user", 100.0, AutofillHint::Username),
                field("pass", 300.0, AutofillHint::Password),
            ],
            ..Default::default()
        },
        site: site.map(str::to_string),
    }
}

async fn suggestions(harness: &Harness, site: Option<&str>) -> Vec<FillSuggestion> {
    match harness
        .service
        .handle_fill_request(login_request(site), None)
        .await
        .unwrap()
    {
        FillResponse::Suggestions(list) => list,
        FillResponse::NoResult => panic!("expected suggestions"),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Fill requests
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_site_scopes_suggestions() {
    let h = harness(AuthOutcome::Success).await;
    let list = suggestions(&h, Some("https://www.example.com/login")).await;

    let users: Vec<&str> = list.iter().map(|s| s.username.as_str()).collect();
    assert_eq!(users, vec!["alice", "bob"]);
    assert_eq!(h.service.pending_count().await, 2);
    assert_eq!(h.decrypts(), 0);
}

#[tokio::test]
async fn test_no_site_offers_whole_vault() {
    let h = harness(AuthOutcome::Success).await;
    let list = suggestions(&h, None).await;
    assert_eq!(list.len(), 3);
}

#[tokio::test]
async fn test_screen_without_login_fields() {
    let h = harness(AuthOutcome::Success).await;
    let request = FillRequest {
        screen: ScreenNode::default(),
        site: Some("example.com".to_string()),
    };
    let response = h.service.handle_fill_request(request, None).await.unwrap();

    assert_eq!(response, FillResponse::NoResult);
    assert_eq!(h.service.pending_count().await, 0);
}

#[tokio::test]
async fn test_no_matching_entries() {
    let h = harness(AuthOutcome::Success).await;
    let response = h
        .service
        .handle_fill_request(login_request(Some("nothing-here.net")), None)
        .await
        .unwrap();
    assert_eq!(response, FillResponse::NoResult);
}

#[tokio::test]
async fn test_cancelled_request_registers_nothing() {
    let h = harness(AuthOutcome::Success).await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let response = h
        .service
        .handle_fill_request(login_request(Some("example.com")), Some(cancel))
        .await
        .unwrap();
    assert_eq!(response, FillResponse::NoResult);
    assert_eq!(h.service.pending_count().await, 0);
}

// ═══════════════════════════════════════════════════════════════════════════════
// Authentication
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_granted_suggestion_fills_classified_fields() {
    let h = harness(AuthOutcome::Success).await;
    let list = suggestions(&h, Some("example.com")).await;
    let alice = list.iter().find(|s| s.username == "alice").unwrap();

    let result = h.service.authenticate_suggestion(&alice.token).await.unwrap();
    let AuthenticationResult::Filled(values) = result else {
        panic!("expected a fill");
    };

    assert_eq!(values.entry_id, alice.target.entry_id);
    assert_eq!(
        values.username,
        Some((FieldHandle::new("user"), "alice".to_string()))
    );
    let (handle, password) = values.password.unwrap();
    assert_eq!(handle, FieldHandle::new("pass"));
    assert_eq!(password.as_str(), "alice-pw");
    assert_eq!(h.decrypts(), 1);
}

#[tokio::test]
async fn test_token_is_single_use() {
    let h = harness(AuthOutcome::Success).await;
    let list = suggestions(&h, Some("example.com")).await;
    let token = list[0].token;

    assert!(matches!(
        h.service.authenticate_suggestion(&token).await.unwrap(),
        AuthenticationResult::Filled(_)
    ));
    assert!(matches!(
        h.service.authenticate_suggestion(&token).await.unwrap(),
        AuthenticationResult::NoResult { message: None }
    ));
    assert_eq!(h.prompts(), 1);
    assert_eq!(h.decrypts(), 1);
}

#[tokio::test]
async fn test_unknown_token() {
    let h = harness(AuthOutcome::Success).await;
    let forged = RequestNonce::generate().challenge_for(1);

    let result = h.service.authenticate_suggestion(&forged).await.unwrap();
    assert!(matches!(result, AuthenticationResult::NoResult { message: None }));
    assert_eq!(h.prompts(), 0);
}

#[tokio::test]
async fn test_cancelled_authentication_never_decrypts() {
    let h = harness(AuthOutcome::Cancelled).await;
    let list = suggestions(&h, Some("example.com")).await;

    let result = h.service.authenticate_suggestion(&list[0].token).await.unwrap();
    assert!(matches!(result, AuthenticationResult::NoResult { message: None }));
    assert_eq!(h.prompts(), 1);
    assert_eq!(h.decrypts(), 0);

    // Denied is terminal.
    let again = h.service.authenticate_suggestion(&list[0].token).await.unwrap();
    assert!(matches!(again, AuthenticationResult::NoResult { .. }));
    assert_eq!(h.prompts(), 1);
}

#[tokio::test]
async fn test_authenticator_error_reports_message() {
    let h = harness(AuthOutcome::Error {
        code: AuthErrorCode::Lockout,
        message: "Too many attempts".to_string(),
    })
    .await;
    let list = suggestions(&h, Some("example.com")).await;

    let result = h.service.authenticate_suggestion(&list[0].token).await.unwrap();
    match result {
        AuthenticationResult::NoResult { message } => {
            assert_eq!(message.as_deref(), Some("Too many attempts"))
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(h.decrypts(), 0);
}

#[tokio::test]
async fn test_none_enrolled_is_silent() {
    let h = harness(AuthOutcome::Error {
        code: AuthErrorCode::NoneEnrolled,
        message: "No biometrics enrolled".to_string(),
    })
    .await;
    let list = suggestions(&h, Some("example.com")).await;

    let result = h.service.authenticate_suggestion(&list[0].token).await.unwrap();
    assert!(matches!(result, AuthenticationResult::NoResult { message: None }));
}

#[tokio::test]
async fn test_cancel_during_authentication_skips_decrypt() {
    let cancel = CancellationToken::new();
    let h = harness_with(AuthOutcome::Success, Some(cancel.clone())).await;
    let response = h
        .service
        .handle_fill_request(login_request(Some("example.com")), Some(cancel))
        .await
        .unwrap();
    let FillResponse::Suggestions(list) = response else {
        panic!("expected suggestions");
    };

    let result = h.service.authenticate_suggestion(&list[0].token).await.unwrap();
    assert!(matches!(result, AuthenticationResult::NoResult { message: None }));
    assert_eq!(h.prompts(), 1);
    assert_eq!(h.decrypts(), 0);
}

#[tokio::test]
async fn test_entry_deleted_after_suggestion() {
    let h = harness(AuthOutcome::Success).await;
    let list = suggestions(&h, Some("other.org")).await;
    h.vault.delete_entry(list[0].target.entry_id).await.unwrap();

    let result = h.service.authenticate_suggestion(&list[0].token).await.unwrap();
    assert!(matches!(result, AuthenticationResult::NoResult { message: None }));
    assert_eq!(h.decrypts(), 0);
}

#[tokio::test]
async fn test_password_only_form() {
    let h = harness(AuthOutcome::Success).await;
    let request = FillRequest {
        screen: ScreenNode {
            children: vec![field("pin-like", 100.0, AutofillHint::Password)],
            ..Default::default()
        },
        site: Some("other.org".to_string()),
    };
    let FillResponse::Suggestions(list) = h.service.handle_fill_request(request, None).await.unwrap() else {
        panic!("expected suggestions");
    };

    let AuthenticationResult::Filled(values) = h.service.authenticate_suggestion(&list[0].token).await.unwrap() else {
        panic!("expected a fill");
    };
    assert!(values.username.is_none());
    assert_eq!(values.password.map(|(_, p)| p.to_string()), Some("carol-pw".to_string()));
}

#[tokio::test]
async fn test_new_request_supersedes_pending() {
    let h = harness(AuthOutcome::Success).await;
    let first = CancellationToken::new();
    h.service
        .handle_fill_request(login_request(Some("example.com")), Some(first.clone()))
        .await
        .unwrap();
    assert_eq!(h.service.pending_count().await, 2);

    h.service
        .handle_fill_request(login_request(Some("other.org")), None)
        .await
        .unwrap();
    assert_eq!(h.service.pending_count().await, 1);

    h.service.clear_pending().await;
    assert_eq!(h.service.pending_count().await, 0);
}

#[tokio::test]
async fn test_repeated_requests_do_not_accumulate() {
    let h = harness(AuthOutcome::Success).await;
    let stale = suggestions(&h, None).await;
    for _ in 0..100 {
        suggestions(&h, None).await;
    }
    assert_eq!(h.service.pending_count().await, 3);

    let result = h.service.authenticate_suggestion(&stale[0].token).await.unwrap();
    assert!(matches!(result, AuthenticationResult::NoResult { message: None }));
    assert_eq!(h.prompts(), 0);
    assert_eq!(h.decrypts(), 0);
}

#[tokio::test]
async fn test_bare_host_site_keeps_compound_suffix() {
    let h = harness(AuthOutcome::Success).await;
    h.vault
        .insert_entry(&NewCredential::new("example.co.uk", "dave", "dave-pw"))
        .await
        .unwrap();
    h.vault
        .insert_entry(&NewCredential::new("bank.co.uk", "erin", "erin-pw"))
        .await
        .unwrap();

    let list = suggestions(&h, Some("www.example.co.uk")).await;
    let users: Vec<&str> = list.iter().map(|s| s.username.as_str()).collect();
    assert_eq!(users, vec!["dave"]);
}

#[test]
fn test_fill_values_debug_hides_password() {
    let values = FillValues {
        entry_id: 1,
        username: None,
        password: Some((FieldHandle::new("p"), zeroize::Zeroizing::new("s3cret".to_string()))),
    };
    assert!(!format!("{:?}", values).contains("s3cret"));
}
