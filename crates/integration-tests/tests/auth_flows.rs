//! Registration, verification, login, and password-reset flows.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use prickly_pear_client::{
    AuthError, LoginOutcome, MemoryStore, RegisterOutcome, ResendOutcome, ResetOtpOutcome,
    ResetOutcome, ResetRequestOutcome, Storage, VerifyOutcome,
};
use prickly_pear_core::PasswordRule;
use prickly_pear_integration_tests::{TestBackend, client_for, client_with_storage};

const PRE_REGISTER_CREDS_KEY: &str = "preRegisterCreds";

// =============================================================================
// Registration & Verification
// =============================================================================

#[tokio::test]
async fn register_reports_verification_sent_and_caches_credentials() {
    let (backend, base) = TestBackend::spawn().await;
    backend.respond("/signup", 200, json!({ "message": "verification code sent" }));

    let storage = Arc::new(MemoryStore::new());
    let state = client_with_storage(&base, Arc::clone(&storage) as Arc<dyn Storage>);

    let outcome = state
        .auth()
        .register("Ada", "Lovelace", "a@x.com", "Str0ng!pass")
        .await
        .unwrap();
    assert_eq!(outcome, RegisterOutcome::VerificationSent);

    let cached = storage.get(PRE_REGISTER_CREDS_KEY).unwrap().unwrap();
    let cached: serde_json::Value = serde_json::from_str(&cached).unwrap();
    assert_eq!(cached["email"], "a@x.com");
    assert_eq!(cached["password"], "Str0ng!pass");

    let signup = backend.last_request("/signup").unwrap();
    assert_eq!(signup.body["firstName"], "Ada");
    assert_eq!(signup.body["lastName"], "Lovelace");
}

#[tokio::test]
async fn register_against_existing_email_is_classified() {
    let (backend, base) = TestBackend::spawn().await;
    backend.respond(
        "/signup",
        409,
        json!({ "message": "Email already registered" }),
    );

    let state = client_for(&base);
    let err = state
        .auth()
        .register("Ada", "Lovelace", "a@x.com", "Str0ng!pass")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::AlreadyRegistered));
}

#[tokio::test]
async fn verify_otp_uses_token_from_verify_response() {
    let (backend, base) = TestBackend::spawn().await;
    backend.respond(
        "/verify-otp",
        200,
        json!({ "status": 200, "data": { "token": "T1" } }),
    );

    let state = client_for(&base);
    let outcome = state.auth().verify_otp("a@x.com", "123456").await.unwrap();

    assert_eq!(outcome, VerifyOutcome::Authenticated);
    assert_eq!(state.session().token().as_deref(), Some("T1"));

    // The token came straight from the verify response: no fallback login,
    // no profile fetch.
    assert_eq!(backend.hits("/loginsignup"), 0);
    assert_eq!(backend.hits("/authverify"), 0);
}

#[tokio::test]
async fn verify_otp_replays_cached_signup_credentials() {
    let (backend, base) = TestBackend::spawn().await;
    backend.respond("/signup", 200, json!({ "message": "code sent" }));
    backend.respond("/verify-otp", 200, json!({ "message": "verified" }));
    backend.respond(
        "/loginsignup",
        200,
        json!({ "data": { "token": "T2", "user": { "id": "u1", "email": "a@x.com" } } }),
    );

    let storage = Arc::new(MemoryStore::new());
    let state = client_with_storage(&base, Arc::clone(&storage) as Arc<dyn Storage>);

    state
        .auth()
        .register("Ada", "Lovelace", "a@x.com", "Str0ng!pass")
        .await
        .unwrap();
    let outcome = state.auth().verify_otp("a@x.com", "123456").await.unwrap();

    assert_eq!(outcome, VerifyOutcome::Authenticated);
    assert_eq!(state.session().token().as_deref(), Some("T2"));
    assert_eq!(backend.hits("/loginsignup"), 1);

    let login = backend.last_request("/loginsignup").unwrap();
    assert_eq!(login.body["email"], "a@x.com");
    assert_eq!(login.body["password"], "Str0ng!pass");

    // The cache is spent once a token lands.
    assert_eq!(storage.get(PRE_REGISTER_CREDS_KEY).unwrap(), None);
}

#[tokio::test]
async fn verify_otp_without_any_token_source_needs_manual_login() {
    let (backend, base) = TestBackend::spawn().await;
    backend.respond("/verify-otp", 200, json!({ "message": "verified" }));

    // No cached credentials, no token anywhere.
    let state = client_for(&base);
    let outcome = state.auth().verify_otp("a@x.com", "123456").await.unwrap();

    assert_eq!(outcome, VerifyOutcome::NeedsManualLogin);
    assert!(state.session().token().is_none());
}

#[tokio::test]
async fn verify_otp_fetches_profile_for_preexisting_token() {
    let (backend, base) = TestBackend::spawn().await;
    backend.respond("/verify-otp", 200, json!({ "message": "verified" }));
    backend.respond(
        "/authverify",
        200,
        json!({ "user": { "id": "u1", "firstname": "Ada" } }),
    );

    // A token survives from an earlier session; the profile does not.
    let storage = Arc::new(MemoryStore::new());
    storage.set("token", "T1").unwrap();
    let state = client_with_storage(&base, storage as Arc<dyn Storage>);

    let outcome = state.auth().verify_otp("a@x.com", "123456").await.unwrap();
    assert_eq!(outcome, VerifyOutcome::Authenticated);

    let session = state.session().session();
    assert_eq!(session.user.unwrap().first_name.as_deref(), Some("Ada"));

    // The account-verification route takes the raw token, no Bearer prefix.
    let check = backend.last_request("/authverify").unwrap();
    assert_eq!(check.authorization.as_deref(), Some("T1"));
}

#[tokio::test]
async fn resend_otp_reports_server_message() {
    let (backend, base) = TestBackend::spawn().await;
    backend.respond("/resend-otp", 200, json!({ "message": "code resent" }));

    let state = client_for(&base);
    let outcome = state.auth().resend_otp("a@x.com").await.unwrap();
    assert_eq!(
        outcome,
        ResendOutcome::Sent {
            message: "code resent".to_owned()
        }
    );
}

#[tokio::test]
async fn duplicate_resend_is_ignored_while_pending() {
    let (backend, base) = TestBackend::spawn().await;
    backend.respond_slow(
        "/resend-otp",
        200,
        json!({ "message": "code resent" }),
        Duration::from_millis(100),
    );

    let state = client_for(&base);
    let auth = state.auth().clone();
    let (first, second) = tokio::join!(auth.resend_otp("a@x.com"), auth.resend_otp("a@x.com"));

    assert!(matches!(first.unwrap(), ResendOutcome::Sent { .. }));
    assert_eq!(second.unwrap(), ResendOutcome::AlreadyPending);
    assert_eq!(backend.hits("/resend-otp"), 1);
}

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn login_stores_token_and_profile() {
    let (backend, base) = TestBackend::spawn().await;
    backend.respond(
        "/loginsignup",
        200,
        json!({ "token": "T1", "user": { "firstname": "Ada", "email": "a@x.com" } }),
    );

    let state = client_for(&base);
    let outcome = state.auth().login("a@x.com", "Str0ng!pass").await.unwrap();
    assert_eq!(outcome, LoginOutcome::Authenticated);

    let session = state.session().session();
    assert_eq!(session.token.as_deref(), Some("T1"));
    assert_eq!(session.user.unwrap().first_name.as_deref(), Some("Ada"));
}

#[tokio::test]
async fn login_before_verification_is_classified() {
    let (backend, base) = TestBackend::spawn().await;
    backend.respond(
        "/loginsignup",
        403,
        json!({ "message": "Please verify your email first" }),
    );

    let state = client_for(&base);
    let err = state.auth().login("a@x.com", "pw").await.unwrap_err();
    assert!(matches!(err, AuthError::Unverified));
}

#[tokio::test]
async fn login_against_unknown_email_is_classified() {
    let (backend, base) = TestBackend::spawn().await;
    backend.respond("/loginsignup", 404, json!({ "message": "User not found" }));

    let state = client_for(&base);
    let err = state.auth().login("a@x.com", "pw").await.unwrap_err();
    assert!(matches!(err, AuthError::NotRegistered));
}

#[tokio::test]
async fn login_with_wrong_password_is_generic() {
    let (backend, base) = TestBackend::spawn().await;
    backend.respond("/loginsignup", 401, json!({ "message": "Wrong password" }));

    let state = client_for(&base);
    let err = state.auth().login("a@x.com", "pw").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));
}

#[tokio::test]
async fn login_rejects_malformed_email_without_backend_call() {
    let (backend, base) = TestBackend::spawn().await;

    let state = client_for(&base);
    let err = state.auth().login("not-an-email", "pw").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidEmail(_)));
    assert_eq!(backend.total_hits(), 0);
}

#[tokio::test]
async fn successful_login_response_without_token_is_a_backend_error() {
    let (backend, base) = TestBackend::spawn().await;
    backend.respond("/loginsignup", 200, json!({ "message": "ok" }));

    let state = client_for(&base);
    let err = state.auth().login("a@x.com", "pw").await.unwrap_err();
    assert!(matches!(err, AuthError::Backend { status: 200, .. }));
    assert!(state.session().token().is_none());
}

// =============================================================================
// Password Reset
// =============================================================================

#[tokio::test]
async fn reset_password_rejects_weak_password_client_side() {
    let (backend, base) = TestBackend::spawn().await;

    let state = client_for(&base);
    let err = state
        .auth()
        .reset_password("a@x.com", "123456", "abc")
        .await
        .unwrap_err();

    let AuthError::PolicyViolation(rules) = err else {
        panic!("expected a policy violation");
    };
    assert_eq!(
        rules,
        vec![
            PasswordRule::MinLength,
            PasswordRule::Uppercase,
            PasswordRule::Digit,
            PasswordRule::Special,
        ]
    );

    // Nothing reached the backend.
    assert_eq!(backend.total_hits(), 0);
}

#[tokio::test]
async fn reset_code_check_tolerates_unimplemented_route() {
    let (backend, base) = TestBackend::spawn().await;
    let state = client_for(&base);

    backend.respond("/verify-reset-otp", 404, json!({ "message": "Not Found" }));
    let outcome = state
        .auth()
        .verify_reset_otp("a@x.com", "123456")
        .await
        .unwrap();
    assert_eq!(outcome, ResetOtpOutcome::Proceed);

    backend.respond(
        "/verify-reset-otp",
        405,
        json!({ "message": "Method Not Allowed" }),
    );
    let outcome = state
        .auth()
        .verify_reset_otp("a@x.com", "123456")
        .await
        .unwrap();
    assert_eq!(outcome, ResetOtpOutcome::Proceed);

    backend.respond("/verify-reset-otp", 400, json!({ "message": "bad code" }));
    let outcome = state
        .auth()
        .verify_reset_otp("a@x.com", "123456")
        .await
        .unwrap();
    assert_eq!(outcome, ResetOtpOutcome::Rejected);
}

#[tokio::test]
async fn full_reset_flow_leaves_session_anonymous() {
    let (backend, base) = TestBackend::spawn().await;
    backend.respond("/forgot-password", 200, json!({ "message": "code sent" }));
    backend.respond("/verify-reset-otp", 200, json!({ "message": "ok" }));
    backend.respond("/reset-password", 200, json!({ "message": "password updated" }));

    let state = client_for(&base);

    let requested = state.auth().request_password_reset("a@x.com").await.unwrap();
    assert_eq!(requested, ResetRequestOutcome::OtpSent);

    let checked = state
        .auth()
        .verify_reset_otp("a@x.com", "123456")
        .await
        .unwrap();
    assert_eq!(checked, ResetOtpOutcome::Proceed);

    let reset = state
        .auth()
        .reset_password("a@x.com", "123456", "N3w!passw0rd")
        .await
        .unwrap();
    assert_eq!(reset, ResetOutcome::Completed);

    // The flow never authenticates; the user logs in with the new password.
    assert!(state.session().token().is_none());

    let sent = backend.last_request("/reset-password").unwrap();
    assert_eq!(sent.body["newPassword"], "N3w!passw0rd");
}
