//! Credential lifecycle flows.
//!
//! Orchestrates registration, email verification, login, and the
//! password-reset flow against the backend. Every payload goes through the
//! normalizer before it touches the session store, and every public
//! operation carries a single-flight guard: while one invocation is
//! pending, a repeated invocation of the same operation returns an
//! `AlreadyPending` outcome instead of queueing or canceling.

mod error;
mod flight;

pub use error::AuthError;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use prickly_pear_core::{Email, PasswordCheck, UserProfile};

use crate::api::{ApiClient, ApiResponse, endpoints, normalize};
use crate::session::SessionStore;
use crate::storage::{Storage, keys};

use flight::InFlight;

/// Operation keys for the in-flight registry.
mod op {
    pub const REGISTER: &str = "register";
    pub const VERIFY_OTP: &str = "verify_otp";
    pub const RESEND_OTP: &str = "resend_otp";
    pub const REQUEST_RESET: &str = "request_password_reset";
    pub const VERIFY_RESET_OTP: &str = "verify_reset_otp";
    pub const RESET_PASSWORD: &str = "reset_password";
    pub const LOGIN: &str = "login";
}

/// Outcome of [`AuthService::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// The backend accepted the signup and sent a verification code.
    VerificationSent,
    /// A registration is already in flight; this call was ignored.
    AlreadyPending,
}

/// Outcome of [`AuthService::verify_otp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Verification succeeded and a token ended up in the session store.
    Authenticated,
    /// Verification succeeded but no token could be obtained by any
    /// fallback; the user must log in manually.
    NeedsManualLogin,
    /// A verification is already in flight; this call was ignored.
    AlreadyPending,
}

/// Outcome of [`AuthService::resend_otp`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResendOutcome {
    /// A new code was sent.
    Sent {
        /// Server-reported confirmation message.
        message: String,
    },
    /// A resend is already in flight; this call was ignored.
    AlreadyPending,
}

/// Outcome of [`AuthService::request_password_reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetRequestOutcome {
    /// A reset code was sent.
    OtpSent,
    /// A request is already in flight; this call was ignored.
    AlreadyPending,
}

/// Outcome of [`AuthService::verify_reset_otp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOtpOutcome {
    /// The code passed (or the backend does not implement the check);
    /// continue to the new-password step.
    Proceed,
    /// The backend rejected the code.
    Rejected,
    /// A check is already in flight; this call was ignored.
    AlreadyPending,
}

/// Outcome of [`AuthService::reset_password`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    /// The password was reset; the user must log in again.
    Completed,
    /// A reset is already in flight; this call was ignored.
    AlreadyPending,
}

/// Outcome of [`AuthService::login`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Credentials accepted; token (and profile, when present) stored.
    Authenticated,
    /// A login is already in flight; this call was ignored.
    AlreadyPending,
}

/// Transient signup credentials cached between signup and verification,
/// used once for the post-verification auto-login.
#[derive(Debug, Serialize, Deserialize)]
struct PreRegisterCreds {
    email: String,
    password: String,
}

/// Credential lifecycle service.
///
/// Cheaply cloneable via `Arc`; owns all session mutation on the identity
/// side.
#[derive(Clone)]
pub struct AuthService {
    inner: Arc<AuthServiceInner>,
}

struct AuthServiceInner {
    api: ApiClient,
    session: SessionStore,
    storage: Arc<dyn Storage>,
    flights: InFlight,
}

impl AuthService {
    /// Create a new credential lifecycle service.
    #[must_use]
    pub fn new(api: ApiClient, session: SessionStore, storage: Arc<dyn Storage>) -> Self {
        Self {
            inner: Arc::new(AuthServiceInner {
                api,
                session,
                storage,
                flights: InFlight::new(),
            }),
        }
    }

    // =========================================================================
    // Registration & Verification
    // =========================================================================

    /// Register a new account. On acceptance the backend sends a
    /// verification code and the credentials are cached for the
    /// post-verification auto-login.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AlreadyRegistered` when the email already has a
    /// verified account; callers should route to login.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        password: &str,
    ) -> Result<RegisterOutcome, AuthError> {
        let Some(_permit) = self.inner.flights.begin(op::REGISTER) else {
            return Ok(RegisterOutcome::AlreadyPending);
        };

        let email = Email::parse(email)?;
        let body = json!({
            "firstName": first_name,
            "lastName": last_name,
            "email": email.as_str(),
            "password": password,
        });

        let response = self.inner.api.post(endpoints::SIGNUP, &body).await?;

        if response.is_success() {
            self.cache_pre_register_creds(email.as_str(), password);
            return Ok(RegisterOutcome::VerificationSent);
        }

        if response.status.as_u16() == 409 || message_contains(&response, "already") {
            return Err(AuthError::AlreadyRegistered);
        }

        Err(backend_error(&response))
    }

    /// Verify the emailed code and try to end up authenticated.
    ///
    /// On a successful verification three recovery steps run, each at most
    /// once, stopping as soon as a token is present:
    /// 1. extract token/profile from the verify response itself;
    /// 2. replay the cached signup credentials through the login endpoint;
    /// 3. with a token but no profile, fetch the profile.
    ///
    /// Returns [`VerifyOutcome::Authenticated`] only if a token is in the
    /// session store at the end of the sequence.
    ///
    /// # Errors
    ///
    /// Returns an error when the verification call itself fails.
    #[instrument(skip(self, otp))]
    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<VerifyOutcome, AuthError> {
        let Some(_permit) = self.inner.flights.begin(op::VERIFY_OTP) else {
            return Ok(VerifyOutcome::AlreadyPending);
        };

        let email = Email::parse(email)?;
        let body = json!({ "email": email.as_str(), "otp": otp });
        let response = self.inner.api.post(endpoints::VERIFY_OTP, &body).await?;

        if !response.is_success() {
            return Err(backend_error(&response));
        }

        let mut recovered = self.apply_credentials(&response.body);

        if self.inner.session.token().is_none()
            && let Some(creds) = self.cached_creds_for(email.as_str())
        {
            debug!("verify response carried no token, replaying signup credentials");
            let body = json!({ "email": creds.email, "password": creds.password });
            match self.inner.api.post(endpoints::LOGIN, &body).await {
                Ok(login) if login.is_success() => recovered = self.apply_credentials(&login.body),
                Ok(login) => debug!(status = %login.status, "auto-login rejected"),
                Err(err) => warn!(error = %err, "auto-login failed"),
            }
        }

        // Neither response yielded a token, yet the store holds one (e.g.
        // persisted from an earlier session) without a profile: fetch it.
        if !recovered
            && self.inner.session.token().is_some()
            && self.inner.session.session().user.is_none()
        {
            let body = json!({ "email": email.as_str() });
            match self.inner.api.post(endpoints::ACCOUNT_VERIFY, &body).await {
                Ok(check) if check.is_success() => {
                    if let Some(user) = extract_profile(&check.body) {
                        self.inner.session.set_user(user);
                    }
                }
                Ok(check) => debug!(status = %check.status, "profile fetch rejected"),
                Err(err) => warn!(error = %err, "profile fetch failed"),
            }
        }

        if self.inner.session.token().is_some() {
            Ok(VerifyOutcome::Authenticated)
        } else {
            Ok(VerifyOutcome::NeedsManualLogin)
        }
    }

    /// Request a fresh verification code.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend refuses the resend.
    #[instrument(skip(self))]
    pub async fn resend_otp(&self, email: &str) -> Result<ResendOutcome, AuthError> {
        let Some(_permit) = self.inner.flights.begin(op::RESEND_OTP) else {
            return Ok(ResendOutcome::AlreadyPending);
        };

        let email = Email::parse(email)?;
        let body = json!({ "email": email.as_str() });
        let response = self.inner.api.post(endpoints::RESEND_OTP, &body).await?;

        if response.is_success() {
            let message = response
                .message()
                .unwrap_or("Verification code sent.")
                .to_owned();
            return Ok(ResendOutcome::Sent { message });
        }

        Err(backend_error(&response))
    }

    // =========================================================================
    // Password Reset
    // =========================================================================

    /// Start the password-reset flow by requesting a reset code.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend refuses the request.
    #[instrument(skip(self))]
    pub async fn request_password_reset(
        &self,
        email: &str,
    ) -> Result<ResetRequestOutcome, AuthError> {
        let Some(_permit) = self.inner.flights.begin(op::REQUEST_RESET) else {
            return Ok(ResetRequestOutcome::AlreadyPending);
        };

        let email = Email::parse(email)?;
        let body = json!({ "email": email.as_str() });
        let response = self
            .inner
            .api
            .post(endpoints::FORGOT_PASSWORD, &body)
            .await?;

        if response.is_success() {
            return Ok(ResetRequestOutcome::OtpSent);
        }

        Err(backend_error(&response))
    }

    /// Check the reset code before asking the user for a new password.
    ///
    /// # Errors
    ///
    /// Returns an error only on transport failure; backend rejections come
    /// back as [`ResetOtpOutcome::Rejected`].
    #[instrument(skip(self, otp))]
    pub async fn verify_reset_otp(
        &self,
        email: &str,
        otp: &str,
    ) -> Result<ResetOtpOutcome, AuthError> {
        let Some(_permit) = self.inner.flights.begin(op::VERIFY_RESET_OTP) else {
            return Ok(ResetOtpOutcome::AlreadyPending);
        };

        let email = Email::parse(email)?;
        let body = json!({ "email": email.as_str(), "otp": otp });
        let response = self
            .inner
            .api
            .post(endpoints::VERIFY_RESET_OTP, &body)
            .await?;

        match response.status.as_u16() {
            200..=299 => Ok(ResetOtpOutcome::Proceed),
            // The backend may not implement this route at all; a missing or
            // method-rejecting endpoint must not block the reset flow. The
            // reset endpoint re-checks the code.
            404 | 405 => {
                debug!(status = %response.status, "reset-code check unavailable, proceeding");
                Ok(ResetOtpOutcome::Proceed)
            }
            _ => Ok(ResetOtpOutcome::Rejected),
        }
    }

    /// Set a new password.
    ///
    /// The password policy is checked client-side first; a violating
    /// password is rejected with every failed rule listed and nothing is
    /// sent to the backend.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PolicyViolation` or a backend error.
    #[instrument(skip(self, otp, new_password))]
    pub async fn reset_password(
        &self,
        email: &str,
        otp: &str,
        new_password: &str,
    ) -> Result<ResetOutcome, AuthError> {
        let Some(_permit) = self.inner.flights.begin(op::RESET_PASSWORD) else {
            return Ok(ResetOutcome::AlreadyPending);
        };

        let email = Email::parse(email)?;

        let check = PasswordCheck::evaluate(new_password);
        if !check.is_satisfied() {
            return Err(AuthError::PolicyViolation(check.failed()));
        }

        let body = json!({
            "email": email.as_str(),
            "otp": otp,
            "newPassword": new_password,
        });
        let response = self.inner.api.post(endpoints::RESET_PASSWORD, &body).await?;

        if response.is_success() {
            return Ok(ResetOutcome::Completed);
        }

        Err(backend_error(&response))
    }

    // =========================================================================
    // Login & Logout
    // =========================================================================

    /// Log in with email and password.
    ///
    /// # Errors
    ///
    /// Failures are classified from the backend status and message:
    /// `Unverified` (message mentions verification), `NotRegistered` (404),
    /// `InvalidCredentials` (other 4xx), `Backend` (5xx or a success
    /// response carrying no token).
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let Some(_permit) = self.inner.flights.begin(op::LOGIN) else {
            return Ok(LoginOutcome::AlreadyPending);
        };

        let email = Email::parse(email)?;
        let body = json!({ "email": email.as_str(), "password": password });
        let response = self.inner.api.post(endpoints::LOGIN, &body).await?;

        if !response.is_success() {
            return Err(classify_login_failure(&response));
        }

        self.apply_credentials(&response.body);

        if self.inner.session.token().is_some() {
            Ok(LoginOutcome::Authenticated)
        } else {
            Err(AuthError::Backend {
                status: response.status.as_u16(),
                message: "login response carried no token".to_owned(),
            })
        }
    }

    /// Clear the session and signal the change. Local only; no backend call.
    pub fn logout(&self) {
        self.inner.session.clear();
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Fold whatever credentials a payload carries into the session store.
    /// Returns `true` when a token was found and applied.
    ///
    /// The transient signup credential cache is deleted the moment a token
    /// lands.
    fn apply_credentials(&self, payload: &Value) -> bool {
        let token = normalize::extract_token(payload);
        if let Some(token) = &token {
            self.inner.session.set_token(token);
            if let Err(err) = self.inner.storage.remove(keys::PRE_REGISTER_CREDS) {
                warn!(error = %err, "failed to drop cached signup credentials");
            }
        }

        if let Some(user) = extract_profile(payload) {
            self.inner.session.set_user(user);
        }

        token.is_some()
    }

    fn cache_pre_register_creds(&self, email: &str, password: &str) {
        let creds = PreRegisterCreds {
            email: email.to_owned(),
            password: password.to_owned(),
        };
        match serde_json::to_string(&creds) {
            Ok(raw) => {
                if let Err(err) = self.inner.storage.set(keys::PRE_REGISTER_CREDS, &raw) {
                    warn!(error = %err, "failed to cache signup credentials");
                }
            }
            Err(err) => warn!(error = %err, "failed to encode signup credentials"),
        }
    }

    /// The cached signup credentials, only when they match `email`.
    fn cached_creds_for(&self, email: &str) -> Option<PreRegisterCreds> {
        let raw = self
            .inner
            .storage
            .get(keys::PRE_REGISTER_CREDS)
            .ok()
            .flatten()?;
        let creds: PreRegisterCreds = serde_json::from_str(&raw).ok()?;
        creds.email.eq_ignore_ascii_case(email).then_some(creds)
    }
}

/// Normalize a payload into a profile, discarding profiles with no identity
/// fields at all (the whole-payload fallback can produce those).
fn extract_profile(payload: &Value) -> Option<UserProfile> {
    normalize::extract_user(payload)
        .as_ref()
        .and_then(normalize::normalize_user)
        .filter(|profile| {
            profile.id.is_some() || profile.email.is_some() || profile.first_name.is_some()
        })
}

fn classify_login_failure(response: &ApiResponse) -> AuthError {
    if message_contains(response, "verify") {
        return AuthError::Unverified;
    }
    match response.status.as_u16() {
        404 => AuthError::NotRegistered,
        500.. => backend_error(response),
        _ => AuthError::InvalidCredentials,
    }
}

fn backend_error(response: &ApiResponse) -> AuthError {
    AuthError::Backend {
        status: response.status.as_u16(),
        message: response.message().unwrap_or("request failed").to_owned(),
    }
}

fn message_contains(response: &ApiResponse, needle: &str) -> bool {
    response
        .message()
        .is_some_and(|message| message.to_lowercase().contains(needle))
}
