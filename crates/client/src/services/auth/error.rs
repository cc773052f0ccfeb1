//! Credential flow error types.

use thiserror::Error;

use prickly_pear_core::{EmailError, PasswordRule};

use crate::api::ApiError;

/// Errors that can occur during credential lifecycle operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Signup against an already-registered email. Route the user to login.
    #[error("an account with this email already exists")]
    AlreadyRegistered,

    /// Login attempt before the email was verified. Offer to resend the
    /// verification code.
    #[error("email address has not been verified")]
    Unverified,

    /// Login against an unknown email. Route the user to registration.
    #[error("no account exists for this email")]
    NotRegistered,

    /// Wrong credentials.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The new password failed policy rules. Checked client-side; nothing
    /// was sent to the backend.
    #[error("password does not meet requirements: {}", format_rules(.0))]
    PolicyViolation(Vec<PasswordRule>),

    /// The backend rejected the request or returned an unusable response.
    #[error("backend error ({status}): {message}")]
    Backend {
        /// HTTP status code.
        status: u16,
        /// Server-reported message, if any.
        message: String,
    },

    /// Transport failure. The operation's in-flight guard has been released
    /// and the call may be retried.
    #[error(transparent)]
    Api(#[from] ApiError),
}

fn format_rules(rules: &[PasswordRule]) -> String {
    rules
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
