//! Backend endpoint paths and conventions.

/// Account creation.
pub const SIGNUP: &str = "/signup";

/// Email verification code check.
pub const VERIFY_OTP: &str = "/verify-otp";

/// Resend the email verification code.
pub const RESEND_OTP: &str = "/resend-otp";

/// Credential login.
pub const LOGIN: &str = "/loginsignup";

/// Start the password-reset flow.
pub const FORGOT_PASSWORD: &str = "/forgot-password";

/// Reset-code check.
pub const VERIFY_RESET_OTP: &str = "/verify-reset-otp";

/// Set a new password.
pub const RESET_PASSWORD: &str = "/reset-password";

/// Account verification check; also returns the profile for a valid token.
pub const ACCOUNT_VERIFY: &str = "/authverify";

/// Server-side logout.
pub const LOGOUT: &str = "/logout";

/// Paths that legitimately return authorization-class statuses during
/// normal unauthenticated use. Failures from these never wipe the session.
pub const PUBLIC_PATHS: &[&str] = &[
    LOGIN,
    SIGNUP,
    VERIFY_OTP,
    RESEND_OTP,
    FORGOT_PASSWORD,
    LOGOUT,
    ACCOUNT_VERIFY,
];

/// Whether `path` is exempt from global session invalidation.
#[must_use]
pub fn is_public(path: &str) -> bool {
    let path = path.trim_start_matches('/');
    PUBLIC_PATHS
        .iter()
        .any(|public| public.trim_start_matches('/') == path)
}

/// How the bearer credential is written into the `Authorization` header.
///
/// Most endpoints expect the standard `Bearer <token>` form; a legacy route
/// expects the raw token with no prefix. The convention is configured per
/// endpoint rather than hard-coded (see `ClientConfig::auth_overrides`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthScheme {
    /// `Authorization: Bearer <token>`
    #[default]
    Bearer,
    /// `Authorization: <token>`
    Raw,
}

impl AuthScheme {
    /// Render the header value for `token`.
    #[must_use]
    pub fn header_value(self, token: &str) -> String {
        match self {
            Self::Bearer => format!("Bearer {token}"),
            Self::Raw => token.to_owned(),
        }
    }
}
