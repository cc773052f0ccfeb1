//! Password policy with per-rule feedback.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// One rule of the password policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PasswordRule {
    /// At least [`MIN_PASSWORD_LENGTH`] characters.
    MinLength,
    /// At least one uppercase letter.
    Uppercase,
    /// At least one lowercase letter.
    Lowercase,
    /// At least one digit.
    Digit,
    /// At least one non-alphanumeric character.
    Special,
}

impl PasswordRule {
    /// All rules, in the order they are reported.
    pub const ALL: [Self; 5] = [
        Self::MinLength,
        Self::Uppercase,
        Self::Lowercase,
        Self::Digit,
        Self::Special,
    ];

    /// Whether `password` satisfies this rule.
    #[must_use]
    pub fn is_met(self, password: &str) -> bool {
        match self {
            Self::MinLength => password.chars().count() >= MIN_PASSWORD_LENGTH,
            Self::Uppercase => password.chars().any(char::is_uppercase),
            Self::Lowercase => password.chars().any(char::is_lowercase),
            Self::Digit => password.chars().any(|c| c.is_ascii_digit()),
            Self::Special => password.chars().any(|c| !c.is_alphanumeric()),
        }
    }
}

impl fmt::Display for PasswordRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::MinLength => "at least 8 characters",
            Self::Uppercase => "at least one uppercase letter",
            Self::Lowercase => "at least one lowercase letter",
            Self::Digit => "at least one digit",
            Self::Special => "at least one special character",
        };
        f.write_str(text)
    }
}

/// The verdict of every policy rule against one password.
///
/// Each rule is evaluated independently so callers can render per-rule
/// feedback instead of a single pass/fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordCheck {
    /// Meets the minimum length.
    pub min_length: bool,
    /// Contains an uppercase letter.
    pub uppercase: bool,
    /// Contains a lowercase letter.
    pub lowercase: bool,
    /// Contains a digit.
    pub digit: bool,
    /// Contains a non-alphanumeric character.
    pub special: bool,
}

impl PasswordCheck {
    /// Evaluate every rule against `password`.
    #[must_use]
    pub fn evaluate(password: &str) -> Self {
        Self {
            min_length: PasswordRule::MinLength.is_met(password),
            uppercase: PasswordRule::Uppercase.is_met(password),
            lowercase: PasswordRule::Lowercase.is_met(password),
            digit: PasswordRule::Digit.is_met(password),
            special: PasswordRule::Special.is_met(password),
        }
    }

    /// `true` when every rule passed.
    #[must_use]
    pub const fn is_satisfied(&self) -> bool {
        self.min_length && self.uppercase && self.lowercase && self.digit && self.special
    }

    /// The rules that failed, in reporting order.
    #[must_use]
    pub fn failed(&self) -> Vec<PasswordRule> {
        let verdicts = [
            (PasswordRule::MinLength, self.min_length),
            (PasswordRule::Uppercase, self.uppercase),
            (PasswordRule::Lowercase, self.lowercase),
            (PasswordRule::Digit, self.digit),
            (PasswordRule::Special, self.special),
        ];
        verdicts
            .into_iter()
            .filter_map(|(rule, met)| (!met).then_some(rule))
            .collect()
    }
}
