//! Normalized user identity.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A user profile in the canonical shape used throughout the client.
///
/// The backend reports identity under varying field names depending on the
/// endpoint; the API layer folds those variants into this one shape. Fields
/// the backend sends that have no canonical slot are kept verbatim in
/// [`extra`](Self::extra) so nothing is lost across a persist/restore cycle.
///
/// Every field is optional: a profile may be partially populated while the
/// rest is still being fetched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Backend identifier for the user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Given name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Family name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Email address as reported by the backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Phone number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Postal address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Avatar image URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// Backend role (e.g. "customer", "admin").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Unrecognized backend fields, preserved opaquely.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    /// Returns a display name: "First Last", whichever parts are present,
    /// falling back to the email address.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => Some(format!("{first} {last}")),
            (Some(first), None) => Some(first.to_owned()),
            (None, Some(last)) => Some(last.to_owned()),
            (None, None) => self.email.clone(),
        }
    }

    /// Returns `true` if no field at all is populated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.address.is_none()
            && self.avatar_url.is_none()
            && self.role.is_none()
            && self.extra.is_empty()
    }
}
