//! Payload normalization.
//!
//! The backend is not contractually stable across endpoints: the same
//! logical response arrives flat, nested one or two levels under `data`, or
//! echoed through headers, and identity fields change spelling from route to
//! route. These pure functions are the only place that variance is known
//! about; everything else consumes the canonical shapes.

use serde_json::{Map, Value};

use prickly_pear_core::UserProfile;

/// Candidate locations for a bearer token, in priority order.
const TOKEN_PATHS: &[&[&str]] = &[
    &["token"],
    &["accessToken"],
    &["data", "token"],
    &["data", "accessToken"],
    &["data", "data", "token"],
    &["headers", "authorization"],
];

/// Candidate locations for a user object, in priority order.
const USER_PATHS: &[&[&str]] = &[
    &["user"],
    &["profile"],
    &["data", "user"],
    &["data", "profile"],
    &["data", "data", "user"],
];

const ID_KEYS: &[&str] = &["id", "_id", "userId", "uid"];
const FIRST_NAME_KEYS: &[&str] = &["firstName", "firstname", "first_name"];
const LAST_NAME_KEYS: &[&str] = &["lastName", "lastname", "last_name"];
const EMAIL_KEYS: &[&str] = &["email", "emailAddress", "mail"];
const PHONE_KEYS: &[&str] = &["phone", "phoneNumber", "mobile"];
const ADDRESS_KEYS: &[&str] = &["address", "addressLine"];
const AVATAR_KEYS: &[&str] = &["avatarUrl", "avatar", "profilePic", "image"];
const ROLE_KEYS: &[&str] = &["role", "userRole"];

/// The combined `name` field, split into first/last when the explicit
/// fields are absent.
const NAME_KEY: &str = "name";

/// Walk a dotted path into a JSON value.
pub(crate) fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(*key))
}

/// Recover a bearer token from a success payload.
///
/// Tries each candidate location in priority order and returns the first
/// non-empty string, stripping a `Bearer ` prefix from header echoes.
#[must_use]
pub fn extract_token(payload: &Value) -> Option<String> {
    for path in TOKEN_PATHS {
        if let Some(raw) = lookup(payload, path).and_then(Value::as_str) {
            let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
            if !token.is_empty() {
                return Some(token.to_owned());
            }
        }
    }
    None
}

/// Recover a user object from a success payload.
///
/// Tries the explicit user locations first, then the `data` envelope, then
/// the payload itself. Returns `None` when nothing object-shaped is found.
#[must_use]
pub fn extract_user(payload: &Value) -> Option<Value> {
    for path in USER_PATHS {
        if let Some(candidate) = lookup(payload, path)
            && candidate.is_object()
        {
            return Some(candidate.clone());
        }
    }

    if let Some(data) = payload.get("data")
        && data.is_object()
    {
        return Some(data.clone());
    }

    payload.is_object().then(|| payload.clone())
}

/// Map a raw user object onto the canonical [`UserProfile`] shape.
///
/// Each canonical field is filled from the first matching alias;
/// unrecognized fields are preserved in `extra` rather than discarded.
/// Returns `None` only when the input is not an object. Idempotent over
/// already-canonical input.
#[must_use]
pub fn normalize_user(raw: &Value) -> Option<UserProfile> {
    let obj = raw.as_object()?;

    let name_parts: Option<(String, Option<String>)> = obj
        .get(NAME_KEY)
        .and_then(Value::as_str)
        .and_then(split_name);

    let first_name = pick_string(obj, FIRST_NAME_KEYS)
        .or_else(|| name_parts.as_ref().map(|(first, _)| first.clone()));
    let last_name = pick_string(obj, LAST_NAME_KEYS)
        .or_else(|| name_parts.as_ref().and_then(|(_, last)| last.clone()));

    let extra: Map<String, Value> = obj
        .iter()
        .filter(|(key, _)| !is_consumed(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Some(UserProfile {
        id: pick_id(obj),
        first_name,
        last_name,
        email: pick_string(obj, EMAIL_KEYS),
        phone: pick_string(obj, PHONE_KEYS),
        address: pick_string(obj, ADDRESS_KEYS),
        avatar_url: pick_string(obj, AVATAR_KEYS),
        role: pick_string(obj, ROLE_KEYS),
        extra,
    })
}

fn is_consumed(key: &str) -> bool {
    key == NAME_KEY
        || [
            ID_KEYS,
            FIRST_NAME_KEYS,
            LAST_NAME_KEYS,
            EMAIL_KEYS,
            PHONE_KEYS,
            ADDRESS_KEYS,
            AVATAR_KEYS,
            ROLE_KEYS,
        ]
        .iter()
        .any(|aliases| aliases.contains(&key))
}

/// First non-empty string among the aliases.
fn pick_string(obj: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .filter_map(|key| obj.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_owned)
}

/// Ids arrive as strings or numbers depending on the endpoint.
fn pick_id(obj: &Map<String, Value>) -> Option<String> {
    for key in ID_KEYS {
        match obj.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_owned()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

/// Split a combined name: first token, then the remainder joined.
fn split_name(name: &str) -> Option<(String, Option<String>)> {
    let mut parts = name.split_whitespace();
    let first = parts.next()?.to_owned();
    let rest: Vec<&str> = parts.collect();
    let last = (!rest.is_empty()).then(|| rest.join(" "));
    Some((first, last))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_token_flat() {
        assert_eq!(
            extract_token(&json!({"token": "T1"})).as_deref(),
            Some("T1")
        );
    }

    #[test]
    fn test_extract_token_nested() {
        assert_eq!(
            extract_token(&json!({"data": {"token": "T1"}})).as_deref(),
            Some("T1")
        );
        assert_eq!(
            extract_token(&json!({"data": {"data": {"token": "T1"}}})).as_deref(),
            Some("T1")
        );
    }

    #[test]
    fn test_extract_token_header_echo_strips_bearer() {
        let payload = json!({"headers": {"authorization": "Bearer T1"}});
        assert_eq!(extract_token(&payload).as_deref(), Some("T1"));
    }

    #[test]
    fn test_extract_token_priority_order() {
        let payload = json!({"token": "FLAT", "data": {"token": "NESTED"}});
        assert_eq!(extract_token(&payload).as_deref(), Some("FLAT"));
    }

    #[test]
    fn test_extract_token_skips_empty_strings() {
        let payload = json!({"token": "", "data": {"token": "T1"}});
        assert_eq!(extract_token(&payload).as_deref(), Some("T1"));
    }

    #[test]
    fn test_extract_token_absent() {
        assert_eq!(extract_token(&json!({"message": "ok"})), None);
        assert_eq!(extract_token(&json!("just a string")), None);
    }

    #[test]
    fn test_extract_user_variants() {
        let flat = json!({"user": {"id": "u1"}});
        assert_eq!(extract_user(&flat).unwrap()["id"], "u1");

        let nested = json!({"data": {"user": {"id": "u2"}}});
        assert_eq!(extract_user(&nested).unwrap()["id"], "u2");

        let deep = json!({"data": {"data": {"user": {"id": "u3"}}}});
        assert_eq!(extract_user(&deep).unwrap()["id"], "u3");
    }

    #[test]
    fn test_extract_user_falls_back_to_data_then_payload() {
        let enveloped = json!({"data": {"id": "u1", "email": "a@x.com"}});
        assert_eq!(extract_user(&enveloped).unwrap()["id"], "u1");

        let bare = json!({"id": "u1"});
        assert_eq!(extract_user(&bare).unwrap()["id"], "u1");

        assert_eq!(extract_user(&json!([1, 2, 3])), None);
    }

    #[test]
    fn test_normalize_user_alias_variants() {
        let raw = json!({
            "_id": "u1",
            "firstname": "Ada",
            "last_name": "Lovelace",
            "mail": "ada@x.com",
            "phoneNumber": "555-0100",
            "profilePic": "https://cdn.example.com/a.png",
        });

        let profile = normalize_user(&raw).unwrap();
        assert_eq!(profile.id.as_deref(), Some("u1"));
        assert_eq!(profile.first_name.as_deref(), Some("Ada"));
        assert_eq!(profile.last_name.as_deref(), Some("Lovelace"));
        assert_eq!(profile.email.as_deref(), Some("ada@x.com"));
        assert_eq!(profile.phone.as_deref(), Some("555-0100"));
        assert_eq!(
            profile.avatar_url.as_deref(),
            Some("https://cdn.example.com/a.png")
        );
    }

    #[test]
    fn test_normalize_user_splits_combined_name() {
        let profile = normalize_user(&json!({"name": "Ada Lovelace King"})).unwrap();
        assert_eq!(profile.first_name.as_deref(), Some("Ada"));
        assert_eq!(profile.last_name.as_deref(), Some("Lovelace King"));

        // Explicit fields win over the combined name.
        let profile = normalize_user(&json!({"name": "X Y", "firstName": "Ada"})).unwrap();
        assert_eq!(profile.first_name.as_deref(), Some("Ada"));
        assert_eq!(profile.last_name.as_deref(), Some("Y"));
    }

    #[test]
    fn test_normalize_user_numeric_id() {
        let profile = normalize_user(&json!({"id": 42})).unwrap();
        assert_eq!(profile.id.as_deref(), Some("42"));
    }

    #[test]
    fn test_normalize_user_preserves_unknown_fields() {
        let raw = json!({"id": "u1", "loyaltyTier": "gold", "consents": {"email": true}});
        let profile = normalize_user(&raw).unwrap();
        assert_eq!(profile.extra["loyaltyTier"], "gold");
        assert_eq!(profile.extra["consents"]["email"], true);
    }

    #[test]
    fn test_normalize_user_rejects_non_objects() {
        assert!(normalize_user(&json!("ada")).is_none());
        assert!(normalize_user(&json!(null)).is_none());
        assert!(normalize_user(&json!([1])).is_none());
    }

    #[test]
    fn test_normalize_user_is_idempotent() {
        let raw = json!({
            "uid": "u1",
            "firstname": "Ada",
            "name": "Ada Lovelace",
            "email": "ada@x.com",
            "loyaltyTier": "gold",
        });

        let once = normalize_user(&raw).unwrap();
        let canonical = serde_json::to_value(&once).unwrap();
        let twice = normalize_user(&canonical).unwrap();

        assert_eq!(once, twice);
    }
}
