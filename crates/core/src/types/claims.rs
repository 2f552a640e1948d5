//! Custom claims attached to credential-store user records.
//!
//! The `admin` claim is derived, never client-settable. Its presence with a
//! truthy value means "is admin"; its absence means "is not admin". A `false`
//! value is never written.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::UserProfile;

/// Name of the authorization claim managed by this backend.
pub const ADMIN_CLAIM: &str = "admin";

/// A user's custom-claims mapping.
///
/// Keys other than [`ADMIN_CLAIM`] are owned by other flows and are carried
/// through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomClaims(Map<String, Value>);

impl CustomClaims {
    /// Create an empty claims mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the `admin` claim is present and truthy.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.0.get(ADMIN_CLAIM).is_some_and(is_truthy)
    }

    /// Set or clear the `admin` claim.
    ///
    /// Granting sets `admin = true`; revoking removes the key entirely.
    pub fn apply_admin(&mut self, is_admin: bool) {
        if is_admin {
            self.0.insert(ADMIN_CLAIM.to_owned(), Value::Bool(true));
        } else {
            self.0.remove(ADMIN_CLAIM);
        }
    }

    /// Look up a claim by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Insert an arbitrary claim.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying JSON object.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for CustomClaims {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Derive the admin flag from the two authoritative sources.
///
/// Either an authorization document or the profile flag is sufficient.
#[must_use]
pub fn derive_is_admin(authorization_exists: bool, profile: Option<&UserProfile>) -> bool {
    authorization_exists || profile.is_some_and(|p| p.is_admin)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
