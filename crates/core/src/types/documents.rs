//! Document models stored in the document store.
//!
//! Documents are schemaless, so every model deserializes leniently: unknown
//! fields are ignored and missing fields fall back to defaults. Timestamps are
//! kept as the RFC 3339 strings the store hands back. Chat and message fields
//! also tolerate unexpected types.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Profile document at `users/{uid}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Admin flag; anything other than a literal `true` reads as `false`.
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl UserProfile {
    /// Read a profile from raw document fields.
    ///
    /// Never fails: a document whose other fields have unexpected types still
    /// yields its `isAdmin` flag.
    #[must_use]
    pub fn from_fields(fields: &Map<String, Value>) -> Self {
        serde_json::from_value(Value::Object(fields.clone())).unwrap_or_else(|_| Self {
            is_admin: matches!(fields.get("isAdmin"), Some(Value::Bool(true))),
            ..Self::default()
        })
    }
}

/// Chat document at `chats/{chatId}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatDocument {
    /// Contact details as typed into the form; numbers are kept as their digits.
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone: String,
    /// Set once the first-contact notification went out.
    #[serde(default, deserialize_with = "lenient_bool")]
    pub first_notified: bool,
}

impl ChatDocument {
    /// Read a chat from raw document fields. Never fails.
    #[must_use]
    pub fn from_fields(fields: &Map<String, Value>) -> Self {
        serde_json::from_value(Value::Object(fields.clone())).unwrap_or_else(|_| Self {
            first_notified: matches!(fields.get("firstNotified"), Some(Value::Bool(true))),
            ..Self::default()
        })
    }
}

/// Who wrote a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthorRole {
    /// A website visitor.
    #[serde(alias = "user")]
    Client,
    /// A brokerage staff member answering from the back office.
    Admin,
    /// Missing or unrecognized role.
    #[default]
    #[serde(other)]
    Unknown,
}

/// Message document at `chats/{chatId}/messages/{messageId}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDocument {
    #[serde(default, deserialize_with = "lenient_string")]
    pub text: String,
    #[serde(default, deserialize_with = "lenient_role")]
    pub author_role: AuthorRole,
    /// Only string timestamps are kept.
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<String>,
}

impl MessageDocument {
    /// Read a message from raw document fields. Never fails; a message
    /// whose role cannot be read is [`AuthorRole::Unknown`].
    #[must_use]
    pub fn from_fields(fields: &Map<String, Value>) -> Self {
        serde_json::from_value(Value::Object(fields.clone())).unwrap_or_default()
    }
}

/// News document in the `news` collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsDocument {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(matches!(value, Value::Bool(true)))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    })
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn lenient_role<'de, D>(deserializer: D) -> Result<AuthorRole, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}
