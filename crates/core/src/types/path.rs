//! Document paths.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::Uid;

/// Errors that can occur when parsing a [`DocPath`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DocPathError {
    #[error("document path cannot be empty")]
    Empty,
    #[error("document path contains an empty segment: {0}")]
    EmptySegment(String),
    /// Document paths alternate collection/id, so they have an even segment count.
    #[error("document path must have an even number of segments: {0}")]
    OddSegments(String),
}

/// A slash-separated path to a single document, e.g. `chats/abc/messages/m1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocPath(String);

impl DocPath {
    /// Parse a document path. Leading and trailing slashes are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is empty, contains an empty segment, or
    /// points at a collection rather than a document.
    pub fn parse(s: &str) -> Result<Self, DocPathError> {
        let trimmed = s.trim_matches('/');
        if trimmed.is_empty() {
            return Err(DocPathError::Empty);
        }
        let segments: Vec<&str> = trimmed.split('/').collect();
        if segments.iter().any(|seg| seg.is_empty()) {
            return Err(DocPathError::EmptySegment(s.to_owned()));
        }
        if segments.len() % 2 != 0 {
            return Err(DocPathError::OddSegments(s.to_owned()));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Build the path of a document inside a top-level collection.
    ///
    /// # Errors
    ///
    /// Returns an error if either part is empty or contains a slash.
    pub fn child(collection: &str, id: &str) -> Result<Self, DocPathError> {
        if id.contains('/') || collection.contains('/') {
            return Err(DocPathError::OddSegments(format!("{collection}/{id}")));
        }
        Self::parse(&format!("{collection}/{id}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// The final segment: the document id.
    #[must_use]
    pub fn id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    /// The path of the collection that holds this document.
    #[must_use]
    pub fn collection(&self) -> &str {
        self.0.rsplit_once('/').map_or("", |(parent, _)| parent)
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DocPath {
    type Error = DocPathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DocPath> for String {
    fn from(path: DocPath) -> Self {
        path.0
    }
}

/// Fixed collection layout.
pub mod collections {
    use super::{DocPath, Uid};

    /// Authorization documents; existence alone means "is admin".
    pub const ADMINS: &str = "admins";
    /// User profile documents.
    pub const USERS: &str = "users";
    /// Ingested news articles.
    pub const NEWS: &str = "news";
    /// Contact chats.
    pub const CHATS: &str = "chats";
    /// Message subcollection under each chat.
    pub const MESSAGES: &str = "messages";

    /// `admins/{uid}`
    #[must_use]
    pub fn admin(uid: &Uid) -> DocPath {
        DocPath(format!("{ADMINS}/{uid}"))
    }

    /// `users/{uid}`
    #[must_use]
    pub fn user(uid: &Uid) -> DocPath {
        DocPath(format!("{USERS}/{uid}"))
    }

    /// `chats/{chatId}`
    ///
    /// # Errors
    ///
    /// Returns an error if `chat_id` is not a single path segment.
    pub fn chat(chat_id: &str) -> Result<DocPath, super::DocPathError> {
        DocPath::child(CHATS, chat_id)
    }

    /// `news/{id}`
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is not a single path segment.
    pub fn news(id: &str) -> Result<DocPath, super::DocPathError> {
        DocPath::child(NEWS, id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_path() {
        let path = DocPath::parse("/chats/c1/messages/m1/").unwrap();
        assert_eq!(path.as_str(), "chats/c1/messages/m1");
        assert_eq!(path.id(), "m1");
        assert_eq!(path.collection(), "chats/c1/messages");
        assert_eq!(path.segments().count(), 4);
    }

    #[test]
    fn test_parse_rejects_collection_paths() {
        assert!(matches!(
            DocPath::parse("chats/c1/messages"),
            Err(DocPathError::OddSegments(_))
        ));
        assert!(matches!(
            DocPath::parse("chats//m1"),
            Err(DocPathError::EmptySegment(_))
        ));
        assert_eq!(DocPath::parse("/"), Err(DocPathError::Empty));
    }

    #[test]
    fn test_collection_helpers() {
        let uid = Uid::parse("u1").unwrap();
        assert_eq!(collections::admin(&uid).as_str(), "admins/u1");
        assert_eq!(collections::user(&uid).as_str(), "users/u1");
        assert!(collections::news("a/b").is_err());
    }
}
