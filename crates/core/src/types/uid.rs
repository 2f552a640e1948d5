//! User identifier type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Uid`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UidError {
    /// The input string is empty.
    #[error("uid cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("uid must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains a path separator.
    #[error("uid cannot contain '/'")]
    ContainsSlash,
}

/// The opaque identifier of a user in the credential store.
///
/// Uids double as document ids under `admins/` and `users/`, so they must be
/// usable as a single path segment.
///
/// ## Examples
///
/// ```
/// use corretora_core::Uid;
///
/// assert!(Uid::parse("k2Jd9sQx7bP0").is_ok());
/// assert!(Uid::parse("").is_err());
/// assert!(Uid::parse("admins/abc").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct Uid(String);

impl Uid {
    /// Maximum length accepted by the credential store.
    pub const MAX_LENGTH: usize = 128;

    /// Parse a `Uid` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, longer than 128 characters,
    /// or contains a `/`.
    pub fn parse(s: &str) -> Result<Self, UidError> {
        if s.is_empty() {
            return Err(UidError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(UidError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if s.contains('/') {
            return Err(UidError::ContainsSlash);
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the uid as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Uid {
    type Err = UidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Uid {
    type Error = UidError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Uid> for String {
    fn from(uid: Uid) -> Self {
        uid.0
    }
}

impl AsRef<str> for Uid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
