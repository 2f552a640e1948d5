//! Document path patterns with `{name}` wildcards.

use core::fmt;

use corretora_core::DocPath;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern cannot be empty")]
    Empty,
    #[error("malformed segment {0:?}")]
    Segment(String),
    #[error("duplicate parameter {0:?}")]
    Duplicate(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A path pattern such as `chats/{chatId}/messages/{messageId}`.
///
/// Matches segment-wise: literals must be equal, wildcards match any single
/// segment. The segment counts must be equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Parse a pattern.
    ///
    /// # Errors
    ///
    /// Returns `PatternError` if the pattern is empty, has an empty or
    /// half-braced segment, or binds the same name twice.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let trimmed = pattern.trim_matches('/');
        if trimmed.is_empty() {
            return Err(PatternError::Empty);
        }

        let mut segments = Vec::new();
        for raw in trimmed.split('/') {
            let segment = match raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) if !name.is_empty() && !name.contains(['{', '}']) => {
                    if segments
                        .iter()
                        .any(|s| matches!(s, Segment::Param(existing) if existing == name))
                    {
                        return Err(PatternError::Duplicate(name.to_owned()));
                    }
                    Segment::Param(name.to_owned())
                }
                None if !raw.is_empty() && !raw.contains(['{', '}']) => {
                    Segment::Literal(raw.to_owned())
                }
                _ => return Err(PatternError::Segment(raw.to_owned())),
            };
            segments.push(segment);
        }

        Ok(Self { segments })
    }

    /// Match a document path, returning the bound parameters.
    #[must_use]
    pub fn matches(&self, path: &DocPath) -> Option<Params> {
        let parts: Vec<&str> = path.segments().collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = Params::default();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => params.0.push((name.clone(), part.to_owned())),
            }
        }
        Some(params)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            match segment {
                Segment::Literal(s) => f.write_str(s)?,
                Segment::Param(name) => write!(f, "{{{name}}}")?,
            }
        }
        Ok(())
    }
}

/// Parameters bound by a successful match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn path(s: &str) -> DocPath {
        DocPath::parse(s).unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        let pattern = PathPattern::parse("/chats/{chatId}/messages/{messageId}").unwrap();
        assert_eq!(pattern.to_string(), "chats/{chatId}/messages/{messageId}");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(PathPattern::parse(""), Err(PatternError::Empty));
        assert!(matches!(PathPattern::parse("admins//x"), Err(PatternError::Segment(_))));
        assert!(matches!(PathPattern::parse("admins/{uid"), Err(PatternError::Segment(_))));
        assert!(matches!(PathPattern::parse("admins/{}"), Err(PatternError::Segment(_))));
        assert!(matches!(
            PathPattern::parse("a/{id}/b/{id}"),
            Err(PatternError::Duplicate(_))
        ));
    }

    #[test]
    fn test_matching() {
        let pattern = PathPattern::parse("chats/{chatId}/messages/{messageId}").unwrap();

        let params = pattern.matches(&path("chats/c1/messages/m9")).unwrap();
        assert_eq!(params.get("chatId"), Some("c1"));
        assert_eq!(params.get("messageId"), Some("m9"));
        assert_eq!(params.get("uid"), None);

        assert!(pattern.matches(&path("chats/c1")).is_none());
        assert!(pattern.matches(&path("chats/c1/replies/m9")).is_none());
        assert!(pattern.matches(&path("admins/c1/messages/m9")).is_none());
    }
}
