//! Controlled tag vocabulary for news documents.

/// Default vocabulary used to classify news articles.
pub const TAG_VOCABULARY: &[&str] = &[
    "auto",
    "vida",
    "saude",
    "habitacao",
    "viagem",
    "empresas",
    "acidentes-trabalho",
    "responsabilidade-civil",
    "poupanca",
    "reforma",
    "regulacao",
    "mercado",
];

/// Fewest tags a news document may carry.
pub const MIN_TAGS: usize = 2;

/// Most tags a news document may carry.
pub const MAX_TAGS: usize = 4;

/// An allow-list of tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagVocabulary {
    allowed: Vec<String>,
}

impl Default for TagVocabulary {
    fn default() -> Self {
        Self::new(TAG_VOCABULARY.iter().copied())
    }
}

impl TagVocabulary {
    /// Build a vocabulary from any list of tags. Entries are normalized to
    /// trimmed lowercase.
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut allowed: Vec<String> = Vec::new();
        for tag in tags {
            let tag = normalize(tag.as_ref());
            if !tag.is_empty() && !allowed.contains(&tag) {
                allowed.push(tag);
            }
        }
        Self { allowed }
    }

    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.allowed.iter().any(|t| t == tag)
    }

    /// The allowed tags, in declaration order.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.allowed
    }

    /// Keep only allowed tags, deduplicated and in input order, capped at
    /// [`MAX_TAGS`].
    #[must_use]
    pub fn filter<I, S>(&self, candidates: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut kept: Vec<String> = Vec::new();
        for candidate in candidates {
            let tag = normalize(candidate.as_ref());
            if self.contains(&tag) && !kept.contains(&tag) {
                kept.push(tag);
            }
            if kept.len() == MAX_TAGS {
                break;
            }
        }
        kept
    }
}

fn normalize(tag: &str) -> String {
    tag.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_drops_unlisted_tags() {
        let vocab = TagVocabulary::new(["auto", "vida", "saude"]);
        assert_eq!(vocab.filter(["auto", "vida", "desporto"]), vec!["auto", "vida"]);
    }

    #[test]
    fn test_filter_normalizes_and_dedupes() {
        let vocab = TagVocabulary::default();
        assert_eq!(
            vocab.filter([" Auto", "auto", "VIDA "]),
            vec!["auto".to_string(), "vida".to_string()]
        );
    }

    #[test]
    fn test_filter_caps_at_max() {
        let vocab = TagVocabulary::default();
        let tags = vocab.filter(["auto", "vida", "saude", "viagem", "reforma"]);
        assert_eq!(tags.len(), MAX_TAGS);
        assert_eq!(tags.last().map(String::as_str), Some("viagem"));
    }

    #[test]
    fn test_filter_empty() {
        let vocab = TagVocabulary::default();
        assert!(vocab.filter(["desporto", "futebol"]).is_empty());
    }
}
