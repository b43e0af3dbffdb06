//! Topic filters
//!
//! A filter is either the wildcard `#`, matching every topic, or an exact
//! topic. `#` is only a wildcard when it is the whole filter; `events/#` is
//! matched literally.

use std::fmt;

/// Wildcard filter text
pub const WILDCARD: &str = "#";

/// One topic filter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TopicFilter {
    /// Matches every topic
    Any,
    /// Matches one topic exactly
    Exact(String),
}

impl TopicFilter {
    /// Parse filter text; `None` for an empty or blank filter
    pub fn parse(filter: &str) -> Option<Self> {
        match filter.trim() {
            "" => None,
            WILDCARD => Some(Self::Any),
            _ => Some(Self::Exact(filter.to_string())),
        }
    }

    #[inline]
    pub fn matches(&self, topic: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => expected == topic,
        }
    }

    #[inline]
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Any)
    }
}

impl fmt::Display for TopicFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str(WILDCARD),
            Self::Exact(topic) => f.write_str(topic),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(TopicFilter::parse("#"), Some(TopicFilter::Any));
        assert_eq!(TopicFilter::parse(" # "), Some(TopicFilter::Any));
        assert_eq!(
            TopicFilter::parse("events/device/X"),
            Some(TopicFilter::Exact("events/device/X".into()))
        );
        assert_eq!(TopicFilter::parse(""), None);
        assert_eq!(TopicFilter::parse("   "), None);
    }

    #[test]
    fn test_wildcard_matches_everything() {
        let any = TopicFilter::Any;
        assert!(any.is_wildcard());
        assert!(any.matches(""));
        assert!(any.matches("a/b/c"));
    }

    #[test]
    fn test_exact_match_only() {
        let filter = TopicFilter::parse("events/#").unwrap();
        assert!(!filter.is_wildcard());
        assert!(filter.matches("events/#"));
        assert!(!filter.matches("events/device"));
        assert!(!filter.matches("events"));
    }

    #[test]
    fn test_display() {
        assert_eq!(TopicFilter::Any.to_string(), "#");
        assert_eq!(TopicFilter::Exact("a/b".into()).to_string(), "a/b");
    }
}
