//! Dotted state paths (`rooms.space.puzzles.p1`).

use crate::error::StoreError;

/// A parsed, non-empty dotted path into the state tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatePath {
    raw: String,
    segments: Vec<String>,
}

impl StatePath {
    /// Parses a dotted path. Every segment must be non-empty.
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        if raw.is_empty() {
            return Err(StoreError::EmptyPath);
        }
        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(StoreError::EmptySegment(raw.to_string()));
        }
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// Returns the path as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the individual segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns the top-level segment.
    pub fn section(&self) -> &str {
        &self.segments[0]
    }

    /// Returns `true` when the path has more than one segment.
    pub fn is_nested(&self) -> bool {
        self.segments.len() > 1
    }

    /// Returns the dotted prefix made of the first `len` segments.
    pub fn prefix(&self, len: usize) -> String {
        self.segments[..len.min(self.segments.len())].join(".")
    }
}

impl std::fmt::Display for StatePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::str::FromStr for StatePath {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_path() {
        let path = StatePath::parse("rooms.space.puzzles").unwrap();
        assert_eq!(path.segments(), ["rooms", "space", "puzzles"]);
        assert_eq!(path.section(), "rooms");
        assert!(path.is_nested());
        assert_eq!(path.prefix(2), "rooms.space");
    }

    #[test]
    fn test_single_segment_is_not_nested() {
        let path = StatePath::parse("badges").unwrap();
        assert!(!path.is_nested());
        assert_eq!(path.to_string(), "badges");
    }

    #[test]
    fn test_rejects_empty_and_hollow_paths() {
        assert_eq!(StatePath::parse(""), Err(StoreError::EmptyPath));
        assert!(matches!(
            StatePath::parse("rooms..space"),
            Err(StoreError::EmptySegment(_))
        ));
        assert!(matches!(
            StatePath::parse("hints."),
            Err(StoreError::EmptySegment(_))
        ));
    }
}
