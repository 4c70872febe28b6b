//! Regex wrapper for configuration fields
//!
//! Predicate fields use full-match semantics, substitution rules use search
//! semantics; `Pattern` compiles both forms once when the configuration is
//! bound, so passes never recompile per element.

use std::fmt;

use regex::Regex;
use serde::de::{Deserialize, Deserializer, Error as DeError};

#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
    anchored: Regex,
}

impl Pattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(source)?;
        let anchored = Regex::new(&format!("^(?:{})$", source))?;
        Ok(Self {
            source: source.to_string(),
            regex,
            anchored,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Full-match test. An empty pattern matches any value, which gives
    /// required-set entries their "key must exist" reading.
    pub fn full_match(&self, text: &str) -> bool {
        if self.source.is_empty() {
            return true;
        }
        self.anchored.is_match(text)
    }

    /// Search-semantics test.
    pub fn search(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// The underlying search regex, for substitution and capture use.
    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let source = String::deserialize(deserializer)?;
        Pattern::new(&source)
            .map_err(|err| D::Error::custom(format!("invalid regex {:?}: {}", source, err)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_match_is_anchored() {
        let pattern = Pattern::new("ab+").expect("compiles");
        assert!(pattern.full_match("abb"));
        assert!(!pattern.full_match("xabb"));
        assert!(!pattern.full_match("abbx"));
        assert!(pattern.search("xabbx"));
    }

    #[test]
    fn empty_pattern_matches_any_value() {
        let pattern = Pattern::new("").expect("compiles");
        assert!(pattern.full_match(""));
        assert!(pattern.full_match("anything"));
    }

    #[test]
    fn deserializes_from_string() {
        let pattern: Pattern = serde_yaml::from_str(r#""\\d+""#).expect("deserializes");
        assert!(pattern.full_match("123"));
        assert!(serde_yaml::from_str::<Pattern>(r#""[""#).is_err());
    }
}
