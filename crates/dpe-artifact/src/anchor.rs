//! Line anchors for addressing inside text documents
//!
//! An anchor names the n-th line containing a literal piece of text, written
//! on the wire as `(text)[n]`. The reserved pattern [`EMPTY_LINE_SENTINEL`]
//! matches blank or whitespace-only lines instead of literal text.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::{self, Display, Formatter};

/// Reserved pattern matching blank lines
pub const EMPTY_LINE_SENTINEL: &str = "EMPTY_LINE";

static ANCHOR_SYNTAX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\((.+?)\)\[(\d+)\]").expect("anchor pattern is a valid regex")
});

/// What an anchor matches against
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LinePattern {
    /// Lines containing this text as a literal substring
    Literal(String),
    /// Lines that are empty or whitespace-only
    EmptyLine,
}

/// `(pattern, occurrence)` reference to one line
///
/// `occurrence` is 1-indexed. An occurrence of 0 is representable (the wire
/// format allows it) but never matches any line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineAnchor {
    pattern: LinePattern,
    occurrence: usize,
}

impl LineAnchor {
    /// Anchor on the `occurrence`-th line containing `text`
    ///
    /// The literal text `EMPTY_LINE` selects the blank-line sentinel.
    #[must_use]
    pub fn new(text: impl Into<String>, occurrence: usize) -> Self {
        let text = text.into();
        let pattern = if text == EMPTY_LINE_SENTINEL {
            LinePattern::EmptyLine
        } else {
            LinePattern::Literal(text)
        };
        Self {
            pattern,
            occurrence,
        }
    }

    /// Parse the wire form
    ///
    /// Accepts `(text)[n]`. Anything else is taken verbatim as the pattern
    /// with occurrence 1, so a proposer that forgets the brackets still gets
    /// a usable anchor. Occurrence numbers too large for `usize` saturate and
    /// therefore never match.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match ANCHOR_SYNTAX.captures(raw) {
            Some(caps) => {
                let occurrence = caps[2].parse().unwrap_or(usize::MAX);
                Self::new(&caps[1], occurrence)
            }
            None => Self::new(raw, 1),
        }
    }

    /// Pattern
    #[inline]
    #[must_use]
    pub fn pattern(&self) -> &LinePattern {
        &self.pattern
    }

    /// 1-indexed occurrence
    #[inline]
    #[must_use]
    pub fn occurrence(&self) -> usize {
        self.occurrence
    }

    /// Whether this anchor uses the blank-line sentinel
    #[inline]
    #[must_use]
    pub fn is_empty_line_sentinel(&self) -> bool {
        matches!(self.pattern, LinePattern::EmptyLine)
    }

    /// Check a single line against the pattern
    #[inline]
    #[must_use]
    pub fn matches(&self, line: &str) -> bool {
        match &self.pattern {
            LinePattern::Literal(text) => line.contains(text.as_str()),
            LinePattern::EmptyLine => line.trim().is_empty(),
        }
    }

    /// 0-based index of the matching line, or `None` when there are fewer
    /// than `occurrence` matches
    #[must_use]
    pub fn locate<S: AsRef<str>>(&self, lines: &[S]) -> Option<usize> {
        if self.occurrence == 0 {
            return None;
        }
        lines
            .iter()
            .enumerate()
            .filter(|(_, line)| self.matches(line.as_ref()))
            .nth(self.occurrence - 1)
            .map(|(i, _)| i)
    }
}

impl Display for LineAnchor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.pattern {
            LinePattern::Literal(text) => write!(f, "({text})[{}]", self.occurrence),
            LinePattern::EmptyLine => write!(f, "({EMPTY_LINE_SENTINEL})[{}]", self.occurrence),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: [&str; 7] = [
        "@startuml",
        "class User {",
        "  +id",
        "}",
        "",
        "class Order {",
        "@enduml",
    ];

    #[test]
    fn parses_wire_syntax() {
        let anchor = LineAnchor::parse("(class User {)[1]");
        assert_eq!(anchor.pattern(), &LinePattern::Literal("class User {".into()));
        assert_eq!(anchor.occurrence(), 1);
        assert_eq!(anchor.to_string(), "(class User {)[1]");
    }

    #[test]
    fn parses_text_with_parentheses() {
        let anchor = LineAnchor::parse("(foo() bar)[2]");
        assert_eq!(anchor.pattern(), &LinePattern::Literal("foo() bar".into()));
        assert_eq!(anchor.occurrence(), 2);
    }

    #[test]
    fn bare_text_means_first_occurrence() {
        let anchor = LineAnchor::parse("@enduml");
        assert_eq!(anchor.pattern(), &LinePattern::Literal("@enduml".into()));
        assert_eq!(anchor.occurrence(), 1);
    }

    #[test]
    fn sentinel_is_recognised() {
        let anchor = LineAnchor::parse("(EMPTY_LINE)[1]");
        assert!(anchor.is_empty_line_sentinel());
        assert_eq!(anchor.locate(&DOC), Some(4));
    }

    #[test]
    fn sentinel_matches_whitespace_only_lines() {
        let lines = ["a", "   ", "\t", "b"];
        assert_eq!(LineAnchor::new(EMPTY_LINE_SENTINEL, 2).locate(&lines), Some(2));
    }

    #[test]
    fn literal_match_is_substring_not_regex() {
        let lines = ["a.b", "axb", "(x)[1]", "a.b"];
        assert_eq!(LineAnchor::new("a.b", 1).locate(&lines), Some(0));
        assert_eq!(LineAnchor::new("a.b", 2).locate(&lines), Some(3));
        assert_eq!(LineAnchor::new("(x)", 1).locate(&lines), Some(2));
    }

    #[test]
    fn occurrence_counts_matches() {
        assert_eq!(LineAnchor::new("class", 1).locate(&DOC), Some(1));
        assert_eq!(LineAnchor::new("class", 2).locate(&DOC), Some(5));
        assert_eq!(LineAnchor::new("class", 3).locate(&DOC), None);
    }

    #[test]
    fn zero_and_huge_occurrences_never_match() {
        assert_eq!(LineAnchor::parse("(class)[0]").locate(&DOC), None);
        let huge = LineAnchor::parse("(class)[999999999999999999999999]");
        assert_eq!(huge.occurrence(), usize::MAX);
        assert_eq!(huge.locate(&DOC), None);
    }

    #[test]
    fn empty_document_has_no_matches() {
        let lines: [&str; 0] = [];
        assert_eq!(LineAnchor::new("x", 1).locate(&lines), None);
    }
}
