//! Location paths for addressing inside structural documents
//!
//! A location is a dotted list of keys where each key may carry a sequence
//! index suffix:
//!
//! - `entities` → key `entities`
//! - `entities[2]` → third element of the `entities` sequence
//! - `entities[end]` → one past the last element (append position)
//! - `entities[0].attributes[end]` → nested addressing
//!
//! The whole-document marker `root` is not a path; callers check for
//! [`ROOT_LOCATION`] before parsing.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Distinguished whole-document replacement marker
pub const ROOT_LOCATION: &str = "root";

/// Index suffix on a path step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepIndex {
    /// Explicit 0-based position
    At(usize),
    /// Append position
    End,
}

impl Display for StepIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::At(n) => write!(f, "{n}"),
            Self::End => f.write_str("end"),
        }
    }
}

/// One `key` or `key[index]` segment
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Step {
    key: String,
    index: Option<StepIndex>,
}

impl Step {
    /// Plain mapping step
    #[inline]
    #[must_use]
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            index: None,
        }
    }

    /// Sequence step
    #[inline]
    #[must_use]
    pub fn indexed(key: impl Into<String>, index: StepIndex) -> Self {
        Self {
            key: key.into(),
            index: Some(index),
        }
    }

    /// Mapping key this step reads
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.key
    }

    /// Sequence index, if the step addresses a sequence
    #[inline]
    #[must_use]
    pub fn index(&self) -> Option<StepIndex> {
        self.index
    }

    fn parse(token: &str, location: &str) -> Result<Self, PathError> {
        let malformed = |reason: &'static str| PathError::Malformed {
            location: location.to_string(),
            token: token.to_string(),
            reason,
        };

        let Some(open) = token.find('[') else {
            if token.contains(']') {
                return Err(malformed("unbalanced brackets"));
            }
            if token.is_empty() {
                return Err(malformed("empty key"));
            }
            return Ok(Self::key(token));
        };

        let key = &token[..open];
        let rest = &token[open + 1..];
        let Some(inner) = rest.strip_suffix(']') else {
            return Err(malformed("unbalanced brackets"));
        };
        if inner.contains('[') || inner.contains(']') {
            return Err(malformed("unbalanced brackets"));
        }
        if key.is_empty() {
            return Err(malformed("empty key"));
        }

        let index = if inner == "end" {
            StepIndex::End
        } else if !inner.is_empty() && inner.bytes().all(|b| b.is_ascii_digit()) {
            inner
                .parse()
                .map(StepIndex::At)
                .map_err(|_| malformed("index out of range"))?
        } else {
            return Err(malformed("index must be a number or `end`"));
        };

        Ok(Self::indexed(key, index))
    }
}

impl Display for Step {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}[{index}]", self.key),
            None => f.write_str(&self.key),
        }
    }
}

/// Parsed, non-empty location path
///
/// # Invariants
/// - At least one step
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocationPath(Vec<Step>);

impl LocationPath {
    /// Build from steps
    ///
    /// # Errors
    /// Returns [`PathError::Empty`] when `steps` is empty
    pub fn new(steps: Vec<Step>) -> Result<Self, PathError> {
        if steps.is_empty() {
            return Err(PathError::Empty);
        }
        Ok(Self(steps))
    }

    /// All steps, root to leaf
    #[inline]
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.0
    }

    /// Steps that must resolve to containers
    #[inline]
    #[must_use]
    pub fn parents(&self) -> &[Step] {
        &self.0[..self.0.len() - 1]
    }

    /// Terminal step the operation acts on
    #[inline]
    #[must_use]
    pub fn terminal(&self) -> &Step {
        &self.0[self.0.len() - 1]
    }

    /// Number of steps
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with `len`
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for LocationPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, step) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

impl FromStr for LocationPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let location = s.trim();
        if location.is_empty() {
            return Err(PathError::Empty);
        }

        let steps = location
            .split('.')
            .map(|token| Step::parse(token, location))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(steps)
    }
}

/// Errors related to location paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Nothing to address
    #[error("location is empty")]
    Empty,

    /// A token could not be parsed
    #[error("malformed location '{location}': token '{token}': {reason}")]
    Malformed {
        location: String,
        token: String,
        reason: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> LocationPath {
        s.parse().unwrap()
    }

    #[test]
    fn plain_keys() {
        let path = parse("config.database.host");
        assert_eq!(path.len(), 3);
        assert_eq!(path.terminal(), &Step::key("host"));
        assert_eq!(path.parents().len(), 2);
    }

    #[test]
    fn indexed_and_end_steps() {
        let path = parse("entities[0].attributes[end]");
        assert_eq!(path.steps()[0], Step::indexed("entities", StepIndex::At(0)));
        assert_eq!(path.terminal(), &Step::indexed("attributes", StepIndex::End));
    }

    #[test]
    fn display_matches_input() {
        for input in ["a", "a[3]", "a.b[end]", "entities[12].name"] {
            assert_eq!(parse(input).to_string(), input);
        }
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(parse("  entities[end] "), parse("entities[end]"));
    }

    #[test]
    fn root_marker_parses_as_plain_key() {
        // callers special-case ROOT_LOCATION before parsing
        assert_eq!(parse(ROOT_LOCATION).terminal(), &Step::key("root"));
    }

    #[test]
    fn rejects_empty() {
        assert_eq!("".parse::<LocationPath>(), Err(PathError::Empty));
        assert_eq!("   ".parse::<LocationPath>(), Err(PathError::Empty));
    }

    #[test]
    fn rejects_bad_tokens() {
        for bad in [
            "a..b",
            "a[1",
            "a]",
            "a[1]]",
            "a[[1]",
            "a[x]",
            "a[-1]",
            "a[]",
            "[0]",
            "a[1]b",
            "a[99999999999999999999999]",
        ] {
            let result = bad.parse::<LocationPath>();
            assert!(
                matches!(result, Err(PathError::Malformed { .. })),
                "{bad} should be malformed, got {result:?}"
            );
        }
    }

    #[test]
    fn new_rejects_no_steps() {
        assert_eq!(LocationPath::new(Vec::new()), Err(PathError::Empty));
    }
}
