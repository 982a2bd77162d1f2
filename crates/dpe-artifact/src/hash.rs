//! Content digests for document snapshots
//!
//! Provides [`ContentHash`], a 32-byte Blake3 digest recorded on every
//! committed artifact so two versions can be compared without diffing them.

use serde_json::{Map, Value};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A 32-byte content hash (Blake3)
///
/// Immutable and cheap to clone (Copy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Wrap raw digest bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Digest arbitrary bytes
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self::new(*blake3::hash(data).as_bytes())
    }

    /// Digest a text document as its newline-joined form
    #[inline]
    #[must_use]
    pub fn of_text(text: &str) -> Self {
        Self::compute(text.as_bytes())
    }

    /// Digest a structural document through its compact JSON encoding
    ///
    /// Key order is part of the digest: two mappings with the same entries in
    /// a different order hash differently.
    #[must_use]
    pub fn of_mapping(mapping: &Map<String, Value>) -> Self {
        // Writing a Value into a Vec cannot fail
        let encoded = serde_json::to_vec(mapping).unwrap_or_default();
        Self::compute(&encoded)
    }

    /// Short string representation (first 16 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for ContentHash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        let actual = bytes.len();
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| HashError::InvalidLength { expected: 32, actual })?;
        Ok(Self(array))
    }
}

impl serde::Serialize for ContentHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for ContentHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors parsing a hex digest
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// Wrong number of bytes
    #[error("invalid hash length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Not hexadecimal
    #[error("invalid hex encoding: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_digest_is_deterministic() {
        assert_eq!(ContentHash::of_text("@startuml"), ContentHash::of_text("@startuml"));
        assert_ne!(ContentHash::of_text("a"), ContentHash::of_text("b"));
    }

    #[test]
    fn mapping_digest_tracks_content() {
        let a = json!({"entities": [{"name": "User"}]});
        let b = json!({"entities": [{"name": "Order"}]});
        let a = a.as_object().unwrap();
        let b = b.as_object().unwrap();
        assert_eq!(ContentHash::of_mapping(a), ContentHash::of_mapping(a));
        assert_ne!(ContentHash::of_mapping(a), ContentHash::of_mapping(b));
    }

    #[test]
    fn hex_roundtrip() {
        let hash = ContentHash::of_text("diagram");
        let parsed: ContentHash = hash.to_string().parse().unwrap();
        assert_eq!(hash, parsed);
        assert_eq!(hash.short().len(), 16);
    }

    #[test]
    fn rejects_short_hex() {
        let result: Result<ContentHash, _> = "abcd".parse();
        assert!(matches!(result, Err(HashError::InvalidLength { actual: 2, .. })));
    }
}
