//! Engine configuration

use crate::error::EngineError;
use crate::retry::{RetryPolicy, DEFAULT_MAX_ATTEMPTS};
use dpe_artifact::PayloadMode;
use dpe_patch::DEFAULT_MAX_PAD_INDEX;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for [`DiagramEngine`](crate::DiagramEngine)
///
/// Every field has a default, so a partial TOML or JSON table deserializes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Attempts per generation stage
    pub max_attempts: u32,
    /// Wall-clock bound for generation plus commit in milliseconds,
    /// unbounded when absent
    pub turn_timeout_ms: Option<u64>,
    /// Render the description after each commit when a renderer is set
    pub render_after_commit: bool,
    /// Parse string payloads that look like JSON before structural decoding
    pub normalize_string_payloads: bool,
    /// Hand the previous attempt's failure to the proposer on retry
    pub feed_back_validation: bool,
    /// Largest sequence index the structural patcher pads up to
    pub max_pad_index: usize,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With attempts per stage
    #[inline]
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// With a turn timeout
    ///
    /// Sub-millisecond remainders round up, so any positive duration stays
    /// positive.
    #[must_use]
    pub fn with_turn_timeout(mut self, timeout: Duration) -> Self {
        let partial = u128::from(timeout.subsec_nanos() % 1_000_000 != 0);
        let millis = u64::try_from(timeout.as_millis() + partial).unwrap_or(u64::MAX);
        self.turn_timeout_ms = Some(millis);
        self
    }

    /// With or without rendering after commit
    #[inline]
    #[must_use]
    pub fn with_render_after_commit(mut self, render: bool) -> Self {
        self.render_after_commit = render;
        self
    }

    /// With or without string payload normalization
    #[inline]
    #[must_use]
    pub fn with_normalize_string_payloads(mut self, normalize: bool) -> Self {
        self.normalize_string_payloads = normalize;
        self
    }

    /// With or without failure feedback to proposers
    #[inline]
    #[must_use]
    pub fn with_feed_back_validation(mut self, feed_back: bool) -> Self {
        self.feed_back_validation = feed_back;
        self
    }

    /// With a padding limit for structural adds
    #[inline]
    #[must_use]
    pub fn with_max_pad_index(mut self, limit: usize) -> Self {
        self.max_pad_index = limit;
        self
    }

    /// Retry policy for each generation stage
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts)
    }

    /// Payload handling for structural decoding
    #[must_use]
    pub fn payload_mode(&self) -> PayloadMode {
        if self.normalize_string_payloads {
            PayloadMode::Normalize
        } else {
            PayloadMode::Verbatim
        }
    }

    /// Turn timeout as a duration
    #[must_use]
    pub fn turn_timeout(&self) -> Option<Duration> {
        self.turn_timeout_ms.map(Duration::from_millis)
    }

    /// Reject settings the engine cannot run with
    ///
    /// # Errors
    /// Returns [`EngineError::Config`] naming the offending field
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.max_attempts == 0 {
            return Err(EngineError::Config("max_attempts must be at least 1".into()));
        }
        if self.turn_timeout_ms == Some(0) {
            return Err(EngineError::Config(
                "turn_timeout_ms must be positive when set".into(),
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            turn_timeout_ms: None,
            render_after_commit: true,
            normalize_string_payloads: true,
            feed_back_validation: false,
            max_pad_index: DEFAULT_MAX_PAD_INDEX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"max_attempts": 5, "turn_timeout_ms": 20000}"#).unwrap();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.turn_timeout(), Some(Duration::from_secs(20)));
        assert!(config.render_after_commit);
        assert_eq!(config.payload_mode(), PayloadMode::Normalize);
        assert_eq!(config.max_pad_index, DEFAULT_MAX_PAD_INDEX);
    }

    #[test]
    fn builder_and_validation() {
        let config = EngineConfig::new()
            .with_max_attempts(1)
            .with_normalize_string_payloads(false);
        assert!(config.validate().is_ok());
        assert_eq!(config.retry_policy().max_attempts(), 1);
        assert_eq!(config.payload_mode(), PayloadMode::Verbatim);

        assert!(EngineConfig::new().with_max_attempts(0).validate().is_err());
        assert!(EngineConfig::new()
            .with_turn_timeout(Duration::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    fn turn_timeout_keeps_sub_second_precision() {
        for millis in [500, 1500, 2250] {
            let config = EngineConfig::new().with_turn_timeout(Duration::from_millis(millis));
            assert!(config.validate().is_ok());
            assert_eq!(config.turn_timeout(), Some(Duration::from_millis(millis)));
        }

        let tiny = EngineConfig::new().with_turn_timeout(Duration::from_micros(300));
        assert!(tiny.validate().is_ok());
        assert_eq!(tiny.turn_timeout(), Some(Duration::from_millis(1)));
    }
}
