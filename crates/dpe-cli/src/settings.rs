//! TOML settings for the `dpe` binary
//!
//! ```toml
//! [engine]
//! normalize_string_payloads = true
//! max_pad_index = 1024
//!
//! [logging]
//! level = "info"
//! json = false
//! ```

use anyhow::{Context, Result};
use dpe_core::EngineConfig;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub engine: EngineConfig,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable logs
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}

impl Settings {
    /// Load settings from `path`, or defaults when no file is given
    ///
    /// # Errors
    /// Returns error if the file cannot be read, is not valid TOML, or holds
    /// an invalid engine configuration
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let settings: Self = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        settings.engine.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpe_artifact::PayloadMode;

    #[test]
    fn parses_partial_tables() {
        let settings: Settings = toml::from_str(
            "[engine]\nnormalize_string_payloads = false\n\n[logging]\njson = true\n",
        )
        .unwrap();
        assert_eq!(settings.engine.payload_mode(), PayloadMode::Verbatim);
        assert_eq!(settings.engine.max_attempts, 3);
        assert!(settings.logging.json);
        assert_eq!(settings.logging.level, "warn");
    }

    #[test]
    fn missing_path_gives_defaults() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.engine, EngineConfig::default());
    }
}
