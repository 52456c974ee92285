//! Configuration for the reference [`ToolkitLoader`](crate::toolkit::ToolkitLoader).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
   #[error("toml parse error: {0}")]
   TomlParse(#[from] toml::de::Error),

   #[error("invalid configuration: {0}")]
   Invalid(String),
}

/// Where to load the toolkit module from and how slow the load pretends to be.
///
/// ```toml
/// location = "./worker.js"
/// latency_ms = 250
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
   pub location: String,
   pub latency_ms: u64,
}

impl Default for LoaderConfig {
   fn default() -> Self {
      Self {
         location: "./worker.js".to_owned(),
         latency_ms: 0,
      }
   }
}

impl LoaderConfig {
   pub fn new(location: impl Into<String>) -> Self {
      Self {
         location: location.into(),
         ..Self::default()
      }
   }

   #[must_use]
   pub fn with_latency(mut self, latency: Duration) -> Self {
      self.latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
      self
   }

   pub fn latency(&self) -> Duration {
      Duration::from_millis(self.latency_ms)
   }

   /// Parses a config from TOML. Missing keys take their defaults.
   pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
      let config = toml::from_str::<Self>(raw)?;
      if config.location.trim().is_empty() {
         return Err(ConfigError::Invalid("location must not be empty".to_owned()));
      }
      Ok(config)
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn oversized_latency_saturates() {
      let config = LoaderConfig::default().with_latency(Duration::MAX);
      assert_eq!(config.latency_ms, u64::MAX);
      let config = LoaderConfig::default().with_latency(Duration::from_secs(3));
      assert_eq!(config.latency_ms, 3000);
   }

   #[test]
   fn missing_keys_use_defaults() {
      let config = LoaderConfig::from_toml_str("latency_ms = 40").unwrap();
      assert_eq!(config.location, "./worker.js");
      assert_eq!(config.latency(), Duration::from_millis(40));
   }

   #[test]
   fn full_document_parses() {
      let config =
         LoaderConfig::from_toml_str("location = \"/assets/toolkit.wasm\"\nlatency_ms = 5").unwrap();
      assert_eq!(
         config,
         LoaderConfig::new("/assets/toolkit.wasm").with_latency(Duration::from_millis(5))
      );
   }

   #[test]
   fn rejects_blank_location() {
      let err = LoaderConfig::from_toml_str("location = \"  \"").unwrap_err();
      assert_eq!(err.to_string(), "invalid configuration: location must not be empty");
   }

   #[test]
   fn rejects_malformed_toml() {
      let err = LoaderConfig::from_toml_str("location = [").unwrap_err();
      assert!(matches!(err, ConfigError::TomlParse(_)));
   }
}
