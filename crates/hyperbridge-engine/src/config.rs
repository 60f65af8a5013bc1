//! Bridge configuration (TOML)
//!
//! Accepted either as a standalone document or as the `[bridge]` table of
//! a larger manifest:
//!
//! ```toml
//! [bridge]
//! class_cache_size = 25
//! memoize_distances = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read bridge config: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse bridge config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("Failed to serialize bridge config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// Validation error
    #[error("Invalid bridge config: {0}")]
    ValidationError(String),
}

/// Tunables of a [`Bridge`](crate::Bridge)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Capacity of the least-recently-used class handle cache
    pub class_cache_size: usize,

    /// Memoize type distances per (argument type, parameter type) pair
    pub memoize_distances: bool,
}

impl BridgeConfig {
    /// Default class handle cache capacity
    pub const DEFAULT_CLASS_CACHE_SIZE: usize = 25;

    /// Load from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse from TOML, using the `[bridge]` table when present
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut document: toml::Table = toml::from_str(content)?;
        let section = match document.remove("bridge") {
            Some(toml::Value::Table(table)) => table,
            Some(_) => {
                return Err(ConfigError::ValidationError(
                    "`bridge` must be a table".to_string(),
                ))
            }
            None => document,
        };
        let config: BridgeConfig = toml::Value::Table(section).try_into()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.class_cache_size == 0 {
            return Err(ConfigError::ValidationError(
                "class_cache_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Serialize as a `[bridge]` table
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        let mut document = toml::Table::new();
        document.insert("bridge".to_string(), toml::Value::try_from(self)?);
        Ok(toml::to_string(&document)?)
    }

    /// Write as a `[bridge]` table
    pub fn to_file(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            class_cache_size: Self::DEFAULT_CLASS_CACHE_SIZE,
            memoize_distances: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.class_cache_size, 25);
        assert!(config.memoize_distances);
    }

    #[test]
    fn test_parse_bridge_table() {
        let config = BridgeConfig::from_toml_str(
            r#"
[package]
name = "app"

[bridge]
class_cache_size = 4
"#,
        )
        .unwrap();
        assert_eq!(config.class_cache_size, 4);
        assert!(config.memoize_distances);
    }

    #[test]
    fn test_parse_standalone_document() {
        let config = BridgeConfig::from_toml_str("memoize_distances = false\n").unwrap();
        assert_eq!(config.class_cache_size, 25);
        assert!(!config.memoize_distances);
    }

    #[test]
    fn test_empty_document_gives_defaults() {
        assert_eq!(BridgeConfig::from_toml_str("").unwrap(), BridgeConfig::default());
    }

    #[test]
    fn test_zero_cache_rejected() {
        let err = BridgeConfig::from_toml_str("[bridge]\nclass_cache_size = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = BridgeConfig::from_toml_str("[bridge]\ncache = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hyperbridge.toml");
        let config = BridgeConfig {
            class_cache_size: 8,
            memoize_distances: false,
        };
        config.to_file(&path).unwrap();
        assert_eq!(BridgeConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file() {
        let err = BridgeConfig::from_file(Path::new("/nonexistent/hyperbridge.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
