//! Configuration management for the CLI.

use crate::error::{CliError, Result};
use litcoder_llm::gemini::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Model vendor settings
    #[serde(default)]
    pub gemini: GeminiSettings,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,
}

/// Gemini connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiSettings {
    /// API key; the environment and `--api-key` take precedence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// API base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model used when a job does not name one
    #[serde(default = "default_model")]
    pub model: String,
}

/// Global CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
}

impl Config {
    /// Get the default configuration file path.
    pub fn path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".litcoder").join("config.toml"))
    }

    /// Load configuration from the default path, or defaults if absent.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load configuration from a file, or defaults if absent.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)?;
            let config: Config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// API key from the command line or environment, else from the file.
    pub fn api_key(&self, override_key: Option<String>) -> Result<String> {
        let usable = |key: &String| !key.trim().is_empty();
        override_key
            .filter(usable)
            .or_else(|| self.gemini.api_key.clone().filter(usable))
            .ok_or(CliError::MissingApiKey)
    }
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_endpoint(),
            model: default_model(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.gemini.model, "gemini-2.5-pro");
        assert_eq!(config.gemini.endpoint, DEFAULT_ENDPOINT);
        assert!(config.gemini.api_key.is_none());
        assert!(config.settings.color);
        assert_eq!(config.settings.format, OutputFormat::Table);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("[gemini]\nmodel = \"gemini-2.5-flash\"\n").unwrap();
        assert_eq!(config.gemini.model, "gemini-2.5-flash");
        assert_eq!(config.gemini.endpoint, DEFAULT_ENDPOINT);
        assert!(config.settings.color);
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[gemini]\napi_key = \"file-key\"\n\n[settings]\nformat = \"json\"\n",
        )
        .unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.gemini.api_key.as_deref(), Some("file-key"));
        assert_eq!(loaded.settings.format, OutputFormat::Json);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("none.toml")).unwrap();
        assert!(config.gemini.api_key.is_none());
    }

    #[test]
    fn test_api_key_precedence() {
        let mut config = Config::default();
        assert!(matches!(config.api_key(None), Err(CliError::MissingApiKey)));

        config.gemini.api_key = Some("file-key".to_string());
        assert_eq!(config.api_key(None).unwrap(), "file-key");
        assert_eq!(config.api_key(Some("env-key".to_string())).unwrap(), "env-key");
    }

    #[test]
    fn test_blank_override_falls_back_to_file_key() {
        let mut config = Config::default();
        config.gemini.api_key = Some("file-key".to_string());
        assert_eq!(config.api_key(Some(String::new())).unwrap(), "file-key");
        assert_eq!(config.api_key(Some("  ".to_string())).unwrap(), "file-key");

        config.gemini.api_key = Some(" ".to_string());
        assert!(matches!(config.api_key(Some(String::new())), Err(CliError::MissingApiKey)));
    }
}
