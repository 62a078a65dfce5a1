//! Configuration management for the CLI
//!
//! Configuration is layered, later layers winning field by field:
//! - Default values
//! - User config (`~/.config/segtran/config.toml`)
//! - Project config (`.segtran.toml`, `segtran.yaml`, ...)
//! - Environment variables (`SEGTRAN_BASE_URL`, `SEGTRAN_MODEL`)
//! - Command-line arguments (applied by the handlers)
//!
//! The proxy credential is never part of the file configuration.

use crate::error::{Error, Result};
use segtran_core::{BackendProfile, ModelId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Project config file names, in lookup order
const PROJECT_CONFIG_FILES: &[&str] = &[
    ".segtran.toml",
    ".segtran.yaml",
    ".segtran.json",
    "segtran.toml",
    "segtran.yaml",
    "segtran.json",
];

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model used when `--model` is not given
    pub default_model: String,

    /// System prompt replacing the built-in one
    pub prompt: Option<String>,

    /// Proxy connection settings
    pub proxy: ProxyConfig,

    /// Retry settings shared by every model
    pub retry: RetryConfig,

    /// Output settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingSettings,

    /// Per-model overrides keyed by model name
    pub models: BTreeMap<String, ModelConfig>,
}

/// Proxy connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Base URL the translate endpoints are joined onto
    pub base_url: String,

    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
}

/// Retry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Fixed delay before retrying a transient failure
    pub retry_delay_ms: u64,
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Show a progress bar while translating
    pub progress: bool,

    /// Use colored output by default
    pub color: bool,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log format (compact, full, json)
    pub format: String,

    /// Log file path
    pub file: Option<PathBuf>,
}

/// Per-model throughput overrides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Maximum segment size in characters
    pub segment_size: Option<usize>,

    /// Maximum concurrent requests
    pub concurrency: Option<usize>,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_model: ModelId::DeepSeek.as_str().to_string(),
            prompt: None,
            proxy: ProxyConfig::default(),
            retry: RetryConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingSettings::default(),
            models: BTreeMap::new(),
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            connect_timeout_secs: 10,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: segtran_core::http::retry::DEFAULT_MAX_RETRIES,
            retry_delay_ms: segtran_core::http::retry::DEFAULT_RETRY_DELAY_MS,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            progress: true,
            color: true,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            format: "compact".to_string(),
            file: None,
        }
    }
}

/// Serialization format, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Toml,
    Yaml,
    Json,
}

impl FileFormat {
    fn detect(path: &Path) -> Result<Self> {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase())
            .as_deref()
        {
            Some("toml") => Ok(Self::Toml),
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            Some("json") => Ok(Self::Json),
            _ => Err(Error::InvalidFormat {
                path: path.to_path_buf(),
                expected: "TOML, YAML or JSON".to_string(),
            }),
        }
    }
}

impl Config {
    /// Load configuration from a single file on top of the defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut merged = serde_json::to_value(Self::default())?;
        merge_values(&mut merged, read_layer(path)?);
        Self::from_value(merged)
    }

    /// Load the user and project layers from the default locations
    pub fn load() -> Result<Self> {
        let mut merged = serde_json::to_value(Self::default())?;

        let mut layers = Vec::new();
        if let Some(user) = Self::user_config_path() {
            layers.push(user);
        }
        if let Some(project) = Self::find_project_config() {
            layers.push(project);
        }

        for path in layers.into_iter().filter(|p| p.exists()) {
            tracing::debug!(path = %path.display(), "Loading config layer");
            merge_values(&mut merged, read_layer(&path)?);
        }

        Self::from_value(merged)
    }

    /// Load configuration from a specific file or default locations, then apply env overrides
    pub fn load_with_file(file: Option<&Path>) -> Result<Self> {
        let mut config = match file {
            Some(path) if !path.exists() => {
                return Err(Error::FileNotFound {
                    path: path.to_path_buf(),
                })
            }
            Some(path) => Self::from_file(path)?,
            None => Self::load()?,
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::config(format!("Invalid configuration: {}", e)))
    }

    /// Apply `SEGTRAN_BASE_URL` and `SEGTRAN_MODEL`
    pub fn apply_env(&mut self) {
        if let Ok(base_url) = std::env::var("SEGTRAN_BASE_URL") {
            if !base_url.trim().is_empty() {
                self.proxy.base_url = base_url;
            }
        }
        if let Ok(model) = std::env::var("SEGTRAN_MODEL") {
            if !model.trim().is_empty() {
                self.default_model = model;
            }
        }
    }

    /// Reject model names and values no command could use
    pub fn validate(&self) -> Result<()> {
        ModelId::from_str(&self.default_model)
            .map_err(|_| Error::config(format!("Unknown default_model '{}'", self.default_model)))?;

        for (name, overrides) in &self.models {
            ModelId::from_str(name)
                .map_err(|_| Error::config(format!("Unknown model '{}' in [models]", name)))?;
            if overrides.segment_size == Some(0) || overrides.concurrency == Some(0) {
                return Err(Error::config(format!(
                    "models.{}: segment_size and concurrency must be positive",
                    name
                )));
            }
        }

        if self.proxy.base_url.trim().is_empty() {
            return Err(Error::config("proxy.base_url must not be empty"));
        }
        Ok(())
    }

    /// Overrides for `model`, looked up by its canonical name
    pub fn model_config(&self, model: ModelId) -> ModelConfig {
        self.models
            .iter()
            .find(|(name, _)| ModelId::from_str(name).ok() == Some(model))
            .map(|(_, overrides)| overrides.clone())
            .unwrap_or_default()
    }

    /// Backend profile for `model` with config overrides applied
    pub fn effective_profile(&self, model: ModelId) -> BackendProfile {
        let mut profile = model.profile();
        let overrides = self.model_config(model);
        if let Some(size) = overrides.segment_size {
            profile.default_segment_size = size;
        }
        if let Some(concurrency) = overrides.concurrency {
            profile.concurrency_limit = concurrency;
        }
        if let Some(secs) = overrides.timeout_secs {
            profile.request_timeout = Duration::from_secs(secs);
        }
        profile
    }

    /// `~/.config/segtran/config.toml`
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("segtran").join("config.toml"))
    }

    /// First project config file present in the current directory
    pub fn find_project_config() -> Option<PathBuf> {
        Self::find_project_config_in(Path::new("."))
    }

    fn find_project_config_in(dir: &Path) -> Option<PathBuf> {
        PROJECT_CONFIG_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
    }

    /// Serialize in the format implied by the path's extension
    pub fn to_string_for(&self, path: &Path) -> Result<String> {
        match FileFormat::detect(path)? {
            FileFormat::Toml => toml::to_string_pretty(self)
                .map_err(|e| Error::config(format!("Failed to serialize as TOML: {}", e))),
            FileFormat::Yaml => Ok(serde_yaml::to_string(self)?),
            FileFormat::Json => Ok(serde_json::to_string_pretty(self)?),
        }
    }

    /// Write the default configuration to `path`, creating parent directories
    pub fn write_default(path: &Path) -> Result<()> {
        let mut content = String::from(
            "# Segtran configuration\n# The proxy credential is read from --api-key or SEGTRAN_API_KEY only.\n\n",
        );
        content.push_str(&Self::default().to_string_for(path)?);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Parse one config file into a generic value for layering
fn read_layer(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)?;
    let value = match FileFormat::detect(path)? {
        FileFormat::Toml => {
            let parsed: toml::Value = toml::from_str(&content)?;
            serde_json::to_value(parsed)?
        }
        FileFormat::Yaml => serde_yaml::from_str(&content)?,
        FileFormat::Json => serde_json::from_str(&content)?,
    };

    match value {
        Value::Object(mut map) => {
            if map.remove("api_key").is_some() {
                eprintln!(
                    "Warning: ignoring api_key in {}; use --api-key or SEGTRAN_API_KEY",
                    path.display()
                );
            }
            Ok(Value::Object(map))
        }
        Value::Null => Ok(Value::Object(Default::default())),
        _ => Err(Error::InvalidFormat {
            path: path.to_path_buf(),
            expected: "a table of settings".to_string(),
        }),
    }
}

/// Deep-merge `overlay` into `base`; tables merge, everything else replaces
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.retry_delay_ms, 2000);
    }

    #[test]
    fn test_toml_file_overrides_defaults_partially() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".segtran.toml");
        std::fs::write(
            &path,
            r#"
default_model = "claude"

[proxy]
base_url = "https://proxy.example.com"

[models.claude]
segment_size = 2500
timeout_secs = 240
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.default_model, "claude");
        assert_eq!(config.proxy.base_url, "https://proxy.example.com");
        assert_eq!(config.proxy.connect_timeout_secs, 10);
        assert_eq!(config.retry.max_retries, 3);

        let profile = config.effective_profile(ModelId::Claude);
        assert_eq!(profile.default_segment_size, 2500);
        assert_eq!(profile.concurrency_limit, 2);
        assert_eq!(profile.request_timeout, Duration::from_secs(240));
        assert_eq!(config.effective_profile(ModelId::Gpt4o), ModelId::Gpt4o.profile());
    }

    #[test]
    fn test_yaml_and_json_files() {
        let dir = TempDir::new().unwrap();
        let yaml = dir.path().join("segtran.yaml");
        std::fs::write(&yaml, "retry:\n  max_retries: 5\n").unwrap();
        assert_eq!(Config::from_file(&yaml).unwrap().retry.max_retries, 5);

        let json = dir.path().join("segtran.json");
        std::fs::write(&json, r#"{"output": {"progress": false}}"#).unwrap();
        let config = Config::from_file(&json).unwrap();
        assert!(!config.output.progress);
        assert!(config.output.color);
    }

    #[test]
    fn test_api_key_in_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("segtran.toml");
        std::fs::write(&path, "api_key = \"sk-should-not-load\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        let shown = config.to_string_for(&path).unwrap();
        assert!(!shown.contains("sk-should-not-load"));
    }

    #[test]
    fn test_unknown_model_override_is_rejected() {
        let mut config = Config::default();
        config.models.insert("llama".to_string(), ModelConfig::default());
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("segtran.ini");
        std::fs::write(&path, "x=1").unwrap();
        assert!(matches!(Config::from_file(&path), Err(Error::InvalidFormat { .. })));
    }

    #[test]
    fn test_write_default_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        Config::write_default(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# Segtran configuration"));
        assert!(!content.contains("api_key ="));
        assert_eq!(Config::from_file(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_project_config_lookup_order() {
        let dir = TempDir::new().unwrap();
        assert!(Config::find_project_config_in(dir.path()).is_none());

        std::fs::write(dir.path().join("segtran.yaml"), "").unwrap();
        std::fs::write(dir.path().join(".segtran.toml"), "").unwrap();
        assert_eq!(
            Config::find_project_config_in(dir.path()),
            Some(dir.path().join(".segtran.toml"))
        );
    }

    #[test]
    fn test_merge_values_is_deep() {
        let mut base = serde_json::json!({"proxy": {"base_url": "a", "connect_timeout_secs": 10}});
        merge_values(&mut base, serde_json::json!({"proxy": {"base_url": "b"}}));
        assert_eq!(base["proxy"]["base_url"], "b");
        assert_eq!(base["proxy"]["connect_timeout_secs"], 10);
    }
}
