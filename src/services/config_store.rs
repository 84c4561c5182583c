// Configuration Storage Service
// Handles config file read/write, environment overrides and version backup

use crate::models::{AcademicLevel, DetectionSensitivity, PipelineConfig, RewriteScope};
use crate::services::detection::DetectionPolicy;
use crate::services::providers::{DEFAULT_CHAT_MODEL, DEFAULT_CHAT_URL};
use crate::services::rewrite::RewritePolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const ENV_API_KEY: &str = "SCHOLAR_HUMANIZER_API_KEY";
pub const ENV_BACKEND_URL: &str = "SCHOLAR_HUMANIZER_BACKEND_URL";
pub const ENV_MODEL: &str = "SCHOLAR_HUMANIZER_MODEL";

/// Key under which the chat backend's API key is stored.
pub const CHAT_PROVIDER: &str = "chat";

const KEEP_BACKUPS: usize = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ConfigError + '_ {
    move |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub version: String,
    pub defaults: RequestDefaults,
    pub detection: DetectionPolicy,
    pub rewrite: RewritePolicy,
    pub backend: BackendConfig,
    pub api_keys: HashMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            defaults: RequestDefaults::default(),
            detection: DetectionPolicy::default(),
            rewrite: RewritePolicy::default(),
            backend: BackendConfig::default(),
            api_keys: HashMap::new(),
        }
    }
}

impl AppConfig {
    /// Apply `SCHOLAR_HUMANIZER_*` environment overrides on top of the file values.
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok());
        self
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(key) = lookup(ENV_API_KEY) {
            self.api_keys.insert(CHAT_PROVIDER.to_string(), key);
            self.backend.kind = BackendKind::Chat;
        }
        if let Some(url) = lookup(ENV_BACKEND_URL) {
            self.backend.base_url = Some(url);
        }
        if let Some(model) = lookup(ENV_MODEL) {
            self.backend.model = Some(model);
        }
    }

    pub fn chat_api_key(&self) -> Option<&str> {
        self.api_keys.get(CHAT_PROVIDER).map(String::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RequestDefaults {
    pub language: String,
    pub academic_level: AcademicLevel,
    pub rewrite_scope: RewriteScope,
    pub sensitivity: DetectionSensitivity,
    pub preserve_citations: bool,
    pub strict_language: bool,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        let config = PipelineConfig::default();
        Self {
            language: "en".to_string(),
            academic_level: config.academic_level,
            rewrite_scope: config.rewrite_scope,
            sensitivity: config.sensitivity,
            preserve_citations: config.preserve_citations,
            strict_language: config.strict_language,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Local,
    Chat,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub proxy: Option<String>,
}

impl BackendConfig {
    pub fn url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_CHAT_URL)
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_CHAT_MODEL)
    }
}

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_dir, config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("scholar-humanizer"))
    }

    /// Store at the default location, if the platform has one.
    pub fn open_default() -> Option<Self> {
        Self::default_config_dir().map(Self::new)
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Ensure config directory exists
    pub fn ensure_dir(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.config_dir).map_err(io_err(&self.config_dir))
    }

    /// Load configuration from file; a missing file yields defaults.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        if !self.config_file.exists() {
            debug!("[CONFIG] no config at {}, using defaults", self.config_file.display());
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file).map_err(io_err(&self.config_file))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration to file
    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        self.ensure_dir()?;

        // Create backup if file exists
        if self.config_file.exists() {
            self.create_backup()?;
        }

        let content = serde_json::to_string_pretty(config)?;
        fs::write(&self.config_file, content).map_err(io_err(&self.config_file))?;
        info!("[CONFIG] saved {}", self.config_file.display());
        Ok(())
    }

    /// Create a backup of current config
    fn create_backup(&self) -> Result<(), ConfigError> {
        let backup_dir = self.config_dir.join("backups");
        fs::create_dir_all(&backup_dir).map_err(io_err(&backup_dir))?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S%.3f");
        let backup_file = backup_dir.join(format!("config_{}.json", timestamp));

        fs::copy(&self.config_file, &backup_file).map_err(io_err(&backup_file))?;

        self.cleanup_old_backups(&backup_dir, KEEP_BACKUPS)
    }

    /// Remove old backups, keeping only the most recent N
    fn cleanup_old_backups(&self, backup_dir: &Path, keep: usize) -> Result<(), ConfigError> {
        let mut entries: Vec<_> = fs::read_dir(backup_dir)
            .map_err(io_err(backup_dir))?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
            .collect();

        if entries.len() <= keep {
            return Ok(());
        }

        // Timestamped names sort oldest first
        entries.sort_by_key(|e| e.file_name());

        let remove_count = entries.len() - keep;
        for entry in entries.iter().take(remove_count) {
            let _ = fs::remove_file(entry.path());
        }

        Ok(())
    }

    /// Store provider API key in config file
    pub fn set_api_key(&self, provider: &str, key: &str) -> Result<(), ConfigError> {
        let mut config = self.load()?;
        config.api_keys.insert(provider.to_string(), key.to_string());
        self.save(&config)
    }

    /// Delete provider API key from config file
    pub fn delete_api_key(&self, provider: &str) -> Result<(), ConfigError> {
        let mut config = self.load()?;
        config.api_keys.remove(provider);
        self.save(&config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.defaults.language, "en");
        assert!(config.defaults.preserve_citations);
        assert_eq!(config.rewrite.max_retries, 2);
        assert_eq!(config.detection.humanize_min_probability, 30.0);
        assert_eq!(config.backend.kind, BackendKind::Local);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"rewrite": {"max_retries": 5}, "backend": {"kind": "chat"}}"#).unwrap();
        assert_eq!(config.rewrite.max_retries, 5);
        assert_eq!(config.rewrite.acceptance_threshold, 70.0);
        assert_eq!(config.detection, DetectionPolicy::default());
        assert_eq!(config.backend.kind, BackendKind::Chat);
        assert_eq!(config.backend.model(), DEFAULT_CHAT_MODEL);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        let env: HashMap<&str, &str> = [(ENV_API_KEY, "sk-test"), (ENV_MODEL, "local-model"), (ENV_BACKEND_URL, " ")]
            .into_iter()
            .collect();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.chat_api_key(), Some("sk-test"));
        assert_eq!(config.backend.kind, BackendKind::Chat);
        assert_eq!(config.backend.model(), "local-model");
        assert_eq!(config.backend.url(), DEFAULT_CHAT_URL);
    }

    #[test]
    fn test_save_load_and_backups() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("cfg"));
        assert_eq!(store.load().unwrap(), AppConfig::default());

        let mut config = AppConfig::default();
        config.defaults.academic_level = AcademicLevel::Phd;
        store.save(&config).unwrap();
        store.set_api_key(CHAT_PROVIDER, "sk-1").unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.defaults.academic_level, AcademicLevel::Phd);
        assert_eq!(loaded.chat_api_key(), Some("sk-1"));

        store.delete_api_key(CHAT_PROVIDER).unwrap();
        assert_eq!(store.load().unwrap().chat_api_key(), None);

        let backups = fs::read_dir(dir.path().join("cfg").join("backups")).unwrap().count();
        assert!(backups >= 1 && backups <= KEEP_BACKUPS);
    }

    #[test]
    fn test_corrupt_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().to_path_buf());
        fs::write(store.config_file(), "{not json").unwrap();
        assert!(matches!(store.load(), Err(ConfigError::Parse(_))));
    }
}
