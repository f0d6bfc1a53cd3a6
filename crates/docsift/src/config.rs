//! Configuration handling for docsift.
//!
//! Settings come from a TOML file (every field optional) and are then
//! overridden by `QDRANT_URL`, `QDRANT_API_KEY`, `OPENAI_API_KEY` and
//! `OPENAI_BASE_URL` from the environment.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use docsift_query::{CriteriaProfile, SearchOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Vector store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Embedding configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Query interpretation model
    #[serde(default)]
    pub llm: LlmConfig,

    /// Search configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Index configuration
    #[serde(default)]
    pub index: IndexConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Vector store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Qdrant base URL
    #[serde(default = "default_store_url")]
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_collection")]
    pub collection: String,

    /// HTTP timeout per request (seconds)
    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,

    /// Attempts to provision the collection before giving up
    #[serde(default = "default_provision_attempts")]
    pub provision_attempts: u32,

    /// Pause between provisioning attempts (seconds)
    #[serde(default = "default_provision_delay")]
    pub provision_delay_secs: u64,
}

fn default_store_url() -> String {
    "http://localhost:6333".to_string()
}

fn default_collection() -> String {
    docsift_store::DEFAULT_COLLECTION.to_string()
}

fn default_store_timeout() -> u64 {
    5
}

fn default_provision_attempts() -> u32 {
    5
}

fn default_provision_delay() -> u64 {
    2
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_store_url(),
            api_key: None,
            collection: default_collection(),
            timeout_secs: default_store_timeout(),
            provision_attempts: default_provision_attempts(),
            provision_delay_secs: default_provision_delay(),
        }
    }
}

/// Which embedding backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    #[default]
    OpenAi,
    /// Offline feature hashing
    Hash,
    /// Local model (requires the `candle` feature)
    Candle,
}

/// Embedding-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub backend: EmbeddingBackend,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Vector dimension the model produces
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    #[serde(default = "default_openai_url")]
    pub base_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}

fn default_dimension() -> usize {
    1536
}

fn default_openai_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_timeout() -> u64 {
    30
}

fn default_max_retries() -> usize {
    3
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::default(),
            model: default_embedding_model(),
            dimension: default_dimension(),
            base_url: default_openai_url(),
            api_key: None,
            timeout_secs: default_embedding_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

/// Which language model answers query interpretation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    #[default]
    OpenAi,
    Ollama,
}

/// Language-model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub backend: LlmBackend,

    /// Model name; the backend's default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Endpoint; the backend's default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Term buckets to extract
    #[serde(default)]
    pub profile: CriteriaProfile,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_temperature() -> f32 {
    0.1
}

fn default_llm_timeout() -> u64 {
    30
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: LlmBackend::default(),
            model: None,
            base_url: None,
            api_key: None,
            temperature: default_temperature(),
            profile: CriteriaProfile::default(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

/// How candidates are retrieved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Embedding similarity
    #[default]
    Vector,
    /// Regex scan of every stored document
    Scan,
}

/// Search-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub mode: SearchMode,

    /// Default result limit
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    #[serde(flatten)]
    pub options: SearchOptions,
}

fn default_limit() -> usize {
    docsift_query::DEFAULT_LIMIT
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            mode: SearchMode::default(),
            default_limit: default_limit(),
            options: SearchOptions::default(),
        }
    }
}

/// Index-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Read every point back after writing it
    #[serde(default = "default_verify_writes")]
    pub verify_writes: bool,
}

fn default_verify_writes() -> bool {
    true
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            verify_writes: default_verify_writes(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or `tracing` filter directive
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load from the default location, falling back to defaults when no file
    /// exists, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::read(&path)?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from an explicit file, then apply environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::read(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Parse TOML text.
    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply overrides from `lookup`. Blank values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = get("QDRANT_URL") {
            self.store.url = url;
        }
        if let Some(key) = get("QDRANT_API_KEY") {
            self.store.api_key = Some(key);
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            self.embedding.api_key = Some(key.clone());
            self.llm.api_key = Some(key);
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            self.embedding.base_url = url.clone();
            if self.llm.backend == LlmBackend::OpenAi {
                self.llm.base_url = Some(url);
            }
        }
    }

    /// Path of the default config file.
    pub fn config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("config.toml"))
    }

    /// A commented sample configuration file.
    pub fn sample_toml() -> &'static str {
        SAMPLE_TOML
    }
}

/// Get the config directory for docsift.
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("DOCSIFT_CONFIG_DIR") {
        return Some(PathBuf::from(dir));
    }

    ProjectDirs::from("", "", "docsift").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the cache directory for docsift (downloaded models live here).
#[cfg(feature = "candle")]
pub fn cache_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "docsift").map(|dirs| dirs.cache_dir().to_path_buf())
}

const SAMPLE_TOML: &str = r#"# docsift configuration
#
# Secrets are best left to the environment: QDRANT_URL, QDRANT_API_KEY,
# OPENAI_API_KEY and OPENAI_BASE_URL override the values below.

[store]
url = "http://localhost:6333"
collection = "documents"
timeout_secs = 5
provision_attempts = 5
provision_delay_secs = 2

[embedding]
# openai | hash | candle
backend = "openai"
model = "text-embedding-ada-002"
dimension = 1536
base_url = "https://api.openai.com/v1"
timeout_secs = 30
max_retries = 3

[llm]
# openai | ollama
backend = "openai"
# model = "gpt-4o-mini"
# base_url = "http://localhost:11434"
temperature = 0.1
# generic (names, keywords) | medical (doctors, medicalTerms, conditions)
profile = "generic"
timeout_secs = 30

[search]
# vector | scan
mode = "vector"
default_limit = 5
similarity_floor = 0.3
max_snippets = 3
scan_window = 50
scan_page_size = 100
highlight_marker = "**"
snippet_separator = "\n[...]\n"

[index]
verify_writes = true

[logging]
level = "info"
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.store.url, "http://localhost:6333");
        assert_eq!(config.store.collection, "documents");
        assert_eq!(config.store.provision_attempts, 5);
        assert_eq!(config.embedding.backend, EmbeddingBackend::OpenAi);
        assert_eq!(config.embedding.dimension, 1536);
        assert_eq!(config.llm.profile, CriteriaProfile::Generic);
        assert_eq!(config.search.mode, SearchMode::Vector);
        assert_eq!(config.search.default_limit, 5);
        assert!(config.index.verify_writes);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_empty_file_is_default() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.store.url, Config::default().store.url);
        assert_eq!(config.search.options, SearchOptions::default());
    }

    #[test]
    fn test_sample_parses_to_defaults() {
        let config = Config::parse(Config::sample_toml()).unwrap();
        let defaults = Config::default();
        assert_eq!(config.search.options, defaults.search.options);
        assert_eq!(config.embedding.model, defaults.embedding.model);
        assert_eq!(config.store.timeout_secs, defaults.store.timeout_secs);
    }

    #[test]
    fn test_partial_sections() {
        let raw = r#"
            [embedding]
            backend = "hash"
            dimension = 256

            [llm]
            backend = "ollama"
            profile = "medical"

            [search]
            mode = "scan"
            similarity_floor = 0.5
        "#;
        let config = Config::parse(raw).unwrap();
        assert_eq!(config.embedding.backend, EmbeddingBackend::Hash);
        assert_eq!(config.embedding.dimension, 256);
        assert_eq!(config.embedding.model, "text-embedding-ada-002");
        assert_eq!(config.llm.backend, LlmBackend::Ollama);
        assert_eq!(config.llm.profile, CriteriaProfile::Medical);
        assert_eq!(config.search.mode, SearchMode::Scan);
        assert!((config.search.options.similarity_floor - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.search.options.max_snippets, 3);
    }

    #[test]
    fn test_invalid_toml_rejected() {
        assert!(Config::parse("[store\nurl = 1").is_err());
        assert!(Config::parse("[embedding]\nbackend = \"nope\"").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("QDRANT_URL", "http://qdrant:6333"),
            ("QDRANT_API_KEY", "q-key"),
            ("OPENAI_API_KEY", "sk-env"),
            ("OPENAI_BASE_URL", "http://proxy/v1"),
        ]);
        let mut config = Config::default();
        config.llm.api_key = Some("sk-file".to_string());
        config.apply_env(|key| env.get(key).map(|v| (*v).to_string()));

        assert_eq!(config.store.url, "http://qdrant:6333");
        assert_eq!(config.store.api_key.as_deref(), Some("q-key"));
        assert_eq!(config.embedding.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.embedding.base_url, "http://proxy/v1");
        assert_eq!(config.llm.base_url.as_deref(), Some("http://proxy/v1"));
    }

    #[test]
    fn test_blank_env_ignored() {
        let mut config = Config::default();
        config.apply_env(|key| (key == "QDRANT_URL").then(|| "  ".to_string()));
        assert_eq!(config.store.url, "http://localhost:6333");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[logging]\nlevel = \"debug\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert!(Config::load_from(&dir.path().join("missing.toml")).is_err());
    }
}
