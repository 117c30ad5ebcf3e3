//! Configuration loading, validation, and management for AutoLearn.
//!
//! Loads configuration from `~/.autolearn/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.autolearn/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Workflow policy (retry ceiling, mastery threshold, batch bounds)
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// Where session checkpoints are persisted
    #[serde(default)]
    pub store: StoreConfig,

    /// Which collaborator implementations to wire in
    #[serde(default)]
    pub collaborators: CollaboratorsConfig,

    /// LLM endpoint used by the judge, summarizer, generator, and explainer
    #[serde(default)]
    pub llm: LlmConfig,

    /// Context search settings
    #[serde(default)]
    pub search: SearchConfig,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Maximum number of gather→validate passes before giving up
    #[serde(default = "default_max_context_attempts")]
    pub max_context_attempts: u32,

    /// Minimum assessment score (inclusive) that counts as mastery
    #[serde(default = "default_mastery_threshold")]
    pub mastery_threshold: f64,

    #[serde(default = "default_min_questions")]
    pub min_questions: usize,

    #[serde(default = "default_max_questions")]
    pub max_questions: usize,

    /// Chunk size in characters for the process stage
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Run per-concept remediation calls concurrently
    #[serde(default = "default_true")]
    pub concurrent_remediation: bool,
}

fn default_max_context_attempts() -> u32 {
    3
}
fn default_mastery_threshold() -> f64 {
    70.0
}
fn default_min_questions() -> usize {
    3
}
fn default_max_questions() -> usize {
    5
}
fn default_chunk_size() -> usize {
    500
}
fn default_chunk_overlap() -> usize {
    50
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_context_attempts: default_max_context_attempts(),
            mastery_threshold: default_mastery_threshold(),
            min_questions: default_min_questions(),
            max_questions: default_max_questions(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            concurrent_remediation: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// "sqlite", "file", or "memory"
    #[serde(default = "default_store_backend")]
    pub backend: String,

    /// Database file (sqlite) or directory (file). Defaults under the config dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

fn default_store_backend() -> String {
    "sqlite".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: None,
        }
    }
}

impl StoreConfig {
    /// The effective storage location for the configured backend.
    pub fn resolved_path(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return path.clone();
        }
        match self.backend.as_str() {
            "file" => AppConfig::config_dir().join("sessions"),
            _ => AppConfig::config_dir().join("sessions.sqlite"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaboratorsConfig {
    /// "llm" (network-backed) or "offline" (deterministic fixed values)
    #[serde(default = "default_collaborators_mode")]
    pub mode: String,
}

fn default_collaborators_mode() -> String {
    "llm".into()
}

impl Default for CollaboratorsConfig {
    fn default() -> Self {
        Self {
            mode: default_collaborators_mode(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible base URL
    #[serde(default = "default_llm_api_url")]
    pub api_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-request HTTP timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_llm_api_url() -> String {
    "https://api.groq.com/openai/v1".into()
}
fn default_llm_model() -> String {
    "llama-3.3-70b-versatile".into()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_timeout_secs() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: default_llm_api_url(),
            api_key: None,
            model: default_llm_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Instant-answer search endpoint
    #[serde(default = "default_search_api_url")]
    pub api_url: String,

    /// Truncate search results to this many characters
    #[serde(default = "default_search_max_chars")]
    pub max_chars: usize,

    /// Directory of the learner's notes (`*.md`, `*.txt`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes_dir: Option<PathBuf>,
}

fn default_search_api_url() -> String {
    "https://api.duckduckgo.com".into()
}
fn default_search_max_chars() -> usize {
    6000
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_url: default_search_api_url(),
            max_chars: default_search_max_chars(),
            notes_dir: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.autolearn/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `AUTOLEARN_API_KEY`, then `GROQ_API_KEY`, then `OPENAI_API_KEY`
    /// - `AUTOLEARN_MODEL`
    /// - `AUTOLEARN_STORE`
    /// - `AUTOLEARN_NOTES_DIR`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.llm.api_key.is_none() {
            self.llm.api_key = lookup("AUTOLEARN_API_KEY")
                .or_else(|| lookup("GROQ_API_KEY"))
                .or_else(|| lookup("OPENAI_API_KEY"));
        }

        if let Some(model) = lookup("AUTOLEARN_MODEL") {
            self.llm.model = model;
        }

        if let Some(backend) = lookup("AUTOLEARN_STORE") {
            self.store.backend = backend;
        }

        if let Some(dir) = lookup("AUTOLEARN_NOTES_DIR") {
            self.search.notes_dir = Some(PathBuf::from(dir));
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".autolearn")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let wf = &self.workflow;

        if wf.max_context_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "workflow.max_context_attempts must be at least 1".into(),
            ));
        }

        if !(0.0..=100.0).contains(&wf.mastery_threshold) {
            return Err(ConfigError::ValidationError(
                "workflow.mastery_threshold must be between 0 and 100".into(),
            ));
        }

        if wf.min_questions == 0 || wf.min_questions > wf.max_questions {
            return Err(ConfigError::ValidationError(
                "workflow.min_questions must be >= 1 and <= max_questions".into(),
            ));
        }

        if wf.chunk_size == 0 || wf.chunk_overlap >= wf.chunk_size {
            return Err(ConfigError::ValidationError(
                "workflow.chunk_overlap must be smaller than a non-zero chunk_size".into(),
            ));
        }

        if !matches!(self.store.backend.as_str(), "sqlite" | "file" | "memory") {
            return Err(ConfigError::ValidationError(format!(
                "store.backend must be one of sqlite, file, memory (got '{}')",
                self.store.backend
            )));
        }

        if !matches!(self.collaborators.mode.as_str(), "llm" | "offline") {
            return Err(ConfigError::ValidationError(format!(
                "collaborators.mode must be 'llm' or 'offline' (got '{}')",
                self.collaborators.mode
            )));
        }

        if self.llm.temperature < 0.0 || self.llm.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "llm.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.llm.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
