//! TOML-based configuration
//!
//! Configuration is read once at startup from an optional TOML file
//! (`study-rag.toml` by default). Every field has a default, so the server
//! runs without a file. A handful of environment variables override the file:
//!
//! - `PORT` → `server.port`
//! - `HOST` → `server.host`
//!
//! Secrets are never stored in the file. Sections name the environment
//! variable that holds each credential (`api_key_env`) and the value is
//! resolved at startup.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Root configuration structure loaded from study-rag.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Chat model used by the generator
    #[serde(default)]
    pub llm: LlmConfig,

    /// Embedding model used to embed questions
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,

    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    #[serde(default)]
    pub prompt: PromptConfig,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    /// Largest accepted request body in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Allowed CORS origins. Empty allows any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            max_body_bytes: default_max_body_bytes(),
            cors_origins: Vec::new(),
        }
    }
}

// ============= Model Provider Configuration =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Google Gemini REST API
    Gemini,
    /// Local Ollama server
    Ollama,
}

impl ProviderKind {
    pub fn default_api_base(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            ProviderKind::Ollama => "http://localhost:11434",
        }
    }

    pub fn requires_api_key(&self) -> bool {
        matches!(self, ProviderKind::Gemini)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: ProviderKind,

    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Overrides the provider's default endpoint
    #[serde(default)]
    pub api_base: Option<String>,

    /// Environment variable containing the API key
    #[serde(default = "default_google_key_env")]
    pub api_key_env: String,

    #[serde(default)]
    pub temperature: Option<f32>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider() -> ProviderKind {
    ProviderKind::Gemini
}

fn default_chat_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_google_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_chat_model(),
            api_base: None,
            api_key_env: default_google_key_env(),
            temperature: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmConfig {
    pub fn api_base(&self) -> &str {
        self.api_base
            .as_deref()
            .unwrap_or_else(|| self.provider.default_api_base())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    #[serde(default = "default_provider")]
    pub provider: ProviderKind,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default)]
    pub api_base: Option<String>,

    #[serde(default = "default_google_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_embedding_model() -> String {
    "models/gemini-embedding-001".to_string()
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_embedding_model(),
            api_base: None,
            api_key_env: default_google_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingsConfig {
    pub fn api_base(&self) -> &str {
        self.api_base
            .as_deref()
            .unwrap_or_else(|| self.provider.default_api_base())
    }
}

// ============= Vector Store Configuration =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VectorStoreKind {
    /// Embedded HNSW store persisted under `path`
    AresVector,
    /// Volatile store, useful for demos and tests
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default = "default_vector_store_kind")]
    pub provider: VectorStoreKind,

    #[serde(default = "default_vector_path")]
    pub path: String,

    #[serde(default = "default_collection")]
    pub collection: String,

    /// Number of fragments handed to the generator
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Minimum similarity score. Unset keeps every top-k hit.
    #[serde(default)]
    pub score_threshold: Option<f32>,
}

fn default_vector_store_kind() -> VectorStoreKind {
    VectorStoreKind::AresVector
}

fn default_vector_path() -> String {
    "./data/vectors".to_string()
}

fn default_collection() -> String {
    "example_collection".to_string()
}

fn default_top_k() -> usize {
    4
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            provider: default_vector_store_kind(),
            path: default_vector_path(),
            collection: default_collection(),
            top_k: default_top_k(),
            score_threshold: None,
        }
    }
}

// ============= Prompt Configuration =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptSource {
    /// Pull the template from the prompt hub at startup
    Hub,
    /// Use the template compiled into the binary
    Builtin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    #[serde(default = "default_prompt_source")]
    pub source: PromptSource,

    /// Hub identifier in `owner/repo` form
    #[serde(default = "default_prompt_name")]
    pub name: String,

    #[serde(default = "default_hub_url")]
    pub hub_url: String,

    /// Environment variable with the (optional) hub API key
    #[serde(default = "default_hub_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_hub_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_prompt_source() -> PromptSource {
    PromptSource::Hub
}

fn default_prompt_name() -> String {
    "rlm/rag-prompt".to_string()
}

fn default_hub_url() -> String {
    "https://api.smith.langchain.com".to_string()
}

fn default_hub_key_env() -> String {
    "LANGSMITH_API_KEY".to_string()
}

fn default_hub_timeout_secs() -> u64 {
    30
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            source: default_prompt_source(),
            name: default_prompt_name(),
            hub_url: default_hub_url(),
            api_key_env: default_hub_key_env(),
            timeout_secs: default_hub_timeout_secs(),
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{name}' has an invalid value '{value}'")]
    InvalidEnvVar { name: String, value: String },
}

impl AppConfig {
    /// Load the file if present, defaults otherwise, then apply environment
    /// overrides and validate.
    ///
    /// Runs before logging is installed; callers check `path.exists()` to
    /// report a missing file.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            AppConfig::default()
        };

        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `PORT` and `HOST` overrides. The lookup is injected so tests do
    /// not have to mutate the process environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT").filter(|v| !v.trim().is_empty()) {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidEnvVar {
                    name: "PORT".to_string(),
                    value: port.clone(),
                })?;
        }
        if let Some(host) = lookup("HOST").filter(|v| !v.trim().is_empty()) {
            self.server.host = host.trim().to_string();
        }
        Ok(())
    }

    /// Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "server.max_body_bytes must be greater than zero".to_string(),
            ));
        }

        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "llm.model must not be empty".to_string(),
            ));
        }
        if let Some(t) = self.llm.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::ValidationError(format!(
                    "llm.temperature must be between 0.0 and 2.0, got {}",
                    t
                )));
            }
        }
        if self.embeddings.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "embeddings.model must not be empty".to_string(),
            ));
        }

        for (section, provider) in [
            ("llm", self.llm.provider),
            ("embeddings", self.embeddings.provider),
        ] {
            if provider == ProviderKind::Ollama && !cfg!(feature = "ollama") {
                return Err(ConfigError::ValidationError(format!(
                    "{}.provider = \"ollama\" requires the `ollama` feature",
                    section
                )));
            }
        }

        if self.vector_store.collection.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "vector_store.collection must not be empty".to_string(),
            ));
        }
        if self.vector_store.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "vector_store.top_k must be at least 1".to_string(),
            ));
        }
        if self.vector_store.provider == VectorStoreKind::AresVector
            && !cfg!(feature = "ares-vector")
        {
            return Err(ConfigError::ValidationError(
                "vector_store.provider = \"ares-vector\" requires the `ares-vector` feature"
                    .to_string(),
            ));
        }

        if self.prompt.source == PromptSource::Hub {
            let valid_name = self
                .prompt
                .name
                .split_once('/')
                .map(|(owner, repo)| !owner.is_empty() && !repo.is_empty())
                .unwrap_or(false);
            if !valid_name {
                return Err(ConfigError::ValidationError(format!(
                    "prompt.name must be in 'owner/repo' form, got '{}'",
                    self.prompt.name
                )));
            }
        }

        Ok(())
    }

    /// Resolve an environment variable, treating empty values as unset
    pub fn resolve_env(&self, env_name: &str) -> Option<String> {
        std::env::var(env_name).ok().filter(|v| !v.is_empty())
    }

    pub fn llm_api_key(&self) -> Option<String> {
        self.resolve_env(&self.llm.api_key_env)
    }

    pub fn embeddings_api_key(&self) -> Option<String> {
        self.resolve_env(&self.embeddings.api_key_env)
    }

    pub fn hub_api_key(&self) -> Option<String> {
        self.resolve_env(&self.prompt.api_key_env)
    }

    /// Address the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
