//! Configuration for the Q&A service
//!
//! Values are resolved in three layers: built-in defaults, an optional TOML
//! file, then environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Environment variable holding the OpenAI API key
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
/// Environment variable overriding the OpenAI base URL
pub const ENV_BASE_URL: &str = "OPENAI_BASE_URL";
/// Environment variable pointing to a TOML config file
pub const ENV_CONFIG_PATH: &str = "DOCQA_CONFIG";
const ENV_HOST: &str = "DOCQA_HOST";
const ENV_PORT: &str = "DOCQA_PORT";
const ENV_LOG_FORMAT: &str = "DOCQA_LOG_FORMAT";

const MB: usize = 1024 * 1024;

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Text chunking configuration
    pub chunking: ChunkingConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// LLM configuration
    pub llm: LlmConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Retry policy for upstream API calls
    pub retry: RetryConfig,
    /// Processing configuration
    pub processing: ProcessingConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Maximum document upload size in bytes (default: 50MB)
    pub max_document_bytes: usize,
    /// Maximum questions file size in bytes (default: 1MB)
    pub max_questions_bytes: usize,
    /// Maximum number of questions per request
    pub max_questions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_document_bytes: 50 * MB,
            max_questions_bytes: MB,
            max_questions: 50,
        }
    }
}

impl ServerConfig {
    /// Body limit for the `/answer` route.
    ///
    /// Leaves headroom above the per-file limits so that an oversized file is
    /// reported by upload validation instead of the transport layer.
    pub fn answer_body_limit(&self) -> usize {
        self.max_document_bytes + self.max_questions_bytes + MB
    }

    /// Document limit in whole megabytes, for messages
    pub fn max_document_mb(&self) -> usize {
        (self.max_document_bytes / MB).max(1)
    }

    /// Questions file limit in whole megabytes, for messages
    pub fn max_questions_mb(&self) -> usize {
        (self.max_questions_bytes / MB).max(1)
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in tokens
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in tokens
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding model name
    pub model: String,
    /// Embedding dimensions (3072 for text-embedding-3-large)
    pub dimensions: usize,
    /// Inputs per embeddings request
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-large".to_string(),
            dimensions: 3072,
            batch_size: 64,
        }
    }
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI compatible base URL
    pub base_url: String,
    /// API key, normally taken from `OPENAI_API_KEY`
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Chat model name
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Questions answered concurrently per request
    pub max_concurrent_requests: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            timeout_secs: 30,
            max_concurrent_requests: 4,
        }
    }
}

impl LlmConfig {
    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Chunks handed to the LLM
    pub k: usize,
    /// Candidates fetched before MMR re-ranking
    pub fetch_k: usize,
    /// MMR balance: 1.0 = pure relevance, 0.0 = pure diversity
    pub lambda_mult: f32,
    /// Citations returned per answer
    pub max_citations: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: 10,
            fetch_k: 25,
            lambda_mult: 0.7,
            max_citations: 4,
        }
    }
}

/// Retry policy for upstream API calls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Multiplier applied to the exponential schedule
    pub multiplier: f64,
    /// Lower bound of a single wait in milliseconds
    pub min_delay_ms: u64,
    /// Upper bound of a single wait in milliseconds
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            multiplier: 1.0,
            min_delay_ms: 2_000,
            max_delay_ms: 10_000,
        }
    }
}

/// Processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Blocking worker threads for parsing and chunking
    pub worker_threads: usize,
    /// Deadline for loading and indexing one document (default: 300 = 5 minutes)
    pub document_timeout_secs: u64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            worker_threads: num_cpus::get().clamp(1, 4),
            document_timeout_secs: 300,
        }
    }
}

impl ProcessingConfig {
    /// Deadline for loading and indexing one document
    pub fn document_timeout(&self) -> Duration {
        Duration::from_secs(self.document_timeout_secs)
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// Human readable output
    Pretty,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Output format
    pub format: LogFormat,
    /// Default filter directive when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            filter: "docqa=info,tower_http=info".to_string(),
        }
    }
}

impl RagConfig {
    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(format!("Invalid config file: {}", e)))
    }

    /// Load a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Resolve configuration from an optional file and the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(ENV_CONFIG_PATH).ok();
        let path = path.or(env_path.as_deref().map(Path::new));

        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply environment overrides using the given lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_API_KEY).filter(|k| !k.trim().is_empty()) {
            self.llm.api_key = Some(key.trim().to_string());
        }
        if let Some(url) = lookup(ENV_BASE_URL).filter(|u| !u.trim().is_empty()) {
            self.llm.base_url = url.trim().to_string();
        }
        if let Some(host) = lookup(ENV_HOST) {
            self.server.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.server.port = port
                .parse()
                .map_err(|_| Error::Config(format!("{} must be a port number, got '{}'", ENV_PORT, port)))?;
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT) {
            self.logging.format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                other => {
                    return Err(Error::Config(format!(
                        "{} must be 'json' or 'pretty', got '{}'",
                        ENV_LOG_FORMAT, other
                    )))
                }
            };
        }
        Ok(())
    }

    /// Check invariants the pipeline relies on
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(Error::Config(format!("{} is required", ENV_API_KEY)));
        }
        if self.chunking.chunk_size == 0 {
            return Err(Error::Config("chunking.chunk_size must be positive".into()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.retrieval.k == 0 {
            return Err(Error::Config("retrieval.k must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.retrieval.lambda_mult) {
            return Err(Error::Config("retrieval.lambda_mult must be within 0.0..=1.0".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config("retry.max_attempts must be at least 1".into()));
        }
        if self.processing.worker_threads == 0 {
            return Err(Error::Config("processing.worker_threads must be positive".into()));
        }
        if self.embeddings.batch_size == 0 {
            return Err(Error::Config("embeddings.batch_size must be positive".into()));
        }
        if self.llm.max_concurrent_requests == 0 {
            return Err(Error::Config("llm.max_concurrent_requests must be positive".into()));
        }
        Ok(())
    }
}
