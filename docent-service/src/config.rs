use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ServiceError, ServiceResult};

/// Environment variable prefix, e.g. `DOCENT__OLLAMA__BASE_URL`
const ENV_PREFIX: &str = "DOCENT";

/// Complete service configuration, loaded once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_server")]
    pub server: ServerConfig,

    #[serde(default = "default_storage")]
    pub storage: StorageConfig,

    #[serde(default = "default_ollama")]
    pub ollama: OllamaConfig,

    #[serde(default = "default_retrieval")]
    pub retrieval: RetrievalConfig,

    #[serde(default = "default_auth")]
    pub auth: AuthConfig,

    #[serde(default = "default_limits")]
    pub limits: LimitsConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("docent.db")
    }
}

/// Ollama model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_url")]
    pub base_url: String,

    /// Generative model used to answer questions
    #[serde(default = "default_model")]
    pub model: String,

    /// Model used to embed document chunks and questions
    #[serde(default = "default_model")]
    pub embedding_model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl OllamaConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Retrieval configuration for the per-request vector index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Chunk size in words
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in words
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Number of chunks handed to the model as context
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Lifetime of an issued bearer token in seconds
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,

    /// Run expired-session cleanup every N seconds
    #[serde(default = "default_session_cleanup_interval_secs")]
    pub session_cleanup_interval_secs: u64,
}

impl AuthConfig {
    /// Token lifetime, or `None` if it does not fit a `chrono::Duration`
    pub fn token_ttl(&self) -> Option<chrono::Duration> {
        i64::try_from(self.token_ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
    }

    /// Expiry for a token issued at `issued_at`
    pub fn token_expiry(
        &self,
        issued_at: chrono::DateTime<chrono::Utc>,
    ) -> ServiceResult<chrono::DateTime<chrono::Utc>> {
        self.token_ttl()
            .and_then(|ttl| issued_at.checked_add_signed(ttl))
            .ok_or_else(|| ServiceError::Config {
                message: format!(
                    "auth.token_ttl_secs ({}) is out of range",
                    self.token_ttl_secs
                ),
            })
    }

    pub fn session_cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.session_cleanup_interval_secs)
    }
}

/// Size limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_document_size")]
    pub max_document_size_bytes: u64,

    #[serde(default = "default_max_title_length")]
    pub max_title_length: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            storage: default_storage(),
            ollama: default_ollama(),
            retrieval: default_retrieval(),
            auth: default_auth(),
            limits: default_limits(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `config.toml` (optional) and `DOCENT__*` env vars
    pub fn load() -> ServiceResult<Self> {
        Self::from_builder(
            Config::builder()
                .add_source(File::with_name("config").required(false))
                .add_source(
                    Environment::with_prefix(ENV_PREFIX)
                        .prefix_separator("__")
                        .separator("__")
                        .try_parsing(true),
                ),
        )
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> ServiceResult<Self> {
        let config: Self = builder
            .build()
            .map_err(|e| ServiceError::Config {
                message: format!("Failed to build config: {}", e),
            })?
            .try_deserialize()
            .map_err(|e| ServiceError::Config {
                message: format!("Failed to deserialize config: {}", e),
            })?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ServiceResult<()> {
        let retrieval = &self.retrieval;
        if retrieval.chunk_size == 0 {
            return Err(ServiceError::Config {
                message: "retrieval.chunk_size must be greater than zero".to_string(),
            });
        }
        if retrieval.chunk_overlap >= retrieval.chunk_size {
            return Err(ServiceError::Config {
                message: format!(
                    "retrieval.chunk_overlap ({}) must be smaller than retrieval.chunk_size ({})",
                    retrieval.chunk_overlap, retrieval.chunk_size
                ),
            });
        }
        if retrieval.top_k == 0 {
            return Err(ServiceError::Config {
                message: "retrieval.top_k must be greater than zero".to_string(),
            });
        }

        let auth = &self.auth;
        if auth.token_ttl_secs == 0 {
            return Err(ServiceError::Config {
                message: "auth.token_ttl_secs must be greater than zero".to_string(),
            });
        }
        auth.token_expiry(chrono::Utc::now())?;
        if auth.session_cleanup_interval_secs == 0 {
            return Err(ServiceError::Config {
                message: "auth.session_cleanup_interval_secs must be greater than zero"
                    .to_string(),
            });
        }
        Ok(())
    }
}

// ==================== Default Value Functions ====================

fn default_server() -> ServerConfig {
    ServerConfig {
        host: default_host(),
        port: default_port(),
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_storage() -> StorageConfig {
    StorageConfig {
        data_dir: default_data_dir(),
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_ollama() -> OllamaConfig {
    OllamaConfig {
        base_url: default_ollama_url(),
        model: default_model(),
        embedding_model: default_model(),
        temperature: default_temperature(),
        request_timeout_secs: default_request_timeout_secs(),
    }
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "mistral".to_string()
}

fn default_temperature() -> f32 {
    0.0
}

fn default_request_timeout_secs() -> u64 {
    300
}

fn default_retrieval() -> RetrievalConfig {
    RetrievalConfig {
        chunk_size: default_chunk_size(),
        chunk_overlap: default_chunk_overlap(),
        top_k: default_top_k(),
    }
}

fn default_chunk_size() -> usize {
    512
}

fn default_chunk_overlap() -> usize {
    64
}

fn default_top_k() -> usize {
    4
}

fn default_auth() -> AuthConfig {
    AuthConfig {
        token_ttl_secs: default_token_ttl_secs(),
        session_cleanup_interval_secs: default_session_cleanup_interval_secs(),
    }
}

fn default_token_ttl_secs() -> u64 {
    86400 // 24 hours
}

fn default_session_cleanup_interval_secs() -> u64 {
    3600
}

fn default_limits() -> LimitsConfig {
    LimitsConfig {
        max_document_size_bytes: default_max_document_size(),
        max_title_length: default_max_title_length(),
    }
}

fn default_max_document_size() -> u64 {
    10 * 1024 * 1024 // 10 MiB
}

fn default_max_title_length() -> usize {
    255
}
