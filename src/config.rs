use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::services::call_policy::CallPolicy;

/// Application configuration loaded from environment variables
#[derive(Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Wit.ai bearer token used for entity extraction
    pub wit_api_token: String,

    /// Wit.ai base URL
    #[serde(default = "default_wit_api_url")]
    pub wit_api_url: String,

    /// Wit.ai API version date, sent as the `v` query parameter
    #[serde(default = "default_wit_api_version")]
    pub wit_api_version: String,

    /// Executable that turns text into an embedding
    #[serde(default = "default_embed_command")]
    pub embed_command: String,

    /// Extra arguments placed before the text (comma separated in the environment)
    #[serde(default)]
    pub embed_args: Vec<String>,

    /// Pinecone API key
    pub pinecone_api_key: String,

    /// Name of the index that must exist at startup
    #[serde(default = "default_pinecone_index_name")]
    pub pinecone_index_name: String,

    /// Data-plane host. Falls back to the host reported by describe-index.
    #[serde(default)]
    pub pinecone_index_host: Option<String>,

    /// Pinecone control-plane base URL
    #[serde(default = "default_pinecone_control_url")]
    pub pinecone_control_url: String,

    #[serde(default)]
    pub pinecone_namespace: String,

    /// OpenRouter API key
    pub openrouter_api_key: String,

    /// OpenRouter base URL
    #[serde(default = "default_openrouter_api_url")]
    pub openrouter_api_url: String,

    #[serde(default = "default_completion_model")]
    pub completion_model: String,

    /// Sent as the `HTTP-Referer` attribution header
    #[serde(default = "default_completion_referer")]
    pub completion_referer: String,

    /// Sent as the `X-Title` attribution header
    #[serde(default = "default_completion_title")]
    pub completion_title: String,

    /// Timeout for the generative completion call
    #[serde(default = "default_completion_timeout_secs")]
    pub completion_timeout_secs: u64,

    /// Timeout for extraction, embedding and search calls. Unset means no timeout.
    #[serde(default)]
    pub provider_timeout_secs: Option<u64>,

    /// Retries per external call. Zero keeps every stage single-shot.
    #[serde(default)]
    pub provider_max_retries: u32,

    #[serde(default = "default_provider_retry_backoff_ms")]
    pub provider_retry_backoff_ms: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_wit_api_url() -> String {
    "https://api.wit.ai".to_string()
}

fn default_wit_api_version() -> String {
    "20250206".to_string()
}

fn default_embed_command() -> String {
    "./handler/embed.exe".to_string()
}

fn default_pinecone_index_name() -> String {
    "movie-search".to_string()
}

fn default_pinecone_control_url() -> String {
    "https://api.pinecone.io".to_string()
}

fn default_openrouter_api_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_completion_model() -> String {
    "nvidia/llama-3.1-nemotron-70b-instruct:free".to_string()
}

fn default_completion_referer() -> String {
    "https://localhost:8080".to_string()
}

fn default_completion_title() -> String {
    "Movie Recommendations".to_string()
}

fn default_completion_timeout_secs() -> u64 {
    120
}

fn default_provider_retry_backoff_ms() -> u64 {
    250
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Address the HTTP server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Call policy shared by extraction, embedding and search
    pub fn provider_policy(&self) -> CallPolicy {
        CallPolicy {
            timeout: self.provider_timeout_secs.map(Duration::from_secs),
            max_retries: self.provider_max_retries,
            backoff: Duration::from_millis(self.provider_retry_backoff_ms),
        }
    }

    /// Call policy for the generative completion
    pub fn completion_policy(&self) -> CallPolicy {
        CallPolicy {
            timeout: Some(Duration::from_secs(self.completion_timeout_secs)),
            ..self.provider_policy()
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("wit_api_token", &"<redacted>")
            .field("wit_api_url", &self.wit_api_url)
            .field("wit_api_version", &self.wit_api_version)
            .field("embed_command", &self.embed_command)
            .field("embed_args", &self.embed_args)
            .field("pinecone_api_key", &"<redacted>")
            .field("pinecone_index_name", &self.pinecone_index_name)
            .field("pinecone_index_host", &self.pinecone_index_host)
            .field("pinecone_control_url", &self.pinecone_control_url)
            .field("pinecone_namespace", &self.pinecone_namespace)
            .field("openrouter_api_key", &"<redacted>")
            .field("openrouter_api_url", &self.openrouter_api_url)
            .field("completion_model", &self.completion_model)
            .field("completion_timeout_secs", &self.completion_timeout_secs)
            .field("provider_timeout_secs", &self.provider_timeout_secs)
            .field("provider_max_retries", &self.provider_max_retries)
            .finish_non_exhaustive()
    }
}
