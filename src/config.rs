use std::env;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-preview-09-2025";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the docsum server.
#[derive(Debug, Clone)]
pub struct Config {
    /// API key for the Gemini service. Requests fail individually when absent.
    pub gemini_api_key: Option<String>,
    /// Base URL of the Gemini REST API, without the `/models/...` suffix.
    pub gemini_api_base: String,
    /// Model identifier used for both summaries and chat answers.
    pub gemini_model: String,
    /// Timeout applied to a single upstream request.
    pub gemini_timeout_secs: u64,
    /// Secret used to sign the session cookie.
    pub session_secret: Option<String>,
    /// Idle lifetime of a session before it is discarded.
    pub session_ttl_secs: u64,
    /// Maximum accepted upload size in bytes.
    pub max_upload_bytes: usize,
    /// Number of document characters forwarded to the model.
    pub max_prompt_chars: usize,
    /// Number of prior exchanges replayed into a chat prompt.
    pub chat_history_turns: usize,
    /// Address the HTTP server binds to.
    pub server_host: String,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            gemini_api_key: load_env_optional("GEMINI_API_KEY"),
            gemini_api_base: load_env_optional("GEMINI_API_BASE")
                .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string()),
            gemini_model: load_env_optional("GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_timeout_secs: load_parsed("GEMINI_TIMEOUT_SECS")?.unwrap_or(60),
            session_secret: load_env_optional("SESSION_SECRET"),
            session_ttl_secs: load_parsed("SESSION_TTL_SECS")?.unwrap_or(3600),
            max_upload_bytes: load_parsed("MAX_UPLOAD_BYTES")?.unwrap_or(16 * 1024 * 1024),
            max_prompt_chars: load_parsed("MAX_PROMPT_CHARS")?.unwrap_or(100_000),
            chat_history_turns: load_parsed("CHAT_HISTORY_TURNS")?.unwrap_or(10),
            server_host: load_env_optional("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".into()),
            server_port: load_parsed("SERVER_PORT")?,
        })
    }

    /// Configuration suitable for tests: a dummy API key, a fixed secret, and a 1 MiB upload limit.
    pub fn for_tests(gemini_api_base: impl Into<String>) -> Self {
        Self {
            gemini_api_key: Some("test-key".into()),
            gemini_api_base: gemini_api_base.into(),
            gemini_model: "gemini-test".into(),
            gemini_timeout_secs: 5,
            session_secret: Some("test-secret-test-secret-test-secret".into()),
            session_ttl_secs: 3600,
            max_upload_bytes: 1024 * 1024,
            max_prompt_chars: 100_000,
            chat_history_turns: 10,
            server_host: "127.0.0.1".into(),
            server_port: None,
        }
    }

    /// Full URL of the `generateContent` endpoint for the configured model.
    pub fn generate_content_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.gemini_api_base.trim_end_matches('/'),
            self.gemini_model
        )
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_parsed<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Load configuration from the environment and install it in the global cache.
///
/// Later calls return the configuration installed by the first successful call.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    if let Some(config) = CONFIG.get() {
        return Ok(config);
    }
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        model = %config.gemini_model,
        api_base = %config.gemini_api_base,
        api_key_present = config.gemini_api_key.is_some(),
        server_port = ?config.server_port,
        max_upload_bytes = config.max_upload_bytes,
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}
