//! Configuration types.
//!
//! Everything is read from the environment once at startup. Unset values
//! fall back to the defaults below; malformed values are a startup error.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Placeholder secret used when `JWT_SECRET` is unset.
pub const DEFAULT_JWT_SECRET: &str = "your-secret-key";

/// Default model for assistant completions.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo-1106";

/// Default OpenAI-compatible API root.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port the HTTP listener binds to.
    pub port: u16,
    /// Path of the libSQL database file.
    pub database_path: PathBuf,
    /// Directory for rolling log files. Console-only logging when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5001,
            database_path: PathBuf::from("./data/account-service.db"),
            log_dir: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            port: env_parse("PORT")?.unwrap_or(defaults.port),
            database_path: std::env::var("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            log_dir: std::env::var("ACCOUNT_SERVICE_LOG_DIR").ok().map(PathBuf::from),
        })
    }
}

/// JWT signing configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: SecretString,
    pub token_ttl: Duration,
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set, falling back to the development secret");
            DEFAULT_JWT_SECRET.to_string()
        });
        let hours: u64 = env_parse("JWT_EXPIRY_HOURS")?.unwrap_or(24);

        Ok(Self {
            jwt_secret: SecretString::from(jwt_secret),
            token_ttl: Duration::from_secs(hours * 3600),
        })
    }
}

/// Assistant (LLM + tool loop) configuration.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// API key for the completion endpoint. The assistant answers 500 without it.
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    /// Tool-calling rounds before a forced final answer.
    pub max_iterations: usize,
    /// Output cap for rounds that offer tools.
    pub tool_max_tokens: u32,
    /// Output cap for the forced final answer and the spell checker.
    pub final_max_tokens: u32,
    /// Arrays longer than this are sent to the model as a preview.
    pub preview_limit: usize,
    pub request_timeout: Duration,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_iterations: 10,
            tool_max_tokens: 150,
            final_max_tokens: 200,
            preview_limit: 25,
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl AssistantConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty())
                .map(SecretString::from),
            base_url: std::env::var("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            model: std::env::var("AI_MODEL").unwrap_or(defaults.model),
            max_iterations: env_parse("AI_MAX_ITERATIONS")?.unwrap_or(defaults.max_iterations),
            tool_max_tokens: env_parse("AI_TOOL_MAX_TOKENS")?.unwrap_or(defaults.tool_max_tokens),
            final_max_tokens: env_parse("AI_FINAL_MAX_TOKENS")?.unwrap_or(defaults.final_max_tokens),
            preview_limit: env_parse("AI_PREVIEW_LIMIT")?.unwrap_or(defaults.preview_limit),
            request_timeout: env_parse("AI_REQUEST_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
        })
    }
}

/// Read and parse an environment variable. `Ok(None)` when unset.
fn env_parse<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let Ok(raw) = std::env::var(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{raw:?}: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assistant_defaults_match_loop_limits() {
        let config = AssistantConfig::default();
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.tool_max_tokens, 150);
        assert_eq!(config.final_max_tokens, 200);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn server_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 5001);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn env_parse_rejects_garbage() {
        // SAFETY: the variable name is unique to this test; nothing else reads it.
        unsafe { std::env::set_var("ACCOUNT_SERVICE_TEST_PARSE", "abc") };
        let err = env_parse::<u16>("ACCOUNT_SERVICE_TEST_PARSE").unwrap_err();
        match err {
            ConfigError::InvalidValue { key, message } => {
                assert_eq!(key, "ACCOUNT_SERVICE_TEST_PARSE");
                assert!(message.contains("abc"), "{message}");
            }
        }

        unsafe { std::env::set_var("ACCOUNT_SERVICE_TEST_PARSE", " 42 ") };
        assert_eq!(env_parse::<u16>("ACCOUNT_SERVICE_TEST_PARSE").unwrap(), Some(42));
        unsafe { std::env::remove_var("ACCOUNT_SERVICE_TEST_PARSE") };
    }

    #[test]
    fn env_parse_unset_is_none() {
        let value = env_parse::<u16>("ACCOUNT_SERVICE_TEST_UNSET_VALUE").unwrap();
        assert_eq!(value, None);
    }
}
