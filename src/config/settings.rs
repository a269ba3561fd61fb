// ============================================
// MANUS BACKEND - Settings
// Environment-driven configuration
// ============================================

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

const MASK: &str = "********";

lazy_static! {
    // scheme://user:password@ or scheme://:password@
    static ref URL_CREDENTIALS: Regex =
        Regex::new(r"(?i)^([a-z][a-z0-9+.\-]*://)[^\s/@]*:[^\s@]*@").unwrap();
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("API key is required for '{provider}' provider.")]
    MissingApiKey { provider: String },

    #[error("Gemini API key is required for 'gemini' provider.")]
    MissingGeminiApiKey,

    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    #[error("{accessor} is only available when model_provider is 'gemini' (current: '{provider}')")]
    ProviderMismatch {
        accessor: &'static str,
        provider: String,
    },

    #[error("Failed to read env file: {0}")]
    EnvFile(#[from] dotenvy::Error),
}

/// Providers the factory knows by name. Anything else is an unrecognized
/// provider and gets the default adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelProvider {
    Gemini,
    OpenAi,
    DeepSeek,
}

impl ModelProvider {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "gemini" => Some(Self::Gemini),
            "openai" => Some(Self::OpenAi),
            "deepseek" => Some(Self::DeepSeek),
            _ => None,
        }
    }

}

#[derive(Clone, Serialize)]
pub struct Settings {
    // Model provider
    pub api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub api_base: String,
    pub model_provider: String,

    // Model
    pub model_name: String,
    pub temperature: f64,
    pub max_tokens: u32,

    // MongoDB
    pub mongodb_uri: String,
    pub mongodb_database: String,
    pub mongodb_username: Option<String>,
    pub mongodb_password: Option<String>,

    // Redis
    pub redis_url: Option<String>,

    // Sandbox
    pub sandbox_address: Option<String>,
    pub sandbox_image: Option<String>,
    pub sandbox_name_prefix: Option<String>,
    pub sandbox_ttl_minutes: Option<u32>,
    pub sandbox_network: Option<String>,
    pub sandbox_chrome_args: Option<String>,
    pub sandbox_https_proxy: Option<String>,
    pub sandbox_http_proxy: Option<String>,
    pub sandbox_no_proxy: Option<String>,

    // Search engine
    pub search_provider: Option<String>,
    pub google_search_api_key: Option<String>,
    pub google_search_engine_id: Option<String>,

    // MCP
    pub mcp_config_path: String,

    pub log_level: String,
}

fn default_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_model_provider() -> String {
    "gemini".to_string()
}
fn default_model_name() -> String {
    "gemini-2.0-flash".to_string()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_max_tokens() -> u32 {
    2000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            gemini_api_key: None,
            api_base: default_api_base(),
            model_provider: default_model_provider(),
            model_name: default_model_name(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            mongodb_uri: "mongodb://mongodb:27017".to_string(),
            mongodb_database: "manus".to_string(),
            mongodb_username: None,
            mongodb_password: None,
            redis_url: None,
            sandbox_address: None,
            sandbox_image: None,
            sandbox_name_prefix: None,
            sandbox_ttl_minutes: Some(30),
            sandbox_network: None,
            sandbox_chrome_args: Some(String::new()),
            sandbox_https_proxy: None,
            sandbox_http_proxy: None,
            sandbox_no_proxy: None,
            search_provider: None,
            google_search_api_key: None,
            google_search_engine_id: None,
            mcp_config_path: "/etc/mcp.json".to_string(),
            log_level: "INFO".to_string(),
        }
    }
}

/// Wraps a key lookup so every field is read by its upper-case env name,
/// falling back to the lower-case spelling.
struct EnvSource<F> {
    lookup: F,
}

impl<F> EnvSource<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn raw(&self, field: &str) -> Option<String> {
        (self.lookup)(&field.to_ascii_uppercase()).or_else(|| (self.lookup)(field))
    }

    fn string(&self, field: &str, default: String) -> String {
        self.raw(field).unwrap_or(default)
    }

    fn optional(&self, field: &str, default: Option<String>) -> Option<String> {
        self.raw(field).or(default)
    }

    fn parse<T: FromStr>(&self, field: &str, default: T) -> Result<T, ConfigError> {
        match self.raw(field) {
            Some(value) => parse_value(field, value),
            None => Ok(default),
        }
    }

    fn parse_optional<T: FromStr>(
        &self,
        field: &str,
        default: Option<T>,
    ) -> Result<Option<T>, ConfigError> {
        match self.raw(field) {
            Some(value) if value.trim().is_empty() => Ok(None),
            Some(value) => parse_value(field, value).map(Some),
            None => Ok(default),
        }
    }
}

impl Settings {
    /// Load `.env` (if any) and build settings from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from the given dotenv file. Process environment values
    /// take precedence over the file.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut file_vars = HashMap::new();
        for item in dotenvy::from_path_iter(path)? {
            let (key, value) = item?;
            file_vars.insert(key, value);
        }
        Self::from_lookup(|key| {
            std::env::var(key)
                .ok()
                .or_else(|| file_vars.get(key).cloned())
        })
    }

    /// Build and validate settings from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvSource { lookup };
        let defaults = Settings::default();

        let settings = Self {
            api_key: env.optional("api_key", defaults.api_key),
            gemini_api_key: env.optional("gemini_api_key", defaults.gemini_api_key),
            api_base: env.string("api_base", defaults.api_base),
            model_provider: env.string("model_provider", defaults.model_provider),
            model_name: env.string("model_name", defaults.model_name),
            temperature: env.parse("temperature", defaults.temperature)?,
            max_tokens: env.parse("max_tokens", defaults.max_tokens)?,
            mongodb_uri: env.string("mongodb_uri", defaults.mongodb_uri),
            mongodb_database: env.string("mongodb_database", defaults.mongodb_database),
            mongodb_username: env.optional("mongodb_username", defaults.mongodb_username),
            mongodb_password: env.optional("mongodb_password", defaults.mongodb_password),
            redis_url: env.optional("redis_url", defaults.redis_url),
            sandbox_address: env.optional("sandbox_address", defaults.sandbox_address),
            sandbox_image: env.optional("sandbox_image", defaults.sandbox_image),
            sandbox_name_prefix: env.optional("sandbox_name_prefix", defaults.sandbox_name_prefix),
            sandbox_ttl_minutes: env
                .parse_optional("sandbox_ttl_minutes", defaults.sandbox_ttl_minutes)?,
            sandbox_network: env.optional("sandbox_network", defaults.sandbox_network),
            sandbox_chrome_args: env.optional("sandbox_chrome_args", defaults.sandbox_chrome_args),
            sandbox_https_proxy: env.optional("sandbox_https_proxy", defaults.sandbox_https_proxy),
            sandbox_http_proxy: env.optional("sandbox_http_proxy", defaults.sandbox_http_proxy),
            sandbox_no_proxy: env.optional("sandbox_no_proxy", defaults.sandbox_no_proxy),
            search_provider: env.optional("search_provider", defaults.search_provider),
            google_search_api_key: env
                .optional("google_search_api_key", defaults.google_search_api_key),
            google_search_engine_id: env
                .optional("google_search_engine_id", defaults.google_search_engine_id),
            mcp_config_path: env.string("mcp_config_path", defaults.mcp_config_path),
            log_level: env.string("log_level", defaults.log_level),
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Cross-field checks: the selected provider must have its credential.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.provider() {
            Some(ModelProvider::OpenAi | ModelProvider::DeepSeek) if is_blank(&self.api_key) => {
                Err(ConfigError::MissingApiKey {
                    provider: self.model_provider.clone(),
                })
            }
            Some(ModelProvider::Gemini) if is_blank(&self.gemini_api_key) => {
                Err(ConfigError::MissingGeminiApiKey)
            }
            _ => Ok(()),
        }
    }

    pub fn provider(&self) -> Option<ModelProvider> {
        ModelProvider::from_name(&self.model_provider)
    }

    /// Full Gemini `generateContent` endpoint for the configured model.
    /// Only valid while `model_provider` is `gemini`.
    pub fn gemini_generate_content_url(&self) -> Result<String, ConfigError> {
        if self.provider() != Some(ModelProvider::Gemini) {
            return Err(ConfigError::ProviderMismatch {
                accessor: "gemini_generate_content_url",
                provider: self.model_provider.clone(),
            });
        }
        let base = self.api_base.trim_end_matches('/');
        Ok(format!("{}/models/{}:generateContent", base, self.model_name))
    }

    /// Copy with every credential replaced, for display.
    pub fn masked(&self) -> Self {
        let mask = |value: &Option<String>| value.as_ref().map(|_| MASK.to_string());
        let mask_url = |value: &Option<String>| {
            value
                .as_deref()
                .map(|url| mask_url_credentials(url).into_owned())
        };
        Self {
            api_key: mask(&self.api_key),
            gemini_api_key: mask(&self.gemini_api_key),
            mongodb_password: mask(&self.mongodb_password),
            google_search_api_key: mask(&self.google_search_api_key),
            mongodb_uri: mask_url_credentials(&self.mongodb_uri).into_owned(),
            redis_url: mask_url(&self.redis_url),
            sandbox_https_proxy: mask_url(&self.sandbox_https_proxy),
            sandbox_http_proxy: mask_url(&self.sandbox_http_proxy),
            ..self.clone()
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked = self.masked();
        f.debug_struct("Settings")
            .field("api_key", &masked.api_key)
            .field("gemini_api_key", &masked.gemini_api_key)
            .field("api_base", &self.api_base)
            .field("model_provider", &self.model_provider)
            .field("model_name", &self.model_name)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("redis_url", &masked.redis_url)
            .field("mongodb_uri", &masked.mongodb_uri)
            .field("mongodb_database", &self.mongodb_database)
            .field("mcp_config_path", &self.mcp_config_path)
            .field("log_level", &self.log_level)
            .finish_non_exhaustive()
    }
}

fn parse_value<T: FromStr>(field: &str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: field.to_ascii_uppercase(),
        value,
    })
}

/// Replace the userinfo of a connection URL, keeping scheme and host.
pub fn mask_url_credentials(url: &str) -> Cow<'_, str> {
    URL_CREDENTIALS.replace(url, format!("${{1}}{MASK}@"))
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}
