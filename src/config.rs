use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;
use reqwest::Url;

use crate::analyzer::StopWordLanguage;
use crate::context::FailedSourcePolicy;
use crate::error::ConfigError;
use crate::validator::DEFAULT_ATTRIBUTION;

pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://yandex.ru/search/xml";
pub const DEFAULT_LLM_ENDPOINT: &str =
    "https://llm.api.cloud.yandex.net/foundationModels/v1/completion";

/// Startup configuration. Read once, then shared read-only by every request.
#[derive(Debug, Clone)]
pub struct Config {
    pub folder_id: String,
    pub llm_api_key: String,
    pub search_api_key: String,
    pub search_endpoint: Url,
    pub llm_endpoint: Url,
    pub llm_model: String,
    pub llm_max_tokens: u32,
    pub search_results: usize,
    pub fetch_timeout: Duration,
    pub fetch_max_chars: usize,
    pub search_timeout: Duration,
    pub llm_timeout: Duration,
    pub request_timeout: Duration,
    pub stop_words_language: StopWordLanguage,
    pub failed_source_policy: FailedSourcePolicy,
    pub attribution: String,
    pub system_prompt_path: Option<PathBuf>,
    pub strict_option_bounds: bool,
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get_env = |key: &'static str| -> Result<String, ConfigError> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let get_env_or_default =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let search_results: usize =
            parse("SEARCH_RESULTS", &get_env_or_default("SEARCH_RESULTS", "3"))?;
        if search_results == 0 {
            return Err(ConfigError::Invalid {
                key: "SEARCH_RESULTS",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Config {
            folder_id: get_env("YANDEX_FOLDER_ID")?,
            llm_api_key: get_env("YANDEX_API_KEY")?,
            search_api_key: get_env("YANDEX_SEARCH_API_KEY")?,
            search_endpoint: parse(
                "SEARCH_ENDPOINT",
                &get_env_or_default("SEARCH_ENDPOINT", DEFAULT_SEARCH_ENDPOINT),
            )?,
            llm_endpoint: parse(
                "LLM_ENDPOINT",
                &get_env_or_default("LLM_ENDPOINT", DEFAULT_LLM_ENDPOINT),
            )?,
            llm_model: get_env_or_default("LLM_MODEL", "yandexgpt/latest"),
            llm_max_tokens: parse("LLM_MAX_TOKENS", &get_env_or_default("LLM_MAX_TOKENS", "2000"))?,
            search_results,
            fetch_timeout: secs("FETCH_TIMEOUT_SECS", &get_env_or_default("FETCH_TIMEOUT_SECS", "5"))?,
            fetch_max_chars: parse(
                "FETCH_MAX_CHARS",
                &get_env_or_default("FETCH_MAX_CHARS", "10000"),
            )?,
            search_timeout: secs(
                "SEARCH_TIMEOUT_SECS",
                &get_env_or_default("SEARCH_TIMEOUT_SECS", "10"),
            )?,
            llm_timeout: secs("LLM_TIMEOUT_SECS", &get_env_or_default("LLM_TIMEOUT_SECS", "60"))?,
            request_timeout: secs(
                "REQUEST_TIMEOUT_SECS",
                &get_env_or_default("REQUEST_TIMEOUT_SECS", "120"),
            )?,
            stop_words_language: get_env_or_default("STOP_WORDS_LANGUAGE", "russian").parse()?,
            failed_source_policy: get_env_or_default("FAILED_SOURCE_POLICY", "placeholder")
                .parse()?,
            attribution: get_env_or_default("ATTRIBUTION", DEFAULT_ATTRIBUTION),
            system_prompt_path: lookup("SYSTEM_PROMPT_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            strict_option_bounds: parse_bool(
                "STRICT_OPTION_BOUNDS",
                &get_env_or_default("STRICT_OPTION_BOUNDS", "false"),
            )?,
        })
    }
}

fn parse<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn secs(key: &'static str, value: &str) -> Result<Duration, ConfigError> {
    parse::<u64>(key, value).map(Duration::from_secs)
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}
