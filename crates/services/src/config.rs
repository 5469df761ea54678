use std::env;
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

const DEFAULT_DB_URL: &str = "sqlite://quiz.sqlite3?mode=rwc";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TARGET_ROUNDS: u32 = 10;
const DEFAULT_AUTO_ADVANCE_SECS: u64 = 3;

/// Runtime configuration, read from `QUIZ_*` environment variables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuizConfig {
    /// `None` means play offline against the built-in question bank.
    pub api_base_url: Option<Url>,
    pub request_timeout: Duration,
    pub target_rounds: u32,
    /// `None` disables auto-progression.
    pub auto_advance: Option<Duration>,
    pub prefetch: bool,
    pub db_url: String,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            target_rounds: DEFAULT_TARGET_ROUNDS,
            auto_advance: Some(Duration::from_secs(DEFAULT_AUTO_ADVANCE_SECS)),
            prefetch: false,
            db_url: DEFAULT_DB_URL.to_string(),
        }
    }
}

impl QuizConfig {
    /// # Errors
    ///
    /// Returns `ConfigError` naming the first variable with an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` naming the first variable with an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(raw) = get("QUIZ_API_BASE_URL") {
            config.api_base_url = Some(parse_base_url("QUIZ_API_BASE_URL", &raw)?);
        }
        if let Some(raw) = get("QUIZ_REQUEST_TIMEOUT_SECS") {
            let secs = parse_number::<u64>("QUIZ_REQUEST_TIMEOUT_SECS", &raw)?;
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    var: "QUIZ_REQUEST_TIMEOUT_SECS",
                    raw,
                });
            }
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = get("QUIZ_TARGET_ROUNDS") {
            let rounds = parse_number::<u32>("QUIZ_TARGET_ROUNDS", &raw)?;
            if rounds == 0 {
                return Err(ConfigError::InvalidValue {
                    var: "QUIZ_TARGET_ROUNDS",
                    raw,
                });
            }
            config.target_rounds = rounds;
        }
        if let Some(raw) = get("QUIZ_AUTO_ADVANCE_SECS") {
            let secs = parse_number::<u64>("QUIZ_AUTO_ADVANCE_SECS", &raw)?;
            config.auto_advance = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(raw) = get("QUIZ_PREFETCH") {
            config.prefetch = parse_flag("QUIZ_PREFETCH", &raw)?;
        }
        if let Some(raw) = get("QUIZ_DB_URL") {
            config.db_url = raw;
        }

        Ok(config)
    }
}

/// Parse an http(s) base URL.
///
/// # Errors
///
/// Returns `ConfigError` for malformed URLs or non-http schemes.
pub fn parse_base_url(var: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidUrl { var, source })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::UnsupportedScheme {
            var,
            scheme: other.to_string(),
        }),
    }
}

fn parse_number<T: std::str::FromStr>(var: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue {
        var,
        raw: raw.to_string(),
    })
}

fn parse_flag(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var,
            raw: raw.to_string(),
        }),
    }
}
