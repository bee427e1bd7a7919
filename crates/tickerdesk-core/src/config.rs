//! Client configuration, loaded from defaults and environment variables.
//!
//! # Environment Variables
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `TICKERDESK_API_URL` | `http://localhost:8000` | Backend origin |
//! | `TICKERDESK_TIMEOUT_MS` | `30000` | Per-attempt timeout |
//! | `TICKERDESK_MAX_RETRIES` | `3` | Retries after the first attempt |
//! | `TICKERDESK_BASE_DELAY_MS` | `1000` | First backoff delay |
//! | `TICKERDESK_MAX_DELAY_MS` | `10000` | Backoff cap |
//! | `TICKERDESK_SWEEP_SECS` | `300` | Periodic cache sweep interval |
//! | `TICKERDESK_TOKEN` | unset | Static bearer token |

use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::str::FromStr;
use std::time::Duration;

use crate::cache::CacheCategory;
use crate::error::ConfigError;
use crate::retry::RetryPolicy;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_API_PREFIX: &str = "/api/v1";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_prefix: String,
    pub timeout_ms: u64,
    pub user_agent: String,
    pub retry: RetryPolicy,
    pub sweep_interval: Duration,
    pub ttl_overrides: BTreeMap<CacheCategory, Duration>,
    pub token: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            user_agent: concat!("tickerdesk/", env!("CARGO_PKG_VERSION")).to_string(),
            retry: RetryPolicy::default(),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            ttl_overrides: BTreeMap::new(),
            token: None,
        }
    }
}

impl Debug for ClientConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_prefix", &self.api_prefix)
            .field("timeout_ms", &self.timeout_ms)
            .field("user_agent", &self.user_agent)
            .field("retry", &self.retry)
            .field("sweep_interval", &self.sweep_interval)
            .field("ttl_overrides", &self.ttl_overrides)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl ClientConfig {
    /// Defaults overlaid with `TICKERDESK_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("TICKERDESK_API_URL") {
            config = config.with_base_url(url)?;
        }
        if let Some(timeout_ms) = parse_var::<u64, _>(&lookup, "TICKERDESK_TIMEOUT_MS")? {
            config.timeout_ms = timeout_ms;
        }
        if let Some(max_retries) = parse_var::<u32, _>(&lookup, "TICKERDESK_MAX_RETRIES")? {
            config.retry.max_retries = max_retries;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "TICKERDESK_BASE_DELAY_MS")? {
            config.retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "TICKERDESK_MAX_DELAY_MS")? {
            config.retry.max_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "TICKERDESK_SWEEP_SECS")? {
            config.sweep_interval = Duration::from_secs(secs.max(1));
        }
        config.token = lookup("TICKERDESK_TOKEN").filter(|token| !token.trim().is_empty());

        config.validate()?;
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Result<Self, ConfigError> {
        let base_url = base_url.into();
        let trimmed = base_url.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl { value: base_url });
        }
        self.base_url = trimmed.to_string();
        Ok(self)
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_ttl(mut self, category: CacheCategory, ttl: Duration) -> Self {
        self.ttl_overrides.insert(category, ttl);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        self.retry.validate()
    }

    /// Absolute URL for an endpoint path such as `/stock/news/AAPL`.
    pub fn url_for(&self, path_and_query: &str) -> String {
        format!("{}{}{}", self.base_url, self.api_prefix, path_and_query)
    }
}

fn parse_var<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|error| ConfigError::InvalidEnv {
                name,
                value: raw.clone(),
                reason: error.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = ClientConfig::from_lookup(lookup(&[])).expect("config");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.sweep_interval, Duration::from_secs(300));
        assert!(config.token.is_none());
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("TICKERDESK_API_URL", "https://api.example.test/"),
            ("TICKERDESK_TIMEOUT_MS", "5000"),
            ("TICKERDESK_MAX_RETRIES", "1"),
            ("TICKERDESK_BASE_DELAY_MS", "250"),
            ("TICKERDESK_TOKEN", "tok"),
        ]))
        .expect("config");

        assert_eq!(config.base_url, "https://api.example.test");
        assert_eq!(config.timeout_ms, 5_000);
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.retry.base_delay, Duration::from_millis(250));
        assert_eq!(config.token.as_deref(), Some("tok"));
        assert_eq!(
            config.url_for("/stock/news/AAPL?limit=5"),
            "https://api.example.test/api/v1/stock/news/AAPL?limit=5"
        );
    }

    #[test]
    fn invalid_numbers_are_reported_with_variable_name() {
        let error = ClientConfig::from_lookup(lookup(&[("TICKERDESK_MAX_RETRIES", "lots")]))
            .expect_err("must fail");
        assert!(matches!(
            error,
            ConfigError::InvalidEnv { name: "TICKERDESK_MAX_RETRIES", .. }
        ));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let error = ClientConfig::from_lookup(lookup(&[("TICKERDESK_TIMEOUT_MS", "0")]))
            .expect_err("must fail");
        assert_eq!(error, ConfigError::ZeroTimeout);
        assert_eq!(
            ClientConfig::default().with_timeout_ms(0).validate(),
            Err(ConfigError::ZeroTimeout)
        );
    }

    #[test]
    fn rejects_base_url_without_scheme() {
        let error = ClientConfig::default()
            .with_base_url("localhost:8000")
            .expect_err("must fail");
        assert!(matches!(error, ConfigError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn debug_output_redacts_token() {
        let config = ClientConfig {
            token: Some(String::from("secret")),
            ..ClientConfig::default()
        };
        assert!(!format!("{config:?}").contains("secret"));
    }
}
