//! Streaming Configuration Settings
//!
//! Configuration types for the streaming engine, loaded from environment
//! variables.

use std::time::Duration;

use crate::application::ports::{ConnectOptions, Token, TokenError};

/// Default streaming endpoint.
pub const STREAMING_URL: &str = "wss://api-invest.tinkoff.ru/openapi/md/v1/md-openapi/ws";

/// Complete streaming engine configuration.
///
/// The timeout defaults follow the upstream API guidance: a short heartbeat
/// keeps intermediaries from dropping the idle connection, and the receive
/// timeout bounds how long a dead connection goes unnoticed.
#[derive(Debug, Clone)]
pub struct StreamingConfig {
    /// WebSocket endpoint.
    pub url: String,
    /// Bearer token presented at connect time.
    pub token: Token,
    /// Fixed delay between reconnect attempts.
    pub reconnect_timeout: Duration,
    /// Maximum silence between inbound frames; `None` waits forever.
    pub receive_timeout: Option<Duration>,
    /// Ping interval; `None` disables pings.
    pub heartbeat: Option<Duration>,
    /// How long to wait for the close handshake; zero skips the wait.
    pub close_timeout: Duration,
}

impl StreamingConfig {
    /// Create a configuration with default endpoint and timeouts.
    #[must_use]
    pub fn new(token: Token) -> Self {
        Self {
            url: STREAMING_URL.to_string(),
            token,
            reconnect_timeout: Duration::from_secs(3),
            receive_timeout: Some(Duration::from_secs(5)),
            heartbeat: Some(Duration::from_secs(3)),
            close_timeout: Duration::ZERO,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// `INVEST_TOKEN` is required and must be non-empty. Optional overrides:
    /// `INVEST_STREAM_URL`, `INVEST_RECONNECT_TIMEOUT_MS`,
    /// `INVEST_RECEIVE_TIMEOUT_MS` (0 disables), `INVEST_HEARTBEAT_MS`
    /// (0 disables), `INVEST_CLOSE_TIMEOUT_MS`.
    ///
    /// # Errors
    ///
    /// Returns an error when `INVEST_TOKEN` is missing or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let token = std::env::var("INVEST_TOKEN")
            .map_err(|_| ConfigError::MissingEnvVar("INVEST_TOKEN".to_string()))?;
        let token = Token::new(token)
            .map_err(|TokenError::Empty| ConfigError::EmptyValue("INVEST_TOKEN".to_string()))?;

        let mut config = Self::new(token);

        if let Ok(url) = std::env::var("INVEST_STREAM_URL") {
            config.url = url;
        }
        config.reconnect_timeout =
            parse_env_duration_millis("INVEST_RECONNECT_TIMEOUT_MS", config.reconnect_timeout);
        config.receive_timeout =
            parse_env_optional_millis("INVEST_RECEIVE_TIMEOUT_MS", config.receive_timeout);
        config.heartbeat = parse_env_optional_millis("INVEST_HEARTBEAT_MS", config.heartbeat);
        config.close_timeout =
            parse_env_duration_millis("INVEST_CLOSE_TIMEOUT_MS", config.close_timeout);

        Ok(config)
    }

    /// Connect-time options derived from this configuration.
    #[must_use]
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            url: self.url.clone(),
            token: self.token.clone(),
            heartbeat: self.heartbeat,
            receive_timeout: self.receive_timeout,
            close_timeout: self.close_timeout,
        }
    }
}

/// Instruments watched by the `invest-stream` binary.
#[derive(Debug, Clone)]
pub struct WatchSettings {
    /// Instruments to subscribe to at startup.
    pub figis: Vec<String>,
    /// Candle interval for candle subscriptions.
    pub candle_interval: String,
    /// Depth for order book subscriptions.
    pub orderbook_depth: u32,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            figis: Vec::new(),
            candle_interval: "1min".to_string(),
            orderbook_depth: 2,
        }
    }
}

impl WatchSettings {
    /// Create watch settings from environment variables.
    ///
    /// `INVEST_WATCH_FIGIS` is a comma-separated instrument list; optional
    /// `INVEST_CANDLE_INTERVAL` and `INVEST_ORDERBOOK_DEPTH` override the
    /// subscription parameters.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let figis = std::env::var("INVEST_WATCH_FIGIS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or(defaults.figis);

        let candle_interval =
            std::env::var("INVEST_CANDLE_INTERVAL").unwrap_or(defaults.candle_interval);

        let orderbook_depth = std::env::var("INVEST_ORDERBOOK_DEPTH")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.orderbook_depth);

        Self {
            figis,
            candle_interval,
            orderbook_depth,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
}

fn parse_env_duration_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}

fn parse_env_optional_millis(key: &str, default: Option<Duration>) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, |millis| {
            (millis > 0).then(|| Duration::from_millis(millis))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_token() -> Token {
        Token::new("t.test").unwrap()
    }

    #[test]
    fn default_timeouts() {
        let config = StreamingConfig::new(test_token());
        assert_eq!(config.url, STREAMING_URL);
        assert_eq!(config.reconnect_timeout, Duration::from_secs(3));
        assert_eq!(config.receive_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.heartbeat, Some(Duration::from_secs(3)));
        assert_eq!(config.close_timeout, Duration::ZERO);
    }

    #[test]
    fn connect_options_pass_through() {
        let config = StreamingConfig::new(test_token());
        let options = config.connect_options();
        assert_eq!(options.url, config.url);
        assert_eq!(options.heartbeat, config.heartbeat);
        assert_eq!(options.receive_timeout, config.receive_timeout);
        assert_eq!(options.close_timeout, config.close_timeout);
    }

    #[test]
    fn config_debug_hides_token() {
        let config = StreamingConfig::new(Token::new("t.supersecret").unwrap());
        let debug = format!("{config:?}");
        assert!(!debug.contains("supersecret"));
    }

    #[test]
    fn watch_settings_defaults() {
        let settings = WatchSettings::default();
        assert!(settings.figis.is_empty());
        assert_eq!(settings.candle_interval, "1min");
        assert_eq!(settings.orderbook_depth, 2);
    }
}
