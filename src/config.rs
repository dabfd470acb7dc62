use std::time::Duration;

use clap::Parser;

use crate::constants::{
    DEFAULT_MODEL, DEFAULT_PROVIDER_URL, DEFAULT_STREAM_TIMEOUT, DEFAULT_TEMPERATURE,
    ERROR_MISSING_API_KEY, MINIMAX_CHAT_COMPLETION,
};
use crate::error::RelayError;

#[derive(Parser, Debug, Clone)]
#[command(name = "minimax-sse-relay")]
#[command(about = "streaming relay turning minimax chat completions into server-sent events")]
pub struct Config {
    #[arg(long, default_value = "0.0.0.0:3001", help = "server listen address")]
    pub listen: String,

    #[arg(
        long,
        env = "MINIMAX_API_BASE",
        default_value = DEFAULT_PROVIDER_URL,
        help = "minimax api base url"
    )]
    pub provider_url: String,

    #[arg(
        long,
        env = "MINIMAX_API_KEY",
        hide_env_values = true,
        help = "minimax api key (bearer credential)"
    )]
    pub api_key: Option<String>,

    #[arg(
        long,
        env = "MINIMAX_MODEL",
        default_value = DEFAULT_MODEL,
        help = "model identifier sent upstream"
    )]
    pub model: String,

    #[arg(long, default_value_t = DEFAULT_TEMPERATURE, help = "sampling temperature")]
    pub temperature: f64,

    #[arg(
        long,
        default_value = DEFAULT_STREAM_TIMEOUT,
        value_parser = humantime::parse_duration,
        help = "hard timeout for a streaming session (e.g. 60s, 2m)"
    )]
    pub stream_timeout: Duration,

    #[arg(
        long,
        default_value = "info",
        help = "log level (off, error, warn, info, debug, trace)"
    )]
    pub log_level: String,
}

/// Everything a relay session needs to reach the provider.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub endpoint: String,
    pub credential: String,
    pub model_id: String,
    pub timeout_budget: Duration,
    pub temperature: f64,
}

impl RelayConfig {
    pub fn from_cli(config: &Config) -> Result<Self, RelayError> {
        let credential = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| RelayError::configuration(ERROR_MISSING_API_KEY))?;

        Ok(Self {
            endpoint: chat_completion_url(&config.provider_url),
            credential: credential.to_string(),
            model_id: config.model.clone(),
            timeout_budget: config.stream_timeout,
            temperature: config.temperature,
        })
    }
}

pub fn chat_completion_url(provider_url: &str) -> String {
    format!(
        "{}{}",
        provider_url.trim_end_matches('/'),
        MINIMAX_CHAT_COMPLETION
    )
}

pub fn validate_config(config: &Config) -> Result<(), String> {
    if config.listen.parse::<std::net::SocketAddr>().is_err() {
        return Err(format!("invalid listen address: {}", config.listen));
    }
    if !config.provider_url.starts_with("http://") && !config.provider_url.starts_with("https://")
    {
        return Err(format!(
            "invalid provider URL (must start with http:// or https://): {}",
            config.provider_url
        ));
    }
    if let Err(e) = url::Url::parse(&config.provider_url) {
        return Err(format!("invalid provider URL format: {}", e));
    }
    if config.stream_timeout.is_zero() {
        return Err("stream timeout must be greater than zero".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["minimax-sse-relay"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).expect("arguments should parse")
    }

    #[test]
    fn missing_credential_fails_at_construction() {
        let cfg = parse(&["--api-key", "   "]);
        let err = RelayConfig::from_cli(&cfg).expect_err("blank key must be rejected");
        assert_eq!(err.message, ERROR_MISSING_API_KEY);
    }

    #[test]
    fn builds_endpoint_and_timeout_from_flags() {
        let cfg = parse(&[
            "--api-key",
            "secret",
            "--provider-url",
            "http://localhost:9000/v1/",
            "--stream-timeout",
            "2m",
        ]);
        let relay = RelayConfig::from_cli(&cfg).expect("config should build");
        assert_eq!(relay.endpoint, "http://localhost:9000/v1/text/chatcompletion_v2");
        assert_eq!(relay.credential, "secret");
        assert_eq!(relay.timeout_budget, Duration::from_secs(120));
    }

    #[test]
    fn rejects_non_http_provider_url() {
        let cfg = parse(&["--provider-url", "ftp://example.com"]);
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn rejects_bad_listen_address() {
        let cfg = parse(&["--listen", "not-an-address"]);
        assert!(validate_config(&cfg).is_err());
    }
}
