use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Upstream settings for a single relay call.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Time allowed until the upstream response headers arrive.
    pub response_timeout: Duration,
}

impl RelayConfig {
    /// Reads `OPENAI_API_KEY`, `OPENAI_BASE_URL` and `UPSTREAM_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        let base_url = std::env::var("OPENAI_BASE_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let secs = std::env::var("UPSTREAM_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            api_key,
            base_url,
            response_timeout: Duration::from_secs(secs),
        }
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// Where the relay looks up its configuration on each request.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// Re-read the process environment every time.
    Env,
    Fixed(RelayConfig),
}

impl ConfigSource {
    pub fn resolve(&self) -> RelayConfig {
        match self {
            ConfigSource::Env => RelayConfig::from_env(),
            ConfigSource::Fixed(config) => config.clone(),
        }
    }
}
