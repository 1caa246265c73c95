//! Application configuration loaded from environment variables.

use std::time::Duration;

use anyhow::Context;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:3000").
    pub bind_addr: String,

    /// Base URL of the demo API, without a trailing slash.
    pub api_url: String,

    /// Site name shown in the navigation bar and page titles.
    pub site_name: String,

    /// How long a built student page is served before it is refreshed.
    pub revalidate: Duration,

    /// Upper bound for every outbound request.
    pub fetch_timeout: Duration,

    /// Idle time after which a session's state store is dropped.
    pub session_idle: Duration,

    /// Number of student pages built at startup.
    pub prerender_limit: usize,

    /// Port for the Prometheus `/metrics` server; disabled when unset.
    pub metrics_port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            api_url: campus_core::api::DEFAULT_API_URL.to_string(),
            site_name: "Academic Dashboard".to_string(),
            revalidate: Duration::from_secs(10),
            fetch_timeout: campus_core::api::DEFAULT_TIMEOUT,
            session_idle: Duration::from_secs(1800),
            prerender_limit: 30,
            metrics_port: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// All variables are optional:
    /// - `CAMPUS_BIND_ADDR`: Server bind address (default: "0.0.0.0:3000")
    /// - `CAMPUS_API_URL`: Demo API base URL (default: "https://dummyjson.com")
    /// - `CAMPUS_SITE_NAME`: Site name (default: "Academic Dashboard")
    /// - `CAMPUS_REVALIDATE_SECS`: Student page revalidation interval (default: 10)
    /// - `CAMPUS_FETCH_TIMEOUT_SECS`: Outbound request timeout (default: 5)
    /// - `CAMPUS_SESSION_IDLE_SECS`: Session idle expiry (default: 1800)
    /// - `CAMPUS_PRERENDER_LIMIT`: Student pages built at startup (default: 30)
    /// - `CAMPUS_METRICS_PORT`: Prometheus metrics port (default: disabled)
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let bind_addr = std::env::var("CAMPUS_BIND_ADDR").unwrap_or(defaults.bind_addr);

        let api_url = std::env::var("CAMPUS_API_URL")
            .unwrap_or(defaults.api_url)
            .trim_end_matches('/')
            .to_string();

        let site_name = std::env::var("CAMPUS_SITE_NAME").unwrap_or(defaults.site_name);

        let revalidate = env_parse::<u64>("CAMPUS_REVALIDATE_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.revalidate);

        let fetch_timeout = env_parse::<u64>("CAMPUS_FETCH_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.fetch_timeout);

        let session_idle = env_parse::<u64>("CAMPUS_SESSION_IDLE_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.session_idle);

        let prerender_limit =
            env_parse::<usize>("CAMPUS_PRERENDER_LIMIT")?.unwrap_or(defaults.prerender_limit);

        let metrics_port = env_parse::<u16>("CAMPUS_METRICS_PORT")?;

        tracing::info!(
            bind_addr = %bind_addr,
            api_url = %api_url,
            site_name = %site_name,
            revalidate_secs = revalidate.as_secs(),
            fetch_timeout_secs = fetch_timeout.as_secs(),
            session_idle_secs = session_idle.as_secs(),
            prerender_limit = prerender_limit,
            metrics_port = ?metrics_port,
            "campus configuration loaded"
        );

        Ok(Self {
            bind_addr,
            api_url,
            site_name,
            revalidate,
            fetch_timeout,
            session_idle,
            prerender_limit,
            metrics_port,
        })
    }
}

/// Parse an optional numeric variable. Unset or blank is `None`; anything
/// unparsable is an error naming the variable.
fn env_parse<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        _ => Ok(None),
    }
}
