//! Client configuration
//!
//! Defaults match a backend started locally with its stock settings.
//! Environment variables (optionally from a `.env` file) override them and
//! the CLI flags override the environment.

use std::path::PathBuf;
use std::time::Duration;

use crate::metrics::StalePolicy;

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);
pub const DEFAULT_STATUS_REVERT: Duration = Duration::from_secs(2);

/// Runtime configuration shared by the chat client, poller and report viewer
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Backend base URL; endpoint paths are joined onto it
    pub base_url: String,
    /// Metrics poll cadence
    pub poll_interval: Duration,
    /// How long transient status messages stay before reverting to "ready"
    pub status_revert: Duration,
    /// Per-request timeout; `None` leaves it to the network layer. Without
    /// one, a hung backend keeps every poll tick's fetches pending.
    pub request_timeout: Option<Duration>,
    pub stale_policy: StalePolicy,
    /// Where downloaded reports are written
    pub report_dir: PathBuf,
    /// Sent as `X-API-Key` to the protected security endpoints
    pub api_key: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            status_revert: DEFAULT_STATUS_REVERT,
            request_timeout: None,
            stale_policy: StalePolicy::default(),
            report_dir: PathBuf::from("."),
            api_key: None,
        }
    }
}

impl ClientConfig {
    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Unparseable values are
    /// logged and ignored.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("GROZY_API_URL").filter(|u| !u.trim().is_empty()) {
            config.base_url = url.trim().to_string();
        }

        match parse_var::<u64>(&lookup, "GROZY_POLL_INTERVAL_MS") {
            Some(0) => tracing::warn!("GROZY_POLL_INTERVAL_MS must be positive, keeping default"),
            Some(ms) => config.poll_interval = Duration::from_millis(ms),
            None => {}
        }

        if let Some(secs) = parse_var::<u64>(&lookup, "GROZY_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        if let Some(drop_stale) = parse_var::<bool>(&lookup, "GROZY_DROP_STALE") {
            config.stale_policy = if drop_stale {
                StalePolicy::DropStale
            } else {
                StalePolicy::LastCompletionWins
            };
        }

        if let Some(dir) = lookup("GROZY_REPORT_DIR").filter(|d| !d.trim().is_empty()) {
            config.report_dir = PathBuf::from(dir);
        }

        config.api_key = lookup("GROZY_API_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        config
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring {}={:?}: not a valid value", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = ClientConfig::from_vars(vars(&[]));
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.poll_interval, Duration::from_millis(5000));
        assert_eq!(config.status_revert, Duration::from_secs(2));
    }

    #[test]
    fn test_env_overrides() {
        let config = ClientConfig::from_vars(vars(&[
            ("GROZY_API_URL", "http://grozy.internal:8000"),
            ("GROZY_POLL_INTERVAL_MS", "1500"),
            ("GROZY_REQUEST_TIMEOUT_SECS", "30"),
            ("GROZY_DROP_STALE", "true"),
            ("GROZY_REPORT_DIR", "/tmp/reports"),
            ("GROZY_API_KEY", " grozy_k3y "),
        ]));
        assert_eq!(config.base_url, "http://grozy.internal:8000");
        assert_eq!(config.poll_interval, Duration::from_millis(1500));
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.stale_policy, StalePolicy::DropStale);
        assert_eq!(config.report_dir, PathBuf::from("/tmp/reports"));
        assert_eq!(config.api_key.as_deref(), Some("grozy_k3y"));
    }

    #[test]
    fn test_bad_values_keep_defaults() {
        let config = ClientConfig::from_vars(vars(&[
            ("GROZY_POLL_INTERVAL_MS", "0"),
            ("GROZY_REQUEST_TIMEOUT_SECS", "soon"),
            ("GROZY_DROP_STALE", "maybe"),
            ("GROZY_API_KEY", "  "),
        ]));
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(config.request_timeout, None);
        assert_eq!(config.stale_policy, StalePolicy::LastCompletionWins);
        assert_eq!(config.api_key, None);
    }
}
