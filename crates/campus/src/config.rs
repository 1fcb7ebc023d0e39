//! Client configuration with environment overrides.

use std::path::PathBuf;
use std::time::Duration;

use campus_access::GuardDestinations;
use campus_gateway::{DEFAULT_BASE_URL, GatewayConfig};
use campus_lifecycle::LifecycleConfig;
use tracing::warn;

pub const ENV_API_URL: &str = "CAMPUS_API_URL";
pub const ENV_ORIGIN: &str = "CAMPUS_ORIGIN";
pub const ENV_SESSION_MARKER: &str = "CAMPUS_SESSION_MARKER";
pub const ENV_REFRESH_INTERVAL_SECS: &str = "CAMPUS_REFRESH_INTERVAL_SECS";
pub const ENV_SIGN_IN_PATH: &str = "CAMPUS_SIGN_IN_PATH";
pub const ENV_LANDING_PATH: &str = "CAMPUS_LANDING_PATH";

/// Everything needed to build a [`Campus`](crate::Campus) client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// API root. Relative values are resolved against `origin`.
    pub api_url: String,
    pub origin: String,
    /// Where the "was signed in" marker lives. `None` keeps it in memory.
    pub session_marker: Option<PathBuf>,
    pub refresh_interval: Duration,
    pub sign_in_path: String,
    pub landing_path: String,
}

impl Default for Config {
    fn default() -> Self {
        let destinations = GuardDestinations::default();
        Self {
            api_url: DEFAULT_BASE_URL.to_string(),
            origin: "http://localhost:3000".to_string(),
            session_marker: None,
            refresh_interval: LifecycleConfig::DEFAULT_REFRESH_INTERVAL,
            sign_in_path: destinations.sign_in,
            landing_path: destinations.landing,
        }
    }
}

impl Config {
    /// Defaults overridden by `CAMPUS_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns. Blank values are
    /// treated as unset; unparsable numbers keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = get(ENV_API_URL) {
            config.api_url = url;
        }
        if let Some(origin) = get(ENV_ORIGIN) {
            config.origin = origin;
        }
        config.session_marker = get(ENV_SESSION_MARKER).map(PathBuf::from);
        if let Some(raw) = get(ENV_REFRESH_INTERVAL_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.refresh_interval = Duration::from_secs(secs),
                _ => warn!(
                    key = ENV_REFRESH_INTERVAL_SECS,
                    value = %raw,
                    default_secs = config.refresh_interval.as_secs(),
                    "invalid refresh interval, using default"
                ),
            }
        }
        if let Some(path) = get(ENV_SIGN_IN_PATH) {
            config.sign_in_path = path;
        }
        if let Some(path) = get(ENV_LANDING_PATH) {
            config.landing_path = path;
        }
        config
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig::with_base_url(self.api_url.clone())
    }

    pub fn lifecycle_config(&self) -> LifecycleConfig {
        LifecycleConfig::with_interval(self.refresh_interval)
    }

    pub fn destinations(&self) -> GuardDestinations {
        GuardDestinations {
            sign_in: self.sign_in_path.clone(),
            landing: self.landing_path.clone(),
        }
    }
}
