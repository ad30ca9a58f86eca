//! Server configuration from environment variables

use std::env;
use std::time::Duration;

/// Default authority base URL (Italian DGC gateway)
const DEFAULT_BASE_URL: &str = "https://get.dgc.gov.it";

/// Runtime configuration for the verification server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP port the HTTP server listens on
    pub port: u16,
    /// Base URL of the authority feeds
    pub base_url: String,
    /// Period between scheduled trust refresh cycles
    pub refresh_interval: Duration,
    /// Per-request timeout for authority fetches
    pub http_timeout: Duration,
    /// Bounded retry count for transient authority fetch failures
    pub http_retries: u32,
    /// Append holder name and date of birth to verification responses
    pub add_holder_details: bool,
}

impl ServerConfig {
    /// Read configuration from `GREENLIGHT_*` environment variables,
    /// falling back to defaults. Panics on unparseable values; the server
    /// cannot start with a broken configuration.
    pub fn from_env() -> Self {
        let port = env::var("GREENLIGHT_PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("GREENLIGHT_PORT must be a valid port number");

        let base_url = env::var("GREENLIGHT_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.into())
            .trim_end_matches('/')
            .to_string();

        let refresh_secs: u64 = env::var("GREENLIGHT_REFRESH_INTERVAL_SECS")
            .unwrap_or_else(|_| "86400".into())
            .parse()
            .expect("GREENLIGHT_REFRESH_INTERVAL_SECS must be a number of seconds");

        let timeout_secs: u64 = env::var("GREENLIGHT_HTTP_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("GREENLIGHT_HTTP_TIMEOUT_SECS must be a number of seconds");

        let http_retries: u32 = env::var("GREENLIGHT_HTTP_RETRIES")
            .unwrap_or_else(|_| "3".into())
            .parse()
            .expect("GREENLIGHT_HTTP_RETRIES must be a number");

        let add_holder_details = env::var("GREENLIGHT_ADD_HOLDER_DETAILS")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            port,
            base_url,
            refresh_interval: Duration::from_secs(refresh_secs),
            http_timeout: Duration::from_secs(timeout_secs),
            http_retries,
            add_holder_details,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            base_url: DEFAULT_BASE_URL.into(),
            refresh_interval: Duration::from_secs(86400),
            http_timeout: Duration::from_secs(30),
            http_retries: 3,
            add_holder_details: false,
        }
    }
}
