//! Session configuration and application URLs.
//!
//! ```yaml
//! default_wait_ms: 5000
//! poll_interval_ms: 100
//! link_settle_ms: 250
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::result::{PageError, PageResult};
use crate::wait::{
    WaitOptions, DEFAULT_LINK_SETTLE_MS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS,
};

/// Environment variable overriding [`SessionConfig::default_wait_ms`]
pub const ENV_DEFAULT_WAIT_MS: &str = "PAGEWORKS_DEFAULT_WAIT_MS";
/// Environment variable overriding [`SessionConfig::poll_interval_ms`]
pub const ENV_POLL_INTERVAL_MS: &str = "PAGEWORKS_POLL_INTERVAL_MS";
/// Environment variable overriding [`SessionConfig::link_settle_ms`]
pub const ENV_LINK_SETTLE_MS: &str = "PAGEWORKS_LINK_SETTLE_MS";

/// Timing knobs of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Timeout used by waits that do not pass one
    pub default_wait_ms: u64,
    /// Interval between polls
    pub poll_interval_ms: u64,
    /// Delay between clicking a link and diffing window handles
    pub link_settle_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_wait_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            link_settle_ms: DEFAULT_LINK_SETTLE_MS,
        }
    }
}

impl SessionConfig {
    /// Create a config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default wait in milliseconds
    #[must_use]
    pub const fn with_default_wait(mut self, ms: u64) -> Self {
        self.default_wait_ms = ms;
        self
    }

    /// Set the polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set the link settle delay in milliseconds
    #[must_use]
    pub const fn with_link_settle(mut self, ms: u64) -> Self {
        self.link_settle_ms = ms;
        self
    }

    /// Parse a YAML document; missing keys keep their defaults
    pub fn from_yaml_str(yaml: &str) -> PageResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml).map_err(|e| PageError::Config {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `PAGEWORKS_*` environment variables
    pub fn from_env() -> PageResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> PageResult<Self> {
        let read = |key: &str, fallback: u64| -> PageResult<u64> {
            match lookup(key) {
                None => Ok(fallback),
                Some(raw) => raw.trim().parse().map_err(|_| PageError::Config {
                    message: format!("{key} must be a whole number of milliseconds, got {raw:?}"),
                }),
            }
        };

        let defaults = Self::default();
        let config = Self {
            default_wait_ms: read(ENV_DEFAULT_WAIT_MS, defaults.default_wait_ms)?,
            poll_interval_ms: read(ENV_POLL_INTERVAL_MS, defaults.poll_interval_ms)?,
            link_settle_ms: read(ENV_LINK_SETTLE_MS, defaults.link_settle_ms)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> PageResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(PageError::Config {
                message: "poll_interval_ms must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Wait options for a given timeout, falling back to the default wait
    #[must_use]
    pub fn wait_options(&self, timeout: Option<Duration>) -> WaitOptions {
        let timeout = timeout.unwrap_or(Duration::from_millis(self.default_wait_ms));
        WaitOptions::new()
            .with_timeout_duration(timeout)
            .with_poll_interval(self.poll_interval_ms)
    }

    /// Link settle delay as Duration
    #[must_use]
    pub const fn link_settle(&self) -> Duration {
        Duration::from_millis(self.link_settle_ms)
    }
}

/// Builder for the entry URL of a web application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppUrl {
    url: Url,
}

impl AppUrl {
    /// Plain http URL for `host`
    pub fn new(host: impl AsRef<str>) -> PageResult<Self> {
        let host = host.as_ref();
        let url = Url::parse(&format!("http://{host}"))
            .map_err(|e| PageError::assertion(format!("invalid host {host:?}: {e}")))?;
        if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
            return Err(PageError::assertion(format!(
                "host must not carry a path, query or fragment: {host:?}"
            )));
        }
        Ok(Self { url })
    }

    /// Set the port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        // http(s) URLs always have a host, so the port can always be set
        let _ = self.url.set_port(Some(port));
        self
    }

    /// Set the relative path; it must start with `/`
    pub fn with_relative(mut self, relative: impl AsRef<str>) -> PageResult<Self> {
        let relative = relative.as_ref();
        if !relative.starts_with('/') {
            return Err(PageError::assertion(format!(
                "relative path must start with '/': {relative:?}"
            )));
        }
        self.url.set_path(relative);
        Ok(self)
    }

    /// Use https instead of http
    #[must_use]
    pub fn with_https(mut self, https: bool) -> Self {
        let port = self.url.port();
        // switching between the two special schemes is always allowed
        let _ = self.url.set_scheme(if https { "https" } else { "http" });
        let _ = self.url.set_port(port);
        self
    }

    /// Whether the URL uses https
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.url.scheme() == "https"
    }

    /// The parsed URL
    #[must_use]
    pub const fn as_url(&self) -> &Url {
        &self.url
    }

    /// The composed URL
    #[must_use]
    pub fn url(&self) -> String {
        self.url.to_string()
    }
}

impl fmt::Display for AppUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.url, f)
    }
}

impl From<AppUrl> for String {
    fn from(app_url: AppUrl) -> Self {
        app_url.url.into()
    }
}
