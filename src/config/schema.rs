/// Configuration schema and defaults for melanalytics.
///
/// Sections: `[service]`, `[web]`, `[dashboard]`, `[logging]`. Every field
/// has a built-in default; files only need the keys they change.
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// Default analytics service address.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Default request timeout for service calls, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default bind address of the local dashboard.
pub const DEFAULT_WEB_ADDR: &str = "127.0.0.1:8501";

/// Longest default date window, in days (about a century).
pub const MAX_RANGE_DAYS: u32 = 36_525;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level configuration, as read from `~/.melanalytics/config.toml` and
/// `.melanalytics.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub web: WebConfig,
    pub dashboard: DashboardConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// [service]
// ---------------------------------------------------------------------------

/// Remote analytics service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL; the `BASE_URL` environment variable overrides it.
    pub base_url: String,
    /// Per-request timeout in seconds. Timeouts are reported, never retried.
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

// ---------------------------------------------------------------------------
// [web]
// ---------------------------------------------------------------------------

/// Local browser dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// `host:port` to bind.
    pub addr: String,
    /// Open the dashboard in the default browser on start.
    pub open_browser: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_WEB_ADDR.to_string(),
            open_browser: true,
        }
    }
}

// ---------------------------------------------------------------------------
// [dashboard]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Length of the default date filter, ending today.
    pub default_range_days: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            default_range_days: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Append a JSONL record per dashboard fetch to the fetch log.
    pub enabled: bool,
    /// Print one line per request served by the local dashboard.
    pub access_log: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            access_log: true,
        }
    }
}

impl AppConfig {
    /// Check the bounds the field types alone do not express.
    pub fn validate(&self) -> Result<()> {
        if self.service.timeout_secs == 0 {
            bail!("service.timeout_secs must be at least 1");
        }
        if self.dashboard.default_range_days > MAX_RANGE_DAYS {
            bail!("dashboard.default_range_days must be at most {MAX_RANGE_DAYS}");
        }
        Ok(())
    }

    /// Replace out-of-bounds values with their defaults.
    pub fn sanitize(&mut self) {
        if self.service.timeout_secs == 0 {
            self.service.timeout_secs = DEFAULT_TIMEOUT_SECS;
        }
        if self.dashboard.default_range_days > MAX_RANGE_DAYS {
            self.dashboard.default_range_days = DashboardConfig::default().default_range_days;
        }
    }

    /// Annotated default config written by `melanalytics config init`.
    pub fn default_toml() -> &'static str {
        r#"# melanalytics configuration
# Values here override built-in defaults. Environment variables
# (BASE_URL, MELANALYTICS_*) override this file.

[service]
# Address of the analytics service.
base_url = "http://localhost:8080"
# Request timeout in seconds.
timeout_secs = 30

[web]
# Local dashboard bind address.
addr = "127.0.0.1:8501"
open_browser = true

[dashboard]
# Default date filter: the last N days up to today.
default_range_days = 30

[logging]
# Record every dashboard fetch in ~/.melanalytics/fetch-log.jsonl.
enabled = false
# Print an access log line per dashboard request.
access_log = true
"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_contract() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.service.base_url, "http://localhost:8080");
        assert_eq!(cfg.service.timeout_secs, 30);
        assert_eq!(cfg.dashboard.default_range_days, 30);
        assert!(!cfg.logging.enabled);
    }

    #[test]
    fn default_toml_parses_to_defaults() {
        let parsed: AppConfig = toml::from_str(AppConfig::default_toml()).unwrap();
        assert_eq!(parsed, AppConfig::default());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let parsed: AppConfig = toml::from_str(
            r#"
[service]
base_url = "https://analytics.example.org"
"#,
        )
        .unwrap();
        assert_eq!(parsed.service.base_url, "https://analytics.example.org");
        assert_eq!(parsed.service.timeout_secs, 30);
        assert_eq!(parsed.web, WebConfig::default());
    }

    #[test]
    fn validate_and_sanitize_bounds() {
        assert!(AppConfig::default().validate().is_ok());

        let mut cfg = AppConfig::default();
        cfg.service.timeout_secs = 0;
        cfg.dashboard.default_range_days = 100_000_000;
        assert!(cfg.validate().is_err());

        cfg.sanitize();
        assert_eq!(cfg, AppConfig::default());

        cfg.dashboard.default_range_days = MAX_RANGE_DAYS;
        assert!(cfg.validate().is_ok());
    }
}
