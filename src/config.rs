//! Centralized configuration management for arfetch

use std::time::Duration;
use anyhow::{Result, Context};

const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// WebDriver endpoint browser sessions connect to
    pub webdriver_url: String,
    /// Browser timeouts
    pub timeouts: Timeouts,
    /// Pacing between batch entries
    pub pacing: Pacing,
    /// HTTP client configuration
    pub http: HttpConfig,
}

/// Timeouts for browser-driven steps
#[derive(Debug, Clone)]
pub struct Timeouts {
    /// Page-load timeout (milliseconds)
    pub navigation_ms: u64,
    /// Element-wait timeout (milliseconds)
    pub element_ms: u64,
}

/// Inter-entry pacing, kept to avoid request burst signatures against the
/// exchange sites
#[derive(Debug, Clone)]
pub struct Pacing {
    /// Delay between companies (seconds)
    pub delay_between_companies_secs: u64,
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Document download timeout in seconds
    pub download_timeout_seconds: u64,
    /// User agent presented to both exchanges
    pub user_agent: String,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation_ms: 45_000,
            element_ms: 15_000,
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            delay_between_companies_secs: 2,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            download_timeout_seconds: 60,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            timeouts: Timeouts::default(),
            pacing: Pacing::default(),
            http: HttpConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables and defaults
    pub fn from_env() -> Result<Self> {
        let webdriver_url = std::env::var("ARFETCH_WEBDRIVER_URL")
            .unwrap_or_else(|_| DEFAULT_WEBDRIVER_URL.to_string());

        let timeouts = Timeouts {
            navigation_ms: parse_env_var("ARFETCH_TIMEOUT_NAVIGATION_MS")?.unwrap_or(45_000),
            element_ms: parse_env_var("ARFETCH_TIMEOUT_ELEMENT_MS")?.unwrap_or(15_000),
        };

        let pacing = Pacing {
            delay_between_companies_secs: parse_env_var("ARFETCH_DELAY_BETWEEN_COMPANIES_SECS")?
                .unwrap_or(2),
        };

        let http = HttpConfig {
            download_timeout_seconds: parse_env_var("ARFETCH_DOWNLOAD_TIMEOUT_SECONDS")?
                .unwrap_or(60),
            user_agent: std::env::var("ARFETCH_USER_AGENT")
                .unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string()),
        };

        Ok(Config {
            webdriver_url,
            timeouts,
            pacing,
            http,
        })
    }

    /// Get page-load timeout as Duration
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.navigation_ms)
    }

    /// Get element-wait timeout as Duration
    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.element_ms)
    }

    /// Get inter-company pacing delay as Duration
    pub fn company_delay(&self) -> Duration {
        Duration::from_secs(self.pacing.delay_between_companies_secs)
    }

    /// Get document download timeout as Duration
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.http.download_timeout_seconds)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.webdriver_url.starts_with("http") {
            return Err(anyhow::anyhow!(
                "WebDriver URL must be an http(s) endpoint: {}",
                self.webdriver_url
            ));
        }

        if self.timeouts.navigation_ms == 0 || self.timeouts.element_ms == 0 {
            return Err(anyhow::anyhow!("Timeouts must be non-zero"));
        }

        Ok(())
    }
}

/// Helper function to parse environment variable as a specific type
fn parse_env_var<T>(var_name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display + Send + Sync + std::error::Error + 'static,
{
    match std::env::var(var_name) {
        Ok(val) => val.parse().map(Some).with_context(|| {
            format!("Failed to parse environment variable {} = '{}'", var_name, val)
        }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.webdriver_url, "http://localhost:9515");
        assert_eq!(config.timeouts.navigation_ms, 45_000);
        assert_eq!(config.timeouts.element_ms, 15_000);
        assert_eq!(config.pacing.delay_between_companies_secs, 2);
        assert_eq!(config.http.download_timeout_seconds, 60);
    }

    #[test]
    fn test_config_validation() {
        let config = Config::default();
        config.validate().unwrap();

        let mut bad = Config::default();
        bad.timeouts.navigation_ms = 0;
        assert!(bad.validate().is_err());

        let mut bad = Config::default();
        bad.webdriver_url = "localhost:9515".to_string();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_duration_getters() {
        let config = Config::default();
        assert_eq!(config.navigation_timeout(), Duration::from_millis(45_000));
        assert_eq!(config.company_delay(), Duration::from_secs(2));
    }
}
