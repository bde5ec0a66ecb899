//! Configuration management for dashcheck
//!
//! Supports environment variables, config files, and runtime overrides.
//! Defaults reproduce the fixed scenario: Vite dev server on port 5173,
//! 10 second render wait, screenshot under `frontend_verification/`.
//!
//! Config file location: ~/.config/dashcheck/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::error::{DashcheckError, Result};

/// Main configuration for dashcheck
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Dashboard under test
    #[serde(default)]
    pub dashboard: DashboardConfig,
    /// Browser configuration
    #[serde(default)]
    pub browser: BrowserSettings,
    /// Wait and assertion bounds
    #[serde(default)]
    pub wait: WaitConfig,
    /// Output artifacts
    #[serde(default)]
    pub output: OutputConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Dashboard dev server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// URL of the running dev server (default: http://localhost:5173)
    pub url: String,
    /// Probe the dev server once before launching the browser
    pub preflight: bool,
}

/// Headless browser configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Whether to run in headed mode (visible browser)
    pub headed: bool,
    /// Disable the Chromium sandbox (needed when running as root in containers)
    pub no_sandbox: bool,
    /// Explicit Chrome/Chromium executable; auto-detected when unset
    pub executable: Option<PathBuf>,
    /// Timeout for browser launch in ms
    pub launch_timeout_ms: u64,
    /// Timeout for navigation and individual CDP requests in ms
    pub request_timeout_ms: u64,
    /// Viewport width in pixels
    pub window_width: u32,
    /// Viewport height in pixels
    pub window_height: u32,
}

/// Bounds for waiting on the rendered page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    /// Bound for the initial render marker (default: 10000)
    pub timeout_ms: u64,
    /// Bound for each visibility expectation (default: 5000)
    pub expect_timeout_ms: u64,
    /// Poll interval while waiting
    pub poll_interval_ms: u64,
}

/// Output artifact configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Screenshot path, relative to the working directory
    pub screenshot: PathBuf,
    /// Open the screenshot in the default viewer after a successful run
    pub open_screenshot: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    pub level: String,
}

fn env_flag(key: &str) -> Option<bool> {
    env::var(key).ok().map(|v| v == "true" || v == "1")
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            url: env::var("DASHCHECK_URL").unwrap_or_else(|_| "http://localhost:5173".to_string()),
            preflight: env_flag("DASHCHECK_PREFLIGHT").unwrap_or(true),
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headed: env_flag("DASHCHECK_HEADED").unwrap_or(false),
            no_sandbox: env_flag("DASHCHECK_NO_SANDBOX").unwrap_or(false),
            executable: env::var("DASHCHECK_CHROME").ok().map(PathBuf::from),
            launch_timeout_ms: 20_000,
            request_timeout_ms: 30_000,
            window_width: 1280,
            window_height: 800,
        }
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout_ms: env::var("DASHCHECK_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10_000),
            expect_timeout_ms: 5_000,
            poll_interval_ms: 100,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            screenshot: env::var("DASHCHECK_SCREENSHOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("frontend_verification/dashboard_verified.png")),
            open_screenshot: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: env::var("DASHCHECK_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dashcheck")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > config file > env vars > defaults
    pub fn load() -> Self {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        let path = Self::config_file();
        if path.exists() {
            match Self::load_from(&path) {
                Ok(config) => return config,
                // Runs before logging is set up
                Err(e) => eprintln!("Ignoring config file {}: {}", path.display(), e),
            }
        }

        Self::default()
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            DashcheckError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text; missing sections and fields take defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| DashcheckError::config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that would make a run meaningless
    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.dashboard.url).map_err(|e| {
            DashcheckError::config(format!("Invalid dashboard url '{}': {}", self.dashboard.url, e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(DashcheckError::config(format!(
                "Dashboard url must be http(s), got '{}'",
                parsed.scheme()
            )));
        }
        if self.wait.timeout_ms == 0 || self.wait.expect_timeout_ms == 0 {
            return Err(DashcheckError::config("Wait timeouts must be non-zero"));
        }
        if self.wait.poll_interval_ms == 0 {
            return Err(DashcheckError::config("Poll interval must be non-zero"));
        }
        if self.output.screenshot.as_os_str().is_empty() {
            return Err(DashcheckError::config("Screenshot path is empty"));
        }
        Ok(())
    }

    /// Generate a default config file content for display
    pub fn default_config_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config)
            .unwrap_or_else(|_| String::from("# Error generating config"))
    }
}

impl WaitConfig {
    /// Bound for the initial render marker
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Bound for each visibility expectation
    pub fn expect_timeout(&self) -> Duration {
        Duration::from_millis(self.expect_timeout_ms)
    }

    /// Poll interval while waiting
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl BrowserSettings {
    /// Navigation / request bound
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Launch bound
    pub fn launch_timeout(&self) -> Duration {
        Duration::from_millis(self.launch_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.wait.poll_interval_ms, 100);
        assert_eq!(config.wait.expect_timeout_ms, 5_000);
        assert_eq!(config.browser.window_width, 1280);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_takes_defaults() {
        let config = Config::from_toml(
            r#"
            [dashboard]
            url = "http://127.0.0.1:4173"
            preflight = false
            "#,
        )
        .unwrap();
        assert_eq!(config.dashboard.url, "http://127.0.0.1:4173");
        assert!(!config.dashboard.preflight);
        assert_eq!(config.browser.window_height, 800);
    }

    #[test]
    fn test_partial_section_takes_field_defaults() {
        let config = Config::from_toml("[wait]\ntimeout_ms = 20000\n").unwrap();
        assert_eq!(config.wait.timeout_ms, 20_000);
        assert_eq!(config.wait.expect_timeout_ms, 5_000);
        assert_eq!(config.wait.poll_interval_ms, 100);

        let config = Config::from_toml("[dashboard]\nurl = \"http://127.0.0.1:4173\"\n").unwrap();
        assert_eq!(config.dashboard.url, "http://127.0.0.1:4173");
        assert_eq!(config.dashboard.preflight, DashboardConfig::default().preflight);

        let config = Config::from_toml("[browser]\nheaded = true\n").unwrap();
        assert!(config.browser.headed);
        assert_eq!(config.browser.window_width, 1280);
    }

    #[test]
    fn test_rejects_non_http_url() {
        let err = Config::from_toml(
            r#"
            [dashboard]
            url = "file:///tmp/index.html"
            preflight = true
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("http(s)"));
    }

    #[test]
    fn test_rejects_zero_wait() {
        let mut config = Config::default();
        config.wait.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let toml_str = Config::default_config_toml();
        assert!(toml_str.contains("[dashboard]"));
        assert!(toml_str.contains("screenshot"));
    }

    #[test]
    fn test_config_dir() {
        let dir = Config::config_dir();
        assert!(dir.to_string_lossy().contains("dashcheck"));
    }
}
