//! Configuration infrastructure
//!
//! Settings are layered: an optional config file (any format the `config`
//! crate understands, usually `efd.toml`) and then `EFD_`-prefixed
//! environment variables, with `__` separating nested keys
//! (`EFD_EXPORT__REMOTE_ENABLED=true`). Every section has defaults, so an
//! empty configuration runs a CSV-only crawl of the last week.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::infrastructure::chrome_driver::ChromeConfig;
use crate::infrastructure::http_client::HttpClientConfig;
use crate::infrastructure::parsing::PortalSelectors;

/// Default configuration values
pub mod defaults {
    pub const BASE_URL: &str = "https://efdsearch.senate.gov";
    pub const USER_AGENT: &str = "efd-ptr-harvester/0.1 (public disclosure research)";
    pub const TIMEOUT_SECS: u64 = 30;
    pub const MAX_REQUESTS_PER_SECOND: u32 = 2;

    /// Pause after a click in the browser, for scripted page updates
    pub const SETTLE_MILLIS: u64 = 2_000;

    pub const DETAIL_CONCURRENCY: usize = 4;
    pub const WAIT_TIMEOUT_SECS: u64 = 10;
    /// The search looks this many days back when no from-date is configured
    pub const LOOKBACK_DAYS: i64 = 7;
    pub const FROM_DATE_FORMAT: &str = "%m/%d/%Y";

    pub const CSV_PATH: &str = "ptr_transactions.csv";

    pub const LOG_LEVEL: &str = "info";
    pub const LOG_DIR: &str = "logs";
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {message}")]
    Validation { message: String },

    #[error("Remote export is enabled but '{field}' is missing or empty")]
    MissingRemoteField { field: &'static str },
}

impl ConfigError {
    fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub portal: PortalConfig,
    pub browser: BrowserSettings,
    pub crawl: CrawlConfig,
    pub export: ExportConfig,
    pub logging: LoggingConfig,
    /// Raise the log level to `debug`
    pub verbose: bool,
}

impl AppConfig {
    /// Load from `path` (optional) and the environment, then validate
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("EFD")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        info!("Configuration loaded (source: {}, environment: EFD_*)", path);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.portal.validate()?;
        self.crawl.validate()?;
        self.export.validate()?;
        Ok(())
    }

    /// Logging settings with the `verbose` flag applied
    pub fn effective_logging(&self) -> LoggingConfig {
        let mut logging = self.logging.clone();
        if self.verbose {
            logging.level = "debug".to_string();
        }
        logging
    }
}

/// Portal location, HTTP client behaviour and page selectors
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_requests_per_second: u32,
    pub selectors: PortalSelectors,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::BASE_URL.to_string(),
            user_agent: defaults::USER_AGENT.to_string(),
            timeout_secs: defaults::TIMEOUT_SECS,
            max_requests_per_second: defaults::MAX_REQUESTS_PER_SECOND,
            selectors: PortalSelectors::default(),
        }
    }
}

impl PortalConfig {
    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn search_home_url(&self) -> String {
        format!("{}/search/home", self.base_url())
    }

    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            user_agent: self.user_agent.clone(),
            timeout_seconds: self.timeout_secs,
            max_requests_per_second: self.max_requests_per_second,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let url = url::Url::parse(self.base_url()).map_err(|e| {
            ConfigError::validation(format!("portal.base_url '{}': {}", self.base_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::validation(format!(
                "portal.base_url must be http(s), got '{}'",
                self.base_url
            )));
        }
        if self.max_requests_per_second == 0 {
            return Err(ConfigError::validation(
                "portal.max_requests_per_second must be greater than 0",
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::validation("portal.timeout_secs must be greater than 0"));
        }
        Ok(())
    }
}

/// Page driver used for the search, the listing and the detail pages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// Headless Chrome; runs the portal's scripts
    #[default]
    Chrome,
    /// Plain HTTP fetches parsed as static HTML
    Static,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub driver: DriverKind,
    pub headless: bool,
    /// Chrome binary; auto-detected when unset
    pub executable: Option<PathBuf>,
    /// Extra Chrome switches, e.g. `--no-sandbox` in containers
    pub args: Vec<String>,
    pub settle_millis: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            driver: DriverKind::default(),
            headless: true,
            executable: None,
            args: Vec::new(),
            settle_millis: defaults::SETTLE_MILLIS,
        }
    }
}

impl BrowserSettings {
    /// Chrome settings; navigation shares the portal request timeout
    pub fn chrome_config(&self, portal: &PortalConfig) -> ChromeConfig {
        ChromeConfig {
            headless: self.headless,
            executable: self.executable.clone(),
            args: self.args.clone(),
            navigation_timeout: Duration::from_secs(portal.timeout_secs),
            settle: Duration::from_millis(self.settle_millis),
        }
    }
}

/// What to do with a detail row that fails extraction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowPolicy {
    /// Fail the run
    #[default]
    Abort,
    /// Log and continue with the next row
    Skip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Search from-date as `MM/DD/YYYY`; a week ago when unset
    pub from_date: Option<String>,
    /// Detail pages read at the same time
    pub detail_concurrency: usize,
    /// Stop paginating after this many listing pages
    pub max_pages: Option<u32>,
    pub on_malformed_row: RowPolicy,
    /// How long the search form waits for each control
    pub wait_timeout_secs: u64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            from_date: None,
            detail_concurrency: defaults::DETAIL_CONCURRENCY,
            max_pages: None,
            on_malformed_row: RowPolicy::default(),
            wait_timeout_secs: defaults::WAIT_TIMEOUT_SECS,
        }
    }
}

impl CrawlConfig {
    /// The configured from-date, or `today - 7 days`, formatted `MM/DD/YYYY`
    pub fn effective_from_date(&self) -> String {
        match &self.from_date {
            Some(date) => date.clone(),
            None => {
                let date = Local::now().date_naive() - chrono::Duration::days(defaults::LOOKBACK_DAYS);
                date.format(defaults::FROM_DATE_FORMAT).to_string()
            }
        }
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.detail_concurrency == 0 {
            return Err(ConfigError::validation(
                "crawl.detail_concurrency must be greater than 0",
            ));
        }
        if self.max_pages == Some(0) {
            return Err(ConfigError::validation("crawl.max_pages must be greater than 0"));
        }
        if let Some(date) = &self.from_date {
            NaiveDate::parse_from_str(date, defaults::FROM_DATE_FORMAT).map_err(|e| {
                ConfigError::validation(format!("crawl.from_date '{date}' is not MM/DD/YYYY: {e}"))
            })?;
        }
        Ok(())
    }
}

/// Which sinks the dataset is exported to
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub csv_enabled: bool,
    pub csv_path: PathBuf,
    pub remote_enabled: bool,
    pub remote_region: Option<String>,
    pub remote_table: Option<String>,
    pub remote_access_key: Option<String>,
    pub remote_secret_key: Option<String>,
    /// Defaults to `https://dynamodb.<region>.amazonaws.com`
    pub remote_endpoint: Option<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            csv_enabled: true,
            csv_path: PathBuf::from(defaults::CSV_PATH),
            remote_enabled: false,
            remote_region: None,
            remote_table: None,
            remote_access_key: None,
            remote_secret_key: None,
            remote_endpoint: None,
        }
    }
}

/// Validated remote sink settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSettings {
    pub region: String,
    pub table: String,
    pub access_key: String,
    pub secret_key: String,
    pub endpoint: String,
}

impl ExportConfig {
    /// Check the remote fields. Returns the remote settings when the remote
    /// sink is enabled.
    pub fn validate(&self) -> Result<Option<RemoteSettings>, ConfigError> {
        if !self.remote_enabled {
            return Ok(None);
        }

        fn present(value: &Option<String>, field: &'static str) -> Result<String, ConfigError> {
            value
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .map(ToString::to_string)
                .ok_or(ConfigError::MissingRemoteField { field })
        }

        let region = present(&self.remote_region, "remote_region")?;
        let table = present(&self.remote_table, "remote_table")?;
        let access_key = present(&self.remote_access_key, "remote_access_key")?;
        let secret_key = present(&self.remote_secret_key, "remote_secret_key")?;
        let endpoint = self
            .remote_endpoint
            .clone()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| format!("https://dynamodb.{region}.amazonaws.com"));

        Ok(Some(RemoteSettings {
            region,
            table,
            access_key,
            secret_key,
            endpoint,
        }))
    }
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// JSON formatted file logs
    pub json_format: bool,

    pub console_output: bool,

    pub file_output: bool,

    /// Directory for the daily rolling log file
    pub log_dir: PathBuf,

    /// Per-target levels, e.g. "reqwest": "warn"
    pub module_filters: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: false,
            console_output: true,
            file_output: true,
            log_dir: PathBuf::from(defaults::LOG_DIR),
            module_filters: HashMap::new(),
        }
    }
}
