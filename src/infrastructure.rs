//! Infrastructure layer: page driving, HTML parsing, sinks and runtime setup
//!
//! This module provides the page drivers (Chrome and static HTML) and their
//! fetchers, the detail-row field extractor, the CSV and remote table sinks,
//! configuration loading and logging.

pub mod browser;  // Page driver trait and element snapshots
pub mod chrome_driver;  // Headless Chrome driver
pub mod static_page_driver;  // Driver over fetched HTML
pub mod http_client;  // Page fetchers (HTTP, in-memory)
pub mod parsing_error;  // Extraction error types
pub mod parsing;  // Selectors and field extraction
pub mod csv_sink;
pub mod table_client;
pub mod config;  // Layered configuration
pub mod logging;  // Logging infrastructure

// Re-export commonly used items
pub use browser::{BrowserDriver, DriverError, DriverFactory, DriverResult, Element};
pub use chrome_driver::{ChromeConfig, ChromeDriver, ChromeSession};
pub use static_page_driver::StaticPageDriver;
pub use http_client::{FetchedPage, HttpClientConfig, HttpFetcher, InMemoryFetcher, PageFetcher, PageRequest};
pub use parsing::{ExtractionError, ExtractionResult, FieldExtractor, PortalSelectors};
pub use csv_sink::{CsvSink, CsvSinkError};
pub use table_client::{
    HttpTableClient, HttpTableSettings, InMemoryTableClient, TableClient, TableClientError, TableItem,
};
pub use config::{
    AppConfig, BrowserSettings, ConfigError, CrawlConfig, DriverKind, ExportConfig, PortalConfig,
    RemoteSettings, RowPolicy,
};
pub use logging::{LoggingConfig, init_logging, init_logging_with_config, log_system_info};
