//! eFD PTR harvester - Senate periodic transaction report crawler
//!
//! Searches the Senate eFD portal for PTR filings, walks the paginated
//! listing, extracts every transaction row from the detail pages, drops
//! duplicates by content identity and exports the dataset to CSV and/or a
//! remote table store.

// Module declarations
pub mod domain;
pub mod application;
pub mod infrastructure;

// Re-export the types most callers need
pub use application::{CrawlOutcome, CrawlPipeline, ExportCoordinator, RunFailure, RunPhase};
pub use domain::{Dataset, DedupAccumulator, DetailLink, IdentityResolver, Record, RecordDraft, RecordId};
pub use infrastructure::{AppConfig, ConfigError};
