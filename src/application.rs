//! Application layer module
//!
//! Orchestrates one harvesting run: search form, listing traversal, detail
//! reading and extraction, then export of the accumulated dataset.

pub mod search_session;
pub mod traversal;
pub mod detail_reader;
pub mod crawl_pipeline;
pub mod export;

pub use search_session::SearchSession;
pub use traversal::{PaginationTraversal, TraversalError, TraversalSummary};
pub use detail_reader::{DetailPage, DetailPageReader, DetailPageSource};
pub use crawl_pipeline::{CrawlError, CrawlOutcome, CrawlPipeline, RunFailure, RunPhase};
pub use export::{
    ExportCoordinator, ExportError, ExportReport, RemoteTableSink, SinkOutcome,
};
