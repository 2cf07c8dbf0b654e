//! Crawl pipeline
//!
//! search → pagination traversal → detail reads → field extraction →
//! deduplicating accumulation.
//!
//! Detail pages are read up to `detail_concurrency` at a time, but results
//! are consumed in link order by a single loop that owns the accumulator, so
//! the dataset is exactly what a sequential run would produce.

use std::fmt;

use futures::stream::{self, StreamExt};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::detail_reader::DetailPageSource;
use super::search_session::SearchSession;
use super::traversal::{PaginationTraversal, TraversalError};
use crate::domain::dataset::{Dataset, DedupAccumulator};
use crate::domain::detail_link::DetailLinkSet;
use crate::infrastructure::browser::{BrowserDriver, DriverError};
use crate::infrastructure::config::{AppConfig, RowPolicy, defaults};
use crate::infrastructure::parsing::{ExtractionError, FieldExtractor};

/// Stage of a run, reported with failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Search,
    Traversal,
    DetailFetch,
    Extraction,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Search => "search",
            Self::Traversal => "traversal",
            Self::DetailFetch => "detail fetch",
            Self::Extraction => "extraction",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("Search form failed: {0}")]
    Search(#[source] DriverError),

    #[error(transparent)]
    Traversal(#[from] TraversalError),

    #[error("Failed to read detail page {link}: {source}")]
    DetailFetch {
        link: String,
        #[source]
        source: DriverError,
    },

    #[error("Row {row} of {link}: {source}")]
    Extraction {
        link: String,
        row: usize,
        #[source]
        source: ExtractionError,
    },
}

impl CrawlError {
    pub const fn phase(&self) -> RunPhase {
        match self {
            Self::Search(_) => RunPhase::Search,
            Self::Traversal(_) => RunPhase::Traversal,
            Self::DetailFetch { .. } => RunPhase::DetailFetch,
            Self::Extraction { .. } => RunPhase::Extraction,
        }
    }

    /// Only a malformed row can be skipped without losing run integrity
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Extraction { .. })
    }
}

/// A failed run, with whatever was accepted before the failure
#[derive(Error, Debug)]
#[error("Run failed during {phase}: {error}")]
pub struct RunFailure {
    pub phase: RunPhase,
    #[source]
    pub error: CrawlError,
    pub partial: Dataset,
}

impl RunFailure {
    fn new(error: CrawlError, accumulator: DedupAccumulator) -> Self {
        Self {
            phase: error.phase(),
            error,
            partial: accumulator.into_dataset(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CrawlOutcome {
    pub dataset: Dataset,
    pub pages_visited: u32,
    pub links_found: usize,
    pub duplicates: usize,
    pub skipped_rows: usize,
}

pub struct CrawlPipeline {
    search: SearchSession,
    traversal: PaginationTraversal,
    from_date: String,
    detail_concurrency: usize,
    row_policy: RowPolicy,
}

impl CrawlPipeline {
    pub fn new(search: SearchSession, traversal: PaginationTraversal, from_date: impl Into<String>) -> Self {
        Self {
            search,
            traversal,
            from_date: from_date.into(),
            detail_concurrency: defaults::DETAIL_CONCURRENCY,
            row_policy: RowPolicy::default(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            SearchSession::from_config(&config.portal, &config.crawl),
            PaginationTraversal::from_config(&config.portal, config.crawl.max_pages),
            config.crawl.effective_from_date(),
        )
        .with_detail_concurrency(config.crawl.detail_concurrency)
        .with_row_policy(config.crawl.on_malformed_row)
    }

    #[must_use]
    pub fn with_detail_concurrency(mut self, concurrency: usize) -> Self {
        self.detail_concurrency = concurrency.max(1);
        self
    }

    #[must_use]
    pub fn with_row_policy(mut self, policy: RowPolicy) -> Self {
        self.row_policy = policy;
        self
    }

    pub fn from_date(&self) -> &str {
        &self.from_date
    }

    /// Full run: search, paginate, then harvest every detail link
    pub async fn run<D, S>(&self, driver: &mut D, source: &S) -> Result<CrawlOutcome, RunFailure>
    where
        D: BrowserDriver + ?Sized,
        S: DetailPageSource + ?Sized,
    {
        if let Err(e) = self.search.submit(driver, &self.from_date).await {
            return Err(RunFailure::new(CrawlError::Search(e), DedupAccumulator::new()));
        }

        let summary = match self.traversal.collect(driver).await {
            Ok(summary) => summary,
            Err(e) => return Err(RunFailure::new(e.into(), DedupAccumulator::new())),
        };

        let mut outcome = self.harvest(summary.links, source).await?;
        outcome.pages_visited = summary.pages_visited;
        Ok(outcome)
    }

    /// Read, extract and accumulate the records behind `links`
    pub async fn harvest<S>(&self, links: DetailLinkSet, source: &S) -> Result<CrawlOutcome, RunFailure>
    where
        S: DetailPageSource + ?Sized,
    {
        let links_found = links.len();
        info!(
            "Reading {} detail pages ({} at a time)",
            links_found, self.detail_concurrency
        );

        let mut accumulator = DedupAccumulator::new();
        let mut skipped_rows = 0;

        let mut pages = stream::iter(links)
            .map(|link| async move {
                let result = source.read(&link).await;
                (link, result)
            })
            .buffered(self.detail_concurrency);

        let mut done = 0;
        while let Some((link, result)) = pages.next().await {
            done += 1;
            let page = match result {
                Ok(page) => page,
                Err(source) => {
                    let error = CrawlError::DetailFetch {
                        link: link.to_string(),
                        source,
                    };
                    return Err(RunFailure::new(error, accumulator));
                }
            };

            let before = accumulator.accepted();
            for (row, raw) in page.rows.iter().enumerate() {
                match FieldExtractor::extract(raw) {
                    Ok(draft) => {
                        accumulator.offer(draft);
                    }
                    Err(source) => {
                        let error = CrawlError::Extraction {
                            link: link.to_string(),
                            row,
                            source,
                        };
                        if self.row_policy == RowPolicy::Skip && error.is_recoverable() {
                            warn!("Skipping malformed row: {}", error);
                            skipped_rows += 1;
                            continue;
                        }
                        return Err(RunFailure::new(error, accumulator));
                    }
                }
            }

            info!(
                "[{}/{}] {}: {} rows, {} new records",
                done,
                links_found,
                link,
                page.rows.len(),
                accumulator.accepted() - before
            );
        }

        debug!(
            "Harvest finished: {} accepted, {} duplicates, {} skipped rows",
            accumulator.accepted(),
            accumulator.duplicates(),
            skipped_rows
        );
        Ok(CrawlOutcome {
            duplicates: accumulator.duplicates(),
            dataset: accumulator.into_dataset(),
            pages_visited: 0,
            links_found,
            skipped_rows,
        })
    }
}
