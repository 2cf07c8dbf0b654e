//! Pagination traversal engine
//!
//! Walks the listing pages the search produced, collecting PTR detail links
//! until the "next" control reports itself disabled. The walk is an explicit
//! loop, so the number of pages is bounded only by the portal (or by
//! `max_pages` when configured).

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::detail_link::{DetailLink, DetailLinkSet};
use crate::infrastructure::browser::{BrowserDriver, DriverError};
use crate::infrastructure::config::PortalConfig;
use crate::infrastructure::parsing::PortalSelectors;

#[derive(Error, Debug)]
pub enum TraversalError {
    #[error("Results container '{selector}' not found on {url}")]
    ResultsContainerMissing { selector: String, url: String },

    #[error("Next-page control '{selector}' not found on {url}")]
    NextControlMissing { selector: String, url: String },

    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Links collected by one traversal
#[derive(Debug, Clone, Default)]
pub struct TraversalSummary {
    pub links: DetailLinkSet,
    pub pages_visited: u32,
}

#[derive(Debug, Clone)]
pub struct PaginationTraversal {
    base_url: String,
    selectors: PortalSelectors,
    max_pages: Option<u32>,
}

impl PaginationTraversal {
    pub fn new(base_url: impl Into<String>, selectors: PortalSelectors) -> Self {
        Self {
            base_url: base_url.into(),
            selectors,
            max_pages: None,
        }
    }

    pub fn from_config(portal: &PortalConfig, max_pages: Option<u32>) -> Self {
        Self::new(portal.base_url(), portal.selectors.clone()).with_max_pages(max_pages)
    }

    #[must_use]
    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Collect detail links starting from the page the driver is on
    pub async fn collect<D>(&self, driver: &mut D) -> Result<TraversalSummary, TraversalError>
    where
        D: BrowserDriver + ?Sized,
    {
        let s = &self.selectors;
        let mut summary = TraversalSummary::default();

        loop {
            let url = driver.current_url().unwrap_or_default().to_string();

            if driver.find_elements(&s.results_container).await?.is_empty() {
                return Err(TraversalError::ResultsContainerMissing {
                    selector: s.results_container.clone(),
                    url,
                });
            }
            summary.pages_visited += 1;

            let mut added = 0;
            for anchor in driver.find_elements(&s.result_link).await? {
                let Some(href) = anchor.get_attribute("href") else {
                    continue;
                };
                match DetailLink::parse(href, &self.base_url) {
                    Some(link) => {
                        if summary.links.insert(link) {
                            added += 1;
                        }
                    }
                    None => debug!("Ignoring non-PTR link: {}", href),
                }
            }
            info!(
                "Listing page {}: {} new detail links ({} total)",
                summary.pages_visited,
                added,
                summary.links.len()
            );

            let next = driver
                .find_elements(&s.next_control)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| TraversalError::NextControlMissing {
                    selector: s.next_control.clone(),
                    url: url.clone(),
                })?;

            let disabled = next
                .get_attribute("class")
                .is_some_and(|class| class.contains(s.disabled_marker.as_str()));
            if disabled {
                debug!("Next control disabled on {}", url);
                break;
            }

            if self.max_pages.is_some_and(|max| summary.pages_visited >= max) {
                warn!(
                    "Stopping pagination at the configured limit of {} pages; later pages are not collected",
                    summary.pages_visited
                );
                break;
            }

            driver.click(&s.next_control).await?;
        }

        info!(
            "Pagination finished: {} pages, {} detail links",
            summary.pages_visited,
            summary.links.len()
        );
        Ok(summary)
    }
}
