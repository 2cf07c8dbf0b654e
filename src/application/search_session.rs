//! Search form session
//!
//! Accepts the portal's consent statement, restricts the search to senator
//! filers from a given date, and submits it. The driver is left on the first
//! listing page.

use std::time::Duration;

use tracing::info;

use crate::infrastructure::browser::{BrowserDriver, DriverResult};
use crate::infrastructure::config::{CrawlConfig, PortalConfig};
use crate::infrastructure::parsing::PortalSelectors;

#[derive(Debug, Clone)]
pub struct SearchSession {
    home_url: String,
    selectors: PortalSelectors,
    wait_timeout: Duration,
}

impl SearchSession {
    pub fn new(home_url: impl Into<String>, selectors: PortalSelectors, wait_timeout: Duration) -> Self {
        Self {
            home_url: home_url.into(),
            selectors,
            wait_timeout,
        }
    }

    pub fn from_config(portal: &PortalConfig, crawl: &CrawlConfig) -> Self {
        Self::new(portal.search_home_url(), portal.selectors.clone(), crawl.wait_timeout())
    }

    /// Run the search for reports filed since `from_date` (`MM/DD/YYYY`)
    pub async fn submit<D>(&self, driver: &mut D, from_date: &str) -> DriverResult<()>
    where
        D: BrowserDriver + ?Sized,
    {
        let s = &self.selectors;

        info!("Opening search page: {}", self.home_url);
        driver.open(&self.home_url).await?;

        self.wait_and_click(driver, &s.agree_checkbox).await?;
        self.wait_and_click(driver, &s.senator_filer).await?;

        driver.wait_for_element(&s.from_date_field, self.wait_timeout).await?;
        driver.fill(&s.from_date_field, from_date).await?;

        driver.wait_for_element(&s.search_button, self.wait_timeout).await?;
        driver.click(&s.search_button).await?;

        info!(
            "Search submitted for senator PTRs since {} ({})",
            from_date,
            driver.current_url().unwrap_or("unknown page")
        );
        Ok(())
    }

    async fn wait_and_click<D>(&self, driver: &mut D, selector: &str) -> DriverResult<()>
    where
        D: BrowserDriver + ?Sized,
    {
        driver.wait_for_element(selector, self.wait_timeout).await?;
        driver.click(selector).await
    }
}
