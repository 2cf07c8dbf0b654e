//! Detail page reading
//!
//! A [`DetailPageSource`] turns one detail link into the raw rows of its
//! transaction table. [`DetailPageReader`] opens each link in a fresh driver
//! from its [`DriverFactory`] (a Chrome tab, or a static driver over a
//! fetcher), so reads for different links never share page state and can run
//! side by side.

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::domain::detail_link::DetailLink;
use crate::domain::record::RawRow;
use crate::infrastructure::browser::{BrowserDriver, DriverFactory, DriverResult, Element};
use crate::infrastructure::parsing::PortalSelectors;

/// Raw rows read from one detail page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailPage {
    pub link: DetailLink,
    pub filer_label: String,
    pub rows: Vec<RawRow>,
}

#[async_trait]
pub trait DetailPageSource: Send + Sync {
    async fn read(&self, link: &DetailLink) -> DriverResult<DetailPage>;
}

pub struct DetailPageReader<P: DriverFactory> {
    drivers: P,
    selectors: PortalSelectors,
}

impl<P: DriverFactory> DetailPageReader<P> {
    pub fn new(drivers: P, selectors: PortalSelectors) -> Self {
        Self { drivers, selectors }
    }

    async fn read_with(&self, driver: &mut P::Driver, link: &DetailLink) -> DriverResult<DetailPage> {
        driver.open(link.as_str()).await?;

        let filer_label = driver.find_element(&self.selectors.filer_label).await?.text().to_string();
        let rows: Vec<RawRow> = driver
            .find_children(&self.selectors.detail_rows, &self.selectors.detail_cells)
            .await?
            .into_iter()
            // header-only rows carry no cells
            .filter(|cells| !cells.is_empty())
            .map(|cells| {
                let cells = cells.iter().map(Element::text).map(ToString::to_string).collect();
                RawRow::new(cells, filer_label.as_str())
            })
            .collect();

        trace!("Filer label on {}: {}", link, filer_label);
        debug!("Read {} transaction rows from {}", rows.len(), link);
        Ok(DetailPage {
            link: link.clone(),
            filer_label,
            rows,
        })
    }
}

#[async_trait]
impl<P: DriverFactory> DetailPageSource for DetailPageReader<P> {
    async fn read(&self, link: &DetailLink) -> DriverResult<DetailPage> {
        let mut driver = self.drivers.new_driver().await?;
        let result = self.read_with(&mut driver, link).await;
        self.drivers.release(driver).await;
        result
    }
}
