//! eFD PTR harvester
//!
//! Usage: `efd-ptr-harvester [CONFIG]` where CONFIG is a config file path
//! (extension optional, default `efd`). Settings can also come from
//! `EFD_*` environment variables.
//!
//! The portal is driven through headless Chrome unless `browser.driver` is
//! `"static"`.
//!
//! Configuration errors stop the process with a non-zero exit before any
//! network activity. Every later failure is logged with the phase it
//! happened in and the process exits normally.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};

use efd_ptr_harvester::application::{
    CrawlOutcome, CrawlPipeline, DetailPageReader, ExportCoordinator, ExportReport, RunFailure,
    SinkOutcome,
};
use efd_ptr_harvester::infrastructure::{
    AppConfig, ChromeSession, DriverFactory, DriverKind, DriverResult, HttpFetcher, PortalSelectors,
    init_logging_with_config, log_system_info,
};

const DEFAULT_CONFIG: &str = "efd";

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = AppConfig::load(&config_path).context("Failed to load configuration")?;
    let exporter =
        ExportCoordinator::from_config(&config.export).context("Invalid export configuration")?;

    init_logging_with_config(config.effective_logging()).context("Failed to initialize logging")?;
    log_system_info();

    let pipeline = CrawlPipeline::from_config(&config);
    let selectors = config.portal.selectors.clone();

    println!("🚀 eFD PTR harvester");
    println!("{}", "=".repeat(60));
    println!("🔎 Searching senator PTRs filed since {}", pipeline.from_date());

    let result = match config.browser.driver {
        DriverKind::Chrome => {
            match ChromeSession::launch(config.browser.chrome_config(&config.portal)).await {
                Ok(session) => {
                    let result = crawl(&pipeline, session.clone(), selectors).await;
                    session.close().await;
                    result
                }
                Err(e) => Err(e),
            }
        }
        DriverKind::Static => {
            let fetcher = Arc::new(
                HttpFetcher::new(config.portal.http_client_config())
                    .context("Failed to create HTTP client")?,
            );
            crawl(&pipeline, fetcher, selectors).await
        }
    };

    let outcome = match result {
        Ok(Ok(outcome)) => outcome,
        Err(e) => {
            error!("Page driver unavailable: {}", e);
            println!("❌ Could not start the page driver: {e}");
            return Ok(());
        }
        Ok(Err(failure)) => {
            error!(phase = %failure.phase, "{}", failure.error);
            println!("❌ Run failed during {}: {}", failure.phase, failure.error);
            println!(
                "   {} records had been collected; nothing was exported",
                failure.partial.len()
            );
            return Ok(());
        }
    };

    println!(
        "📄 {} listing pages, {} detail links, {} duplicates dropped",
        outcome.pages_visited, outcome.links_found, outcome.duplicates
    );
    if outcome.skipped_rows > 0 {
        println!("⚠️  {} malformed rows skipped", outcome.skipped_rows);
    }

    let report = exporter.export(&outcome.dataset).await;
    print_report(&report);

    info!("Run complete: {} records", outcome.dataset.len());
    println!("✅ Done: {} records", outcome.dataset.len());
    Ok(())
}

/// Run the pipeline with drivers from `drivers`: one for the search and
/// listing, one per detail page
async fn crawl<P: DriverFactory>(
    pipeline: &CrawlPipeline,
    drivers: P,
    selectors: PortalSelectors,
) -> DriverResult<Result<CrawlOutcome, RunFailure>> {
    let mut driver = drivers.new_driver().await?;
    let reader = DetailPageReader::new(drivers, selectors);
    Ok(pipeline.run(&mut driver, &reader).await)
}

fn print_report(report: &ExportReport) {
    for (sink, outcome) in [("CSV", &report.csv), ("Remote table", &report.remote)] {
        match outcome {
            SinkOutcome::Skipped => println!("   {sink}: skipped"),
            SinkOutcome::Written { count } => println!("💾 {sink}: {count} written"),
            SinkOutcome::Failed(e) => println!("❌ {sink}: {e} ({} written)", outcome.written()),
        }
    }
}
