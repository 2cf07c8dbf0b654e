//! Page fetching for the static page driver
//!
//! [`HttpFetcher`] is a reqwest client with a cookie store and a governor rate
//! limiter, so the portal session (consent cookie) survives across requests
//! and the crawl stays polite. [`InMemoryFetcher`] serves canned pages.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use governor::{Quota, RateLimiter, clock::DefaultClock, state::{InMemoryState, direct::NotKeyed}};
use reqwest::{Client, header::{HeaderMap, HeaderValue, USER_AGENT}};
use tracing::{debug, info};

use super::browser::{DriverError, DriverResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMethod {
    Get,
    Post,
}

/// One page request issued by the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub method: FetchMethod,
    pub url: String,
    pub form: Vec<(String, String)>,
}

impl PageRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: FetchMethod::Get,
            url: url.into(),
            form: Vec::new(),
        }
    }

    pub fn post(url: impl Into<String>, form: Vec<(String, String)>) -> Self {
        Self {
            method: FetchMethod::Post,
            url: url.into(),
            form,
        }
    }
}

/// Fetched HTML and the URL it was served from, after redirects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub url: String,
    pub html: String,
}

/// Source of raw HTML pages
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, request: &PageRequest) -> DriverResult<FetchedPage>;
}

/// HTTP client configuration for crawling
#[derive(Debug, Clone, serde::Serialize)]
pub struct HttpClientConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_requests_per_second: u32,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            user_agent: "efd-ptr-harvester/0.1 (public disclosure research)".to_string(),
            timeout_seconds: 30,
            max_requests_per_second: 2,
        }
    }
}

/// Rate-limited HTTP page fetcher
pub struct HttpFetcher {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    config: HttpClientConfig,
}

impl HttpFetcher {
    pub fn new(config: HttpClientConfig) -> anyhow::Result<Self> {
        use anyhow::Context;

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("Invalid user agent")?,
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .cookie_store(true)
            .gzip(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("Failed to create HTTP client")?;

        let quota = Quota::per_second(
            NonZeroU32::new(config.max_requests_per_second)
                .context("Rate limit must be greater than 0")?,
        );

        Ok(Self {
            client,
            rate_limiter: RateLimiter::direct(quota),
            config,
        })
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, request: &PageRequest) -> DriverResult<FetchedPage> {
        self.rate_limiter.until_ready().await;

        info!("Fetching URL: {}", request.url);

        let builder = match request.method {
            FetchMethod::Get => self.client.get(&request.url),
            FetchMethod::Post => {
                // Django forms on the portal expect the CSRF token echoed back as a header
                let csrf = request
                    .form
                    .iter()
                    .find(|(name, _)| name == "csrfmiddlewaretoken")
                    .map(|(_, value)| value.clone());
                let builder = self
                    .client
                    .post(&request.url)
                    .header(reqwest::header::REFERER, request.url.as_str())
                    .form(&request.form);
                match csrf {
                    Some(token) => builder.header("X-CSRFToken", token),
                    None => builder,
                }
            }
        };

        let response = builder
            .send()
            .await
            .map_err(|e| DriverError::navigation(&request.url, e.to_string()))?;

        if !response.status().is_success() {
            return Err(DriverError::HttpStatus {
                status: response.status().as_u16(),
                url: request.url.clone(),
            });
        }

        let url = response.url().to_string();
        let html = response
            .text()
            .await
            .map_err(|e| DriverError::navigation(&request.url, format!("Failed to read body: {e}")))?;

        debug!("Successfully fetched: {} ({} chars)", url, html.len());
        Ok(FetchedPage { url, html })
    }
}

/// Serves pages from memory, keyed by URL; records every request
#[derive(Debug, Default)]
pub struct InMemoryFetcher {
    pages: HashMap<String, String>,
    requests: Mutex<Vec<PageRequest>>,
}

impl InMemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    pub fn insert(&mut self, url: impl Into<String>, html: impl Into<String>) {
        self.pages.insert(url.into(), html.into());
    }

    /// Requests served so far, in order
    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PageFetcher for InMemoryFetcher {
    async fn fetch(&self, request: &PageRequest) -> DriverResult<FetchedPage> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        self.pages
            .get(&request.url)
            .map(|html| FetchedPage {
                url: request.url.clone(),
                html: html.clone(),
            })
            .ok_or_else(|| DriverError::HttpStatus {
                status: 404,
                url: request.url.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_http_fetcher_creation() {
        let fetcher = HttpFetcher::new(HttpClientConfig::default());
        assert!(fetcher.is_ok());
    }

    #[tokio::test]
    async fn test_zero_rate_limit_is_rejected() {
        let config = HttpClientConfig {
            max_requests_per_second: 0,
            ..Default::default()
        };
        assert!(HttpFetcher::new(config).is_err());
    }

    #[tokio::test]
    async fn test_in_memory_fetcher_serves_and_records() {
        let fetcher = InMemoryFetcher::new().with_page("https://portal.test/a", "<p>a</p>");

        let page = fetcher.fetch(&PageRequest::get("https://portal.test/a")).await.unwrap();
        assert_eq!(page.html, "<p>a</p>");

        let missing = fetcher.fetch(&PageRequest::get("https://portal.test/b")).await;
        assert!(matches!(missing, Err(DriverError::HttpStatus { status: 404, .. })));
        assert_eq!(fetcher.requests().len(), 2);
    }
}
