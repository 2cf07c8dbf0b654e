//! Headless Chrome implementation of [`BrowserDriver`]
//!
//! The portal's consent form and the listing's "next" control are driven by
//! page scripts, so live runs go through a real browser. One
//! [`ChromeSession`] owns the browser process; every [`ChromeDriver`] it
//! hands out is a separate tab.
//!
//! Element lookups run `querySelectorAll` in the page and return JSON
//! snapshots, so the crawl core sees the same [`Element`] shape as with the
//! static driver.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use super::browser::{BrowserDriver, DriverError, DriverFactory, DriverResult, Element};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Snapshot helper shared by the query scripts. URL attributes are resolved
/// against the document, like the static driver does.
const SNAPSHOT_FN: &str = r"const snap = (el) => {
    const attributes = {};
    for (const attr of el.attributes) { attributes[attr.name] = attr.value; }
    for (const name of ['href', 'action', 'src']) {
        if (el.hasAttribute(name)) {
            try { attributes[name] = new URL(el.getAttribute(name), document.baseURI).href; } catch (_) {}
        }
    }
    const text = (el.innerText ?? el.textContent ?? '').replace(/\s+/g, ' ').trim();
    return { tag: el.tagName.toLowerCase(), text, attributes };
};";

/// Browser launch and interaction settings
#[derive(Debug, Clone)]
pub struct ChromeConfig {
    pub headless: bool,
    /// Chrome binary; auto-detected when unset
    pub executable: Option<PathBuf>,
    /// Extra command line switches
    pub args: Vec<String>,
    pub navigation_timeout: Duration,
    /// Pause after each click so scripted updates can finish
    pub settle: Duration,
}

impl Default for ChromeConfig {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            args: Vec::new(),
            navigation_timeout: Duration::from_secs(30),
            settle: Duration::from_secs(2),
        }
    }
}

struct SessionInner {
    browser: Mutex<Browser>,
    handler: Mutex<Option<JoinHandle<()>>>,
    config: ChromeConfig,
}

/// A running browser process
#[derive(Clone)]
pub struct ChromeSession {
    inner: Arc<SessionInner>,
}

impl ChromeSession {
    pub async fn launch(config: ChromeConfig) -> DriverResult<Self> {
        let mut builder = BrowserConfig::builder().request_timeout(config.navigation_timeout);
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &config.executable {
            builder = builder.chrome_executable(path);
        }
        for arg in &config.args {
            builder = builder.arg(arg.clone());
        }
        let browser_config = builder.build().map_err(|reason| DriverError::Launch { reason })?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| DriverError::Launch { reason: e.to_string() })?;

        // The CDP connection only makes progress while its handler is polled
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler stopped: {}", e);
                    break;
                }
            }
        });

        info!("Chrome started (headless: {})", config.headless);
        Ok(Self {
            inner: Arc::new(SessionInner {
                browser: Mutex::new(browser),
                handler: Mutex::new(Some(handler)),
                config,
            }),
        })
    }

    /// Open a new tab
    pub async fn open_driver(&self) -> DriverResult<ChromeDriver> {
        let page = self
            .inner
            .browser
            .lock()
            .await
            .new_page("about:blank")
            .await
            .map_err(|e| DriverError::Launch { reason: e.to_string() })?;
        Ok(ChromeDriver {
            page,
            url: None,
            navigation_timeout: self.inner.config.navigation_timeout,
            settle: self.inner.config.settle,
        })
    }

    /// Close the browser and stop its handler task
    pub async fn close(&self) {
        {
            let mut browser = self.inner.browser.lock().await;
            if let Err(e) = browser.close().await {
                warn!("Failed to close browser: {}", e);
            }
            if let Err(e) = browser.wait().await {
                warn!("Failed to wait for browser exit: {}", e);
            }
        }
        if let Some(handler) = self.inner.handler.lock().await.take() {
            handler.abort();
        }
        debug!("Chrome closed");
    }
}

#[async_trait]
impl DriverFactory for ChromeSession {
    type Driver = ChromeDriver;

    async fn new_driver(&self) -> DriverResult<ChromeDriver> {
        self.open_driver().await
    }

    async fn release(&self, driver: ChromeDriver) {
        // Pages stay open until closed explicitly
        if let Err(e) = driver.page.close().await {
            warn!("Failed to close tab: {}", e);
        }
    }
}

/// One browser tab
pub struct ChromeDriver {
    page: Page,
    url: Option<String>,
    navigation_timeout: Duration,
    settle: Duration,
}

impl ChromeDriver {
    async fn refresh_url(&mut self) {
        match self.page.url().await {
            Ok(url) => self.url = url,
            Err(e) => debug!("Could not read page URL: {}", e),
        }
    }

    /// Run `script`, which must evaluate to a JSON string, and decode it
    async fn eval_json<T: DeserializeOwned>(&self, script: &str) -> DriverResult<T> {
        let raw: String = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| DriverError::script(e.to_string()))?
            .into_value()
            .map_err(|e| DriverError::script(e.to_string()))?;
        serde_json::from_str(&raw).map_err(|e| DriverError::script(e.to_string()))
    }

    async fn query(&self, selector: &str) -> DriverResult<Vec<Element>> {
        let snapshots: Vec<Snapshot> = self.eval_json(&query_script(selector)).await?;
        Ok(snapshots.into_iter().map(Element::from).collect())
    }
}

#[async_trait]
impl BrowserDriver for ChromeDriver {
    async fn open(&mut self, url: &str) -> DriverResult<()> {
        debug!("Navigating: {}", url);
        tokio::time::timeout(self.navigation_timeout, self.page.goto(url))
            .await
            .map_err(|_| {
                DriverError::navigation(url, format!("timed out after {:?}", self.navigation_timeout))
            })?
            .map_err(|e| DriverError::navigation(url, e.to_string()))?;
        self.refresh_url().await;
        Ok(())
    }

    async fn wait_for_element(&mut self, selector: &str, timeout: Duration) -> DriverResult<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if !self.query(selector).await?.is_empty() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DriverError::Timeout {
                    selector: selector.to_string(),
                    timeout,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn click(&mut self, selector: &str) -> DriverResult<()> {
        if self.query(selector).await?.is_empty() {
            return Err(DriverError::element_not_found(selector));
        }
        self.page
            .find_element(selector)
            .await
            .map_err(|e| DriverError::interaction(selector, e.to_string()))?
            .click()
            .await
            .map_err(|e| DriverError::interaction(selector, e.to_string()))?;

        trace!("Clicked '{}', settling for {:?}", selector, self.settle);
        tokio::time::sleep(self.settle).await;
        self.refresh_url().await;
        Ok(())
    }

    async fn fill(&mut self, selector: &str, value: &str) -> DriverResult<()> {
        let filled: bool = self.eval_json(&fill_script(selector, value)).await?;
        if !filled {
            return Err(DriverError::element_not_found(selector));
        }
        Ok(())
    }

    async fn find_element(&mut self, selector: &str) -> DriverResult<Element> {
        self.query(selector)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DriverError::element_not_found(selector))
    }

    async fn find_elements(&mut self, selector: &str) -> DriverResult<Vec<Element>> {
        self.query(selector).await
    }

    async fn find_children(&mut self, scope: &str, selector: &str) -> DriverResult<Vec<Vec<Element>>> {
        let groups: Vec<Vec<Snapshot>> = self.eval_json(&children_script(scope, selector)).await?;
        Ok(groups
            .into_iter()
            .map(|group| group.into_iter().map(Element::from).collect())
            .collect())
    }

    fn current_url(&self) -> Option<&str> {
        self.url.as_deref()
    }
}

/// Element as serialized by [`SNAPSHOT_FN`]
#[derive(Debug, Deserialize)]
struct Snapshot {
    tag: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    attributes: HashMap<String, String>,
}

impl From<Snapshot> for Element {
    fn from(snapshot: Snapshot) -> Self {
        Self::new(snapshot.tag, snapshot.text, snapshot.attributes)
    }
}

/// JavaScript string literal for `value`
fn js_string(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

fn query_script(selector: &str) -> String {
    format!(
        "(() => {{ {SNAPSHOT_FN} return JSON.stringify(Array.from(document.querySelectorAll({})).map(snap)); }})()",
        js_string(selector)
    )
}

fn children_script(scope: &str, selector: &str) -> String {
    format!(
        "(() => {{ {SNAPSHOT_FN} return JSON.stringify(Array.from(document.querySelectorAll({})).map(\
         (parent) => Array.from(parent.querySelectorAll({})).map(snap))); }})()",
        js_string(scope),
        js_string(selector)
    )
}

/// Sets the field value and fires the events a user's typing would
fn fill_script(selector: &str, value: &str) -> String {
    format!(
        "(() => {{ const el = document.querySelector({}); if (!el) {{ return JSON.stringify(false); }} \
         el.focus(); el.value = {}; \
         el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
         el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
         return JSON.stringify(true); }})()",
        js_string(selector),
        js_string(value)
    )
}
