//! Page driver abstraction
//!
//! The crawl core talks to the portal only through [`BrowserDriver`]. Every
//! call may block on navigation or element waits; the core treats each one
//! as a single call that either returns or fails.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("HTTP request failed: {status} - {url}")]
    HttpStatus { status: u16, url: String },

    #[error("No element matches '{selector}'")]
    ElementNotFound { selector: String },

    #[error("Timed out after {timeout:?} waiting for '{selector}'")]
    Timeout { selector: String, timeout: Duration },

    #[error("Invalid CSS selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("No page is open")]
    NoPage,

    #[error("Cannot interact with '{selector}': {reason}")]
    Interaction { selector: String, reason: String },

    #[error("Failed to start browser: {reason}")]
    Launch { reason: String },

    #[error("Page script failed: {reason}")]
    Script { reason: String },
}

impl DriverError {
    pub fn element_not_found(selector: &str) -> Self {
        Self::ElementNotFound {
            selector: selector.to_string(),
        }
    }

    pub fn navigation(url: &str, reason: impl Into<String>) -> Self {
        Self::Navigation {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    pub fn interaction(selector: &str, reason: impl Into<String>) -> Self {
        Self::Interaction {
            selector: selector.to_string(),
            reason: reason.into(),
        }
    }

    pub fn script(reason: impl Into<String>) -> Self {
        Self::Script { reason: reason.into() }
    }
}

pub type DriverResult<T> = Result<T, DriverError>;

/// Snapshot of one element at the time it was looked up
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    tag: String,
    text: String,
    attributes: HashMap<String, String>,
}

impl Element {
    pub fn new(tag: impl Into<String>, text: impl Into<String>, attributes: HashMap<String, String>) -> Self {
        Self {
            tag: tag.into(),
            text: text.into(),
            attributes,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Rendered text: whitespace runs collapsed, ends trimmed
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Browser-like session over the portal
#[async_trait]
pub trait BrowserDriver: Send {
    /// Navigate to `url`
    async fn open(&mut self, url: &str) -> DriverResult<()>;

    /// Wait until `selector` matches, up to `timeout`
    async fn wait_for_element(&mut self, selector: &str, timeout: Duration) -> DriverResult<()>;

    /// Click the first element matching `selector`
    async fn click(&mut self, selector: &str) -> DriverResult<()>;

    /// Type `value` into the first field matching `selector`
    async fn fill(&mut self, selector: &str, value: &str) -> DriverResult<()>;

    /// First element matching `selector`
    async fn find_element(&mut self, selector: &str) -> DriverResult<Element>;

    /// All elements matching `selector`, in document order
    async fn find_elements(&mut self, selector: &str) -> DriverResult<Vec<Element>>;

    /// For every element matching `scope`, the elements matching `selector`
    /// inside it. Used to read table rows cell by cell.
    async fn find_children(&mut self, scope: &str, selector: &str) -> DriverResult<Vec<Vec<Element>>>;

    /// URL of the page currently shown
    fn current_url(&self) -> Option<&str>;
}

/// Hands out independent drivers, one per detail page read
#[async_trait]
pub trait DriverFactory: Send + Sync {
    type Driver: BrowserDriver;

    async fn new_driver(&self) -> DriverResult<Self::Driver>;

    /// Give back a driver that is no longer needed
    async fn release(&self, driver: Self::Driver) {
        drop(driver);
    }
}
