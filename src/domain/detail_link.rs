//! PTR detail links
//!
//! Only links under the portal's PTR view path are kept; paper filings and
//! other report kinds never enter the link set.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Path prefix of PTR detail ("view") pages on the portal
pub const PTR_VIEW_PATH: &str = "/search/view/ptr";

/// Absolute URL of one PTR detail page
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetailLink(String);

impl DetailLink {
    /// Accept `url` only when it lives under the portal's PTR view path.
    pub fn parse(url: &str, base_url: &str) -> Option<Self> {
        let prefix = format!("{}{}", base_url.trim_end_matches('/'), PTR_VIEW_PATH);
        url.starts_with(&prefix).then(|| Self(url.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for DetailLink {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<DetailLink> for String {
    fn from(link: DetailLink) -> Self {
        link.0
    }
}

impl fmt::Display for DetailLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Detail links in first-seen order, without duplicates
#[derive(Debug, Clone, Default)]
pub struct DetailLinkSet {
    links: Vec<DetailLink>,
    seen: HashSet<String>,
}

impl DetailLinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the link was already present.
    pub fn insert(&mut self, link: DetailLink) -> bool {
        if !self.seen.insert(link.0.clone()) {
            return false;
        }
        self.links.push(link);
        true
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DetailLink> {
        self.links.iter()
    }

    pub fn into_vec(self) -> Vec<DetailLink> {
        self.links
    }
}

impl IntoIterator for DetailLinkSet {
    type Item = DetailLink;
    type IntoIter = std::vec::IntoIter<DetailLink>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.into_iter()
    }
}

impl<'a> IntoIterator for &'a DetailLinkSet {
    type Item = &'a DetailLink;
    type IntoIter = std::slice::Iter<'a, DetailLink>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.iter()
    }
}
