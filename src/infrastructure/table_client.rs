//! Remote table store clients
//!
//! The export coordinator writes one item per record through [`TableClient`].
//! [`HttpTableClient`] sends PutItem-shaped JSON to a table endpoint;
//! request signing is left to the endpoint side (a signing gateway or a local
//! table emulator). [`InMemoryTableClient`] keeps items in memory.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::debug;

/// Item written to the table: field name to value
pub type TableItem = Map<String, Value>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableClientError {
    #[error("Credentials rejected by table store: {message}")]
    Credentials { message: String },

    #[error("Table client error: {message}")]
    Client { message: String },
}

impl TableClientError {
    pub fn credentials(message: impl Into<String>) -> Self {
        Self::Credentials {
            message: message.into(),
        }
    }

    pub fn client(message: impl Into<String>) -> Self {
        Self::Client {
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait TableClient: Send + Sync {
    /// Write (insert or overwrite) one item into `table`
    async fn put_item(&self, table: &str, item: &TableItem) -> Result<(), TableClientError>;
}

/// Connection settings for [`HttpTableClient`]
#[derive(Debug, Clone)]
pub struct HttpTableSettings {
    pub endpoint: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    pub timeout: Duration,
}

/// PutItem over HTTP
pub struct HttpTableClient {
    client: Client,
    settings: HttpTableSettings,
}

impl HttpTableClient {
    pub fn new(settings: HttpTableSettings) -> Result<Self, TableClientError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| TableClientError::client(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, settings })
    }

    /// PutItem request body with every attribute typed as a string
    pub fn put_item_body(table: &str, item: &TableItem) -> Value {
        let attributes: BTreeMap<&str, Value> = item
            .iter()
            .map(|(name, value)| {
                let text = value.as_str().map_or_else(|| value.to_string(), ToString::to_string);
                (name.as_str(), json!({ "S": text }))
            })
            .collect();
        json!({ "TableName": table, "Item": attributes })
    }

    /// Outcome of a PutItem response: 401/403 mean the credentials were
    /// refused, any other non-success status is a client error
    pub fn check_status(status: StatusCode, body: &str) -> Result<(), TableClientError> {
        if status.is_success() {
            return Ok(());
        }
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(TableClientError::credentials(format!("{status}: {body}")))
            }
            _ => Err(TableClientError::client(format!("{status}: {body}"))),
        }
    }
}

#[async_trait]
impl TableClient for HttpTableClient {
    async fn put_item(&self, table: &str, item: &TableItem) -> Result<(), TableClientError> {
        let response = self
            .client
            .post(&self.settings.endpoint)
            .header("X-Amz-Target", "DynamoDB_20120810.PutItem")
            .header("Content-Type", "application/x-amz-json-1.0")
            .header("X-Table-Region", &self.settings.region)
            .basic_auth(&self.settings.access_key, Some(&self.settings.secret_key))
            .json(&Self::put_item_body(table, item))
            .send()
            .await
            .map_err(|e| TableClientError::client(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!("Put item into {} ({})", table, status);
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Self::check_status(status, &body)
    }
}

/// Table store kept in memory, keyed by table then item `id`
#[derive(Debug, Default)]
pub struct InMemoryTableClient {
    tables: Mutex<BTreeMap<String, BTreeMap<String, TableItem>>>,
}

impl InMemoryTableClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Items of `table`, ordered by `id`
    pub fn items(&self, table: &str) -> Vec<TableItem> {
        self.tables
            .lock()
            .ok()
            .and_then(|tables| tables.get(table).map(|items| items.values().cloned().collect()))
            .unwrap_or_default()
    }
}

#[async_trait]
impl TableClient for InMemoryTableClient {
    async fn put_item(&self, table: &str, item: &TableItem) -> Result<(), TableClientError> {
        let id = item
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| TableClientError::client("item has no string 'id' key"))?
            .to_string();
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| TableClientError::client("table store lock poisoned"))?;
        tables.entry(table.to_string()).or_default().insert(id, item.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, amount: &str) -> TableItem {
        let mut item = TableItem::new();
        item.insert("id".to_string(), json!(id));
        item.insert("amount".to_string(), json!(amount));
        item
    }

    #[test]
    fn test_put_item_body_types_attributes_as_strings() {
        let body = HttpTableClient::put_item_body("ptr", &item("abc", "$1,001 - $15,000"));
        assert_eq!(body["TableName"], "ptr");
        assert_eq!(body["Item"]["id"]["S"], "abc");
        assert_eq!(body["Item"]["amount"]["S"], "$1,001 - $15,000");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(HttpTableClient::check_status(StatusCode::OK, ""), Ok(()));
        assert_eq!(
            HttpTableClient::check_status(StatusCode::UNAUTHORIZED, "missing token"),
            Err(TableClientError::credentials("401 Unauthorized: missing token"))
        );
        assert!(matches!(
            HttpTableClient::check_status(StatusCode::FORBIDDEN, "expired"),
            Err(TableClientError::Credentials { .. })
        ));
        for status in [StatusCode::BAD_REQUEST, StatusCode::NOT_FOUND, StatusCode::INTERNAL_SERVER_ERROR] {
            assert!(matches!(
                HttpTableClient::check_status(status, "nope"),
                Err(TableClientError::Client { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_in_memory_put_overwrites_by_id() {
        let client = InMemoryTableClient::new();
        client.put_item("ptr", &item("a", "1")).await.unwrap();
        client.put_item("ptr", &item("a", "2")).await.unwrap();
        client.put_item("ptr", &item("b", "3")).await.unwrap();

        let items = client.items("ptr");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["amount"], "2");
    }

    #[tokio::test]
    async fn test_in_memory_rejects_item_without_id() {
        let client = InMemoryTableClient::new();
        let result = client.put_item("ptr", &TableItem::new()).await;
        assert!(matches!(result, Err(TableClientError::Client { .. })));
    }
}
