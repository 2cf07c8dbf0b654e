//! Export coordinator
//!
//! Writes a finished dataset to the enabled sinks. The sinks are independent:
//! a CSV failure does not stop the remote export and the reverse. The remote
//! sink writes one item per record and stops at the first failed write,
//! reporting how many items went through. Nothing is retried or rolled back.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::domain::dataset::Dataset;
use crate::infrastructure::config::{ConfigError, ExportConfig, RemoteSettings};
use crate::infrastructure::csv_sink::{CsvSink, CsvSinkError};
use crate::infrastructure::table_client::{
    HttpTableClient, HttpTableSettings, TableClient, TableClientError,
};

const REMOTE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Csv(#[from] CsvSinkError),

    #[error("Remote export stopped after {written} items: {source}")]
    Remote {
        written: usize,
        #[source]
        source: TableClientError,
    },
}

/// Result of exporting to one sink
#[derive(Debug)]
pub enum SinkOutcome {
    /// Sink disabled, or nothing to export
    Skipped,
    Written { count: usize },
    Failed(ExportError),
}

impl SinkOutcome {
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Rows or items that reached the sink
    pub const fn written(&self) -> usize {
        match self {
            Self::Skipped => 0,
            Self::Written { count } => *count,
            Self::Failed(ExportError::Remote { written, .. }) => *written,
            Self::Failed(ExportError::Csv(_)) => 0,
        }
    }
}

#[derive(Debug)]
pub struct ExportReport {
    pub csv: SinkOutcome,
    pub remote: SinkOutcome,
}

impl ExportReport {
    const fn skipped() -> Self {
        Self {
            csv: SinkOutcome::Skipped,
            remote: SinkOutcome::Skipped,
        }
    }

    pub const fn is_success(&self) -> bool {
        !self.csv.is_failed() && !self.remote.is_failed()
    }
}

/// Remote table sink: one `put_item` per record into `table`
pub struct RemoteTableSink {
    table: String,
    client: Arc<dyn TableClient>,
}

impl RemoteTableSink {
    pub fn new(table: impl Into<String>, client: Arc<dyn TableClient>) -> Self {
        Self {
            table: table.into(),
            client,
        }
    }

    pub fn from_settings(settings: &RemoteSettings) -> Result<Self, ConfigError> {
        let client = HttpTableClient::new(HttpTableSettings {
            endpoint: settings.endpoint.clone(),
            region: settings.region.clone(),
            access_key: settings.access_key.clone(),
            secret_key: settings.secret_key.clone(),
            timeout: REMOTE_TIMEOUT,
        })
        .map_err(|e| ConfigError::Validation {
            message: format!("remote table client: {e}"),
        })?;
        Ok(Self::new(settings.table.clone(), Arc::new(client)))
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Write every record in order; the first failure ends the batch
    pub async fn write(&self, dataset: &Dataset) -> Result<usize, ExportError> {
        let mut written = 0;
        for record in dataset {
            self.client
                .put_item(&self.table, &record.to_item())
                .await
                .map_err(|source| ExportError::Remote { written, source })?;
            written += 1;
        }
        Ok(written)
    }
}

pub struct ExportCoordinator {
    csv: Option<CsvSink>,
    remote: Option<RemoteTableSink>,
}

impl ExportCoordinator {
    pub const fn new(csv: Option<CsvSink>, remote: Option<RemoteTableSink>) -> Self {
        Self { csv, remote }
    }

    /// Validate `config` and build the enabled sinks
    pub fn from_config(config: &ExportConfig) -> Result<Self, ConfigError> {
        let remote = config
            .validate()?
            .map(|settings| RemoteTableSink::from_settings(&settings))
            .transpose()?;
        let csv = config
            .csv_enabled
            .then(|| CsvSink::new(config.csv_path.clone()));
        Ok(Self::new(csv, remote))
    }

    pub async fn export(&self, dataset: &Dataset) -> ExportReport {
        if dataset.is_empty() {
            info!("Dataset is empty; nothing to export");
            return ExportReport::skipped();
        }
        if self.csv.is_none() && self.remote.is_none() {
            warn!("No export sink enabled; {} records were not exported", dataset.len());
            return ExportReport::skipped();
        }

        let csv = match &self.csv {
            None => SinkOutcome::Skipped,
            Some(sink) => match sink.write(dataset) {
                Ok(count) => SinkOutcome::Written { count },
                Err(e) => {
                    error!("CSV export to {} failed: {}", sink.path().display(), e);
                    SinkOutcome::Failed(e.into())
                }
            },
        };

        let remote = match &self.remote {
            None => SinkOutcome::Skipped,
            Some(sink) => match sink.write(dataset).await {
                Ok(count) => {
                    info!("Wrote {} items to table {}", count, sink.table());
                    SinkOutcome::Written { count }
                }
                Err(e) => {
                    error!("Remote export to table {} failed: {}", sink.table(), e);
                    SinkOutcome::Failed(e)
                }
            },
        };

        ExportReport { csv, remote }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::domain::dataset::DedupAccumulator;
    use crate::domain::record::fixtures::sample_draft;
    use crate::infrastructure::table_client::{InMemoryTableClient, TableItem};

    /// Accepts writes until `fail_at` (0-based), then rejects every call
    struct FailingClient {
        fail_at: usize,
        attempts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TableClient for FailingClient {
        async fn put_item(&self, _table: &str, item: &TableItem) -> Result<(), TableClientError> {
            let mut attempts = self.attempts.lock().unwrap();
            attempts.push(item["id"].as_str().unwrap().to_string());
            if attempts.len() > self.fail_at {
                return Err(TableClientError::client("throttled"));
            }
            Ok(())
        }
    }

    fn dataset(amounts: &[&str]) -> Dataset {
        let mut acc = DedupAccumulator::new();
        for amount in amounts {
            acc.offer(sample_draft(amount));
        }
        acc.into_dataset()
    }

    #[tokio::test]
    async fn test_partial_remote_failure_reports_written_count() {
        let client = Arc::new(FailingClient {
            fail_at: 1,
            attempts: Mutex::new(Vec::new()),
        });
        let coordinator =
            ExportCoordinator::new(None, Some(RemoteTableSink::new("ptr", client.clone())));

        let report = coordinator.export(&dataset(&["$1", "$2", "$3"])).await;

        assert!(matches!(
            report.remote,
            SinkOutcome::Failed(ExportError::Remote { written: 1, .. })
        ));
        assert_eq!(report.remote.written(), 1);
        // the third record is never attempted
        assert_eq!(client.attempts.lock().unwrap().len(), 2);
        assert!(matches!(report.csv, SinkOutcome::Skipped));
    }

    #[tokio::test]
    async fn test_empty_dataset_skips_every_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let client = Arc::new(InMemoryTableClient::new());
        let coordinator = ExportCoordinator::new(
            Some(CsvSink::new(&path)),
            Some(RemoteTableSink::new("ptr", client.clone())),
        );

        let report = coordinator.export(&Dataset::default()).await;

        assert!(matches!(report.csv, SinkOutcome::Skipped));
        assert!(matches!(report.remote, SinkOutcome::Skipped));
        assert!(!path.exists());
        assert!(client.items("ptr").is_empty());
    }

    #[tokio::test]
    async fn test_csv_failure_does_not_stop_remote() {
        let dir = tempfile::tempdir().unwrap();
        let blocked = dir.path().join("blocked");
        std::fs::create_dir(&blocked).unwrap();
        std::fs::write(blocked.join("keep"), "x").unwrap();

        let client = Arc::new(InMemoryTableClient::new());
        let coordinator = ExportCoordinator::new(
            Some(CsvSink::new(&blocked)),
            Some(RemoteTableSink::new("ptr", client.clone())),
        );

        let report = coordinator.export(&dataset(&["$1", "$2"])).await;

        assert!(report.csv.is_failed());
        assert_eq!(report.remote.written(), 2);
        assert_eq!(client.items("ptr").len(), 2);
        assert!(!report.is_success());
    }

    #[test]
    fn test_from_config_rejects_incomplete_remote() {
        let config = ExportConfig {
            remote_enabled: true,
            remote_region: Some("us-east-1".to_string()),
            remote_table: Some("ptr".to_string()),
            remote_access_key: Some("key".to_string()),
            remote_secret_key: None,
            ..Default::default()
        };
        assert!(matches!(
            ExportCoordinator::from_config(&config),
            Err(ConfigError::MissingRemoteField { field: "remote_secret_key" })
        ));
    }

    #[test]
    fn test_from_config_builds_enabled_sinks() {
        let coordinator = ExportCoordinator::from_config(&ExportConfig::default()).unwrap();
        assert!(coordinator.csv.is_some());
        assert!(coordinator.remote.is_none());
    }
}
