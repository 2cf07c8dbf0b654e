//! Export coordinator behaviour through the public API

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use efd_ptr_harvester::application::{ExportCoordinator, ExportError, RemoteTableSink, SinkOutcome};
use efd_ptr_harvester::domain::{Dataset, DedupAccumulator, RawRow};
use efd_ptr_harvester::infrastructure::{
    ConfigError, CsvSink, ExportConfig, FieldExtractor, TableClient, TableClientError, TableItem,
};

/// Rejects the second write with a credentials error
struct RejectSecond {
    seen: Mutex<Vec<String>>,
}

#[async_trait]
impl TableClient for RejectSecond {
    async fn put_item(&self, _table: &str, item: &TableItem) -> Result<(), TableClientError> {
        let mut seen = self.seen.lock().unwrap();
        seen.push(item["amount"].as_str().unwrap_or_default().to_string());
        if seen.len() == 2 {
            return Err(TableClientError::credentials("403 Forbidden: token expired"));
        }
        Ok(())
    }
}

fn dataset(amounts: &[&str]) -> Dataset {
    let mut acc = DedupAccumulator::new();
    for amount in amounts {
        let cells = ["1", "9/30/2025", "Self", "--", "US Treasury Bill", "Government Security", "Purchase", amount, "--"];
        let row = RawRow::new(
            cells.iter().map(ToString::to_string).collect(),
            "The Honorable Jane Doe (Doe, Jane)",
        );
        acc.offer(FieldExtractor::extract(&row).unwrap());
    }
    acc.into_dataset()
}

#[tokio::test]
async fn remote_failure_on_second_write_stops_the_batch() {
    let client = Arc::new(RejectSecond {
        seen: Mutex::new(Vec::new()),
    });
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("out.csv");
    let exporter = ExportCoordinator::new(
        Some(CsvSink::new(&csv_path)),
        Some(RemoteTableSink::new("ptr", client.clone())),
    );

    let report = exporter
        .export(&dataset(&["$1,001 - $15,000", "$15,001 - $50,000", "$50,001 - $100,000"]))
        .await;

    match &report.remote {
        SinkOutcome::Failed(ExportError::Remote { written, source }) => {
            assert_eq!(*written, 1);
            assert!(matches!(source, TableClientError::Credentials { .. }));
        }
        other => panic!("expected a remote failure, got {other:?}"),
    }
    assert_eq!(
        *client.seen.lock().unwrap(),
        vec!["$1,001 - $15,000".to_string(), "$15,001 - $50,000".to_string()]
    );

    // the CSV sink is independent of the remote failure
    assert!(matches!(report.csv, SinkOutcome::Written { count: 3 }));
    assert_eq!(std::fs::read_to_string(&csv_path).unwrap().lines().count(), 4);
}

#[tokio::test]
async fn disabled_sinks_export_nothing() {
    let config = ExportConfig {
        csv_enabled: false,
        ..Default::default()
    };
    let exporter = ExportCoordinator::from_config(&config).unwrap();

    let report = exporter.export(&dataset(&["$1,001 - $15,000"])).await;
    assert!(matches!(report.csv, SinkOutcome::Skipped));
    assert!(matches!(report.remote, SinkOutcome::Skipped));
}

#[test]
fn remote_export_without_table_is_a_config_error() {
    let config = ExportConfig {
        remote_enabled: true,
        remote_region: Some("us-east-1".to_string()),
        remote_access_key: Some("key".to_string()),
        remote_secret_key: Some("secret".to_string()),
        ..Default::default()
    };
    assert!(matches!(
        ExportCoordinator::from_config(&config),
        Err(ConfigError::MissingRemoteField { field: "remote_table" })
    ));
}
