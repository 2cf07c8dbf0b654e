//! Disclosure records
//!
//! A `RecordDraft` is what the field extractor produces from one detail-page
//! row. It becomes a `Record` only once an identity has been attached, so a
//! `Record` without an `id` cannot exist.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::identity::RecordId;

/// Field names in export order.
pub const RECORD_FIELDS: [&str; 10] = [
    "id",
    "filer",
    "date",
    "owner",
    "ticker",
    "asset_name",
    "asset_type",
    "tx_type",
    "amount",
    "comment",
];

/// One table row read from a detail page, plus the page-level filer label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub cells: Vec<String>,
    pub filer_label: String,
}

impl RawRow {
    pub fn new(cells: Vec<String>, filer_label: impl Into<String>) -> Self {
        Self {
            cells,
            filer_label: filer_label.into(),
        }
    }
}

/// Normalized record content, identity not yet assigned
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordDraft {
    pub filer: String,
    pub date: NaiveDate,
    pub owner: String,
    pub ticker: Option<String>,
    pub asset_name: String,
    pub asset_type: String,
    pub tx_type: String,
    pub amount: String,
    pub comment: Option<String>,
}

/// Normalized disclosure record with its content-derived identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub filer: String,
    pub date: NaiveDate,
    pub owner: String,
    pub ticker: Option<String>,
    pub asset_name: String,
    pub asset_type: String,
    pub tx_type: String,
    pub amount: String,
    pub comment: Option<String>,
}

impl Record {
    /// Attach an identity to a draft
    pub fn from_draft(id: RecordId, draft: RecordDraft) -> Self {
        Self {
            id,
            filer: draft.filer,
            date: draft.date,
            owner: draft.owner,
            ticker: draft.ticker,
            asset_name: draft.asset_name,
            asset_type: draft.asset_type,
            tx_type: draft.tx_type,
            amount: draft.amount,
            comment: draft.comment,
        }
    }

    /// Field mapping used by the remote table sink.
    ///
    /// Absent optional fields are omitted rather than written as null.
    pub fn to_item(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut item = serde_json::Map::new();
        let mut put = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                item.insert(key.to_string(), serde_json::Value::String(value));
            }
        };

        put("id", Some(self.id.to_string()));
        put("filer", Some(self.filer.clone()));
        put("date", Some(self.date.format("%Y-%m-%d").to_string()));
        put("owner", Some(self.owner.clone()));
        put("ticker", self.ticker.clone());
        put("asset_name", Some(self.asset_name.clone()));
        put("asset_type", Some(self.asset_type.clone()));
        put("tx_type", Some(self.tx_type.clone()));
        put("amount", Some(self.amount.clone()));
        put("comment", self.comment.clone());
        item
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::RecordDraft;
    use chrono::NaiveDate;

    /// A draft shaped like a typical PTR row
    pub fn sample_draft(amount: &str) -> RecordDraft {
        RecordDraft {
            filer: "Tuberville, Tommy".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 10, 3).unwrap_or_default(),
            owner: "Spouse".to_string(),
            ticker: Some("MSFT".to_string()),
            asset_name: "Microsoft Corporation - Common Stock".to_string(),
            asset_type: "Stock".to_string(),
            tx_type: "Purchase".to_string(),
            amount: amount.to_string(),
            comment: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::sample_draft;
    use super::*;
    use crate::domain::identity::IdentityResolver;

    #[test]
    fn test_item_omits_absent_fields() {
        let draft = sample_draft("$1,001 - $15,000");
        let record = Record::from_draft(IdentityResolver::resolve(&draft), draft);
        let item = record.to_item();

        assert_eq!(item.len(), RECORD_FIELDS.len() - 1);
        assert!(!item.contains_key("comment"));
        assert_eq!(item["date"], "2025-10-03");
        assert_eq!(item["id"], record.id.as_str());
    }

    #[test]
    fn test_serialized_field_order_matches_export_order() {
        let draft = sample_draft("$15,001 - $50,000");
        let record = Record::from_draft(IdentityResolver::resolve(&draft), draft);
        let value = serde_json::to_value(&record).unwrap();
        let keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();

        // serde_json without preserve_order sorts keys, so compare as sets
        let mut expected = RECORD_FIELDS.to_vec();
        expected.sort_unstable();
        assert_eq!(keys, expected);
    }
}
