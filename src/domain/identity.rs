//! Content-derived record identity
//!
//! The identity of a record is the blake3 digest of its canonical form: every
//! field except `id`, keyed by field name in lexicographic order and
//! serialized as JSON. Re-scraping the same disclosure row, on another day or
//! in another page order, yields the same identity.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::record::RecordDraft;

/// Hex-encoded blake3 digest of a record's canonical form
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derives identities from record content
pub struct IdentityResolver;

impl IdentityResolver {
    /// Canonical textual form of a draft.
    ///
    /// Absent optional fields serialize as `null`, which keeps them distinct
    /// from an empty string.
    pub fn canonical_form(draft: &RecordDraft) -> String {
        let date = draft.date.format("%Y-%m-%d").to_string();
        let fields: BTreeMap<&str, Option<&str>> = BTreeMap::from([
            ("amount", Some(draft.amount.as_str())),
            ("asset_name", Some(draft.asset_name.as_str())),
            ("asset_type", Some(draft.asset_type.as_str())),
            ("comment", draft.comment.as_deref()),
            ("date", Some(date.as_str())),
            ("filer", Some(draft.filer.as_str())),
            ("owner", Some(draft.owner.as_str())),
            ("ticker", draft.ticker.as_deref()),
            ("tx_type", Some(draft.tx_type.as_str())),
        ]);

        // A map of strings and nulls cannot fail to serialize.
        serde_json::to_string(&fields).unwrap_or_default()
    }

    /// Identity of a draft
    pub fn resolve(draft: &RecordDraft) -> RecordId {
        let canonical = Self::canonical_form(draft);
        RecordId(blake3::hash(canonical.as_bytes()).to_hex().to_string())
    }
}
