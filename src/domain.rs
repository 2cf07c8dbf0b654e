//! Domain module - disclosure records, identities and the run dataset
//!
//! Modern Rust module organization (Rust 2018+ style):
//! - Each module is its own file in the domain/ directory
//! - Public exports are defined here for convenience

pub mod dataset;
pub mod detail_link;
pub mod identity;
pub mod record;

pub use dataset::{Dataset, DedupAccumulator, SeenIdentities};
pub use detail_link::{DetailLink, DetailLinkSet, PTR_VIEW_PATH};
pub use identity::{IdentityResolver, RecordId};
pub use record::{RECORD_FIELDS, RawRow, Record, RecordDraft};
