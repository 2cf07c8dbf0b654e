//! Field extractor for PTR detail rows
//!
//! Converts one [`RawRow`] into a [`RecordDraft`]. Cell layout of a PTR
//! transaction table:
//!
//! | 0 | 1    | 2     | 3      | 4          | 5          | 6    | 7      | 8       |
//! |---|------|-------|--------|------------|------------|------|--------|---------|
//! | # | date | owner | ticker | asset name | asset type | type | amount | comment |
//!
//! Text is kept exactly as rendered; only the date is reformatted and the
//! `--` placeholder is mapped to an absent value.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use crate::infrastructure::parsing_error::{ExtractionError, ExtractionResult};
use crate::domain::record::{RawRow, RecordDraft};

/// Minimum number of cells in a transaction row
pub const MIN_CELLS: usize = 9;

/// Rendered by the portal for "no value"
pub const PLACEHOLDER: &str = "--";

static FILER_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^)]*)\)").expect("filer name pattern"));
static US_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").expect("date pattern"));

pub struct FieldExtractor;

impl FieldExtractor {
    /// Extract a record draft from one row
    pub fn extract(row: &RawRow) -> ExtractionResult<RecordDraft> {
        if row.cells.len() < MIN_CELLS {
            return Err(ExtractionError::too_few_cells(row.cells.len(), MIN_CELLS));
        }
        let cell = |index: usize| row.cells[index].as_str();

        let draft = RecordDraft {
            filer: Self::filer_name(&row.filer_label)?,
            date: Self::transaction_date(cell(1))?,
            owner: required("owner", cell(2))?,
            ticker: optional(cell(3)),
            asset_name: required("asset_name", cell(4))?,
            asset_type: required("asset_type", cell(5))?,
            tx_type: required("tx_type", cell(6))?,
            amount: required("amount", cell(7))?,
            comment: optional(cell(8)),
        };

        trace!("Extracted row for {} dated {}", draft.filer, draft.date);
        Ok(draft)
    }

    /// Text inside the first parenthesized group of the filer label. A
    /// label without a group, or with an empty one, is malformed.
    pub fn filer_name(label: &str) -> ExtractionResult<String> {
        FILER_NAME
            .captures(label)
            .and_then(|captures| captures.get(1))
            .map(|group| group.as_str().trim())
            .filter(|name| !name.is_empty())
            .map(ToString::to_string)
            .ok_or_else(|| ExtractionError::filer_label(label))
    }

    /// `M/D/YYYY` or `MM/DD/YYYY` into a calendar date
    pub fn transaction_date(raw: &str) -> ExtractionResult<NaiveDate> {
        let captures = US_DATE
            .captures(raw)
            .ok_or_else(|| ExtractionError::date(raw, "expected MM/DD/YYYY"))?;

        let number = |index: usize| -> ExtractionResult<u32> {
            captures[index]
                .parse()
                .map_err(|_| ExtractionError::date(raw, "non-numeric component"))
        };
        let (month, day) = (number(1)?, number(2)?);
        let year: i32 = captures[3]
            .parse()
            .map_err(|_| ExtractionError::date(raw, "non-numeric year"))?;

        NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| ExtractionError::date(raw, "no such calendar date"))
    }
}

fn required(field: &'static str, text: &str) -> ExtractionResult<String> {
    if text.is_empty() {
        return Err(ExtractionError::empty_field(field));
    }
    Ok(text.to_string())
}

fn optional(text: &str) -> Option<String> {
    (text != PLACEHOLDER).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn row(cells: [&str; 9]) -> RawRow {
        RawRow::new(
            cells.iter().map(ToString::to_string).collect(),
            "The Honorable Tommy Tuberville (Tuberville, Tommy)",
        )
    }

    fn purchase_row() -> RawRow {
        row([
            "1",
            "10/3/2025",
            "Spouse",
            "MSFT",
            "Microsoft Corporation - Common Stock",
            "Stock",
            "Purchase",
            "$1,001 - $15,000",
            "--",
        ])
    }

    #[test]
    fn test_extracts_all_fields() {
        let draft = FieldExtractor::extract(&purchase_row()).unwrap();

        assert_eq!(draft.filer, "Tuberville, Tommy");
        assert_eq!(draft.date.to_string(), "2025-10-03");
        assert_eq!(draft.owner, "Spouse");
        assert_eq!(draft.ticker.as_deref(), Some("MSFT"));
        assert_eq!(draft.asset_name, "Microsoft Corporation - Common Stock");
        assert_eq!(draft.asset_type, "Stock");
        assert_eq!(draft.tx_type, "Purchase");
        assert_eq!(draft.amount, "$1,001 - $15,000");
        assert_eq!(draft.comment, None);
    }

    #[test]
    fn test_placeholder_ticker_is_absent_not_dashes() {
        let mut raw = purchase_row();
        raw.cells[3] = "--".to_string();
        raw.cells[8] = "Sold via broker".to_string();

        let draft = FieldExtractor::extract(&raw).unwrap();
        assert_eq!(draft.ticker, None);
        assert_eq!(draft.comment.as_deref(), Some("Sold via broker"));
    }

    #[test]
    fn test_text_is_not_trimmed() {
        let mut raw = purchase_row();
        raw.cells[2] = " Joint ".to_string();
        let draft = FieldExtractor::extract(&raw).unwrap();
        assert_eq!(draft.owner, " Joint ");
    }

    #[rstest]
    #[case("1/2/2023", "2023-01-02")]
    #[case("12/31/2024", "2024-12-31")]
    #[case("09/05/2025", "2025-09-05")]
    fn test_date_reformat(#[case] raw: &str, #[case] expected: &str) {
        let date = FieldExtractor::transaction_date(raw).unwrap();
        assert_eq!(date.format("%Y-%m-%d").to_string(), expected);
    }

    #[rstest]
    #[case("2023-01-02")]
    #[case("1/2/23")]
    #[case("13/01/2024")]
    #[case("2/30/2024")]
    #[case("")]
    fn test_malformed_dates_fail(#[case] raw: &str) {
        let err = FieldExtractor::transaction_date(raw).unwrap_err();
        assert_eq!(err.field(), "date");
    }

    #[test]
    fn test_filer_label_without_parentheses_fails() {
        let mut raw = purchase_row();
        raw.filer_label = "The Honorable Tommy Tuberville".to_string();

        assert_eq!(
            FieldExtractor::extract(&raw).unwrap_err(),
            ExtractionError::filer_label("The Honorable Tommy Tuberville")
        );
    }

    #[rstest]
    #[case("The Honorable X ()")]
    #[case("The Honorable X (   )")]
    fn test_empty_filer_name_is_a_label_error(#[case] label: &str) {
        assert_eq!(
            FieldExtractor::filer_name(label).unwrap_err(),
            ExtractionError::filer_label(label)
        );
    }

    #[test]
    fn test_first_parenthesized_group_wins() {
        let name = FieldExtractor::filer_name("Jane Doe (Doe, Jane) (Amended)").unwrap();
        assert_eq!(name, "Doe, Jane");
    }

    #[test]
    fn test_short_row_fails() {
        let raw = RawRow::new(vec!["1".to_string(), "1/2/2023".to_string()], "X (Y)");
        assert_eq!(
            FieldExtractor::extract(&raw).unwrap_err(),
            ExtractionError::too_few_cells(2, MIN_CELLS)
        );
    }

    #[test]
    fn test_empty_mandatory_cell_fails() {
        let mut raw = purchase_row();
        raw.cells[7] = String::new();
        assert_eq!(
            FieldExtractor::extract(&raw).unwrap_err(),
            ExtractionError::empty_field("amount")
        );
    }
}
