//! Selector configuration for the eFD portal
//!
//! Centralized CSS selectors for the search form, listing and detail pages.

use serde::{Deserialize, Serialize};

/// CSS selectors used against the portal's pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalSelectors {
    /// Consent checkbox on the search home page
    pub agree_checkbox: String,

    /// "Senator" filer type option
    pub senator_filer: String,

    /// From-date filter field
    pub from_date_field: String,

    /// Search submit button
    pub search_button: String,

    /// Container holding the listing results
    pub results_container: String,

    /// Anchors inside the results container
    pub result_link: String,

    /// "Next page" control of the listing
    pub next_control: String,

    /// Class marker of a disabled "next" control
    pub disabled_marker: String,

    /// Filer label on a detail page
    pub filer_label: String,

    /// Transaction rows on a detail page
    pub detail_rows: String,

    /// Cells within one transaction row
    pub detail_cells: String,
}

impl Default for PortalSelectors {
    fn default() -> Self {
        Self {
            agree_checkbox: "#agree_statement".to_string(),
            senator_filer: "input.senator_filer".to_string(),
            from_date_field: "#fromDate".to_string(),
            search_button: "button.btn.btn-primary".to_string(),
            results_container: "#filedReports".to_string(),
            result_link: "#filedReports a[href]".to_string(),
            next_control: "#filedReports_next".to_string(),
            disabled_marker: "disabled".to_string(),
            filer_label: "h2.filedReport".to_string(),
            detail_rows: "table.table tbody tr".to_string(),
            detail_cells: "td".to_string(),
        }
    }
}
