//! FHIR R4 wire types
//!
//! Only the fields the benchmark reads are modelled; everything else in the
//! server's JSON is ignored.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::models::RecordPage;

/// Search result bundle
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub resource_type: String,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub entry: Vec<BundleEntry>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    #[serde(default)]
    pub resource: Option<serde_json::Value>,
}

impl Bundle {
    pub fn is_bundle(&self) -> bool {
        self.resource_type == "Bundle"
    }

    /// Consume the bundle into a page, one raw entry per bundle entry.
    ///
    /// Entries without a resource become `null` so the projector can report them.
    pub fn into_page(self) -> RecordPage {
        RecordPage {
            entries: self
                .entry
                .into_iter()
                .map(|e| e.resource.unwrap_or(serde_json::Value::Null))
                .collect(),
            total: self.total,
        }
    }
}

/// Patient resource
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub resource_type: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Vec<HumanName>,
    #[serde(default)]
    pub birth_date: Option<String>,
}

impl Patient {
    pub fn is_patient(&self) -> bool {
        self.resource_type == "Patient"
    }
}

/// A patient name; `given` may hold several parts
#[derive(Clone, Debug, Default, Deserialize)]
pub struct HumanName {
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub given: Vec<String>,
}

impl HumanName {
    /// All given-name parts joined with single spaces
    pub fn given_as_single_string(&self) -> String {
        self.given
            .iter()
            .map(|g| g.trim())
            .filter(|g| !g.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Parse a FHIR `date` (`YYYY`, `YYYY-MM` or `YYYY-MM-DD`).
///
/// Partial dates resolve to the first day of the period.
pub fn parse_fhir_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if !has_date_shape(value) {
        return None;
    }
    match value.len() {
        4 => {
            let year = value.parse().ok()?;
            NaiveDate::from_ymd_opt(year, 1, 1)
        }
        7 => NaiveDate::parse_from_str(&format!("{value}-01"), "%Y-%m-%d").ok(),
        10 => NaiveDate::parse_from_str(value, "%Y-%m-%d").ok(),
        _ => None,
    }
}

/// ASCII digits, with `-` exactly at offsets 4 and 7
fn has_date_shape(value: &str) -> bool {
    value
        .bytes()
        .enumerate()
        .all(|(i, b)| if i == 4 || i == 7 { b == b'-' } else { b.is_ascii_digit() })
}
