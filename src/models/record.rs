//! Record page and normalized record models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Raw entries of one search response, in server order
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordPage {
    /// The `resource` of each bundle entry, untouched
    pub entries: Vec<serde_json::Value>,
    /// Total match count reported by the server, when present
    pub total: Option<u64>,
}

impl RecordPage {
    #[cfg(test)]
    pub fn new(entries: Vec<serde_json::Value>) -> Self {
        Self {
            entries,
            total: None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Name and birth date extracted from a patient record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub given_name: String,
    pub family_name: String,
    pub birth_date: Option<NaiveDate>,
}

impl NormalizedRecord {
    /// Render as `<given>, <family>, <birth date or absent marker>`
    pub fn render(&self, absent_marker: &str) -> String {
        let birth = match self.birth_date {
            Some(date) => date.format("%Y-%m-%d").to_string(),
            None => absent_marker.to_string(),
        };
        format!("{}, {}, {}", self.given_name, self.family_name, birth)
    }
}
