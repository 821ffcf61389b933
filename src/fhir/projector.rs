//! Result projection
//!
//! Turns a page of raw entries into `<given>, <family>, <birth date>` lines,
//! ordered by given name.

use tracing::warn;

use super::bundle::{parse_fhir_date, Patient};
use crate::models::{NormalizedRecord, RecordPage};

/// Rendered lines, one per well-formed record
pub type RenderedNameList = Vec<String>;

/// Marker printed when a record has no usable birth date
pub const DEFAULT_ABSENT_MARKER: &str = "unknown";

/// Maps, sorts and formats search results
#[derive(Clone, Debug)]
pub struct ResultProjector {
    absent_marker: String,
}

impl Default for ResultProjector {
    fn default() -> Self {
        Self::new(DEFAULT_ABSENT_MARKER)
    }
}

impl ResultProjector {
    pub fn new(absent_marker: impl Into<String>) -> Self {
        Self {
            absent_marker: absent_marker.into(),
        }
    }

    /// Normalize every well-formed entry and sort by given name.
    ///
    /// The sort is stable and compares raw bytes, so equal given names keep
    /// server order and non-ASCII names are not locale-collated.
    pub fn normalize(&self, page: &RecordPage) -> Vec<NormalizedRecord> {
        let mut records: Vec<NormalizedRecord> = page
            .entries
            .iter()
            .enumerate()
            .filter_map(|(idx, entry)| normalize_entry(idx, entry))
            .collect();

        records.sort_by(|a, b| a.given_name.cmp(&b.given_name));
        records
    }

    /// Project a page into its rendered name list
    pub fn project(&self, page: &RecordPage) -> RenderedNameList {
        self.normalize(page)
            .iter()
            .map(|record| record.render(&self.absent_marker))
            .collect()
    }
}

fn normalize_entry(idx: usize, entry: &serde_json::Value) -> Option<NormalizedRecord> {
    let patient: Patient = match serde_json::from_value(entry.clone()) {
        Ok(patient) => patient,
        Err(e) => {
            warn!("Skipping entry {}: not a readable resource ({})", idx, e);
            return None;
        }
    };

    if !patient.is_patient() {
        warn!(
            "Skipping entry {}: expected Patient, got {}",
            idx, patient.resource_type
        );
        return None;
    }

    let Some(name) = patient.name.first() else {
        warn!(
            "Skipping entry {}: patient {} has no name",
            idx,
            patient.id.as_deref().unwrap_or("<no id>")
        );
        return None;
    };

    let birth_date = patient.birth_date.as_deref().and_then(|raw| {
        let parsed = parse_fhir_date(raw);
        if parsed.is_none() {
            warn!("Entry {}: ignoring unparseable birthDate {:?}", idx, raw);
        }
        parsed
    });

    Some(NormalizedRecord {
        given_name: name.given_as_single_string(),
        family_name: name.family.clone().unwrap_or_default(),
        birth_date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn patient(family: &str, given: &[&str], birth: Option<&str>) -> Value {
        let mut resource = json!({
            "resourceType": "Patient",
            "name": [{"family": family, "given": given}]
        });
        if let Some(birth) = birth {
            resource["birthDate"] = json!(birth);
        }
        resource
    }

    #[test]
    fn test_sorted_by_given_name() {
        let page = RecordPage::new(vec![
            patient("Alpha", &["Zed"], Some("1990-05-01")),
            patient("Beta", &["Ann"], Some("1985-11-30")),
        ]);

        let lines = ResultProjector::default().project(&page);

        assert_eq!(
            lines,
            vec!["Ann, Beta, 1985-11-30", "Zed, Alpha, 1990-05-01"]
        );
    }

    #[test]
    fn test_empty_page() {
        let lines = ResultProjector::default().project(&RecordPage::default());
        assert!(lines.is_empty());
    }

    #[test]
    fn test_absent_birth_date_uses_marker() {
        let page = RecordPage::new(vec![patient("Beta", &["Ann"], None)]);

        assert_eq!(
            ResultProjector::default().project(&page),
            vec!["Ann, Beta, unknown"]
        );
        assert_eq!(
            ResultProjector::new("null").project(&page),
            vec!["Ann, Beta, null"]
        );
    }

    #[test]
    fn test_multi_part_given_name() {
        let page = RecordPage::new(vec![patient("SMITH", &["John", "Paul"], Some("1970"))]);
        assert_eq!(
            ResultProjector::default().project(&page),
            vec!["John Paul, SMITH, 1970-01-01"]
        );
    }

    #[test]
    fn test_stable_for_equal_given_names() {
        let page = RecordPage::new(vec![
            patient("First", &["Sam"], None),
            patient("Second", &["Amy"], None),
            patient("Third", &["Sam"], None),
        ]);

        let lines = ResultProjector::default().project(&page);

        assert_eq!(
            lines,
            vec![
                "Amy, Second, unknown",
                "Sam, First, unknown",
                "Sam, Third, unknown"
            ]
        );
    }

    #[test]
    fn test_ordering_is_idempotent() {
        let page = RecordPage::new(vec![
            patient("C", &["carol"], None),
            patient("A", &["Álvaro"], None),
            patient("B", &["Bob"], None),
            patient("D", &["Bob"], Some("2001-02-03")),
        ]);
        let projector = ResultProjector::default();
        let once = projector.normalize(&page);

        let resorted_page = RecordPage::new(
            once.iter()
                .map(|r| {
                    let birth = r.birth_date.map(|d| d.format("%Y-%m-%d").to_string());
                    patient(&r.family_name, &[r.given_name.as_str()], birth.as_deref())
                })
                .collect(),
        );
        let twice = projector.normalize(&resorted_page);

        assert_eq!(once, twice);
        // byte order: uppercase ASCII, then lowercase, then non-ASCII
        let given: Vec<_> = once.iter().map(|r| r.given_name.as_str()).collect();
        assert_eq!(given, vec!["Bob", "Bob", "carol", "Álvaro"]);
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let page = RecordPage::new(vec![
            Value::Null,
            json!({"resourceType": "Observation"}),
            json!({"resourceType": "Patient", "id": "no-name"}),
            patient("Beta", &["Ann"], Some("not-a-date")),
        ]);

        let lines = ResultProjector::default().project(&page);

        assert_eq!(lines, vec!["Ann, Beta, unknown"]);
    }
}
