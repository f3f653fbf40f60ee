use crate::models::PublicationRecord;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Fallback for any description field the newspaper data cannot supply.
///
/// Downstream templates expect this exact string; it is not an error marker.
pub const PLACEHOLDER: &str = "placeholder";

/// Newspaper-level records keyed by `Identifier`, built once per run
#[derive(Debug, Clone, Default)]
pub struct PublicationIndex {
    records: HashMap<String, PublicationRecord>,
    duplicates: usize,
}

impl PublicationIndex {
    /// Index records by identifier; records without one are skipped.
    ///
    /// When an identifier repeats, the later record replaces the earlier one
    /// and a warning is logged for each replacement.
    pub fn build<I>(records: I) -> Self
    where
        I: IntoIterator<Item = PublicationRecord>,
    {
        let mut index = PublicationIndex::default();
        let mut skipped = 0usize;

        for record in records {
            let Some(identifier) = record.identifier() else {
                skipped += 1;
                continue;
            };
            if index.records.insert(identifier.clone(), record).is_some() {
                index.duplicates += 1;
                warn!(
                    "PublicationIndex: duplicate identifier {}, keeping the later record",
                    identifier
                );
            }
        }

        debug!(
            "PublicationIndex: {} records indexed, {} without identifier, {} overwritten",
            index.records.len(),
            skipped,
            index.duplicates
        );
        index
    }

    /// Value of `field` for the publication `identifier`, or [`PLACEHOLDER`].
    pub fn lookup(&self, identifier: &str, field: &str) -> String {
        self.records
            .get(identifier)
            .and_then(|record| record.field(field))
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| PLACEHOLDER.to_string())
    }

    pub fn get(&self, identifier: &str) -> Option<&PublicationRecord> {
        self.records.get(identifier)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// How many records were replaced by a later record with the same identifier
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn records(values: Vec<Value>) -> Vec<PublicationRecord> {
        values
            .into_iter()
            .map(|v| serde_json::from_value(v).unwrap())
            .collect()
    }

    #[test]
    fn test_build_skips_records_without_identifier() {
        let index = PublicationIndex::build(records(vec![
            json!({"Identifier": "HN", "Abstract": "Daily paper"}),
            json!({"Abstract": "orphan"}),
            json!({"Identifier": "", "Abstract": "blank"}),
            json!({"Identifier": null, "Abstract": "null"}),
        ]));

        assert_eq!(index.len(), 1);
        assert!(index.get("HN").is_some());
        assert_eq!(index.duplicates(), 0);
    }

    #[test]
    fn test_duplicate_identifier_last_wins() {
        let index = PublicationIndex::build(records(vec![
            json!({"Identifier": "HN", "Abstract": "first"}),
            json!({"Identifier": "HN", "Abstract": "second"}),
        ]));

        assert_eq!(index.len(), 1);
        assert_eq!(index.duplicates(), 1);
        assert_eq!(index.lookup("HN", "Abstract"), "second");
    }

    #[test]
    fn test_lookup_falls_back_to_placeholder() {
        let index = PublicationIndex::build(records(vec![json!({
            "Identifier": "HN",
            "Abstract": "Weekly",
            "Abstract [SPAN]": null
        })]));

        assert_eq!(index.lookup("HN", "Abstract"), "Weekly");
        assert_eq!(index.lookup("HN", "Abstract [SPAN]"), PLACEHOLDER);
        assert_eq!(index.lookup("HN", "Missing"), PLACEHOLDER);
        assert_eq!(index.lookup("OTHER", "Abstract"), PLACEHOLDER);
        assert_eq!(index.lookup("", "Abstract"), PLACEHOLDER);
    }

    #[test]
    fn test_lookup_treats_empty_string_as_missing() {
        let index = PublicationIndex::build(records(vec![json!({
            "Identifier": "HN",
            "Abstract": ""
        })]));
        assert_eq!(index.lookup("HN", "Abstract"), PLACEHOLDER);
    }

    #[test]
    fn test_lookup_treats_false_and_zero_as_missing() {
        let index = PublicationIndex::build(records(vec![json!({
            "Identifier": "HN",
            "Abstract": false,
            "Abstract [SPAN]": 0
        })]));
        assert_eq!(index.lookup("HN", "Abstract"), PLACEHOLDER);
        assert_eq!(index.lookup("HN", "Abstract [SPAN]"), PLACEHOLDER);
    }
}
