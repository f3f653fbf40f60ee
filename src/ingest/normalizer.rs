use crate::ingest::publication_index::PublicationIndex;
use crate::models::{IssueRecord, NormalizedAsset};

const ABSTRACT_FIELD: &str = "Abstract";
const ABSTRACT_SPANISH_FIELD: &str = "Abstract [SPAN]";

/// Split a semicolon-delimited cell into trimmed, non-empty entries.
///
/// Returns `None` when the cell itself is missing or empty, and `Some(vec![])`
/// when it only holds separators or whitespace.
pub fn separate_list(content: Option<&str>) -> Option<Vec<String>> {
    let content = content.filter(|c| !c.is_empty())?;
    Some(
        content
            .split(';')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

fn non_empty_list(list: Option<Vec<String>>) -> Option<Vec<String>> {
    list.filter(|l| !l.is_empty())
}

/// Build the canonical metadata for one issue.
///
/// Never fails: missing cells are omitted and missing abstracts come back as
/// the placeholder sentinel.
pub fn normalize(record: &IssueRecord, publications: &PublicationIndex) -> NormalizedAsset {
    let identifier = record.identifier();

    let tags = non_empty_list(separate_list(record.tags.as_deref()));
    let tags_spanish = non_empty_list(separate_list(record.tags_spanish.as_deref()));

    let keywords = if tags.is_some() || tags_spanish.is_some() {
        let mut keywords = tags_spanish.clone().unwrap_or_default();
        keywords.extend(tags.iter().flatten().cloned());
        Some(keywords)
    } else {
        None
    };

    NormalizedAsset {
        title: record.issue_title.clone(),
        title_spanish: record.issue_title_spanish.clone(),
        alternative_title: record.title_alternative.clone(),
        alternative_title_spanish: record.title_alternative_spanish.clone(),
        issue_title: record.issue_title.clone(),
        creator: record.publisher.clone(),
        description: publications.lookup(identifier, ABSTRACT_FIELD),
        description_spanish: publications.lookup(identifier, ABSTRACT_SPANISH_FIELD),
        publicationtype: record.periodical_type.clone(),
        author_name: record.creator.clone(),
        tags,
        tags_spanish,
        language: non_empty(&record.language),
        production_date: non_empty(&record.single_dates),
        production_place: non_empty(&record.coverage_spatial),
        issue_title_spanish: non_empty(&record.issue_title_spanish),
        publicationtype_spanish: non_empty(&record.periodical_type_spanish),
        keywords,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::publication_index::PLACEHOLDER;
    use crate::models::PublicationRecord;
    use serde_json::json;

    fn index() -> PublicationIndex {
        let record: PublicationRecord = serde_json::from_value(json!({
            "Identifier": "HN-1921",
            "Abstract": "A Spanish-language weekly from Houston.",
            "Abstract [SPAN]": "Un semanario en español de Houston."
        }))
        .unwrap();
        PublicationIndex::build(vec![record])
    }

    fn issue(value: serde_json::Value) -> IssueRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_separate_list() {
        assert_eq!(separate_list(None), None);
        assert_eq!(separate_list(Some("")), None);
        assert_eq!(separate_list(Some(" ; ;")), Some(vec![]));
        assert_eq!(
            separate_list(Some("p1.jpg; p2.jpg ;;p3.jpg")),
            Some(vec![
                "p1.jpg".to_string(),
                "p2.jpg".to_string(),
                "p3.jpg".to_string()
            ])
        );
    }

    #[test]
    fn test_keywords_spanish_first() {
        let asset = normalize(
            &issue(json!({"Identifier": "HN-1921", "Tags": "A; B", "Tags [SPAN]": "C"})),
            &index(),
        );

        assert_eq!(asset.tags, Some(vec!["A".to_string(), "B".to_string()]));
        assert_eq!(asset.tags_spanish, Some(vec!["C".to_string()]));
        assert_eq!(
            asset.keywords,
            Some(vec!["C".to_string(), "A".to_string(), "B".to_string()])
        );
    }

    #[test]
    fn test_keywords_from_single_list() {
        let asset = normalize(&issue(json!({"Tags [SPAN]": "política; ; "})), &index());
        assert_eq!(asset.tags, None);
        assert_eq!(asset.keywords, Some(vec!["política".to_string()]));
    }

    #[test]
    fn test_keywords_absent_without_tags() {
        let asset = normalize(&issue(json!({"Tags": " ; ", "Tags [SPAN]": ""})), &index());
        assert_eq!(asset.tags, None);
        assert_eq!(asset.tags_spanish, None);
        assert_eq!(asset.keywords, None);

        let value = serde_json::to_value(&asset).unwrap();
        assert!(value.get("keywords").is_none());
    }

    #[test]
    fn test_descriptions_from_publication_index() {
        let asset = normalize(&issue(json!({"Identifier": "HN-1921"})), &index());
        assert_eq!(asset.description, "A Spanish-language weekly from Houston.");
        assert_eq!(asset.description_spanish, "Un semanario en español de Houston.");
    }

    #[test]
    fn test_descriptions_placeholder_for_unknown_publication() {
        for record in [
            issue(json!({"Identifier": "UNKNOWN"})),
            issue(json!({})),
            issue(json!({"Identifier": null})),
        ] {
            let asset = normalize(&record, &index());
            assert_eq!(asset.description, PLACEHOLDER);
            assert_eq!(asset.description_spanish, PLACEHOLDER);
        }
    }

    #[test]
    fn test_field_mapping() {
        let record = issue(json!({
            "Identifier": "HN-1921",
            "Issue Title": "El Tecolote, 12 de marzo",
            "Issue Title [SPAN]": "El Tecolote, 12 de marzo (es)",
            "Title Alternative": "The Owl",
            "Title Alternative [SPAN]": "El Tecolote",
            "'Creator (Alternative Title: Publisher? Most often printed as \"Director\" or \"Owner\")": "R. Flores",
            "Creator": "Flores Publishing",
            "Type of Periodical": "Weekly",
            "Type of Periodical [SPAN]": "Semanal",
            "Language": "Spanish",
            "Single Dates": "1921-03-12",
            "Coverage-Spatial": "Houston, Texas"
        }));
        let asset = normalize(&record, &index());

        assert_eq!(asset.title.as_deref(), Some("El Tecolote, 12 de marzo"));
        assert_eq!(asset.issue_title, asset.title);
        assert_eq!(
            asset.title_spanish.as_deref(),
            Some("El Tecolote, 12 de marzo (es)")
        );
        assert_eq!(asset.issue_title_spanish, asset.title_spanish);
        assert_eq!(asset.alternative_title.as_deref(), Some("The Owl"));
        assert_eq!(asset.alternative_title_spanish.as_deref(), Some("El Tecolote"));
        assert_eq!(asset.creator.as_deref(), Some("R. Flores"));
        assert_eq!(asset.author_name.as_deref(), Some("Flores Publishing"));
        assert_eq!(asset.publicationtype.as_deref(), Some("Weekly"));
        assert_eq!(asset.publicationtype_spanish.as_deref(), Some("Semanal"));
        assert_eq!(asset.language.as_deref(), Some("Spanish"));
        assert_eq!(asset.production_date.as_deref(), Some("1921-03-12"));
        assert_eq!(asset.production_place.as_deref(), Some("Houston, Texas"));
    }

    #[test]
    fn test_empty_optional_cells_are_omitted() {
        let record = issue(json!({
            "Language": "",
            "Single Dates": null,
            "Issue Title [SPAN]": "",
            "Type of Periodical [SPAN]": ""
        }));
        let value = serde_json::to_value(normalize(&record, &index())).unwrap();
        let object = value.as_object().unwrap();

        for key in [
            "language",
            "production_date",
            "production_place",
            "issue_title_spanish",
            "publicationtype_spanish",
        ] {
            assert!(!object.contains_key(key), "{} should be omitted", key);
        }
        assert_eq!(object["description"], PLACEHOLDER);
    }

    #[test]
    fn test_falsy_optional_cells_are_omitted() {
        let record = issue(json!({
            "Identifier": "HN-1921",
            "Language": 0,
            "Single Dates": false,
            "Coverage-Spatial": 0.0,
            "Type of Periodical [SPAN]": false
        }));
        let asset = normalize(&record, &index());

        assert_eq!(asset.language, None);
        assert_eq!(asset.production_date, None);
        assert_eq!(asset.production_place, None);
        assert_eq!(asset.publicationtype_spanish, None);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let record = issue(json!({
            "Identifier": "HN-1921",
            "Tags": "A; B",
            "Tags [SPAN]": "C",
            "Language": "Spanish"
        }));
        let index = index();
        assert_eq!(normalize(&record, &index), normalize(&record, &index));
    }
}
