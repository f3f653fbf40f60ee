use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Render a spreadsheet-exported JSON value as text.
///
/// Strings pass through, `true` and non-zero numbers are stringified.
/// `false`, zero, null, arrays and objects count as no value.
pub fn lenient_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some(true.to_string()),
        Value::Bool(false) | Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(lenient_scalar(&value))
}

/// One row of the issue-level export: a single newspaper issue
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IssueRecord {
    #[serde(rename = "Identifier", default, deserialize_with = "lenient_string")]
    pub identifier: Option<String>,
    #[serde(rename = "Title", default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(rename = "Issue Title", default, deserialize_with = "lenient_string")]
    pub issue_title: Option<String>,
    #[serde(
        rename = "Issue Title [SPAN]",
        default,
        deserialize_with = "lenient_string"
    )]
    pub issue_title_spanish: Option<String>,
    #[serde(
        rename = "Title Alternative",
        default,
        deserialize_with = "lenient_string"
    )]
    pub title_alternative: Option<String>,
    #[serde(
        rename = "Title Alternative [SPAN]",
        default,
        deserialize_with = "lenient_string"
    )]
    pub title_alternative_spanish: Option<String>,
    /// Publisher column; the header text (leading quote included) is exactly what the export carries.
    #[serde(
        rename = "'Creator (Alternative Title: Publisher? Most often printed as \"Director\" or \"Owner\")",
        default,
        deserialize_with = "lenient_string"
    )]
    pub publisher: Option<String>,
    #[serde(rename = "Creator", default, deserialize_with = "lenient_string")]
    pub creator: Option<String>,
    #[serde(
        rename = "Type of Periodical",
        default,
        deserialize_with = "lenient_string"
    )]
    pub periodical_type: Option<String>,
    #[serde(
        rename = "Type of Periodical [SPAN]",
        default,
        deserialize_with = "lenient_string"
    )]
    pub periodical_type_spanish: Option<String>,
    #[serde(rename = "Language", default, deserialize_with = "lenient_string")]
    pub language: Option<String>,
    #[serde(rename = "Single Dates", default, deserialize_with = "lenient_string")]
    pub single_dates: Option<String>,
    #[serde(
        rename = "Coverage-Spatial",
        default,
        deserialize_with = "lenient_string"
    )]
    pub coverage_spatial: Option<String>,
    #[serde(rename = "Tags", default, deserialize_with = "lenient_string")]
    pub tags: Option<String>,
    #[serde(rename = "Tags [SPAN]", default, deserialize_with = "lenient_string")]
    pub tags_spanish: Option<String>,
    /// Semicolon-delimited page image filenames
    #[serde(rename = "Pages", default, deserialize_with = "lenient_string")]
    pub pages: Option<String>,
}

impl IssueRecord {
    /// Join key into the publication index and storage prefix; empty when absent.
    pub fn identifier(&self) -> &str {
        self.identifier.as_deref().unwrap_or("")
    }

    /// Short label for log lines
    pub fn label(&self) -> String {
        format!(
            "{} - {}",
            self.identifier(),
            self.title.as_deref().unwrap_or("<untitled>")
        )
    }
}

/// One row of the newspaper-level export, kept as the raw JSON object
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct PublicationRecord(pub Map<String, Value>);

impl PublicationRecord {
    pub fn identifier(&self) -> Option<String> {
        self.0
            .get("Identifier")
            .and_then(lenient_scalar)
            .filter(|id| !id.is_empty())
    }

    pub fn field(&self, name: &str) -> Option<String> {
        self.0.get(name).and_then(lenient_scalar)
    }
}

/// Canonical metadata derived from one issue record, sent to the mapper.
///
/// Optional fields that are `None` are left out of the JSON entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedAsset {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_spanish: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternative_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternative_title_spanish: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    pub description: String,
    pub description_spanish: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publicationtype: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags_spanish: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub production_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub production_place: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_title_spanish: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publicationtype_spanish: Option<String>,
    /// Spanish tags first, then native tags
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
}

/// Repository-ready metadata returned by the mapper; passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepositoryMetadata(pub Value);

/// Persistent identifier (DOI) issued by the repository for a created dataset
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersistentId(pub String);

impl PersistentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersistentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A page image fetched from storage, ready to attach
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFile {
    /// Full storage key
    pub key: String,
    /// Final path segment of the key, used as the upload filename
    pub filename: String,
    pub content: Vec<u8>,
}
