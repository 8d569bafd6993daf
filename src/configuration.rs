use std::path::Path;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::ContextError;

/// The identifier written to the PDF trailer when none is configured.
pub const DEFAULT_DOCUMENT_ID: &str = "DA2404-FEB2011-APD-LC-V1-00ES";

/// Everything that can be tuned about a rendering, read from a JSON file. Every field is optional
/// and the defaults reproduce the plain form with a single supplementary sheet.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderConfiguration {
    /// First element of the trailer `ID` array, which identifies the document across revisions.
    pub document_id: String,
    /// Second element of the trailer `ID` array; it defaults to the document ID.
    pub instance_id: Option<String>,
    pub metadata: DocumentMetadata,
    /// Continuation sheets appended after the main page.
    pub supplementary_sheets: usize,
    /// Compress the content streams and renumber the objects before saving.
    pub compress: bool,
}

impl Default for RenderConfiguration {
    fn default() -> Self {
        RenderConfiguration {
            document_id: DEFAULT_DOCUMENT_ID.into(),
            instance_id: None,
            metadata: DocumentMetadata::default(),
            supplementary_sheets: 1,
            compress: false,
        }
    }
}

/// The entries of the PDF information dictionary.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentMetadata {
    pub title: String,
    pub author: String,
    pub subject: String,
    pub creator: String,
    pub producer: String,
    pub keywords: String,
    /// Written as both creation and modification date. It defaults to the Unix epoch so that the
    /// same configuration always produces the same bytes.
    #[serde(with = "time::serde::rfc3339")]
    pub creation_date: OffsetDateTime,
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        DocumentMetadata {
            title: "Equipment Inspection and Maintenance Worksheet".into(),
            author: "Unknown".into(),
            subject: "DA Form 2404".into(),
            creator: "Unknown".into(),
            producer: concat!("da2404 ", env!("CARGO_PKG_VERSION")).into(),
            keywords: String::new(),
            creation_date: OffsetDateTime::UNIX_EPOCH,
        }
    }
}

impl RenderConfiguration {
    pub fn from_path(configuration_file_path: &Path) -> Result<Self, ContextError> {
        let configuration_file_contents = std::fs::read_to_string(configuration_file_path)
            .map_err(|error| {
                ContextError::with_error(
                    format!(
                        "Failed to read the configuration file {:?}",
                        configuration_file_path
                    ),
                    &error,
                )
            })?;
        let configuration: RenderConfiguration =
            serde_json::from_str(&configuration_file_contents).map_err(|error| {
                ContextError::with_error(
                    format!(
                        "Failed to parse the configuration file {:?}",
                        configuration_file_path
                    ),
                    &error,
                )
            })?;

        Ok(configuration)
    }

    pub fn instance_id(&self) -> &str {
        self.instance_id.as_deref().unwrap_or(&self.document_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_their_defaults() {
        let configuration: RenderConfiguration =
            serde_json::from_str(r#"{ "supplementarySheets": 3 }"#).unwrap();
        assert_eq!(configuration.supplementary_sheets, 3);
        assert_eq!(configuration.document_id, DEFAULT_DOCUMENT_ID);
        assert_eq!(configuration.instance_id(), DEFAULT_DOCUMENT_ID);
        assert_eq!(configuration.metadata, DocumentMetadata::default());
    }

    #[test]
    fn parses_metadata_and_dates() {
        let configuration: RenderConfiguration = serde_json::from_str(
            r#"{
                "documentId": "2404-A",
                "instanceId": "2404-A-1",
                "metadata": { "author": "SPC Doe", "creationDate": "2011-02-01T08:30:00+02:00" }
            }"#,
        )
        .unwrap();
        assert_eq!(configuration.instance_id(), "2404-A-1");
        assert_eq!(configuration.metadata.author, "SPC Doe");
        assert_eq!(configuration.metadata.title, DocumentMetadata::default().title);
        assert_eq!(configuration.metadata.creation_date.year(), 2011);
        assert_eq!(configuration.metadata.creation_date.offset().whole_hours(), 2);
    }

    #[test]
    fn reports_the_path_of_unreadable_files() {
        let path = std::env::temp_dir().join("da2404-missing-configuration.json");
        let error = RenderConfiguration::from_path(&path).unwrap_err();
        assert!(error.context.contains("da2404-missing-configuration.json"));
        assert!(error.source_error.is_some());
    }

    #[test]
    fn rejects_malformed_json() {
        let path = std::env::temp_dir().join("da2404-malformed-configuration.json");
        std::fs::write(&path, "{ \"compress\": maybe }").unwrap();
        let error = RenderConfiguration::from_path(&path).unwrap_err();
        assert!(error.context.starts_with("Failed to parse the configuration file"));
        std::fs::remove_file(&path).unwrap();
    }
}
