//! Typed catalog response records.
//!
//! The upstream API serves loosely-shaped JSON; these structs pin down the
//! fields the pipeline relies on and leave the rest optional. Every record
//! round-trips through serde so version records can be stored verbatim in
//! the hash cache.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hash-algorithm key the catalog uses for SHA-256 digests.
const SHA256_KEY: &str = "SHA256";

/// One published version of a catalog model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelVersion {
    pub id: i64,
    /// Id of the parent model this version belongs to.
    pub model_id: i64,
    #[serde(default)]
    pub name: Option<String>,
    /// Publication timestamp; orders competing records during cache writes.
    pub created_at: DateTime<Utc>,
    /// Free-text base-model family label (e.g. "SDXL 1.0").
    #[serde(default)]
    pub base_model: Option<String>,
    /// Trigger words for the version.
    #[serde(default)]
    pub trained_words: Vec<String>,
    #[serde(default)]
    pub files: Vec<ModelFile>,
    #[serde(default)]
    pub images: Vec<ModelImage>,
}

/// A downloadable file attached to a model version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelFile {
    #[serde(default)]
    pub name: Option<String>,
    /// Algorithm → hex digest, as reported by the catalog.
    #[serde(default)]
    pub hashes: HashMap<String, String>,
}

impl ModelFile {
    /// The file's SHA-256 digest, when the catalog reports one.
    pub fn sha256(&self) -> Option<&str> {
        self.hashes.get(SHA256_KEY).map(String::as_str)
    }
}

/// A media entry attached to a model version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelImage {
    pub url: String,
}

/// A catalog model as returned by the search endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogModel {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type", default)]
    pub model_type: Option<String>,
    #[serde(default)]
    pub model_versions: Vec<ModelVersion>,
}

/// A creator entry from the creator search endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogCreator {
    pub username: String,
    #[serde(default)]
    pub model_count: Option<i64>,
}

/// A tag entry from the tag search endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogTag {
    pub name: String,
    #[serde(default)]
    pub model_count: Option<i64>,
}

/// Paginated envelope used by every search endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub metadata: PageMetadata,
}

/// Pagination block accompanying search results.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    #[serde(default)]
    pub total_items: Option<i64>,
    #[serde(default)]
    pub current_page: Option<i64>,
    #[serde(default)]
    pub page_size: Option<i64>,
    #[serde(default)]
    pub total_pages: Option<i64>,
    #[serde(default)]
    pub next_page: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_VERSION: &str = r#"{
        "id": 2002,
        "modelId": 101,
        "name": "v1.0",
        "createdAt": "2024-03-01T12:30:00.000Z",
        "baseModel": "SDXL 1.0",
        "trainedWords": ["foo", "bar"],
        "files": [
            {
                "name": "style.safetensors",
                "hashes": { "AutoV2": "ABCD1234", "SHA256": "DEADBEEFCAFE" }
            }
        ],
        "images": [
            { "url": "https://cdn.example/preview.jpeg", "width": 512 }
        ],
        "downloadUrl": "https://cdn.example/style.safetensors"
    }"#;

    #[test]
    fn version_parses_from_upstream_shape() {
        let version: ModelVersion = serde_json::from_str(SAMPLE_VERSION).unwrap();
        assert_eq!(version.id, 2002);
        assert_eq!(version.model_id, 101);
        assert_eq!(version.base_model.as_deref(), Some("SDXL 1.0"));
        assert_eq!(version.trained_words, vec!["foo", "bar"]);
        assert_eq!(version.files[0].sha256(), Some("DEADBEEFCAFE"));
        assert_eq!(version.images[0].url, "https://cdn.example/preview.jpeg");
    }

    #[test]
    fn version_round_trips_through_cache_json() {
        let version: ModelVersion = serde_json::from_str(SAMPLE_VERSION).unwrap();
        let stored = serde_json::to_value(&version).unwrap();
        let back: ModelVersion = serde_json::from_value(stored).unwrap();
        assert_eq!(version, back);
    }

    #[test]
    fn missing_optional_fields_default() {
        let version: ModelVersion = serde_json::from_str(
            r#"{"id": 1, "modelId": 2, "createdAt": "2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(version.trained_words.is_empty());
        assert!(version.files.is_empty());
        assert!(version.images.is_empty());
        assert_eq!(version.base_model, None);
    }

    #[test]
    fn file_without_sha256_reports_none() {
        let file: ModelFile =
            serde_json::from_str(r#"{"hashes": {"AutoV2": "ABCD"}}"#).unwrap();
        assert_eq!(file.sha256(), None);
    }

    #[test]
    fn search_page_tolerates_missing_metadata() {
        let page: SearchPage<CatalogTag> =
            serde_json::from_str(r#"{"items": [{"name": "style"}]}"#).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.metadata.total_items, None);
    }
}
