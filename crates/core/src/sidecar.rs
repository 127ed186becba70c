//! Info sidecar schema.
//!
//! Defines the JSON structure written to `<stem>.json` next to a resource
//! file, recording its upstream catalog identity. Key spelling ("activation
//! text", "sd version") matches the convention the host UI reads.

use serde::{Deserialize, Serialize};

/// JSON sidecar describing a resource's upstream catalog identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoSidecar {
    /// Comma-joined trained words for the resource.
    #[serde(rename = "activation text")]
    pub activation_text: String,

    /// Normalized base-model tag (e.g. `SD1`, `SDXL`); empty when unknown.
    #[serde(rename = "sd version")]
    pub sd_version: String,

    /// Upstream parent model id.
    #[serde(rename = "modelId")]
    pub model_id: i64,

    /// Upstream model version id.
    #[serde(rename = "modelVersionId")]
    pub model_version_id: i64,

    /// Uppercase SHA-256 of the resource file.
    pub sha256: String,
}

/// Serialize a sidecar to pretty-printed JSON.
pub fn serialize_sidecar(sidecar: &InfoSidecar) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(sidecar)
}
