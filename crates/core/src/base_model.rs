//! Base-model label normalization.
//!
//! The catalog reports model families as free text ("SDXL 1.0",
//! "Pony Diffusion V6"); the host's sidecar format wants a short tag.

/// Ordered prefix table mapping upstream base-model labels to short tags.
/// The first matching prefix wins.
pub const BASE_MODEL_TAGS: &[(&str, &str)] = &[
    ("SD 1", "SD1"),
    ("SD 1.5", "SD1"),
    ("SD 2", "SD2"),
    ("SD 3", "SD3"),
    ("SDXL", "SDXL"),
    ("Pony", "SDXL"),
    ("Illustrious", "SDXL"),
];

/// Normalize a free-text base-model label to a short tag.
///
/// Returns the tag of the first table entry whose key is a prefix of
/// `label`, or `""` when none matches.
pub fn normalize_base_model(label: &str) -> &'static str {
    BASE_MODEL_TAGS
        .iter()
        .find(|(prefix, _)| label.starts_with(prefix))
        .map(|(_, tag)| *tag)
        .unwrap_or("")
}
