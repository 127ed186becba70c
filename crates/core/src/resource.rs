//! Local resource model: kinds, discovery rules, naming, and sidecar paths.
//!
//! A resource is one model file discovered under a configured root folder.
//! Each kind carries its own allowed file suffixes, exclusion suffixes, and
//! name-derivation rule; sidecar helpers locate the info JSON and preview
//! image that live next to the resource file.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Preview image extensions recognized next to a resource file.
pub const PREVIEW_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif"];

/// Extension suffix the preview sync job writes (`<stem>.preview.png`).
pub const PREVIEW_SUFFIX: &str = "preview.png";

// ---------------------------------------------------------------------------
// Resource kinds
// ---------------------------------------------------------------------------

/// The classes of local model files the scanner tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Checkpoint,
    Lora,
    LoCon,
    Hypernetwork,
    TextualInversion,
    Vae,
    Controlnet,
    Upscaler,
}

/// All kinds, in scan order.
pub const ALL_KINDS: &[ResourceKind] = &[
    ResourceKind::Lora,
    ResourceKind::LoCon,
    ResourceKind::Hypernetwork,
    ResourceKind::TextualInversion,
    ResourceKind::Checkpoint,
    ResourceKind::Controlnet,
    ResourceKind::Upscaler,
    ResourceKind::Vae,
];

impl ResourceKind {
    /// Canonical ecosystem label for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Checkpoint => "Checkpoint",
            Self::Lora => "LORA",
            Self::LoCon => "LoCon",
            Self::Hypernetwork => "Hypernetwork",
            Self::TextualInversion => "TextualInversion",
            Self::Vae => "VAE",
            Self::Controlnet => "Controlnet",
            Self::Upscaler => "Upscaler",
        }
    }

    /// Parse a canonical label back into a kind.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "Checkpoint" => Ok(Self::Checkpoint),
            "LORA" => Ok(Self::Lora),
            "LoCon" => Ok(Self::LoCon),
            "Hypernetwork" => Ok(Self::Hypernetwork),
            "TextualInversion" => Ok(Self::TextualInversion),
            "VAE" => Ok(Self::Vae),
            "Controlnet" => Ok(Self::Controlnet),
            "Upscaler" => Ok(Self::Upscaler),
            other => Err(CoreError::Validation(format!(
                "Unknown resource kind '{other}'"
            ))),
        }
    }

    /// File suffixes scanned for this kind in its primary root folder.
    ///
    /// The VAE suffixes here apply to the dedicated VAE folder; the scanner
    /// additionally sweeps the checkpoint root with
    /// [`vae_checkpoint_root_suffixes`].
    pub fn suffixes(self) -> &'static [&'static str] {
        match self {
            Self::Lora | Self::LoCon | Self::Hypernetwork => &["pt", "safetensors", "ckpt"],
            Self::TextualInversion => &["pt", "bin", "safetensors"],
            Self::Checkpoint | Self::Controlnet => &["safetensors", "ckpt"],
            Self::Upscaler => &["safetensors", "ckpt", "pt"],
            Self::Vae => &["pt", "safetensors", "ckpt"],
        }
    }

    /// Suffixes excluded from this kind's scan. Keeps standalone VAE weights
    /// out of checkpoint and controlnet matches.
    pub fn excluded_suffixes(self) -> &'static [&'static str] {
        match self {
            Self::Checkpoint | Self::Controlnet => &["vae.safetensors", "vae.ckpt"],
            _ => &[],
        }
    }

    /// Whether derived names keep the file extension.
    pub fn keeps_extension(self) -> bool {
        matches!(self, Self::Checkpoint)
    }
}

/// Compound suffixes matched when sweeping the checkpoint root for VAEs.
pub fn vae_checkpoint_root_suffixes() -> &'static [&'static str] {
    &["vae.pt", "vae.safetensors", "vae.ckpt"]
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Resource
// ---------------------------------------------------------------------------

/// One discovered local model file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub kind: ResourceKind,
    /// Root-relative name used as a matching key (see [`derived_name`]).
    pub name: String,
    /// Lowercase SHA-256 hex digest of the file contents.
    pub hash: String,
    /// Absolute path of the file.
    pub path: PathBuf,
    /// A preview image sidecar exists next to the file.
    pub has_preview: bool,
    /// A JSON info sidecar exists next to the file.
    pub has_info: bool,
}

// ---------------------------------------------------------------------------
// Name derivation
// ---------------------------------------------------------------------------

/// Derive the inventory name for a file discovered under `root`.
///
/// The name is the path relative to the scanned root; checkpoints keep
/// their extension, every other kind strips the final extension. A file
/// that escapes the root (e.g. through a symlink) falls back to its bare
/// file name.
pub fn derived_name(kind: ResourceKind, path: &Path, root: &Path) -> String {
    let relative = match path.strip_prefix(root) {
        Ok(rel) => rel.to_path_buf(),
        Err(_) => path.file_name().map(PathBuf::from).unwrap_or_default(),
    };

    let named = if kind.keeps_extension() {
        relative
    } else {
        relative.with_extension("")
    };
    named.to_string_lossy().into_owned()
}

// ---------------------------------------------------------------------------
// Sidecar paths
// ---------------------------------------------------------------------------

/// Path of the JSON info sidecar for a resource file.
pub fn info_path(resource_path: &Path) -> PathBuf {
    resource_path.with_extension("json")
}

/// Path the preview sync job writes next to a resource file.
pub fn preview_path(resource_path: &Path) -> PathBuf {
    resource_path.with_extension(PREVIEW_SUFFIX)
}

/// True when a JSON info sidecar exists next to the file.
pub fn has_info(resource_path: &Path) -> bool {
    info_path(resource_path).is_file()
}

/// True when any recognized preview image exists next to the file.
///
/// Accepts both `<stem>.<ext>` and `<stem>.preview.<ext>` for every
/// extension in [`PREVIEW_EXTENSIONS`].
pub fn has_preview(resource_path: &Path) -> bool {
    PREVIEW_EXTENSIONS.iter().any(|ext| {
        resource_path.with_extension(ext).is_file()
            || resource_path
                .with_extension(format!("preview.{ext}"))
                .is_file()
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- name derivation -------------------------------------------------------

    #[test]
    fn checkpoint_name_keeps_relative_path_and_extension() {
        let name = derived_name(
            ResourceKind::Checkpoint,
            Path::new("/models/Stable-diffusion/sub/model.safetensors"),
            Path::new("/models/Stable-diffusion"),
        );
        assert_eq!(name, "sub/model.safetensors");
    }

    #[test]
    fn lora_name_strips_extension() {
        let name = derived_name(
            ResourceKind::Lora,
            Path::new("/models/Lora/sub/model.safetensors"),
            Path::new("/models/Lora"),
        );
        assert_eq!(name, "sub/model");
    }

    #[test]
    fn only_final_extension_is_stripped() {
        let name = derived_name(
            ResourceKind::Vae,
            Path::new("/models/Stable-diffusion/anime.vae.pt"),
            Path::new("/models/Stable-diffusion"),
        );
        assert_eq!(name, "anime.vae");
    }

    #[test]
    fn file_outside_root_falls_back_to_file_name() {
        let name = derived_name(
            ResourceKind::Lora,
            Path::new("/elsewhere/detail.safetensors"),
            Path::new("/models/Lora"),
        );
        assert_eq!(name, "detail");
    }

    // -- kind tables -----------------------------------------------------------

    #[test]
    fn labels_round_trip() {
        for kind in ALL_KINDS {
            assert_eq!(ResourceKind::from_name(kind.as_str()).unwrap(), *kind);
        }
    }

    #[test]
    fn unknown_label_rejected() {
        assert!(ResourceKind::from_name("Diffuser").is_err());
        assert!(ResourceKind::from_name("").is_err());
    }

    #[test]
    fn checkpoint_excludes_standalone_vae_suffixes() {
        assert!(ResourceKind::Checkpoint
            .excluded_suffixes()
            .contains(&"vae.safetensors"));
        assert!(ResourceKind::Lora.excluded_suffixes().is_empty());
    }

    #[test]
    fn only_checkpoints_keep_extensions() {
        assert!(ResourceKind::Checkpoint.keeps_extension());
        assert!(!ResourceKind::Lora.keeps_extension());
        assert!(!ResourceKind::Vae.keeps_extension());
    }

    // -- sidecar paths ---------------------------------------------------------

    #[test]
    fn info_path_replaces_final_extension() {
        assert_eq!(
            info_path(Path::new("/m/anime.vae.pt")),
            Path::new("/m/anime.vae.json")
        );
    }

    #[test]
    fn preview_path_uses_preview_suffix() {
        assert_eq!(
            preview_path(Path::new("/m/style.safetensors")),
            Path::new("/m/style.preview.png")
        );
    }

    #[test]
    fn sidecar_detection_sees_plain_and_preview_named_images() {
        let dir = tempfile::tempdir().unwrap();
        let resource = dir.path().join("style.safetensors");
        std::fs::write(&resource, b"w").unwrap();

        assert!(!has_preview(&resource));
        assert!(!has_info(&resource));

        std::fs::write(dir.path().join("style.preview.png"), b"p").unwrap();
        assert!(has_preview(&resource));

        std::fs::write(dir.path().join("style.json"), b"{}").unwrap();
        assert!(has_info(&resource));
    }

    #[test]
    fn plain_image_next_to_resource_counts_as_preview() {
        let dir = tempfile::tempdir().unwrap();
        let resource = dir.path().join("style.safetensors");
        std::fs::write(&resource, b"w").unwrap();
        std::fs::write(dir.path().join("style.jpg"), b"p").unwrap();
        assert!(has_preview(&resource));
    }
}
