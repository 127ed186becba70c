//! Resource discovery.
//!
//! Walks the configured model folders, derives names, digests file
//! contents through the [`FileHasher`], and records sidecar presence. The
//! result is an owned [`Inventory`] that downstream consumers (sync jobs,
//! hashifier) read without any shared mutable state.

use std::path::{Path, PathBuf};

use curator_core::resource::{
    self, derived_name, vae_checkpoint_root_suffixes, Resource, ResourceKind,
};
use walkdir::WalkDir;

use crate::error::PipelineError;
use crate::hasher::FileHasher;
use crate::settings::Settings;

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// The discovered local resources, at most one snapshot per scan pass.
///
/// Rebuilding a kind fully replaces that kind's entries; entries of other
/// kinds are untouched.
#[derive(Debug, Default)]
pub struct Inventory {
    resources: Vec<Resource>,
}

impl Inventory {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build an inventory from pre-discovered resources. Hosts that track
    /// resources themselves can inject them directly; tests use this too.
    pub fn from_resources(resources: Vec<Resource>) -> Self {
        Self { resources }
    }

    /// Scan the given kinds into a fresh inventory.
    pub async fn scan(
        settings: &Settings,
        hasher: &FileHasher,
        kinds: &[ResourceKind],
    ) -> Result<Self, PipelineError> {
        let mut inventory = Self::empty();
        inventory.rescan(settings, hasher, kinds).await?;
        Ok(inventory)
    }

    /// Re-scan the given kinds, replacing their entries wholesale.
    pub async fn rescan(
        &mut self,
        settings: &Settings,
        hasher: &FileHasher,
        kinds: &[ResourceKind],
    ) -> Result<(), PipelineError> {
        for kind in kinds {
            let fresh = scan_kind(settings, hasher, *kind).await?;
            self.resources.retain(|r| r.kind != *kind);
            self.resources.extend(fresh);
        }
        Ok(())
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Resources of one kind, in scan order.
    pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &Resource> {
        self.resources.iter().filter(move |r| r.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Scanning
// ---------------------------------------------------------------------------

/// Scan one kind across its configured root folder(s).
async fn scan_kind(
    settings: &Settings,
    hasher: &FileHasher,
    kind: ResourceKind,
) -> Result<Vec<Resource>, PipelineError> {
    match kind {
        ResourceKind::Checkpoint => {
            scan_folder(kind, &settings.checkpoint_root(), kind.suffixes(), hasher).await
        }
        ResourceKind::Lora => scan_folder(kind, &settings.lora_root(), kind.suffixes(), hasher).await,
        ResourceKind::LoCon => {
            let lora_root = ensure_root(&settings.lora_root())?;
            let lycoris_root = ensure_root(&settings.lycoris_root())?;
            // Without a dedicated LyCORIS folder the LoRA scan already
            // covers these files; a second pass would duplicate them.
            if lora_root == lycoris_root {
                return Ok(Vec::new());
            }
            scan_folder(kind, &lycoris_root, kind.suffixes(), hasher).await
        }
        ResourceKind::Hypernetwork => {
            scan_folder(kind, &settings.hypernetwork_root(), kind.suffixes(), hasher).await
        }
        ResourceKind::TextualInversion => {
            scan_folder(kind, &settings.embeddings_root(), kind.suffixes(), hasher).await
        }
        ResourceKind::Controlnet => {
            scan_folder(kind, &settings.controlnet_root(), kind.suffixes(), hasher).await
        }
        ResourceKind::Upscaler => {
            scan_folder(kind, &settings.upscaler_root(), kind.suffixes(), hasher).await
        }
        ResourceKind::Vae => {
            // Standalone VAE files live both next to the checkpoints (with
            // compound `.vae.*` suffixes) and in the dedicated VAE folder.
            let checkpoint_root = ensure_root(&settings.checkpoint_root())?;
            let vae_root = ensure_root(&settings.vae_root())?;

            let mut resources = scan_folder(
                kind,
                &checkpoint_root,
                vae_checkpoint_root_suffixes(),
                hasher,
            )
            .await?;
            if checkpoint_root != vae_root {
                resources.extend(scan_folder(kind, &vae_root, kind.suffixes(), hasher).await?);
            }
            Ok(resources)
        }
    }
}

/// Scan a single folder for files carrying one of `suffixes`, excluding
/// the kind's exclusion suffixes.
async fn scan_folder(
    kind: ResourceKind,
    folder: &Path,
    suffixes: &[&str],
    hasher: &FileHasher,
) -> Result<Vec<Resource>, PipelineError> {
    let folder = ensure_root(folder)?;

    let mut candidates: Vec<PathBuf> = WalkDir::new(&folder)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            includes_suffix(&name, suffixes) && !excluded_by_suffix(&name, kind.excluded_suffixes())
        })
        .collect();
    candidates.sort();

    let mut resources = Vec::with_capacity(candidates.len());
    for path in candidates {
        // A file can vanish between enumeration and hashing; skip it.
        let hash = match hasher.hash_file(&path).await {
            Ok(hash) => hash,
            Err(PipelineError::Io { source, .. }) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %source,
                    "File unreadable during scan; skipping"
                );
                continue;
            }
            Err(err) => return Err(err),
        };

        resources.push(Resource {
            kind,
            name: derived_name(kind, &path, &folder),
            hash,
            has_preview: resource::has_preview(&path),
            has_info: resource::has_info(&path),
            path,
        });
    }

    tracing::debug!(kind = %kind, folder = %folder.display(), count = resources.len(), "Scanned folder");
    Ok(resources)
}

/// Create the root folder if missing and return its canonical path.
fn ensure_root(folder: &Path) -> Result<PathBuf, PipelineError> {
    std::fs::create_dir_all(folder).map_err(|source| PipelineError::Io {
        path: folder.to_path_buf(),
        source,
    })?;
    folder.canonicalize().map_err(|source| PipelineError::Io {
        path: folder.to_path_buf(),
        source,
    })
}

/// True when `name` ends with `.{suffix}` for any of `suffixes`.
fn includes_suffix(name: &str, suffixes: &[&str]) -> bool {
    suffixes
        .iter()
        .any(|suffix| name.len() > suffix.len() + 1 && strip_dot_suffix(name, suffix))
}

fn strip_dot_suffix(name: &str, suffix: &str) -> bool {
    name.ends_with(suffix) && name[..name.len() - suffix.len()].ends_with('.')
}

/// True when `name` ends with any exclusion suffix (no dot required, so
/// `myvae.safetensors` is excluded by `vae.safetensors`).
fn excluded_by_suffix(name: &str, suffixes: &[&str]) -> bool {
    suffixes.iter().any(|suffix| name.ends_with(suffix))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
