//! Info-sidecar sync job.
//!
//! Scans the synced resource kinds, selects files without an info sidecar,
//! resolves their hashes through the reconciliation engine, and writes a
//! JSON sidecar for every resource the catalog knows. Each resource's
//! write is independent; one failure never aborts the rest.

use curator_core::base_model::normalize_base_model;
use curator_core::resource::{self, Resource, ResourceKind};
use curator_core::sidecar::{serialize_sidecar, InfoSidecar};

use crate::error::PipelineError;
use crate::hasher::FileHasher;
use crate::resolver::HashResolver;
use crate::scanner::Inventory;
use crate::settings::Settings;

/// Kinds covered by the info and preview sync jobs.
pub const SYNC_KINDS: &[ResourceKind] = &[
    ResourceKind::Lora,
    ResourceKind::LoCon,
    ResourceKind::Hypernetwork,
    ResourceKind::TextualInversion,
    ResourceKind::Checkpoint,
];

/// Scan and fill in missing info sidecars. Returns the number written.
pub async fn sync_info_files(
    settings: &Settings,
    hasher: &FileHasher,
    resolver: &HashResolver,
) -> Result<usize, PipelineError> {
    let inventory = Inventory::scan(settings, hasher, SYNC_KINDS).await?;
    sync_info_for_inventory(&inventory, resolver).await
}

/// Fill in missing info sidecars for an already-built inventory.
pub async fn sync_info_for_inventory(
    inventory: &Inventory,
    resolver: &HashResolver,
) -> Result<usize, PipelineError> {
    let missing: Vec<&Resource> = inventory
        .resources()
        .iter()
        .filter(|r| SYNC_KINDS.contains(&r.kind) && !r.has_info)
        .collect();
    if missing.is_empty() {
        return Ok(0);
    }

    tracing::info!(candidates = missing.len(), "Checking resources for missing info sidecars");

    let hashes: Vec<String> = missing.iter().map(|r| r.hash.clone()).collect();
    let records = resolver.resolve(&hashes).await?;

    let mut written = 0;
    for (resource, record) in missing.iter().zip(records.iter()) {
        let Some(record) = record else {
            continue;
        };
        // The sidecar may have appeared since the scan.
        if resource::has_info(&resource.path) {
            continue;
        }

        let sidecar = InfoSidecar {
            activation_text: record.trained_words.join(", "),
            sd_version: normalize_base_model(record.base_model.as_deref().unwrap_or(""))
                .to_string(),
            model_id: record.model_id,
            model_version_id: record.id,
            sha256: resource.hash.to_uppercase(),
        };
        let json = serialize_sidecar(&sidecar)?;

        let dest = resource::info_path(&resource.path);
        if let Err(err) = std::fs::write(&dest, json) {
            tracing::warn!(path = %dest.display(), error = %err, "Failed to write info sidecar");
            continue;
        }
        written += 1;
    }

    if written > 0 {
        tracing::info!(written, "Updated info sidecars");
    }
    Ok(written)
}
