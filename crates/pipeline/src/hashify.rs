//! Generation-metadata hashifier.
//!
//! Matches the resources referenced by a generation's metadata text
//! (inline network tags, embedding names, the loaded VAE, and the short
//! model hash) against the inventory, and merges their 10-character hash
//! prefixes into the text's `Hashes:` fragment so the originating
//! resources can be auto-detected when the image is shared.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use curator_core::infotext::{contains_token, merge_hashes, parse_infotext, short_hash};
use curator_core::resource::ResourceKind;
use regex::Regex;

use crate::scanner::Inventory;

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

/// Matches inline `<lora:NAME:WEIGHT>` / `<hypernet:NAME:WEIGHT>` tags;
/// an optional extra colon segment is ignored.
static NETWORK_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(lora|hypernet):([a-zA-Z0-9_\.\-\s]+):([0-9.]+)(?:[:][^>]*)?>")
        .expect("valid regex")
});

/// Matches the short model hash inside the generation parameters.
static MODEL_HASH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Model hash: ([0-9a-fA-F]{10})").expect("valid regex"));

// ---------------------------------------------------------------------------
// Hashify
// ---------------------------------------------------------------------------

/// Inputs for one hashify pass.
pub struct HashifyContext<'a> {
    pub inventory: &'a Inventory,
    /// File name of the currently loaded VAE, if any.
    pub loaded_vae: Option<&'a str>,
    /// Host toggle; when off the text passes through untouched.
    pub enabled: bool,
}

/// Embed short resource hashes into a generation-metadata text.
///
/// No-op when the feature is disabled or nothing in the text matches the
/// inventory.
pub fn augment_infotext(ctx: &HashifyContext<'_>, infotext: &str) -> String {
    if !ctx.enabled {
        return infotext.to_string();
    }
    let found = collect_resource_hashes(ctx.inventory, infotext, ctx.loaded_vae);
    if found.is_empty() {
        return infotext.to_string();
    }
    merge_hashes(infotext, &found)
}

/// Collect the short hashes of every inventory resource the text references.
pub fn collect_resource_hashes(
    inventory: &Inventory,
    infotext: &str,
    loaded_vae: Option<&str>,
) -> BTreeMap<String, String> {
    let parsed = parse_infotext(infotext);
    let mut found = BTreeMap::new();

    // Loaded VAE, matched by exact name (file name minus extension).
    if let Some(vae_file) = loaded_vae {
        let vae_name = Path::new(vae_file).with_extension("");
        let vae_name = vae_name.to_string_lossy();
        if let Some(resource) = inventory
            .of_kind(ResourceKind::Vae)
            .find(|r| r.name == vae_name)
        {
            found.insert("vae".to_string(), short_hash(&resource.hash).to_string());
        }
    }

    // Embeddings referenced as whole tokens in either prompt.
    for resource in inventory.of_kind(ResourceKind::TextualInversion) {
        if contains_token(&parsed.prompt, &resource.name)
            || contains_token(&parsed.negative_prompt, &resource.name)
        {
            found.insert(
                format!("embed:{}", resource.name),
                short_hash(&resource.hash).to_string(),
            );
        }
    }

    // Inline network tags in the positive prompt.
    for caps in NETWORK_TAG_RE.captures_iter(&parsed.prompt) {
        let tag_type = &caps[1];
        let tag_name = &caps[2];
        let kind = match tag_type {
            "lora" => ResourceKind::Lora,
            _ => ResourceKind::Hypernetwork,
        };
        let wanted = tag_name.to_lowercase();
        let matched = inventory.of_kind(kind).find(|r| {
            let name = r.name.to_lowercase();
            name == wanted || name.split('-').next().unwrap_or("") == wanted
        });
        if let Some(resource) = matched {
            found.insert(
                format!("{tag_type}:{tag_name}"),
                short_hash(&resource.hash).to_string(),
            );
        }
    }

    // Checkpoint referenced by the short model hash in the parameters.
    if let Some(caps) = MODEL_HASH_RE.captures(&parsed.generation_params) {
        let prefix = &caps[1];
        if let Some(resource) = inventory
            .of_kind(ResourceKind::Checkpoint)
            .find(|r| r.hash.starts_with(prefix))
        {
            found.insert("model".to_string(), short_hash(&resource.hash).to_string());
        }
    }

    found
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
