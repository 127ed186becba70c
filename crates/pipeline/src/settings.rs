//! Runtime settings for the sync pipeline.
//!
//! Mirrors the host's configuration surface: folder overrides for the
//! model/LoRA/LyCORIS directories, the catalog API key, and the hashify
//! toggle. Values come from the environment (a `.env` file is honored by
//! the worker binary before settings are read).

use std::env;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Environment variable names
// ---------------------------------------------------------------------------

const ENV_MODELS_ROOT: &str = "CURATOR_MODELS_ROOT";
const ENV_CHECKPOINT_DIR: &str = "CURATOR_CHECKPOINT_DIR";
const ENV_LORA_DIR: &str = "CURATOR_LORA_DIR";
const ENV_LYCORIS_DIR: &str = "CURATOR_LYCORIS_DIR";
const ENV_EMBEDDINGS_DIR: &str = "CURATOR_EMBEDDINGS_DIR";
const ENV_HYPERNETWORK_DIR: &str = "CURATOR_HYPERNETWORK_DIR";
const ENV_VAE_DIR: &str = "CURATOR_VAE_DIR";
const ENV_API_KEY: &str = "CURATOR_API_KEY";
const ENV_HASHIFY: &str = "CURATOR_HASHIFY";
const ENV_CACHE_PATH: &str = "CURATOR_CACHE_PATH";

/// Default models root when no override is configured.
const DEFAULT_MODELS_ROOT: &str = "models";

/// Default cache database location.
const DEFAULT_CACHE_PATH: &str = "cache/curator.sqlite";

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Runtime settings consumed by the scanner, sync jobs, and hashifier.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Root under which per-kind model folders live by default.
    pub models_root: PathBuf,
    /// Checkpoint folder override.
    pub checkpoint_dir: Option<PathBuf>,
    /// LoRA folder override.
    pub lora_dir: Option<PathBuf>,
    /// LyCORIS folder override; falls back to the LoRA folder when unset.
    pub lycoris_dir: Option<PathBuf>,
    /// Embeddings folder override.
    pub embeddings_dir: Option<PathBuf>,
    /// Hypernetwork folder override.
    pub hypernetwork_dir: Option<PathBuf>,
    /// Dedicated VAE folder override.
    pub vae_dir: Option<PathBuf>,
    /// Catalog API key; requests go unauthenticated without one.
    pub api_key: Option<String>,
    /// Gate for embedding resource hashes into generation metadata.
    pub hashify: bool,
    /// Location of the cache database file.
    pub cache_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            models_root: PathBuf::from(DEFAULT_MODELS_ROOT),
            checkpoint_dir: None,
            lora_dir: None,
            lycoris_dir: None,
            embeddings_dir: None,
            hypernetwork_dir: None,
            vae_dir: None,
            api_key: None,
            hashify: true,
            cache_path: PathBuf::from(DEFAULT_CACHE_PATH),
        }
    }
}

impl Settings {
    /// Build settings from the environment, using defaults for anything
    /// unset.
    pub fn from_env() -> Self {
        Self {
            models_root: env_path(ENV_MODELS_ROOT)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODELS_ROOT)),
            checkpoint_dir: env_path(ENV_CHECKPOINT_DIR),
            lora_dir: env_path(ENV_LORA_DIR),
            lycoris_dir: env_path(ENV_LYCORIS_DIR),
            embeddings_dir: env_path(ENV_EMBEDDINGS_DIR),
            hypernetwork_dir: env_path(ENV_HYPERNETWORK_DIR),
            vae_dir: env_path(ENV_VAE_DIR),
            api_key: env_nonempty(ENV_API_KEY),
            hashify: env_flag(ENV_HASHIFY, true),
            cache_path: env_path(ENV_CACHE_PATH)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_PATH)),
        }
    }

    // ---- folder resolution ----

    /// Checkpoint root (the shared model folder).
    pub fn checkpoint_root(&self) -> PathBuf {
        self.checkpoint_dir
            .clone()
            .unwrap_or_else(|| self.models_root.join("Stable-diffusion"))
    }

    /// LoRA root.
    pub fn lora_root(&self) -> PathBuf {
        self.lora_dir
            .clone()
            .unwrap_or_else(|| self.models_root.join("Lora"))
    }

    /// LyCORIS root; the LoRA root when no dedicated folder is configured.
    pub fn lycoris_root(&self) -> PathBuf {
        self.lycoris_dir.clone().unwrap_or_else(|| self.lora_root())
    }

    /// Hypernetwork root.
    pub fn hypernetwork_root(&self) -> PathBuf {
        self.hypernetwork_dir
            .clone()
            .unwrap_or_else(|| self.models_root.join("hypernetworks"))
    }

    /// Textual-inversion embeddings root.
    pub fn embeddings_root(&self) -> PathBuf {
        self.embeddings_dir
            .clone()
            .unwrap_or_else(|| self.models_root.join("embeddings"))
    }

    /// Controlnet root.
    pub fn controlnet_root(&self) -> PathBuf {
        self.models_root.join("ControlNet")
    }

    /// Upscaler root.
    pub fn upscaler_root(&self) -> PathBuf {
        self.models_root.join("ESRGAN")
    }

    /// Dedicated VAE root (scanned in addition to the checkpoint root).
    pub fn vae_root(&self) -> PathBuf {
        self.vae_dir
            .clone()
            .unwrap_or_else(|| self.models_root.join("VAE"))
    }
}

// ---------------------------------------------------------------------------
// Environment helpers
// ---------------------------------------------------------------------------

fn env_nonempty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_path(name: &str) -> Option<PathBuf> {
    env_nonempty(name).map(PathBuf::from)
}

fn env_flag(name: &str, default: bool) -> bool {
    match env_nonempty(name) {
        Some(value) => !matches!(value.to_lowercase().as_str(), "0" | "false" | "no" | "off"),
        None => default,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn lycoris_falls_back_to_lora_root() {
        let settings = Settings {
            lora_dir: Some(PathBuf::from("/custom/lora")),
            ..Default::default()
        };
        assert_eq!(settings.lycoris_root(), Path::new("/custom/lora"));
    }

    #[test]
    fn lycoris_override_wins() {
        let settings = Settings {
            lora_dir: Some(PathBuf::from("/custom/lora")),
            lycoris_dir: Some(PathBuf::from("/custom/lycoris")),
            ..Default::default()
        };
        assert_eq!(settings.lycoris_root(), Path::new("/custom/lycoris"));
    }

    #[test]
    fn unset_folders_derive_from_models_root() {
        let settings = Settings {
            models_root: PathBuf::from("/data/models"),
            ..Default::default()
        };
        assert_eq!(
            settings.checkpoint_root(),
            Path::new("/data/models/Stable-diffusion")
        );
        assert_eq!(settings.lora_root(), Path::new("/data/models/Lora"));
        assert_eq!(
            settings.controlnet_root(),
            Path::new("/data/models/ControlNet")
        );
        assert_eq!(settings.upscaler_root(), Path::new("/data/models/ESRGAN"));
        assert_eq!(settings.vae_root(), Path::new("/data/models/VAE"));
    }

    #[test]
    fn hashify_defaults_on() {
        assert!(Settings::default().hashify);
    }
}
