//! Resource indexing and catalog-reconciliation engine.
//!
//! This crate ties the domain logic, cache, and catalog client together:
//! the scanner builds an [`Inventory`] of local model files, the resolver
//! reconciles their hashes against the remote catalog through the cache,
//! the two sync jobs fill in missing sidecar files, and the hashifier
//! embeds short resource hashes into generation metadata.

pub mod error;
pub mod hasher;
pub mod hashify;
pub mod info_sync;
pub mod jobs;
pub mod preview_sync;
pub mod resolver;
pub mod scanner;
pub mod settings;

pub use error::PipelineError;
pub use hasher::FileHasher;
pub use jobs::SyncJobs;
pub use resolver::{HashLookup, HashResolver};
pub use scanner::Inventory;
pub use settings::Settings;
