//! Domain logic for the curator resource-sync service.
//!
//! Pure building blocks shared by the scanner, sync jobs, and hashifier:
//! the local resource model and its naming rules, base-model label
//! normalization, SHA-256 helpers, generation-infotext parsing and
//! `Hashes:` merging, and the info sidecar schema.

pub mod base_model;
pub mod error;
pub mod hashing;
pub mod infotext;
pub mod resource;
pub mod sidecar;

pub use error::CoreError;
