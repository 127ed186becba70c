//! HTTP client for the remote model catalog.
//!
//! Wraps the catalog's REST API (hash-batch lookup, single-version
//! lookup, model/creator/tag search) using [`reqwest`], with typed
//! response records and the fixed client-identifier and bearer-auth
//! headers every request carries.

pub mod client;
pub mod models;

pub use client::{
    CatalogClient, CatalogError, ModelSearchQuery, BASE_URL, CLIENT_IDENTIFIER, MAX_HASH_BATCH,
};
pub use models::{
    CatalogCreator, CatalogModel, CatalogTag, ModelFile, ModelImage, ModelVersion, PageMetadata,
    SearchPage,
};
