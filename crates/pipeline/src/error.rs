use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] curator_core::CoreError),

    #[error(transparent)]
    Cache(#[from] curator_cache::CacheError),

    #[error(transparent)]
    Catalog(#[from] curator_catalog::CatalogError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Download failed for {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("Download cancelled")]
    Cancelled,

    #[error("Image processing failed: {0}")]
    Image(#[from] image::ImageError),
}
