//! Preview-image sync job.
//!
//! Scans the synced resource kinds, selects files without a preview image,
//! resolves their hashes, and downloads the first usable catalog media
//! entry for each, resized to a 512 long edge and re-encoded as PNG. A
//! failed or cancelled download removes its partial file, logs, and the
//! job moves on to the next resource.

use std::io::Cursor;
use std::path::Path;

use curator_catalog::{ModelImage, CLIENT_IDENTIFIER};
use curator_core::resource::{self, Resource};
use futures::StreamExt;
use image::imageops::FilterType;
use image::ImageFormat;
use reqwest::header::USER_AGENT;

use crate::error::PipelineError;
use crate::hasher::FileHasher;
use crate::info_sync::SYNC_KINDS;
use crate::resolver::HashResolver;
use crate::scanner::Inventory;
use crate::settings::Settings;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Long-edge size previews are resized to.
pub const PREVIEW_LONG_EDGE: u32 = 512;

/// Media suffixes never usable as a static preview.
const SKIPPED_MEDIA_SUFFIXES: &[&str] = &[".mp4", ".gif"];

/// Progress callback for preview downloads. Receives bytes downloaded so
/// far and the total reported by the server; returning `true` cancels the
/// download.
pub type ProgressFn<'a> = &'a (dyn Fn(u64, Option<u64>) -> bool + Send + Sync);

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// Scan and fill in missing preview images. Returns the number written.
pub async fn sync_preview_images(
    settings: &Settings,
    hasher: &FileHasher,
    resolver: &HashResolver,
    http: &reqwest::Client,
    progress: Option<ProgressFn<'_>>,
) -> Result<usize, PipelineError> {
    let inventory = Inventory::scan(settings, hasher, SYNC_KINDS).await?;
    sync_previews_for_inventory(&inventory, resolver, http, progress).await
}

/// Fill in missing preview images for an already-built inventory.
pub async fn sync_previews_for_inventory(
    inventory: &Inventory,
    resolver: &HashResolver,
    http: &reqwest::Client,
    progress: Option<ProgressFn<'_>>,
) -> Result<usize, PipelineError> {
    let missing: Vec<&Resource> = inventory
        .resources()
        .iter()
        .filter(|r| SYNC_KINDS.contains(&r.kind) && !r.has_preview)
        .collect();
    if missing.is_empty() {
        return Ok(0);
    }

    tracing::info!(candidates = missing.len(), "Checking resources for missing preview images");

    let hashes: Vec<String> = missing.iter().map(|r| r.hash.clone()).collect();
    let records = resolver.resolve(&hashes).await?;

    let mut written = 0;
    for (resource, record) in missing.iter().zip(records.iter()) {
        let Some(record) = record else {
            continue;
        };
        let Some(url) = pick_preview_url(&record.images) else {
            continue;
        };

        let dest = resource::preview_path(&resource.path);
        if dest.exists() {
            continue;
        }

        match download_preview(http, url, &dest, progress).await {
            Ok(()) => written += 1,
            Err(err) => {
                tracing::warn!(path = %dest.display(), error = %err, "Preview download failed");
            }
        }
    }

    if written > 0 {
        tracing::info!(written, "Updated preview images");
    }
    Ok(written)
}

/// Pick the first media entry usable as a static preview: anything whose
/// URL does not end in a video/animation suffix (case-insensitive).
pub fn pick_preview_url(images: &[ModelImage]) -> Option<&str> {
    images.iter().map(|image| image.url.as_str()).find(|url| {
        let lower = url.to_lowercase();
        !SKIPPED_MEDIA_SUFFIXES
            .iter()
            .any(|suffix| lower.ends_with(suffix))
    })
}

// ---------------------------------------------------------------------------
// Download + re-encode
// ---------------------------------------------------------------------------

/// Download `url`, resize to [`PREVIEW_LONG_EDGE`], re-encode as PNG, and
/// write the result to `dest`. On failure or cancellation any partially
/// written destination file is removed.
pub async fn download_preview(
    http: &reqwest::Client,
    url: &str,
    dest: &Path,
    progress: Option<ProgressFn<'_>>,
) -> Result<(), PipelineError> {
    let result = fetch_and_write(http, url, dest, progress).await;
    if result.is_err() && dest.exists() {
        let _ = std::fs::remove_file(dest);
    }
    result
}

async fn fetch_and_write(
    http: &reqwest::Client,
    url: &str,
    dest: &Path,
    progress: Option<ProgressFn<'_>>,
) -> Result<(), PipelineError> {
    let download_err = |reason: String| PipelineError::Download {
        url: url.to_string(),
        reason,
    };

    let response = http
        .get(url)
        .header(USER_AGENT, CLIENT_IDENTIFIER)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|err| download_err(err.to_string()))?;

    let total = response.content_length();
    let mut stream = response.bytes_stream();
    let mut data: Vec<u8> = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|err| download_err(err.to_string()))?;
        data.extend_from_slice(&chunk);
        if let Some(progress) = progress {
            if progress(data.len() as u64, total) {
                return Err(PipelineError::Cancelled);
            }
        }
    }

    let png = resize_preview(&data)?;
    std::fs::write(dest, png).map_err(|source| PipelineError::Io {
        path: dest.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Resize image bytes so the long edge is [`PREVIEW_LONG_EDGE`] (aspect
/// ratio preserved, Lanczos3) and re-encode as PNG.
pub fn resize_preview(data: &[u8]) -> Result<Vec<u8>, PipelineError> {
    let decoded = image::load_from_memory(data)?;
    let resized = decoded.resize(PREVIEW_LONG_EDGE, PREVIEW_LONG_EDGE, FilterType::Lanczos3);

    let mut out = Vec::new();
    resized.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbaImage};

    fn image_entry(url: &str) -> ModelImage {
        ModelImage {
            url: url.to_string(),
        }
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(width, height));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    // -- pick_preview_url ------------------------------------------------------

    #[test]
    fn first_static_image_wins() {
        let images = vec![
            image_entry("https://cdn.example/a.mp4"),
            image_entry("https://cdn.example/b.jpeg"),
            image_entry("https://cdn.example/c.png"),
        ];
        assert_eq!(pick_preview_url(&images), Some("https://cdn.example/b.jpeg"));
    }

    #[test]
    fn animated_suffixes_are_skipped_case_insensitively() {
        let images = vec![
            image_entry("https://cdn.example/clip.MP4"),
            image_entry("https://cdn.example/anim.GIF"),
        ];
        assert_eq!(pick_preview_url(&images), None);
    }

    #[test]
    fn no_images_yields_none() {
        assert_eq!(pick_preview_url(&[]), None);
    }

    // -- resize_preview --------------------------------------------------------

    #[test]
    fn wide_image_resizes_to_512_long_edge() {
        let resized = resize_preview(&png_bytes(1024, 512)).unwrap();
        let decoded = image::load_from_memory(&resized).unwrap();
        assert_eq!(decoded.width(), 512);
        assert_eq!(decoded.height(), 256);
    }

    #[test]
    fn tall_image_resizes_to_512_long_edge() {
        let resized = resize_preview(&png_bytes(256, 1024)).unwrap();
        let decoded = image::load_from_memory(&resized).unwrap();
        assert_eq!(decoded.width(), 128);
        assert_eq!(decoded.height(), 512);
    }

    #[test]
    fn output_is_png() {
        let resized = resize_preview(&png_bytes(64, 64)).unwrap();
        assert_eq!(&resized[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn garbage_bytes_fail_decoding() {
        assert!(matches!(
            resize_preview(b"not an image"),
            Err(PipelineError::Image(_))
        ));
    }
}
