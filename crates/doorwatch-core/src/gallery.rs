//! Reference gallery loading.
//!
//! Reads a directory of face images, encodes each one, and produces the
//! in-memory gallery the matcher compares against. The encoding step is
//! injected so the directory handling can be tested without ONNX models.

use crate::classifier::FaceError;
use crate::types::{Embedding, ReferenceFace};
use std::path::Path;
use thiserror::Error;

/// Accepted gallery image extensions (case-insensitive).
const GALLERY_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("gallery directory not found: {0}")]
    DirectoryNotFound(String),
    #[error("cannot read gallery directory {dir}: {source}")]
    Io {
        dir: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot decode gallery image {path}: {source}")]
    Image {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("face encoding failed for {path}: {source}")]
    Encode {
        path: String,
        #[source]
        source: FaceError,
    },
}

/// Load every reference face from `dir`.
///
/// Files with unrecognized extensions are silently skipped; images in which
/// `encode` finds no face are skipped with a warning. Each reference is
/// labeled with its file stem. Entries are processed in name order so the
/// gallery is deterministic.
pub fn load_reference_gallery<F>(dir: &Path, mut encode: F) -> Result<Vec<ReferenceFace>, GalleryError>
where
    F: FnMut(&[u8], u32, u32) -> Result<Option<Embedding>, FaceError>,
{
    if !dir.is_dir() {
        return Err(GalleryError::DirectoryNotFound(dir.display().to_string()));
    }

    let read_dir = std::fs::read_dir(dir).map_err(|e| GalleryError::Io {
        dir: dir.display().to_string(),
        source: e,
    })?;

    let mut paths: Vec<_> = read_dir
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .map(|e| GALLERY_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();

    let mut gallery = Vec::new();

    for path in paths {
        let image = image::open(&path).map_err(|e| GalleryError::Image {
            path: path.display().to_string(),
            source: e,
        })?;
        let luma = image.to_luma8();

        let label = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("reference")
            .to_string();

        match encode(luma.as_raw(), luma.width(), luma.height()).map_err(|e| GalleryError::Encode {
            path: path.display().to_string(),
            source: e,
        })? {
            Some(embedding) => {
                tracing::info!(label = %label, path = %path.display(), "enrolled reference face");
                gallery.push(ReferenceFace { label, embedding });
            }
            None => {
                tracing::warn!(path = %path.display(), "no face found in gallery image, skipping");
            }
        }
    }

    if gallery.is_empty() {
        tracing::warn!(dir = %dir.display(), "reference gallery is empty, no visitor will match as friend");
    }

    Ok(gallery)
}
