//! Visitor classification: combines object detections and face matching
//! into a single per-frame category.

use crate::detector::{DetectorError, FaceDetector};
use crate::gallery::{self, GalleryError};
use crate::labels;
use crate::objects::Detection;
use crate::recognizer::{FaceRecognizer, RecognizerError};
use crate::types::{CosineMatcher, Embedding, Matcher, ReferenceFace};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Per-frame visitor category. Exactly one per processed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Friend,
    Delivery,
    Thief,
    NoPerson,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Friend => "friend",
            Category::Delivery => "delivery",
            Category::Thief => "thief",
            Category::NoPerson => "noperson",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum FaceError {
    #[error("face detection: {0}")]
    Detector(#[from] DetectorError),
    #[error("face recognition: {0}")]
    Recognizer(#[from] RecognizerError),
}

/// Face-matching service seam: reports whether any face in the frame
/// matches the reference gallery.
pub trait FaceMatcher {
    fn any_known_face(&mut self, luma: &[u8], width: u32, height: u32) -> Result<bool, FaceError>;
}

/// Classify the visitor in a frame.
///
/// Strict priority order:
/// 1. no "person" detection → [`Category::NoPerson`] (face matching skipped)
/// 2. any face matches the gallery → [`Category::Friend`]
/// 3. any delivery-cue label present → [`Category::Delivery`]
/// 4. otherwise → [`Category::Thief`]
pub fn classify<M: FaceMatcher>(
    detections: &[Detection],
    luma: &[u8],
    width: u32,
    height: u32,
    matcher: &mut M,
) -> Result<Category, FaceError> {
    if !detections.iter().any(Detection::is_person) {
        return Ok(Category::NoPerson);
    }

    if matcher.any_known_face(luma, width, height)? {
        return Ok(Category::Friend);
    }

    if detections.iter().any(|d| labels::is_delivery_cue(d.label())) {
        return Ok(Category::Delivery);
    }

    Ok(Category::Thief)
}

/// Production face matcher: SCRFD detection, ArcFace embedding, cosine
/// matching against the reference gallery.
pub struct FaceIdentifier {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
    threshold: f32,
    gallery: Vec<ReferenceFace>,
}

impl FaceIdentifier {
    /// Build an identifier with an empty gallery; call
    /// [`load_gallery`](Self::load_gallery) before the first frame.
    pub fn new(detector: FaceDetector, recognizer: FaceRecognizer, threshold: f32) -> Self {
        Self {
            detector,
            recognizer,
            threshold,
            gallery: Vec::new(),
        }
    }

    /// Load reference faces from a directory of images. Returns the number
    /// of references enrolled.
    pub fn load_gallery(&mut self, dir: &Path) -> Result<usize, GalleryError> {
        let detector = &mut self.detector;
        let recognizer = &mut self.recognizer;
        let gallery = gallery::load_reference_gallery(dir, |luma, w, h| {
            encode_best_face(detector, recognizer, luma, w, h)
        })?;
        let count = gallery.len();
        self.gallery = gallery;
        Ok(count)
    }

    pub fn gallery_len(&self) -> usize {
        self.gallery.len()
    }
}

impl FaceMatcher for FaceIdentifier {
    /// Walk every detected face and compare its embedding against the
    /// gallery; a single match suffices.
    fn any_known_face(&mut self, luma: &[u8], width: u32, height: u32) -> Result<bool, FaceError> {
        let faces = self.detector.detect(luma, width, height)?;

        for face in &faces {
            let embedding = self.recognizer.extract(luma, width, height, face)?;
            let result = CosineMatcher.compare(&embedding, &self.gallery, self.threshold);
            if result.matched {
                tracing::debug!(
                    label = result.label.as_deref().unwrap_or("?"),
                    similarity = result.similarity,
                    "face matched gallery"
                );
                return Ok(true);
            }
        }

        Ok(false)
    }
}

/// Encode the best (highest-confidence) face of a frame, or `None` when the
/// frame contains no detectable face.
fn encode_best_face(
    detector: &mut FaceDetector,
    recognizer: &mut FaceRecognizer,
    luma: &[u8],
    width: u32,
    height: u32,
) -> Result<Option<Embedding>, FaceError> {
    let faces = detector.detect(luma, width, height)?;
    match faces.first() {
        Some(face) => Ok(Some(recognizer.extract(luma, width, height, face)?)),
        None => Ok(None),
    }
}
