use serde::{Deserialize, Serialize};

/// Bounding box for a detected face, with optional facial landmarks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

/// Face embedding vector (512-dimensional for ArcFace).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
    /// Model version that produced this embedding (e.g., "w600k_r50").
    pub model_version: Option<String>,
}

impl Embedding {
    /// Compute cosine similarity between two embeddings.
    ///
    /// Returns a value in [-1, 1]. Higher = more similar.
    pub fn similarity(&self, other: &Embedding) -> f32 {
        let mut dot = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;

        for (a, b) in self.values.iter().zip(other.values.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom > 0.0 {
            dot / denom
        } else {
            0.0
        }
    }
}

/// A reference face from the gallery directory.
///
/// The label is the source image's file stem; the gallery is loaded once at
/// startup and immutable for the rest of the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceFace {
    pub label: String,
    pub embedding: Embedding,
}

/// Result of matching a probe embedding against the reference gallery.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub matched: bool,
    /// Cosine similarity of the best match [-1, 1].
    pub similarity: f32,
    /// Label of the matched reference (if any).
    pub label: Option<String>,
}

/// Strategy for comparing a probe embedding against the reference gallery.
pub trait Matcher {
    fn compare(&self, probe: &Embedding, gallery: &[ReferenceFace], threshold: f32) -> MatchResult;
}

/// Cosine similarity matcher.
///
/// Always iterates the full gallery and reports the best match, so the
/// result is independent of gallery ordering.
pub struct CosineMatcher;

impl Matcher for CosineMatcher {
    fn compare(&self, probe: &Embedding, gallery: &[ReferenceFace], threshold: f32) -> MatchResult {
        let mut best_sim = f32::NEG_INFINITY;
        let mut best_idx: Option<usize> = None;

        for (i, reference) in gallery.iter().enumerate() {
            let sim = probe.similarity(&reference.embedding);
            if sim > best_sim {
                best_sim = sim;
                best_idx = Some(i);
            }
        }

        match best_idx {
            Some(idx) if best_sim >= threshold => MatchResult {
                matched: true,
                similarity: best_sim,
                label: Some(gallery[idx].label.clone()),
            },
            _ => MatchResult {
                matched: false,
                similarity: if best_sim == f32::NEG_INFINITY { 0.0 } else { best_sim },
                label: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedding(values: Vec<f32>) -> Embedding {
        Embedding {
            values,
            model_version: None,
        }
    }

    fn reference(label: &str, values: Vec<f32>) -> ReferenceFace {
        ReferenceFace {
            label: label.into(),
            embedding: embedding(values),
        }
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let a = embedding(vec![1.0, 0.0, 0.0]);
        let b = embedding(vec![1.0, 0.0, 0.0]);
        assert!((a.similarity(&b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = embedding(vec![1.0, 0.0]);
        let b = embedding(vec![0.0, 1.0]);
        assert!(a.similarity(&b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_opposite() {
        let a = embedding(vec![1.0, 0.0]);
        let b = embedding(vec![-1.0, 0.0]);
        assert!((a.similarity(&b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        let a = embedding(vec![0.0, 0.0]);
        let b = embedding(vec![1.0, 0.0]);
        assert_eq!(a.similarity(&b), 0.0);
    }

    #[test]
    fn test_cosine_matcher_picks_best() {
        // Best match is the last entry; every entry must be compared.
        let probe = embedding(vec![1.0, 0.0, 0.0]);
        let gallery = vec![
            reference("decoy1", vec![0.0, 1.0, 0.0]),
            reference("decoy2", vec![0.0, 0.0, 1.0]),
            reference("match", vec![1.0, 0.0, 0.0]),
        ];

        let result = CosineMatcher.compare(&probe, &gallery, 0.5);
        assert!(result.matched);
        assert_eq!(result.label.as_deref(), Some("match"));
        assert!((result.similarity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_matcher_below_threshold() {
        let probe = embedding(vec![1.0, 0.0, 0.0]);
        let gallery = vec![reference("other", vec![0.0, 1.0, 0.0])];

        let result = CosineMatcher.compare(&probe, &gallery, 0.5);
        assert!(!result.matched);
        assert!(result.label.is_none());
        assert!(result.similarity.abs() < 1e-6);
    }

    #[test]
    fn test_cosine_matcher_empty_gallery() {
        let probe = embedding(vec![1.0, 0.0]);
        let result = CosineMatcher.compare(&probe, &[], 0.5);
        assert!(!result.matched);
        assert_eq!(result.similarity, 0.0);
    }
}
