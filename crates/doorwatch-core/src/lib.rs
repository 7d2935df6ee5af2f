//! doorwatch-core — Vision and classification engine.
//!
//! Object detection via YOLOv8 and face recognition via SCRFD + ArcFace,
//! all running through ONNX Runtime for CPU inference, combined by the
//! visitor classification rule.

pub mod alignment;
pub mod classifier;
pub mod detector;
pub mod gallery;
pub mod imageops;
pub mod labels;
pub mod objects;
pub mod recognizer;
pub mod types;

pub use classifier::{classify, Category, FaceError, FaceIdentifier, FaceMatcher};
pub use detector::FaceDetector;
pub use objects::{Detection, ObjectDetector};
pub use recognizer::FaceRecognizer;
pub use types::{BoundingBox, CosineMatcher, Embedding, MatchResult, Matcher, ReferenceFace};
