//! Model capability implementations
//!
//! The ONNX Runtime backend serves both jobs: segmentation for background
//! removal and region classification for content analysis. Test doubles
//! live in `test_utils` and are compiled for tests only.

#[cfg(feature = "onnx")]
pub mod onnx;

#[cfg(test)]
pub mod test_utils;

#[cfg(feature = "onnx")]
pub use self::onnx::{OnnxDetector, OnnxSegmenter};
