//! Model capability abstraction consumed by the transform engines
//!
//! Backends are constructed once at process start and fan out calls for
//! every item in a batch. Engines own all post-processing; backends return
//! raw model output only.

use crate::error::{PipelineError, Result};
use crate::models::ModelDescriptor;
use image::RgbaImage;

/// Foreground coverage map produced by a segmentation capability
///
/// 8-bit per pixel, row-major, same dimensions as the image it was
/// computed for; 0 is background, 255 is foreground.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationMask {
    /// Coverage values, `width * height` bytes
    pub data: Vec<u8>,
    /// `(width, height)` the mask applies to
    pub dimensions: (u32, u32),
}

impl SegmentationMask {
    /// Build a mask, validating that the buffer matches the dimensions
    ///
    /// # Errors
    /// Returns [`PipelineError::ProcessingFailed`] when the buffer length
    /// is not `width * height`.
    pub fn new(data: Vec<u8>, dimensions: (u32, u32)) -> Result<Self> {
        let expected = dimensions.0 as usize * dimensions.1 as usize;
        if data.len() != expected {
            return Err(PipelineError::processing(format!(
                "Mask buffer holds {} values, expected {} for {}x{}",
                data.len(),
                expected,
                dimensions.0,
                dimensions.1
            )));
        }
        Ok(Self { data, dimensions })
    }

    /// Whether the mask covers an image of the given dimensions
    #[must_use]
    pub fn matches(&self, width: u32, height: u32) -> bool {
        self.dimensions == (width, height)
    }
}

/// Region proposal exactly as the detection model produced it
///
/// Unvalidated: the label may be outside the allow-list and the corners may
/// be malformed. The detection engine filters and converts.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    /// Model's class name
    pub label: String,
    /// Model confidence, 0.0-1.0
    pub score: f32,
    /// `[x1, y1, x2, y2]` corner pair in pixel units
    pub corners: [f32; 4],
}

impl RawDetection {
    /// Convenience constructor for backends and tests
    #[must_use]
    pub fn new<S: Into<String>>(label: S, score: f32, corners: [f32; 4]) -> Self {
        Self {
            label: label.into(),
            score,
            corners,
        }
    }
}

/// Mask-producing capability used by the background-removal engine
pub trait SegmentationBackend {
    /// Compute a foreground mask for `image`
    ///
    /// The returned mask must match the image dimensions.
    ///
    /// # Errors
    /// Model invocation failures; the engine surfaces them as
    /// [`PipelineError::ProcessingFailed`] on the item.
    fn segment(&mut self, image: &RgbaImage) -> Result<SegmentationMask>;

    /// Static identity of the loaded model
    fn describe(&self) -> ModelDescriptor;
}

/// Region-classifying capability used by the detection engine
pub trait DetectionBackend {
    /// Locate and classify regions in `image`
    ///
    /// # Errors
    /// Model invocation failures; the engine surfaces them as
    /// [`PipelineError::ProcessingFailed`] on the item.
    fn detect(&mut self, image: &RgbaImage) -> Result<Vec<RawDetection>>;

    /// Static identity of the loaded model
    fn describe(&self) -> ModelDescriptor;
}
