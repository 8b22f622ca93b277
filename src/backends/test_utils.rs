//! Mock model capabilities for testing
//!
//! These doubles implement the backend traits without model files or the
//! ONNX runtime, so engine and pipeline behavior can be tested in
//! isolation. Call history is recorded for verification.

use crate::error::{PipelineError, Result};
use crate::inference::{DetectionBackend, RawDetection, SegmentationBackend, SegmentationMask};
use crate::models::ModelDescriptor;
use image::RgbaImage;
use std::sync::{Arc, Mutex};

/// Mask fill produced by [`MockSegmenter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MaskPattern {
    /// Every pixel foreground (255)
    Opaque,
    /// Alternating foreground/background, `(x + y) % 2 == 0` is foreground
    Checkerboard,
}

/// Scriptable segmentation capability
#[derive(Debug, Clone)]
pub struct MockSegmenter {
    pattern: MaskPattern,
    /// When set, masks are produced at these dimensions regardless of input
    fixed_dimensions: Option<(u32, u32)>,
    fail_message: Option<String>,
    call_history: Arc<Mutex<Vec<String>>>,
}

impl MockSegmenter {
    /// Segmenter whose mask keeps every pixel
    #[must_use]
    pub fn opaque() -> Self {
        Self {
            pattern: MaskPattern::Opaque,
            fixed_dimensions: None,
            fail_message: None,
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Segmenter whose mask alternates per pixel; `(0, 0)` is foreground
    #[must_use]
    pub fn checkerboard() -> Self {
        Self {
            pattern: MaskPattern::Checkerboard,
            ..Self::opaque()
        }
    }

    /// Segmenter that fails every invocation with `message`
    #[must_use]
    pub fn failing<S: Into<String>>(message: S) -> Self {
        Self {
            fail_message: Some(message.into()),
            ..Self::opaque()
        }
    }

    /// Produce masks at fixed dimensions, ignoring the input image
    ///
    /// Used to exercise the mask/image dimension contract.
    #[must_use]
    pub fn with_fixed_dimensions(mut self, width: u32, height: u32) -> Self {
        self.fixed_dimensions = Some((width, height));
        self
    }

    /// Methods invoked on this mock, in order
    pub fn call_history(&self) -> Vec<String> {
        self.call_history.lock().unwrap().clone()
    }

    fn record_call(&self, method: &str) {
        if let Ok(mut history) = self.call_history.lock() {
            history.push(method.to_string());
        }
    }
}

impl SegmentationBackend for MockSegmenter {
    fn segment(&mut self, image: &RgbaImage) -> Result<SegmentationMask> {
        self.record_call("segment");
        if let Some(message) = &self.fail_message {
            return Err(PipelineError::processing(message.clone()));
        }

        let (width, height) = self.fixed_dimensions.unwrap_or_else(|| image.dimensions());
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                let value = match self.pattern {
                    MaskPattern::Opaque => 255,
                    MaskPattern::Checkerboard => {
                        if (x + y) % 2 == 0 {
                            255
                        } else {
                            0
                        }
                    },
                };
                data.push(value);
            }
        }
        SegmentationMask::new(data, (width, height))
    }

    fn describe(&self) -> ModelDescriptor {
        ModelDescriptor::new("mock-segmenter")
    }
}

/// Scriptable detection capability
#[derive(Debug, Clone)]
pub struct MockDetector {
    detections: Vec<RawDetection>,
    fail_message: Option<String>,
    call_history: Arc<Mutex<Vec<String>>>,
}

impl MockDetector {
    /// Detector that returns the same detections for every image
    #[must_use]
    pub fn returning(detections: Vec<RawDetection>) -> Self {
        Self {
            detections,
            fail_message: None,
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Detector that never finds anything
    #[must_use]
    pub fn empty() -> Self {
        Self::returning(Vec::new())
    }

    /// Detector that fails every invocation with `message`
    #[must_use]
    pub fn failing<S: Into<String>>(message: S) -> Self {
        Self {
            fail_message: Some(message.into()),
            ..Self::empty()
        }
    }

    /// Methods invoked on this mock, in order
    pub fn call_history(&self) -> Vec<String> {
        self.call_history.lock().unwrap().clone()
    }

    fn record_call(&self, method: &str) {
        if let Ok(mut history) = self.call_history.lock() {
            history.push(method.to_string());
        }
    }
}

impl DetectionBackend for MockDetector {
    fn detect(&mut self, _image: &RgbaImage) -> Result<Vec<RawDetection>> {
        self.record_call("detect");
        if let Some(message) = &self.fail_message {
            return Err(PipelineError::processing(message.clone()));
        }
        Ok(self.detections.clone())
    }

    fn describe(&self) -> ModelDescriptor {
        ModelDescriptor::new("mock-detector")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkerboard_parity() {
        let mut segmenter = MockSegmenter::checkerboard();
        let mask = segmenter.segment(&RgbaImage::new(4, 2)).unwrap();
        assert_eq!(mask.dimensions, (4, 2));
        assert_eq!(mask.data[0], 255);
        assert_eq!(mask.data[1], 0);
        // second row shifts by one
        assert_eq!(mask.data[4], 0);
        assert_eq!(mask.data[5], 255);
    }

    #[test]
    fn test_fixed_dimensions_ignore_input() {
        let mut segmenter = MockSegmenter::opaque().with_fixed_dimensions(2, 3);
        let mask = segmenter.segment(&RgbaImage::new(10, 10)).unwrap();
        assert_eq!(mask.dimensions, (2, 3));
        assert!(!mask.matches(10, 10));
    }

    #[test]
    fn test_call_history_records_invocations() {
        let mut detector = MockDetector::empty();
        detector.detect(&RgbaImage::new(1, 1)).unwrap();
        detector.detect(&RgbaImage::new(1, 1)).unwrap();
        assert_eq!(detector.call_history(), ["detect", "detect"]);
    }

    #[test]
    fn test_failing_mocks_surface_message() {
        let mut segmenter = MockSegmenter::failing("no weights");
        let err = segmenter.segment(&RgbaImage::new(1, 1)).unwrap_err();
        assert!(err.to_string().contains("no weights"));

        let mut detector = MockDetector::failing("no session");
        let err = detector.detect(&RgbaImage::new(1, 1)).unwrap_err();
        assert!(err.to_string().contains("no session"));
    }
}
