//! Wire-level result types shared by both jobs
//!
//! Every processed item, success or failure, is reported as one of these
//! records; the host always receives syntactically valid JSON and inspects
//! `success`/`error` per item. Field names are part of the process contract
//! and must stay stable.

use crate::config::OutputFormat;
use crate::models::SensitiveLabel;
use serde::{Deserialize, Serialize};

/// Plain `"WxH"` size string used in removal records
#[must_use]
pub fn size_string(width: u32, height: u32) -> String {
    format!("{width}x{height}")
}

/// Result envelope for one background-removal item
///
/// On failure only `success` and `error` are populated; the payload fields
/// are omitted from the serialized record. `error` itself is always
/// serialized (`null` on success) so hosts can key on it unconditionally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovalRecord {
    /// Whether this item was processed
    pub success: bool,
    /// Where the processed image was written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_image_path: Option<String>,
    /// Input path as supplied by the caller
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_image_path: Option<String>,
    /// Model that actually ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    /// Format the output was encoded in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_format: Option<OutputFormat>,
    /// Wall-clock seconds, monotonic source
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<f64>,
    /// Input dimensions as `"WxH"`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_size: Option<String>,
    /// Output dimensions as `"WxH"`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_size: Option<String>,
    /// Failure message; `null` on success
    pub error: Option<String>,
    /// Correlation id, attached during batch processing only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl RemovalRecord {
    /// Failure envelope carrying only the error message
    #[must_use]
    pub fn failure<S: Into<String>>(error: S) -> Self {
        Self {
            success: false,
            processed_image_path: None,
            original_image_path: None,
            model_used: None,
            output_format: None,
            processing_time: None,
            original_size: None,
            processed_size: None,
            error: Some(error.into()),
            user_id: None,
        }
    }

    /// Attach a batch correlation id
    #[must_use]
    pub fn with_user_id<S: Into<String>>(mut self, user_id: S) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// Result envelope for one content-analysis item
///
/// The failure mode is flagged-false with `error` populated: content is
/// never silently flagged on error, and an error is never silently dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    /// Whether any allow-listed detection met the threshold
    pub is_nsfw: bool,
    /// Highest kept detection confidence, 0.0 when none
    pub confidence: f32,
    /// Kept detections, already filtered and converted
    pub detections: Vec<Detection>,
    /// Failure message; `null` on success
    pub error: Option<String>,
    /// Correlation id, attached during batch processing only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl AnalysisRecord {
    /// Successful record from engine output
    #[must_use]
    pub fn flagged(is_nsfw: bool, confidence: f32, detections: Vec<Detection>) -> Self {
        Self {
            is_nsfw,
            confidence,
            detections,
            error: None,
            user_id: None,
        }
    }

    /// Safe failure envelope: unflagged, empty, error surfaced
    #[must_use]
    pub fn failure<S: Into<String>>(error: S) -> Self {
        Self {
            is_nsfw: false,
            confidence: 0.0,
            detections: Vec::new(),
            error: Some(error.into()),
            user_id: None,
        }
    }

    /// Attach a batch correlation id
    #[must_use]
    pub fn with_user_id<S: Into<String>>(mut self, user_id: S) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// One allow-listed, threshold-passing detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Sensitive-content class
    #[serde(rename = "class")]
    pub label: SensitiveLabel,
    /// Model confidence for this region
    pub confidence: f32,
    /// Region in origin+extent form, pixel units
    pub bounding_box: BoundingBox,
}

/// Axis-aligned box in origin+extent form; coordinates never negative
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Extent right of `x`; `>= 0`
    pub width: f32,
    /// Extent below `y`; `>= 0`
    pub height: f32,
}

impl BoundingBox {
    /// Convert a model corner pair into origin+extent form
    ///
    /// Negative corner coordinates are clamped to zero. Returns `None` for
    /// malformed boxes: inverted corners (`x2 < x1` or `y2 < y1`) or boxes
    /// whose clamped area vanishes entirely.
    #[must_use]
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Option<Self> {
        if x2 < x1 || y2 < y1 {
            return None;
        }
        let x = x1.max(0.0);
        let y = y1.max(0.0);
        let width = x2.max(0.0) - x;
        let height = y2.max(0.0) - y;
        if width <= 0.0 || height <= 0.0 {
            return None;
        }
        Some(Self {
            x,
            y,
            width,
            height,
        })
    }
}

/// Capability summary for the background-removal job (`--info` output)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovalModelInfo {
    /// Loaded (or requested) model name
    pub model_name: String,
    /// Capability version
    pub version: String,
    /// Whether the capability initialized
    pub is_available: bool,
    /// Models the job knows how to serve
    pub available_models: Vec<String>,
    /// Model used when a request names none
    pub default_model: String,
    /// Accepted input formats
    pub supported_formats: Vec<String>,
    /// Initialization failure message, if any
    pub error: Option<String>,
}

/// Capability summary for the content-analysis job (`--info` output)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisModelInfo {
    /// Loaded (or requested) model name
    pub model_name: String,
    /// Capability version
    pub version: String,
    /// Whether the capability initialized
    pub is_available: bool,
    /// Default confidence threshold applied to detections
    pub confidence_threshold: f32,
    /// The closed allow-list of reportable classes
    pub supported_classes: Vec<SensitiveLabel>,
    /// Initialization failure message, if any
    pub error: Option<String>,
}
