//! Model registry: known model names, label allow-list, weight-file resolution

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Segmentation models understood by the background-removal job
pub const SEGMENTATION_MODELS: &[&str] = &[
    "u2net",
    "u2net_human_seg",
    "u2netp",
    "u2net_cloth_seg",
    "silueta",
    "isnet-general-use",
];

/// Default segmentation model when the request names none
pub const DEFAULT_MODEL: &str = "u2net";

/// Detection model name reported in analysis model info
pub const DETECTION_MODEL_NAME: &str = "NudeNet";

/// Input formats accepted by both jobs, as reported in model info
pub const SUPPORTED_FORMAT_NAMES: &[&str] = &["PNG", "JPEG", "JPG", "WEBP"];

/// Whether `name` is in the segmentation-model registry
#[must_use]
pub fn is_known_model(name: &str) -> bool {
    SEGMENTATION_MODELS.contains(&name)
}

/// Sensitive-content labels that can contribute to a flagged result
///
/// This is a closed set: raw model labels outside it are discarded at the
/// detection-engine boundary and never reach the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SensitiveLabel {
    /// Exposed buttocks
    ExposedButtocks,
    /// Exposed female breast
    ExposedBreastF,
    /// Exposed female genitalia
    ExposedGenitaliaF,
    /// Exposed male genitalia
    ExposedGenitaliaM,
}

impl SensitiveLabel {
    /// All allow-listed labels, in reporting order
    pub const ALL: [Self; 4] = [
        Self::ExposedButtocks,
        Self::ExposedBreastF,
        Self::ExposedGenitaliaF,
        Self::ExposedGenitaliaM,
    ];

    /// Wire spelling of the label
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExposedButtocks => "EXPOSED_BUTTOCKS",
            Self::ExposedBreastF => "EXPOSED_BREAST_F",
            Self::ExposedGenitaliaF => "EXPOSED_GENITALIA_F",
            Self::ExposedGenitaliaM => "EXPOSED_GENITALIA_M",
        }
    }

    /// Map a raw model label onto the closed set; `None` when not allow-listed
    #[must_use]
    pub fn from_model_label(raw: &str) -> Option<Self> {
        match raw {
            "EXPOSED_BUTTOCKS" => Some(Self::ExposedButtocks),
            "EXPOSED_BREAST_F" => Some(Self::ExposedBreastF),
            "EXPOSED_GENITALIA_F" => Some(Self::ExposedGenitaliaF),
            "EXPOSED_GENITALIA_M" => Some(Self::ExposedGenitaliaM),
            _ => None,
        }
    }
}

impl std::fmt::Display for SensitiveLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Static identity of a loaded model capability
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDescriptor {
    /// Model name as reported in result records (`model_used`)
    pub name: String,
    /// Capability version string
    pub version: String,
}

impl ModelDescriptor {
    /// Create a descriptor with this crate's version
    #[must_use]
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Create a descriptor with an explicit version
    #[must_use]
    pub fn with_version<S: Into<String>, V: Into<String>>(name: S, version: V) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Resolve a model weight file from a path argument and a model name
///
/// `location` may point directly at a weight file, or at a directory that
/// holds `<model>.onnx`.
///
/// # Errors
/// Returns [`PipelineError::InvalidConfig`] when no weight file exists at
/// the resolved location.
pub fn resolve_model_file(location: &Path, model: &str) -> Result<PathBuf> {
    if location.is_file() {
        return Ok(location.to_path_buf());
    }
    let candidate = location.join(format!("{model}.onnx"));
    if candidate.is_file() {
        return Ok(candidate);
    }
    Err(PipelineError::invalid_config(format!(
        "No model file for '{}' at '{}'",
        model,
        location.display()
    )))
}
