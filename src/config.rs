//! Processing options and the default/override resolution contract

use crate::models;
use serde::{Deserialize, Serialize};

/// Output image format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutputFormat {
    /// PNG with alpha channel transparency
    Png,
    /// JPEG (no transparency; alpha is dropped or composited away)
    #[serde(alias = "JPG")]
    Jpeg,
    /// WebP with alpha channel transparency
    WebP,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Png
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Png => write!(f, "png"),
            Self::Jpeg => write!(f, "jpeg"),
            Self::WebP => write!(f, "webp"),
        }
    }
}

impl OutputFormat {
    /// File extension used when deriving output paths
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }

    /// Whether the format can carry an alpha channel
    #[must_use]
    pub fn supports_alpha(&self) -> bool {
        !matches!(self, Self::Jpeg)
    }
}

/// Complete, validated processing parameters for one request
///
/// Produced by [`ProcessingOptions::resolve`]; immutable afterwards. The
/// same record drives both jobs: the removal engine ignores
/// `confidence_threshold`, the detection engine ignores the output fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingOptions {
    /// Segmentation model name (see [`crate::models::SEGMENTATION_MODELS`])
    pub model: String,

    /// Output format for processed images
    pub output_format: OutputFormat,

    /// Encoding quality, 1-100 (lossy formats only)
    pub quality: u8,

    /// Downscale bound for the longest image side; `None` disables resizing
    pub max_dimension: Option<u32>,

    /// Bake EXIF orientation and composite over white for alpha-less formats
    pub optimize_for_web: bool,

    /// Minimum confidence for a detection to count, 0.0-1.0
    pub confidence_threshold: f32,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            model: models::DEFAULT_MODEL.to_string(),
            output_format: OutputFormat::default(),
            quality: 95,
            max_dimension: None,
            optimize_for_web: true,
            confidence_threshold: 0.5,
        }
    }
}

impl ProcessingOptions {
    /// Merge caller-supplied overrides onto these defaults
    ///
    /// Per-key: the override wins when present, the default otherwise.
    /// `quality` and `confidence_threshold` are clamped to their valid
    /// ranges. This never fails; `resolve` with empty overrides returns the
    /// defaults unchanged.
    ///
    /// ```rust
    /// use imgjobs::{OptionOverrides, ProcessingOptions};
    ///
    /// let defaults = ProcessingOptions::default();
    /// let resolved = defaults.resolve(&OptionOverrides::default());
    /// assert_eq!(resolved, defaults);
    /// ```
    #[must_use]
    pub fn resolve(&self, overrides: &OptionOverrides) -> Self {
        let mut resolved = self.clone();
        if let Some(model) = &overrides.model {
            resolved.model = model.clone();
        }
        if let Some(format) = overrides.output_format {
            resolved.output_format = format;
        }
        if let Some(quality) = overrides.quality {
            resolved.quality = quality;
        }
        if let Some(max_dimension) = overrides.max_dimension {
            resolved.max_dimension = Some(max_dimension);
        }
        if let Some(optimize) = overrides.optimize_for_web {
            resolved.optimize_for_web = optimize;
        }
        if let Some(threshold) = overrides.confidence_threshold {
            resolved.confidence_threshold = threshold;
        }
        resolved.quality = resolved.quality.clamp(1, 100);
        resolved.confidence_threshold = resolved.confidence_threshold.clamp(0.0, 1.0);
        resolved
    }

    /// Shorthand for resolving a detection threshold supplied on its own
    #[must_use]
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold.clamp(0.0, 1.0);
        self
    }
}

/// Per-key tolerant deserialization for override fields
///
/// A present key whose value does not convert to the field's type counts
/// as absent, so the default applies instead of the whole request failing.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Caller-supplied partial options, as parsed from request JSON
///
/// Every field is optional; unknown keys in the source document are
/// ignored so older hosts can talk to newer jobs, and a key whose value
/// has the wrong type falls back to the default instead of rejecting the
/// request.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OptionOverrides {
    /// Override for [`ProcessingOptions::model`]
    #[serde(deserialize_with = "lenient")]
    pub model: Option<String>,
    /// Override for [`ProcessingOptions::output_format`]
    #[serde(deserialize_with = "lenient")]
    pub output_format: Option<OutputFormat>,
    /// Override for [`ProcessingOptions::quality`]
    #[serde(deserialize_with = "lenient")]
    pub quality: Option<u8>,
    /// Override for [`ProcessingOptions::max_dimension`]
    #[serde(alias = "max_size", deserialize_with = "lenient")]
    pub max_dimension: Option<u32>,
    /// Override for [`ProcessingOptions::optimize_for_web`]
    #[serde(deserialize_with = "lenient")]
    pub optimize_for_web: Option<bool>,
    /// Override for [`ProcessingOptions::confidence_threshold`]
    #[serde(deserialize_with = "lenient")]
    pub confidence_threshold: Option<f32>,
}

impl OptionOverrides {
    /// Parse overrides from a JSON options file
    ///
    /// # Errors
    /// Returns [`crate::PipelineError::InvalidConfig`] when the file cannot
    /// be read or does not parse as an options object.
    pub fn from_json_file<P: AsRef<std::path::Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            crate::PipelineError::invalid_config(format!(
                "Cannot read options file '{}': {}",
                path.display(),
                e
            ))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            crate::PipelineError::invalid_config(format!(
                "Cannot parse options file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
