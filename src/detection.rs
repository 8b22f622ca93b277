//! Sensitive-content detection engine and job pipeline
//!
//! The engine filters raw model regions through the closed label
//! allow-list and the confidence threshold, then converts corner-pair
//! boxes to origin+extent form. The pipeline wraps it with loading and
//! envelope construction; its failure mode is always flagged-false with
//! the error surfaced.

use crate::batch::AnalysisBatchRequest;
use crate::config::{OptionOverrides, ProcessingOptions};
use crate::error::{PipelineError, Result};
use crate::inference::DetectionBackend;
use crate::models::{self, ModelDescriptor, SensitiveLabel};
use crate::services::io::{ImageIo, LoadedImage};
use crate::types::{AnalysisModelInfo, AnalysisRecord, BoundingBox, Detection};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Engine verdict for one image
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutput {
    /// Whether any allow-listed detection met the threshold
    pub is_nsfw: bool,
    /// Highest kept confidence, 0.0 when nothing was kept
    pub confidence: f32,
    /// Kept detections in model order
    pub detections: Vec<Detection>,
}

/// Region classification plus allow-list and threshold filtering
pub struct DetectionEngine {
    backend: Box<dyn DetectionBackend>,
}

impl DetectionEngine {
    /// Wrap a detection capability
    #[must_use]
    pub fn new(backend: Box<dyn DetectionBackend>) -> Self {
        Self { backend }
    }

    /// Identity of the loaded model
    #[must_use]
    pub fn describe(&self) -> ModelDescriptor {
        self.backend.describe()
    }

    /// Classify the raw (un-resized) image
    ///
    /// Raw detections outside the allow-list are discarded entirely; the
    /// survivors are thresholded on `confidence_threshold` and their
    /// corner boxes converted (clamped, malformed ones rejected).
    ///
    /// # Errors
    /// [`PipelineError::ProcessingFailed`] when the model invocation fails.
    #[instrument(
        skip(self, image, options),
        fields(
            model = %self.backend.describe().name,
            threshold = options.confidence_threshold
        )
    )]
    pub fn analyze(
        &mut self,
        image: &LoadedImage,
        options: &ProcessingOptions,
    ) -> Result<AnalysisOutput> {
        let raw = self.backend.detect(&image.pixels).map_err(|e| match e {
            PipelineError::ProcessingFailed(_) => e,
            other => PipelineError::processing(format!("Model invocation failed: {other}")),
        })?;
        debug!(candidates = raw.len(), "Raw detections returned");

        let mut detections = Vec::new();
        let mut confidence: f32 = 0.0;
        for candidate in raw {
            let Some(label) = SensitiveLabel::from_model_label(&candidate.label) else {
                debug!(label = %candidate.label, "Discarding detection outside the allow-list");
                continue;
            };
            if candidate.score < options.confidence_threshold {
                continue;
            }
            let [x1, y1, x2, y2] = candidate.corners;
            let Some(bounding_box) = BoundingBox::from_corners(x1, y1, x2, y2) else {
                warn!(
                    label = %label,
                    corners = ?candidate.corners,
                    "Rejecting detection with malformed bounding box"
                );
                continue;
            };
            confidence = confidence.max(candidate.score);
            detections.push(Detection {
                label,
                confidence: candidate.score,
                bounding_box,
            });
        }

        Ok(AnalysisOutput {
            is_nsfw: !detections.is_empty(),
            confidence,
            detections,
        })
    }
}

/// Content-analysis job: capability holder, envelope builder, batch fan-out
pub struct DetectionPipeline {
    engine: Option<DetectionEngine>,
    disabled_reason: Option<String>,
    defaults: ProcessingOptions,
}

impl DetectionPipeline {
    /// Pipeline around a working capability
    #[must_use]
    pub fn new(engine: DetectionEngine, defaults: ProcessingOptions) -> Self {
        Self {
            engine: Some(engine),
            disabled_reason: None,
            defaults,
        }
    }

    /// Pipeline in the disabled state (capability failed to initialize)
    #[must_use]
    pub fn unavailable<S: Into<String>>(reason: S, defaults: ProcessingOptions) -> Self {
        Self {
            engine: None,
            disabled_reason: Some(reason.into()),
            defaults,
        }
    }

    /// Whether the capability initialized
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.engine.is_some()
    }

    /// Analyze a single file into a result record; never fails
    pub fn analyze_file(&mut self, input: &Path, overrides: &OptionOverrides) -> AnalysisRecord {
        let options = self.defaults.resolve(overrides);
        match self.run_item(input, &options) {
            Ok(record) => record,
            Err(e) => {
                if e.is_capability_unavailable() {
                    debug!(
                        input = %input.display(),
                        "Capability disabled; answering with the stored reason"
                    );
                } else {
                    warn!(input = %input.display(), error = %e, "Analysis item failed");
                }
                AnalysisRecord::failure(e.to_string())
            },
        }
    }

    /// Analyze a whole batch request with per-item isolation
    ///
    /// Items run strictly in input order and each record carries the
    /// positional `user_id` from the request.
    ///
    /// # Errors
    /// [`PipelineError::Validation`] when the parallel arrays disagree in
    /// length. Nothing is processed in that case.
    pub fn analyze_batch(&mut self, request: &AnalysisBatchRequest) -> Result<Vec<AnalysisRecord>> {
        request.validate()?;
        let total = request.image_paths.len();
        info!(total, "Starting analysis batch");

        let mut records = Vec::with_capacity(total);
        for (index, (path, user_id)) in request
            .image_paths
            .iter()
            .zip(request.user_ids.iter())
            .enumerate()
        {
            info!(item = index + 1, total, path = %path, "Analyzing batch item");
            let record = self
                .analyze_file(Path::new(path), &OptionOverrides::default())
                .with_user_id(user_id);
            records.push(record);
        }
        Ok(records)
    }

    fn run_item(&mut self, input: &Path, options: &ProcessingOptions) -> Result<AnalysisRecord> {
        let engine = match &mut self.engine {
            Some(engine) => engine,
            None => {
                return Err(PipelineError::capability_unavailable(
                    self.disabled_reason
                        .clone()
                        .unwrap_or_else(|| "capability not initialized".to_string()),
                ))
            },
        };
        let image = ImageIo::load(input)?;
        let output = engine.analyze(&image, options)?;
        debug!(
            flagged = output.is_nsfw,
            kept = output.detections.len(),
            "Analysis item complete"
        );
        Ok(AnalysisRecord::flagged(
            output.is_nsfw,
            output.confidence,
            output.detections,
        ))
    }

    /// Capability summary for `--info`
    #[must_use]
    pub fn model_info(&self) -> AnalysisModelInfo {
        let (model_name, version, is_available, error) = match &self.engine {
            Some(engine) => {
                let descriptor = engine.describe();
                (descriptor.name, descriptor.version, true, None)
            },
            None => (
                models::DETECTION_MODEL_NAME.to_string(),
                env!("CARGO_PKG_VERSION").to_string(),
                false,
                self.disabled_reason.clone(),
            ),
        };
        AnalysisModelInfo {
            model_name,
            version,
            is_available,
            confidence_threshold: self.defaults.confidence_threshold,
            supported_classes: SensitiveLabel::ALL.to_vec(),
            error,
        }
    }
}
