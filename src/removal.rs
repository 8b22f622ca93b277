//! Background-removal engine and job pipeline
//!
//! The engine performs the pure transform (bounded downscale, segmentation,
//! mask application, web optimization); the pipeline wraps it with loading,
//! option resolution, persistence, and envelope construction so that no
//! per-item failure ever escapes as an error.

use crate::batch::{RemovalBatchRequest, RemovalItemRequest};
use crate::config::{OptionOverrides, ProcessingOptions};
use crate::error::{PipelineError, Result};
use crate::inference::{SegmentationBackend, SegmentationMask};
use crate::models::{self, ModelDescriptor};
use crate::services::io::{ImageIo, LoadedImage};
use crate::types::{size_string, RemovalModelInfo, RemovalRecord};
use image::{imageops::FilterType, DynamicImage, RgbImage, RgbaImage};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Transform output, ready to encode
#[derive(Debug)]
pub struct RemovalOutput {
    /// Final image; RGBA for alpha formats, RGB after compositing otherwise
    pub image: DynamicImage,
    /// Input dimensions before any resizing
    pub original_size: (u32, u32),
    /// Dimensions of `image`
    pub processed_size: (u32, u32),
}

/// Mask-based foreground extraction plus size/format post-processing
pub struct RemovalEngine {
    backend: Box<dyn SegmentationBackend>,
}

impl RemovalEngine {
    /// Wrap a segmentation capability
    #[must_use]
    pub fn new(backend: Box<dyn SegmentationBackend>) -> Self {
        Self { backend }
    }

    /// Identity of the loaded model
    #[must_use]
    pub fn describe(&self) -> ModelDescriptor {
        self.backend.describe()
    }

    /// Run the removal transform on a loaded image
    ///
    /// Stages: bounded downscale (aspect-preserving, long side set exactly
    /// to `max_dimension`), segmentation, mask application, then the
    /// `optimize_for_web` pass (orientation bake; white composite for
    /// alpha-less output formats).
    ///
    /// # Errors
    /// [`PipelineError::ProcessingFailed`] for model errors or a mask that
    /// does not match the image dimensions.
    #[instrument(
        skip(self, image, options),
        fields(
            model = %self.backend.describe().name,
            dimensions = %format!("{}x{}", image.width(), image.height())
        )
    )]
    pub fn remove_background(
        &mut self,
        image: LoadedImage,
        options: &ProcessingOptions,
    ) -> Result<RemovalOutput> {
        let original_size = image.dimensions();
        let orientation = image.orientation;

        let working = match options.max_dimension {
            Some(limit) => downscale_to_fit(image.pixels, limit),
            None => image.pixels,
        };
        let (width, height) = working.dimensions();
        if (width, height) != original_size {
            debug!(
                from = %size_string(original_size.0, original_size.1),
                to = %size_string(width, height),
                "Downscaled input for processing"
            );
        }

        let mask = self.backend.segment(&working).map_err(|e| match e {
            PipelineError::ProcessingFailed(_) => e,
            other => PipelineError::processing(format!("Model invocation failed: {other}")),
        })?;
        if !mask.matches(width, height) {
            return Err(PipelineError::processing(format!(
                "Mask dimensions {}x{} do not match image {}x{}",
                mask.dimensions.0, mask.dimensions.1, width, height
            )));
        }

        let cutout = apply_mask(&working, &mask);

        let mut result = DynamicImage::ImageRgba8(cutout);
        if options.optimize_for_web {
            // Bake EXIF rotation into pixel order; the metadata is not
            // copied to the output, so viewers see consistent pixels.
            result.apply_orientation(orientation);
        }
        let final_image = if options.output_format.supports_alpha() {
            result
        } else if options.optimize_for_web {
            DynamicImage::ImageRgb8(composite_over_white(&result.to_rgba8()))
        } else {
            DynamicImage::ImageRgb8(result.to_rgb8())
        };

        let processed_size = (final_image.width(), final_image.height());
        Ok(RemovalOutput {
            image: final_image,
            original_size,
            processed_size,
        })
    }
}

/// Downscale so neither side exceeds `limit`, preserving aspect ratio
///
/// The long side lands exactly on `limit`; the short side is
/// `round(short * limit / long)`, at least 1. Images already within the
/// bound come back untouched.
fn downscale_to_fit(pixels: RgbaImage, limit: u32) -> RgbaImage {
    let limit = limit.max(1);
    let (width, height) = pixels.dimensions();
    if width <= limit && height <= limit {
        return pixels;
    }
    let (new_width, new_height) = bounded_dimensions(width, height, limit);
    image::imageops::resize(&pixels, new_width, new_height, FilterType::Lanczos3)
}

fn bounded_dimensions(width: u32, height: u32, limit: u32) -> (u32, u32) {
    let scale_round = |short: u32, long: u32| -> u32 {
        let scaled = (f64::from(short) * f64::from(limit)) / f64::from(long);
        (scaled.round() as u32).max(1)
    };
    if width >= height {
        (limit, scale_round(height, width))
    } else {
        (scale_round(width, height), limit)
    }
}

/// Alpha from the mask; fully masked-out pixels are zeroed entirely
fn apply_mask(image: &RgbaImage, mask: &SegmentationMask) -> RgbaImage {
    let (width, height) = image.dimensions();
    let mut result = RgbaImage::new(width, height);
    for (x, y, pixel) in image.enumerate_pixels() {
        let index = (y * width + x) as usize;
        let alpha = mask.data.get(index).copied().unwrap_or(0);
        if alpha > 0 {
            result.put_pixel(x, y, image::Rgba([pixel[0], pixel[1], pixel[2], alpha]));
        } else {
            result.put_pixel(x, y, image::Rgba([0, 0, 0, 0]));
        }
    }
    result
}

/// Composite RGBA over an opaque white background
///
/// Used before dropping alpha for formats without native transparency;
/// a plain channel drop would leave the removed region black.
fn composite_over_white(rgba: &RgbaImage) -> RgbImage {
    let (width, height) = rgba.dimensions();
    let mut result = RgbImage::new(width, height);
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = f32::from(pixel[3]) / 255.0;
        let blend = |channel: u8| -> u8 {
            (f32::from(channel) * alpha + 255.0 * (1.0 - alpha)).round() as u8
        };
        result.put_pixel(
            x,
            y,
            image::Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]),
        );
    }
    result
}

/// Background-removal job: capability holder, envelope builder, batch fan-out
///
/// Holds either a working engine or the reason the capability failed to
/// initialize; in the latter state every operation answers with the same
/// disabled-state record instead of crashing.
pub struct RemovalPipeline {
    engine: Option<RemovalEngine>,
    disabled_reason: Option<String>,
    defaults: ProcessingOptions,
}

impl RemovalPipeline {
    /// Pipeline around a working capability
    #[must_use]
    pub fn new(engine: RemovalEngine, defaults: ProcessingOptions) -> Self {
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

    /// Process a single file into a result record; never fails
    ///
    /// With `output` unset the result is written to a kept temp file whose
    /// path the record reports. Timing covers load through save on a
    /// monotonic clock.
    pub fn process_file(
        &mut self,
        input: &Path,
        output: Option<&Path>,
        overrides: &OptionOverrides,
    ) -> RemovalRecord {
        let started = Instant::now();
        let options = self.defaults.resolve(overrides);
        match self.run_item(input, output, &options, started) {
            Ok(record) => record,
            Err(e) => {
                if e.is_capability_unavailable() {
                    debug!(
                        input = %input.display(),
                        "Capability disabled; answering with the stored reason"
                    );
                } else {
                    warn!(input = %input.display(), error = %e, "Removal item failed");
                }
                RemovalRecord::failure(e.to_string())
            },
        }
    }

    /// Process a whole batch request with per-item isolation
    ///
    /// Items run strictly in input order; each record carries the item's
    /// `user_id`, with `"unknown"` standing in when the item omits one.
    /// One bad item never aborts the rest.
    ///
    /// # Errors
    /// [`PipelineError::Validation`] when the parallel arrays disagree in
    /// length. Nothing is processed in that case.
    pub fn process_batch(&mut self, request: &RemovalBatchRequest) -> Result<Vec<RemovalRecord>> {
        request.validate()?;
        let output_dir = PathBuf::from(&request.output_path);
        let total = request.image_paths.len();
        info!(total, output_dir = %output_dir.display(), "Starting removal batch");

        let mut records = Vec::with_capacity(total);
        for (index, (path, item)) in request
            .image_paths
            .iter()
            .zip(request.requests.iter())
            .enumerate()
        {
            info!(item = index + 1, total, path = %path, "Processing batch item");
            records.push(self.batch_item(Path::new(path), item, &output_dir));
        }
        Ok(records)
    }

    fn batch_item(
        &mut self,
        input: &Path,
        item: &RemovalItemRequest,
        output_dir: &Path,
    ) -> RemovalRecord {
        let started = Instant::now();
        let options = self.defaults.resolve(&item.options);
        let output_path = ImageIo::derive_output_path(input, output_dir, options.output_format);
        let record = match self.run_item(input, Some(&output_path), &options, started) {
            Ok(record) => record,
            Err(e) => {
                if e.is_capability_unavailable() {
                    debug!(
                        input = %input.display(),
                        "Capability disabled; answering with the stored reason"
                    );
                } else {
                    warn!(input = %input.display(), error = %e, "Removal batch item failed");
                }
                RemovalRecord::failure(e.to_string())
            },
        };
        // Every batch record carries a correlation id, "unknown" standing in
        // when the item did not supply one.
        record.with_user_id(item.user_id.as_deref().unwrap_or("unknown"))
    }

    fn run_item(
        &mut self,
        input: &Path,
        output: Option<&Path>,
        options: &ProcessingOptions,
        started: Instant,
    ) -> Result<RemovalRecord> {
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

        let loaded_model = engine.describe().name;
        if options.model != loaded_model {
            // One capability per process; a differing per-item model cannot
            // be served without re-initialization.
            warn!(
                requested = %options.model,
                loaded = %loaded_model,
                "Requested model differs from the loaded one; using the loaded model"
            );
        }

        let image = ImageIo::load(input)?;
        let result = engine.remove_background(image, options)?;

        // The kept temp file is allocated only once the transform has
        // succeeded; a failed item leaves nothing behind on disk.
        let output_path = match output {
            Some(path) => path.to_path_buf(),
            None => ImageIo::temp_output_path(options.output_format)?,
        };
        ImageIo::save(
            &result.image,
            &output_path,
            options.output_format,
            options.quality,
        )?;

        let elapsed = started.elapsed().as_secs_f64();
        debug!(
            output = %output_path.display(),
            seconds = elapsed,
            "Removal item complete"
        );
        Ok(RemovalRecord {
            success: true,
            processed_image_path: Some(output_path.display().to_string()),
            original_image_path: Some(input.display().to_string()),
            model_used: Some(loaded_model),
            output_format: Some(options.output_format),
            processing_time: Some(elapsed),
            original_size: Some(size_string(result.original_size.0, result.original_size.1)),
            processed_size: Some(size_string(result.processed_size.0, result.processed_size.1)),
            error: None,
            user_id: None,
        })
    }

    /// Capability summary for `--info`
    #[must_use]
    pub fn model_info(&self) -> RemovalModelInfo {
        let (model_name, version, is_available, error) = match &self.engine {
            Some(engine) => {
                let descriptor = engine.describe();
                (descriptor.name, descriptor.version, true, None)
            },
            None => (
                self.defaults.model.clone(),
                env!("CARGO_PKG_VERSION").to_string(),
                false,
                self.disabled_reason.clone(),
            ),
        };
        RemovalModelInfo {
            model_name,
            version,
            is_available,
            available_models: models::SEGMENTATION_MODELS
                .iter()
                .map(|m| (*m).to_string())
                .collect(),
            default_model: models::DEFAULT_MODEL.to_string(),
            supported_formats: models::SUPPORTED_FORMAT_NAMES
                .iter()
                .map(|f| (*f).to_string())
                .collect(),
            error,
        }
    }
}
