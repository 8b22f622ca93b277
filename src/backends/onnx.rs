//! ONNX Runtime model capabilities
//!
//! One session per process, created eagerly at startup and reused for every
//! item. `OnnxSegmenter` produces foreground masks for background removal;
//! `OnnxDetector` locates and classifies sensitive regions. Both run on CPU;
//! the host process decides how many job processes to spawn.

use crate::error::{PipelineError, Result};
use crate::inference::{DetectionBackend, RawDetection, SegmentationBackend, SegmentationMask};
use crate::models::{self, ModelDescriptor};
use image::imageops::FilterType;
use image::{GrayImage, RgbaImage};
use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::{self, value::Value};
use std::path::Path;

/// Model-side edge length shared by both model families
const INPUT_SIZE: u32 = 320;

/// Per-channel normalization applied to segmentation inputs
const NORMALIZATION_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const NORMALIZATION_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Class table embedded in the detection model export, indexed by class id
const DETECTION_CLASSES: [&str; 16] = [
    "EXPOSED_ANUS",
    "EXPOSED_ARMPITS",
    "COVERED_BELLY",
    "EXPOSED_BELLY",
    "COVERED_BUTTOCKS",
    "EXPOSED_BUTTOCKS",
    "FACE_F",
    "FACE_M",
    "COVERED_FEET",
    "EXPOSED_FEET",
    "COVERED_BREAST_F",
    "EXPOSED_BREAST_F",
    "COVERED_GENITALIA_F",
    "EXPOSED_GENITALIA_F",
    "EXPOSED_BREAST_M",
    "EXPOSED_GENITALIA_M",
];

fn build_session(model_file: &Path) -> Result<Session> {
    Session::builder()
        .map_err(|e| PipelineError::processing(format!("Failed to create session builder: {e}")))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| PipelineError::processing(format!("Failed to set optimization level: {e}")))?
        .commit_from_file(model_file)
        .map_err(|e| {
            PipelineError::processing(format!(
                "Failed to load model from '{}': {e}",
                model_file.display()
            ))
        })
}

/// Run the session and extract the first output as a flat `f32` buffer
fn run_first_output(session: &mut Session, input: Array4<f32>) -> Result<Vec<f32>> {
    let input_value = Value::from_array(input)
        .map_err(|e| PipelineError::processing(format!("Failed to convert input tensor: {e}")))?;
    let outputs = session
        .run(ort::inputs![input_value])
        .map_err(|e| PipelineError::processing(format!("Model invocation failed: {e}")))?;

    let keys: Vec<_> = outputs.keys().collect();
    let first_key = keys
        .first()
        .ok_or_else(|| PipelineError::processing("Model produced no output tensors"))?;
    let tensor = outputs
        .get(first_key)
        .ok_or_else(|| PipelineError::processing("First output tensor not found"))?
        .try_extract_array::<f32>()
        .map_err(|e| {
            PipelineError::processing(format!("Failed to extract output tensor: {e}"))
        })?;
    Ok(tensor.view().to_owned().into_raw_vec_and_offset().0)
}

/// Fit `width x height` inside the model square, preserving aspect
///
/// Returns the scaled dimensions and the scale factor that maps original
/// coordinates into model space. The remainder of the square is padding.
fn letterbox_dimensions(width: u32, height: u32) -> (u32, u32, f32) {
    let long_side = width.max(height).max(1);
    let scale = INPUT_SIZE as f32 / long_side as f32;
    let scaled_w = ((width as f32 * scale).round() as u32).clamp(1, INPUT_SIZE);
    let scaled_h = ((height as f32 * scale).round() as u32).clamp(1, INPUT_SIZE);
    (scaled_w, scaled_h, scale)
}

/// Min-max normalize the model's mask plane and resize it to `target`
fn mask_from_logits(data: &[f32], target: (u32, u32)) -> Result<SegmentationMask> {
    let expected = (INPUT_SIZE * INPUT_SIZE) as usize;
    if data.len() < expected {
        return Err(PipelineError::processing(format!(
            "Segmentation output holds {} values, expected at least {expected}",
            data.len()
        )));
    }
    let plane = &data[..expected];

    let mut lo = f32::INFINITY;
    let mut hi = f32::NEG_INFINITY;
    for &value in plane {
        lo = lo.min(value);
        hi = hi.max(value);
    }

    let range = hi - lo;
    let mut bytes = Vec::with_capacity(expected);
    if range <= f32::EPSILON {
        log::warn!("Segmentation output is uniform, mask collapses to background");
        bytes.resize(expected, 0u8);
    } else {
        for &value in plane {
            bytes.push((((value - lo) / range) * 255.0).round() as u8);
        }
    }

    let small = GrayImage::from_raw(INPUT_SIZE, INPUT_SIZE, bytes)
        .ok_or_else(|| PipelineError::processing("Segmentation output does not form a plane"))?;
    let full = image::imageops::resize(&small, target.0, target.1, FilterType::Lanczos3);
    SegmentationMask::new(full.into_raw(), target)
}

/// Decode detection rows of `[x1, y1, x2, y2, score, class_id]`
///
/// Coordinates come back in model space; dividing by `scale` undoes the
/// letterbox (padding sits right/bottom, so no offset applies). Rows with a
/// class id outside the table are skipped.
fn rows_to_detections(data: &[f32], scale: f32, width: u32, height: u32) -> Vec<RawDetection> {
    let mut detections = Vec::new();
    for row in data.chunks_exact(6) {
        let class_id = row[5].round();
        if class_id < 0.0 {
            continue;
        }
        let Some(label) = DETECTION_CLASSES.get(class_id as usize) else {
            log::debug!("Skipping detection with unknown class id {class_id}");
            continue;
        };
        let corners = [
            (row[0] / scale).clamp(0.0, width as f32),
            (row[1] / scale).clamp(0.0, height as f32),
            (row[2] / scale).clamp(0.0, width as f32),
            (row[3] / scale).clamp(0.0, height as f32),
        ];
        detections.push(RawDetection::new(*label, row[4], corners));
    }
    detections
}

/// Segmentation capability backed by an ONNX Runtime session
pub struct OnnxSegmenter {
    session: Session,
    descriptor: ModelDescriptor,
}

impl OnnxSegmenter {
    /// Load segmentation weights and build the session
    ///
    /// `location` may be the weight file itself or a directory holding
    /// `<model>.onnx`.
    ///
    /// # Errors
    /// [`PipelineError::InvalidConfig`] when no weight file resolves, or
    /// [`PipelineError::ProcessingFailed`] when session creation fails.
    pub fn load(location: &Path, model: &str) -> Result<Self> {
        let model_file = models::resolve_model_file(location, model)?;
        log::debug!(
            "Loading segmentation model '{model}' from {}",
            model_file.display()
        );
        let session = build_session(&model_file)?;
        log::info!("Segmentation model '{model}' ready");
        Ok(Self {
            session,
            descriptor: ModelDescriptor::new(model),
        })
    }

    fn preprocess(image: &RgbaImage) -> Array4<f32> {
        let size = INPUT_SIZE;
        // plain stretch to the model square, aspect handled by the mask resize
        let resized = image::imageops::resize(image, size, size, FilterType::Lanczos3);
        let mut tensor = Array4::<f32>::zeros((1, 3, size as usize, size as usize));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for channel in 0..3 {
                let value = f32::from(pixel.0[channel]) / 255.0;
                tensor[[0, channel, y as usize, x as usize]] =
                    (value - NORMALIZATION_MEAN[channel]) / NORMALIZATION_STD[channel];
            }
        }
        tensor
    }
}

impl SegmentationBackend for OnnxSegmenter {
    fn segment(&mut self, image: &RgbaImage) -> Result<SegmentationMask> {
        let target = image.dimensions();
        let tensor = Self::preprocess(image);
        let output = run_first_output(&mut self.session, tensor)?;
        mask_from_logits(&output, target)
    }

    fn describe(&self) -> ModelDescriptor {
        self.descriptor.clone()
    }
}

/// Detection capability backed by an ONNX Runtime session
pub struct OnnxDetector {
    session: Session,
    descriptor: ModelDescriptor,
}

impl OnnxDetector {
    /// Load detector weights and build the session
    ///
    /// `location` may be the weight file itself or a directory holding
    /// `detector.onnx`.
    ///
    /// # Errors
    /// [`PipelineError::InvalidConfig`] when no weight file resolves, or
    /// [`PipelineError::ProcessingFailed`] when session creation fails.
    pub fn load(location: &Path) -> Result<Self> {
        let model_file = models::resolve_model_file(location, "detector")?;
        log::debug!("Loading detection model from {}", model_file.display());
        let session = build_session(&model_file)?;
        log::info!("Detection model ready");
        Ok(Self {
            session,
            descriptor: ModelDescriptor::new(models::DETECTION_MODEL_NAME),
        })
    }

    fn preprocess(image: &RgbaImage) -> (Array4<f32>, f32) {
        let (width, height) = image.dimensions();
        let (scaled_w, scaled_h, scale) = letterbox_dimensions(width, height);
        let resized = image::imageops::resize(image, scaled_w, scaled_h, FilterType::Triangle);

        // zero canvas, content top-left, padding right/bottom
        let size = INPUT_SIZE as usize;
        let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for channel in 0..3 {
                tensor[[0, channel, y as usize, x as usize]] = f32::from(pixel.0[channel]) / 255.0;
            }
        }
        (tensor, scale)
    }
}

impl DetectionBackend for OnnxDetector {
    fn detect(&mut self, image: &RgbaImage) -> Result<Vec<RawDetection>> {
        let (width, height) = image.dimensions();
        let (tensor, scale) = Self::preprocess(image);
        let output = run_first_output(&mut self.session, tensor)?;
        if output.len() % 6 != 0 {
            return Err(PipelineError::processing(format!(
                "Detection output is not row-aligned: {} values",
                output.len()
            )));
        }
        Ok(rows_to_detections(&output, scale, width, height))
    }

    fn describe(&self) -> ModelDescriptor {
        self.descriptor.clone()
    }
}
