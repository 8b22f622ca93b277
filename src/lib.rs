#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # imgjobs
//!
//! Sidecar image-processing jobs for host applications: background removal
//! and sensitive-content analysis, invoked as separate short-lived processes
//! that exchange JSON over argv and stdout.
//!
//! Two binaries front one library:
//!
//! - **`imgjobs-bgremove`**: mask-based background removal (U²-Net-family
//!   ONNX models)
//! - **`imgjobs-moderate`**: sensitive-content detection (NudeNet-style
//!   ONNX detector with a closed label allow-list)
//!
//! The library owns the whole pipeline: image loading with EXIF orientation
//! capture, option resolution with defaulting and clamping, the two
//! transform engines, result envelopes with stable wire field names, and
//! batch orchestration with strict ordering and per-item isolation. Model
//! capabilities are trait objects ([`SegmentationBackend`],
//! [`DetectionBackend`]) constructed once per process; when initialization
//! fails the pipeline still answers every call with a uniform
//! disabled-state record instead of crashing, and `model_info` reports
//! `is_available: false` with the reason.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! # #[cfg(feature = "onnx")]
//! use imgjobs::backends::OnnxSegmenter;
//! use imgjobs::{OptionOverrides, ProcessingOptions, RemovalEngine, RemovalPipeline};
//! use std::path::Path;
//!
//! # #[cfg(feature = "onnx")]
//! # fn example() -> anyhow::Result<()> {
//! let segmenter = OnnxSegmenter::load(Path::new("models"), "u2net")?;
//! let engine = RemovalEngine::new(Box::new(segmenter));
//! let mut pipeline = RemovalPipeline::new(engine, ProcessingOptions::default());
//!
//! let record = pipeline.process_file(
//!     Path::new("photo.jpg"),
//!     Some(Path::new("photo_no_bg.png")),
//!     &OptionOverrides::default(),
//! );
//! assert!(record.success);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature flags
//!
//! - `onnx` (default): ONNX Runtime backends for both jobs
//! - `cli` (default): the binaries' argument parsing and tracing setup
//! - `webp-support` (default): WebP encoding via the image crate
//! - `tracing-json`: JSON-formatted diagnostics on stderr

pub mod backends;
pub mod batch;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod detection;
pub mod error;
pub mod inference;
pub mod models;
pub mod removal;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;

// Public API exports
pub use batch::{AnalysisBatchRequest, RemovalBatchRequest, RemovalItemRequest};
pub use config::{OptionOverrides, OutputFormat, ProcessingOptions};
pub use detection::{AnalysisOutput, DetectionEngine, DetectionPipeline};
pub use error::{PipelineError, Result};
pub use inference::{DetectionBackend, RawDetection, SegmentationBackend, SegmentationMask};
pub use models::{ModelDescriptor, SensitiveLabel, DEFAULT_MODEL, SEGMENTATION_MODELS};
pub use removal::{RemovalEngine, RemovalOutput, RemovalPipeline};
pub use services::{ImageIo, LoadedImage};
pub use types::{
    AnalysisModelInfo, AnalysisRecord, BoundingBox, Detection, RemovalModelInfo, RemovalRecord,
};

#[cfg(feature = "onnx")]
pub use backends::{OnnxDetector, OnnxSegmenter};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, TracingConfig, TracingFormat};
