//! Content-analysis job CLI
//!
//! Mirrors the removal job's surface with the analyzer's positional
//! arguments: image, model location, confidence threshold.

use super::emit_json;
use crate::batch::AnalysisBatchRequest;
use crate::config::{OptionOverrides, ProcessingOptions};
use crate::detection::DetectionPipeline;
use crate::types::AnalysisRecord;
use clap::{CommandFactory, Parser};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::warn;

/// Sensitive-content analysis job
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "imgjobs-moderate")]
pub struct ModerateCli {
    /// Image to analyze; with --batch or --info, the model file or directory
    #[arg(value_name = "IMAGE_PATH", required_unless_present_any = &["batch", "info"])]
    pub image_path: Option<PathBuf>,

    /// Detection model file or directory holding `detector.onnx`
    #[arg(value_name = "MODEL_PATH", conflicts_with_all = &["batch", "info"])]
    pub model_path: Option<PathBuf>,

    /// Minimum confidence for a detection to count (0.0-1.0)
    #[arg(value_name = "CONFIDENCE_THRESHOLD", conflicts_with_all = &["batch", "info"])]
    pub threshold: Option<f32>,

    /// Analyze a batch request file instead of a single image
    #[arg(long, value_name = "REQUEST_FILE", conflicts_with = "info")]
    pub batch: Option<PathBuf>,

    /// Print model capability info and exit
    #[arg(long)]
    pub info: bool,

    /// Raise diagnostic verbosity (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl ModerateCli {
    /// Where model weights live for the selected mode
    fn model_location(&self) -> Option<&Path> {
        if self.batch.is_some() || self.info {
            self.image_path.as_deref()
        } else {
            self.model_path.as_deref()
        }
    }
}

/// Entry point for the `imgjobs-moderate` binary
pub fn main() -> ExitCode {
    if std::env::args().len() <= 1 {
        let _ = ModerateCli::command().print_help();
        println!();
        return ExitCode::SUCCESS;
    }

    let cli = ModerateCli::parse();
    if let Err(e) = crate::tracing_config::init_cli_tracing(cli.verbose) {
        eprintln!("Failed to initialize tracing: {e}");
    }
    run(&cli)
}

fn run(cli: &ModerateCli) -> ExitCode {
    let mut pipeline = build_pipeline(cli.model_location(), ProcessingOptions::default());

    if cli.info {
        return match emit_json(&pipeline.model_info()) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => fail(&e.to_string()),
        };
    }

    if let Some(request_file) = &cli.batch {
        return run_batch(&mut pipeline, request_file);
    }

    let Some(image_path) = &cli.image_path else {
        return fail("No image path provided");
    };
    let overrides = OptionOverrides {
        confidence_threshold: cli.threshold,
        ..OptionOverrides::default()
    };
    // Item failures are data: the record carries the error and the process
    // still exits zero. Non-zero is reserved for invocation-level problems
    // surfaced through fail().
    let record = pipeline.analyze_file(image_path, &overrides);
    match emit_json(&record) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e.to_string()),
    }
}

fn run_batch(pipeline: &mut DetectionPipeline, request_file: &Path) -> ExitCode {
    let request = match AnalysisBatchRequest::from_file(request_file) {
        Ok(request) => request,
        Err(e) => return fail(&e.to_string()),
    };
    match pipeline.analyze_batch(&request) {
        Ok(records) => match emit_json(&records) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => fail(&e.to_string()),
        },
        Err(e) => fail(&e.to_string()),
    }
}

/// Build the pipeline, eagerly loading the detection model
fn build_pipeline(location: Option<&Path>, defaults: ProcessingOptions) -> DetectionPipeline {
    #[cfg(feature = "onnx")]
    {
        use crate::backends::OnnxDetector;
        use crate::detection::DetectionEngine;

        let Some(location) = location else {
            return DetectionPipeline::unavailable("No model path provided", defaults);
        };
        match OnnxDetector::load(location) {
            Ok(detector) => {
                DetectionPipeline::new(DetectionEngine::new(Box::new(detector)), defaults)
            },
            Err(e) => {
                warn!(error = %e, "Detection capability failed to initialize");
                DetectionPipeline::unavailable(e.to_string(), defaults)
            },
        }
    }
    #[cfg(not(feature = "onnx"))]
    {
        let _ = location;
        DetectionPipeline::unavailable("Built without the onnx feature", defaults)
    }
}

/// Top-level failure: error envelope on stdout, non-zero exit
fn fail(message: &str) -> ExitCode {
    warn!(error = %message, "Job failed");
    if emit_json(&AnalysisRecord::failure(message)).is_err() {
        eprintln!("{message}");
    }
    ExitCode::FAILURE
}
