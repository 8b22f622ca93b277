//! Background-removal job CLI
//!
//! Three modes, one per invocation: single image (positional args), batch
//! (`--batch <request-file>`), capability info (`--info`). Every mode ends
//! with one JSON document on stdout.

use super::emit_json;
use crate::batch::RemovalBatchRequest;
use crate::config::{OptionOverrides, ProcessingOptions};
use crate::removal::RemovalPipeline;
use crate::types::RemovalRecord;
use clap::{CommandFactory, Parser};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::warn;

/// Background-removal job
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "imgjobs-bgremove")]
pub struct BgremoveCli {
    /// Image to process; with --batch or --info, the model file or directory
    #[arg(value_name = "IMAGE_PATH", required_unless_present_any = &["batch", "info"])]
    pub image_path: Option<PathBuf>,

    /// Model file or directory holding `<model>.onnx` weights
    #[arg(value_name = "MODEL_PATH", conflicts_with_all = &["batch", "info"])]
    pub model_path: Option<PathBuf>,

    /// Where to write the processed image; a kept temp file when omitted
    #[arg(value_name = "OUTPUT_PATH", conflicts_with_all = &["batch", "info"])]
    pub output_path: Option<PathBuf>,

    /// JSON options file with processing overrides
    #[arg(value_name = "OPTIONS_FILE", conflicts_with_all = &["batch", "info"])]
    pub options_file: Option<PathBuf>,

    /// Process a batch request file instead of a single image
    #[arg(long, value_name = "REQUEST_FILE", conflicts_with = "info")]
    pub batch: Option<PathBuf>,

    /// Print model capability info and exit
    #[arg(long)]
    pub info: bool,

    /// Raise diagnostic verbosity (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl BgremoveCli {
    /// Where model weights live for the selected mode
    ///
    /// Batch and info invocations carry the location in the first
    /// positional slot; single mode uses the second.
    fn model_location(&self) -> Option<&Path> {
        if self.batch.is_some() || self.info {
            self.image_path.as_deref()
        } else {
            self.model_path.as_deref()
        }
    }
}

/// Entry point for the `imgjobs-bgremove` binary
pub fn main() -> ExitCode {
    if std::env::args().len() <= 1 {
        let _ = BgremoveCli::command().print_help();
        println!();
        return ExitCode::SUCCESS;
    }

    let cli = BgremoveCli::parse();
    if let Err(e) = crate::tracing_config::init_cli_tracing(cli.verbose) {
        eprintln!("Failed to initialize tracing: {e}");
    }
    run(&cli)
}

fn run(cli: &BgremoveCli) -> ExitCode {
    // The options file is read before the capability loads so a model
    // override selects which weights to load.
    let overrides = match &cli.options_file {
        Some(path) => match OptionOverrides::from_json_file(path) {
            Ok(overrides) => overrides,
            Err(e) => return fail(&e.to_string()),
        },
        None => OptionOverrides::default(),
    };

    let defaults = ProcessingOptions {
        model: overrides
            .model
            .clone()
            .unwrap_or_else(|| crate::models::DEFAULT_MODEL.to_string()),
        ..ProcessingOptions::default()
    };
    if !crate::models::is_known_model(&defaults.model) {
        warn!(
            model = %defaults.model,
            "Model name is not in the registry; attempting to load it anyway"
        );
    }
    let mut pipeline = build_pipeline(cli.model_location(), defaults);

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
    // Item failures are data: the record carries success/error and the
    // process still exits zero. Non-zero is reserved for invocation-level
    // problems surfaced through fail().
    let record = pipeline.process_file(image_path, cli.output_path.as_deref(), &overrides);
    match emit_json(&record) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e.to_string()),
    }
}

fn run_batch(pipeline: &mut RemovalPipeline, request_file: &Path) -> ExitCode {
    let request = match RemovalBatchRequest::from_file(request_file) {
        Ok(request) => request,
        Err(e) => return fail(&e.to_string()),
    };
    match pipeline.process_batch(&request) {
        Ok(records) => match emit_json(&records) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => fail(&e.to_string()),
        },
        Err(e) => fail(&e.to_string()),
    }
}

/// Build the pipeline, eagerly loading the segmentation model
///
/// Initialization failure does not abort: the pipeline enters the disabled
/// state and every later operation reports the reason.
fn build_pipeline(location: Option<&Path>, defaults: ProcessingOptions) -> RemovalPipeline {
    #[cfg(feature = "onnx")]
    {
        use crate::backends::OnnxSegmenter;
        use crate::removal::RemovalEngine;

        let Some(location) = location else {
            return RemovalPipeline::unavailable("No model path provided", defaults);
        };
        let model = defaults.model.clone();
        match OnnxSegmenter::load(location, &model) {
            Ok(segmenter) => {
                RemovalPipeline::new(RemovalEngine::new(Box::new(segmenter)), defaults)
            },
            Err(e) => {
                warn!(error = %e, "Segmentation capability failed to initialize");
                RemovalPipeline::unavailable(e.to_string(), defaults)
            },
        }
    }
    #[cfg(not(feature = "onnx"))]
    {
        let _ = location;
        RemovalPipeline::unavailable("Built without the onnx feature", defaults)
    }
}

/// Top-level failure: error envelope on stdout, non-zero exit
fn fail(message: &str) -> ExitCode {
    warn!(error = %message, "Job failed");
    if emit_json(&RemovalRecord::failure(message)).is_err() {
        eprintln!("{message}");
    }
    ExitCode::FAILURE
}
