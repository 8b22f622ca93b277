//! Batch request documents and their structural validation
//!
//! Parallel-array validation runs before any item is touched: a mismatch
//! fails the whole request as [`PipelineError::Validation`], which the CLI
//! reports as a top-level error with a non-zero exit. Per-item problems are
//! never raised from here; the pipelines convert them into records.

use crate::config::OptionOverrides;
use crate::error::{PipelineError, Result};
use serde::Deserialize;
use std::path::Path;

fn default_output_dir() -> String {
    "output".to_string()
}

/// Per-item entry of a removal batch: option overrides plus correlation id
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemovalItemRequest {
    /// Partial options for this item
    #[serde(default)]
    pub options: OptionOverrides,
    /// Correlation id echoed back on the item's record
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Batch document for the background-removal job
///
/// ```json
/// { "image_paths": ["a.jpg", "b.png"],
///   "requests": [{ "options": {"quality": 80}, "user_id": "u1" },
///                { "options": {}, "user_id": "u2" }],
///   "output_path": "processed" }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RemovalBatchRequest {
    /// Input files, one per item
    pub image_paths: Vec<String>,
    /// Parallel per-item requests; must match `image_paths` in length
    #[serde(default)]
    pub requests: Vec<RemovalItemRequest>,
    /// Directory processed images are written into
    #[serde(default = "default_output_dir")]
    pub output_path: String,
}

impl RemovalBatchRequest {
    /// Read and parse a batch document
    ///
    /// # Errors
    /// [`PipelineError::Validation`] when the file cannot be read or is not
    /// a removal batch document.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        parse_batch_file(path.as_ref())
    }

    /// Check the parallel arrays line up
    ///
    /// # Errors
    /// [`PipelineError::Validation`] on a length mismatch.
    pub fn validate(&self) -> Result<()> {
        ensure_parallel(
            "image_paths",
            self.image_paths.len(),
            "requests",
            self.requests.len(),
        )
    }
}

/// Batch document for the content-analysis job
///
/// ```json
/// { "image_paths": ["a.jpg", "b.png"], "user_ids": ["u1", "u2"] }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisBatchRequest {
    /// Input files, one per item
    pub image_paths: Vec<String>,
    /// Parallel correlation ids; must match `image_paths` in length
    #[serde(default)]
    pub user_ids: Vec<String>,
}

impl AnalysisBatchRequest {
    /// Read and parse a batch document
    ///
    /// # Errors
    /// [`PipelineError::Validation`] when the file cannot be read or is not
    /// an analysis batch document.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        parse_batch_file(path.as_ref())
    }

    /// Check the parallel arrays line up
    ///
    /// # Errors
    /// [`PipelineError::Validation`] on a length mismatch.
    pub fn validate(&self) -> Result<()> {
        ensure_parallel(
            "image_paths",
            self.image_paths.len(),
            "user_ids",
            self.user_ids.len(),
        )
    }
}

fn parse_batch_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        PipelineError::validation(format!(
            "Cannot read batch file '{}': {}",
            path.display(),
            e
        ))
    })?;
    serde_json::from_str(&raw).map_err(|e| {
        PipelineError::validation(format!(
            "Cannot parse batch file '{}': {}",
            path.display(),
            e
        ))
    })
}

fn ensure_parallel(a_name: &str, a_len: usize, b_name: &str, b_len: usize) -> Result<()> {
    if a_len == b_len {
        Ok(())
    } else {
        Err(PipelineError::validation(format!(
            "{a_name} has {a_len} entries but {b_name} has {b_len}; the arrays must be parallel"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removal_batch_parses_with_defaults() {
        let request: RemovalBatchRequest = serde_json::from_value(serde_json::json!({
            "image_paths": ["a.jpg", "b.png"],
            "requests": [
                { "options": { "quality": 80 }, "user_id": "u1" },
                {}
            ]
        }))
        .unwrap();
        assert_eq!(request.output_path, "output");
        assert_eq!(request.requests[0].user_id.as_deref(), Some("u1"));
        assert_eq!(request.requests[0].options.quality, Some(80));
        assert!(request.requests[1].user_id.is_none());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_removal_batch_mistyped_item_option_does_not_sink_request() {
        let request: RemovalBatchRequest = serde_json::from_value(serde_json::json!({
            "image_paths": ["a.jpg", "b.png"],
            "requests": [
                { "options": { "quality": "max" }, "user_id": "u1" },
                { "options": { "quality": 70 }, "user_id": "u2" }
            ]
        }))
        .unwrap();
        assert_eq!(request.requests[0].options.quality, None);
        assert_eq!(request.requests[1].options.quality, Some(70));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_removal_batch_length_mismatch() {
        let request: RemovalBatchRequest = serde_json::from_value(serde_json::json!({
            "image_paths": ["a.jpg", "b.png"],
            "requests": [{ "user_id": "u1" }]
        }))
        .unwrap();
        let err = request.validate().unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
        assert!(err.to_string().contains("image_paths has 2"));
    }

    #[test]
    fn test_analysis_batch_two_paths_one_id_is_invalid() {
        let request: AnalysisBatchRequest = serde_json::from_value(serde_json::json!({
            "image_paths": ["a.jpg", "b.jpg"],
            "user_ids": ["u1"]
        }))
        .unwrap();
        assert!(matches!(
            request.validate(),
            Err(PipelineError::Validation(_))
        ));
    }

    #[test]
    fn test_batch_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.json");
        std::fs::write(
            &path,
            r#"{ "image_paths": ["x.png"], "user_ids": ["u9"] }"#,
        )
        .unwrap();

        let request = AnalysisBatchRequest::from_file(&path).unwrap();
        assert_eq!(request.image_paths, vec!["x.png"]);
        assert_eq!(request.user_ids, vec!["u9"]);
    }

    #[test]
    fn test_batch_file_errors_are_validation() {
        let missing = RemovalBatchRequest::from_file("no/such/batch.json");
        assert!(matches!(missing, Err(PipelineError::Validation(_))));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        let malformed = RemovalBatchRequest::from_file(&path);
        assert!(matches!(malformed, Err(PipelineError::Validation(_))));

        // missing required image_paths key
        std::fs::write(&path, r#"{ "requests": [] }"#).unwrap();
        let incomplete = RemovalBatchRequest::from_file(&path);
        assert!(matches!(incomplete, Err(PipelineError::Validation(_))));
    }
}
