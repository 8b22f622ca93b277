//! Error types for the image-processing job pipelines

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Error taxonomy shared by the background-removal and detection jobs
///
/// Per-item failures never cross the item boundary as errors; the pipelines
/// convert them into result records. Only structural failures (bad batch
/// request, unwritable top-level output) escape to the process layer.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Model capability failed to initialize; all operations short-circuit
    #[error("Model capability unavailable: {0}")]
    CapabilityUnavailable(String),

    /// Input path does not resolve to an existing file
    #[error("Image not found: {0}")]
    ImageNotFound(String),

    /// The codec could not decode the input bytes
    #[error("Failed to decode image '{path}': {reason}")]
    ImageLoadFailed {
        /// Path of the undecodable input
        path: String,
        /// Decoder message
        reason: String,
    },

    /// Model invocation or post-processing failed
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),

    /// Structurally invalid batch request (length mismatch, bad JSON)
    #[error("Invalid batch request: {0}")]
    Validation(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input/output errors (permission denied, disk full, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Create a new capability-unavailable error
    pub fn capability_unavailable<S: Into<String>>(msg: S) -> Self {
        Self::CapabilityUnavailable(msg.into())
    }

    /// Create a new image-not-found error for a path
    pub fn image_not_found<P: AsRef<std::path::Path>>(path: P) -> Self {
        Self::ImageNotFound(path.as_ref().display().to_string())
    }

    /// Create a new decode error with path context
    pub fn image_load_failed<P: AsRef<std::path::Path>, E: std::fmt::Display>(
        path: P,
        reason: E,
    ) -> Self {
        Self::ImageLoadFailed {
            path: path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::ProcessingFailed(msg.into())
    }

    /// Create a new batch validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Whether this error marks the disabled-capability state
    #[must_use]
    pub fn is_capability_unavailable(&self) -> bool {
        matches!(self, Self::CapabilityUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_error_creation() {
        let err = PipelineError::processing("mask shape mismatch");
        assert!(matches!(err, PipelineError::ProcessingFailed(_)));

        let err = PipelineError::validation("length mismatch");
        assert!(matches!(err, PipelineError::Validation(_)));

        let err = PipelineError::image_not_found(Path::new("/tmp/missing.png"));
        assert!(matches!(err, PipelineError::ImageNotFound(_)));
    }

    #[test]
    fn test_error_display() {
        let err = PipelineError::image_not_found(Path::new("/tmp/missing.png"));
        assert_eq!(err.to_string(), "Image not found: /tmp/missing.png");

        let err = PipelineError::image_load_failed(Path::new("in.jpg"), "bad marker");
        assert_eq!(
            err.to_string(),
            "Failed to decode image 'in.jpg': bad marker"
        );

        let err = PipelineError::capability_unavailable("model file missing");
        assert_eq!(
            err.to_string(),
            "Model capability unavailable: model file missing"
        );
    }

    #[test]
    fn test_contextual_errors() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = PipelineError::file_io_error("write output", Path::new("/out/result.png"), io_error);
        let error_string = err.to_string();
        assert!(error_string.contains("write output"));
        assert!(error_string.contains("/out/result.png"));
    }

    #[test]
    fn test_capability_state_check() {
        assert!(PipelineError::capability_unavailable("x").is_capability_unavailable());
        assert!(!PipelineError::processing("x").is_capability_unavailable());
    }
}
