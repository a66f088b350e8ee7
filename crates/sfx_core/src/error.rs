//! Extraction Error Types

use thiserror::Error;

use crate::format::ElementType;

/// Errors raised while assembling or running feature pipelines
///
/// Configuration and resource errors are raised synchronously during assembly.
/// Buffer shape errors and `Cancelled` come from processing.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Unknown transform: {0}")]
    UnknownTransformName(String),

    #[error("Transform already registered: {0}")]
    DuplicateTransform(String),

    #[error("There is no \"{name}\" parameter in {transform} supported parameters list")]
    UnknownParameter { name: String, transform: String },

    #[error("Parameter \"{name}\" is set to an invalid value \"{value}\" for transform {transform}")]
    InvalidParameterValue {
        name: String,
        value: String,
        transform: String,
    },

    #[error("Format mismatch in {transform}: expected {expected} elements, got {got}")]
    FormatMismatch {
        transform: String,
        expected: ElementType,
        got: ElementType,
    },

    #[error("Frame size mismatch in {transform}: expected {expected} elements per frame, got {got}")]
    FrameSizeMismatch {
        transform: String,
        expected: usize,
        got: usize,
    },

    #[error("Frame count mismatch in {transform}: expected {expected} output frames, got {got}")]
    FrameCountMismatch {
        transform: String,
        expected: usize,
        got: usize,
    },

    #[error("Output format of {0} has not been negotiated")]
    UnnegotiatedFormat(String),

    #[error("Invalid feature description \"{description}\": {reason}")]
    InvalidFeatureDescription { description: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Too many features: {count} requested, at most {max} supported")]
    TooManyFeatures { count: usize, max: usize },

    #[error("PCM buffer length mismatch: expected {expected}, got {got}")]
    PcmLengthMismatch { expected: usize, got: usize },

    #[error("Failed to build handles for {transform}: {source}")]
    HandleConstruction {
        transform: String,
        #[source]
        source: sfx_dsp::DspError,
    },

    #[error("Cancelled while waiting for a free handle")]
    Cancelled,

    #[error("Configuration parse error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for extraction operations
pub type ExtractionResult<T> = Result<T, ExtractionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ExtractionError::InvalidParameterValue {
            name: "base".into(),
            value: "3".into(),
            transform: "Log".into(),
        };
        let text = err.to_string();
        assert!(text.contains("base"));
        assert!(text.contains("\"3\""));
        assert!(text.contains("Log"));

        let err = ExtractionError::FormatMismatch {
            transform: "Energy".into(),
            expected: ElementType::Float32,
            got: ElementType::Int16,
        };
        assert!(err.to_string().contains("int16"));
    }

    #[test]
    fn test_shape_errors_name_the_transform() {
        let err = ExtractionError::FrameSizeMismatch {
            transform: "Window".into(),
            expected: 64,
            got: 20,
        };
        let text = err.to_string();
        assert!(text.contains("Window"));
        assert!(text.contains("64"));
        assert!(text.contains("20"));
    }
}
