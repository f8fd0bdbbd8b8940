// Detection error taxonomy
// Every detect() invocation either produces an AggregateResult or exactly one
// of these. Cleanup failures are deliberately absent: ResourceScope logs and
// swallows them (see services/resource_scope.rs).

use thiserror::Error;

use crate::services::classifier::ClassifierError;

#[derive(Error, Debug)]
pub enum DetectionError {
    /// Source file missing/unreadable, or the invocation could not be set up.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Media stream could not be opened or decoded (zero/invalid frame rate,
    /// corrupt stream, unsupported codec).
    #[error("decode failed: {0}")]
    Decode(String),

    /// Decomposition or aggregation ended up with zero classifiable units.
    #[error("no classifiable units: {0}")]
    EmptyMedia(String),

    /// The external classifier capability failed or returned a score outside
    /// [0, 1]. Aborts the remaining units of the invocation.
    #[error("classifier failed: {0}")]
    Classifier(#[from] ClassifierError),
}

impl DetectionError {
    /// Stable kind label for logs and for outer layers mapping to status codes.
    pub fn kind(&self) -> &'static str {
        match self {
            DetectionError::InvalidInput(_) => "invalid_input",
            DetectionError::Decode(_) => "decode_error",
            DetectionError::EmptyMedia(_) => "empty_media",
            DetectionError::Classifier(_) => "classifier_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels() {
        assert_eq!(DetectionError::InvalidInput("x".into()).kind(), "invalid_input");
        assert_eq!(DetectionError::Decode("x".into()).kind(), "decode_error");
        assert_eq!(DetectionError::EmptyMedia("x".into()).kind(), "empty_media");
    }

    #[test]
    fn test_classifier_error_converts() {
        let err: DetectionError = ClassifierError::Unavailable("no model".into()).into();
        assert_eq!(err.kind(), "classifier_error");
        assert!(err.to_string().contains("no model"));
    }
}
