// Classifier Capability
// The neural-network classifier is consumed strictly as an injected
// capability: one method mapping a preprocessed unit to a raw score in [0, 1],
// higher meaning more likely synthetic. The pipeline never sees model
// architecture or weights, so it stays testable against deterministic stubs.

use thiserror::Error;

use crate::models::MediaUnit;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("classifier unavailable: {0}")]
    Unavailable(String),
    #[error("malformed classifier input: {0}")]
    BadInput(String),
    #[error("classifier returned out-of-range score: {0}")]
    OutOfRange(f64),
}

/// External classification capability. Must be deterministic for a fixed
/// input and fixed loaded weights; no side effects visible to the pipeline.
pub trait Classifier: Send + Sync {
    fn predict(&self, unit: &MediaUnit) -> Result<f64, ClassifierError>;
}

/// Classifier that returns the same score for every unit. Used by the
/// inspect_media debug tool and as a baseline in tests; not a real model.
#[derive(Debug, Clone, Copy)]
pub struct FixedScoreClassifier {
    score: f64,
}

impl FixedScoreClassifier {
    pub fn new(score: f64) -> Self {
        Self { score }
    }
}

impl Classifier for FixedScoreClassifier {
    fn predict(&self, _unit: &MediaUnit) -> Result<f64, ClassifierError> {
        Ok(self.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImageTensor;

    fn frame_unit() -> MediaUnit {
        MediaUnit::Frame {
            tensor: ImageTensor {
                width: 1,
                height: 1,
                data: vec![0.0, 0.0, 0.0],
            },
            ordinal: 0,
        }
    }

    #[test]
    fn test_fixed_score_classifier() {
        let clf = FixedScoreClassifier::new(0.9);
        assert_eq!(clf.predict(&frame_unit()).unwrap(), 0.9);
    }
}
