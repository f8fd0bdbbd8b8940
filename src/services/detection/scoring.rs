// Unit Scoring
// Runs the injected classifier over one media unit and derives the per-unit
// verdict. The raw score is the model's fake probability; confidence is the
// distance from total uncertainty, `max(raw, 1 - raw)`, so a 0.1 raw score is
// reported as a confident authentic call, not a weak fake call.

use tracing::warn;

use crate::models::{ClassificationResult, MediaUnit};
use crate::services::classifier::{Classifier, ClassifierError};

pub struct UnitScorer<'a> {
    classifier: &'a dyn Classifier,
    threshold: f64,
}

impl<'a> UnitScorer<'a> {
    pub fn new(classifier: &'a dyn Classifier, threshold: f64) -> Self {
        Self {
            classifier,
            threshold,
        }
    }

    /// Classify one unit. Scores outside [0, 1] or non-finite mark the
    /// classifier as misbehaving and fail the whole invocation.
    pub fn score(&self, unit: &MediaUnit) -> Result<ClassificationResult, ClassifierError> {
        let raw = self.classifier.predict(unit)?;
        if !raw.is_finite() || !(0.0..=1.0).contains(&raw) {
            warn!(ordinal = unit.ordinal(), score = raw, "classifier returned unusable score");
            return Err(ClassifierError::OutOfRange(raw));
        }

        Ok(ClassificationResult {
            ordinal: unit.ordinal(),
            is_fake: raw > self.threshold,
            confidence: raw.max(1.0 - raw),
            raw_score: raw,
        })
    }
}
