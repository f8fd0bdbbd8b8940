// Aggregation Logic
// Folds per-unit classification results into the overall media verdict.
//
// Single-unit media (images, the one audio spectrogram) pass the unit verdict
// through unchanged and report no fake-unit ratio. Multi-unit media vote: the
// media is fake when the fraction of fake units reaches the aggregation
// threshold, and the overall confidence is the plain mean of unit confidences.

use crate::error::DetectionError;
use crate::models::{AggregateResult, ClassificationResult};

pub fn aggregate_units(
    per_unit: Vec<ClassificationResult>,
    aggregation_threshold: f64,
) -> Result<AggregateResult, DetectionError> {
    if per_unit.is_empty() {
        return Err(DetectionError::EmptyMedia(
            "no units were classified".to_string(),
        ));
    }

    if per_unit.len() == 1 {
        let unit = &per_unit[0];
        return Ok(AggregateResult {
            is_fake: unit.is_fake,
            confidence: unit.confidence,
            fake_unit_ratio: None,
            units_analyzed: 1,
            per_unit,
        });
    }

    let total = per_unit.len();
    let fake_count = per_unit.iter().filter(|r| r.is_fake).count();
    let ratio = fake_count as f64 / total as f64;
    let confidence = per_unit.iter().map(|r| r.confidence).sum::<f64>() / total as f64;

    Ok(AggregateResult {
        is_fake: ratio >= aggregation_threshold,
        confidence,
        fake_unit_ratio: Some(ratio),
        units_analyzed: total,
        per_unit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(ordinal: usize, raw: f64, is_fake: bool) -> ClassificationResult {
        ClassificationResult {
            ordinal,
            is_fake,
            confidence: raw.max(1.0 - raw),
            raw_score: raw,
        }
    }

    #[test]
    fn test_empty_input_is_empty_media() {
        let err = aggregate_units(Vec::new(), 0.5).unwrap_err();
        assert_eq!(err.kind(), "empty_media");
    }

    #[test]
    fn test_single_unit_passes_through() {
        let result = aggregate_units(vec![unit(0, 0.8, true)], 0.5).unwrap();
        assert!(result.is_fake);
        assert!((result.confidence - 0.8).abs() < 1e-9);
        assert_eq!(result.fake_unit_ratio, None);
        assert_eq!(result.units_analyzed, 1);
    }

    #[test]
    fn test_all_fake_units() {
        let units = (0..4).map(|i| unit(i, 0.9, true)).collect();
        let result = aggregate_units(units, 0.5).unwrap();
        assert!(result.is_fake);
        assert_eq!(result.fake_unit_ratio, Some(1.0));
        assert!((result.confidence - 0.9).abs() < 1e-9);
        assert_eq!(result.units_analyzed, 4);
    }

    #[test]
    fn test_ratio_at_threshold_counts_as_fake() {
        // Two of four fake at threshold 0.5: inclusive comparison flags it.
        let units = vec![
            unit(0, 0.3, false),
            unit(1, 0.3, false),
            unit(2, 0.9, true),
            unit(3, 0.9, true),
        ];
        let result = aggregate_units(units, 0.5).unwrap();
        assert!(result.is_fake);
        assert_eq!(result.fake_unit_ratio, Some(0.5));
        // mean of 0.7, 0.7, 0.9, 0.9
        assert!((result.confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_ratio_below_threshold_is_authentic() {
        let units = vec![
            unit(0, 0.2, false),
            unit(1, 0.2, false),
            unit(2, 0.2, false),
            unit(3, 0.9, true),
        ];
        let result = aggregate_units(units, 0.5).unwrap();
        assert!(!result.is_fake);
        assert_eq!(result.fake_unit_ratio, Some(0.25));
    }

    #[test]
    fn test_per_unit_order_is_preserved() {
        let units = vec![unit(0, 0.1, false), unit(1, 0.9, true), unit(2, 0.4, false)];
        let result = aggregate_units(units, 0.5).unwrap();
        let ordinals: Vec<usize> = result.per_unit.iter().map(|r| r.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);
    }
}
