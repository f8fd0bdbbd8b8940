// Detection Module
// Deepfake detection core logic organized into specialized submodules:
// - scoring: Classifies one media unit and derives the per-unit verdict
// - aggregation: Folds per-unit results into the overall media verdict
// - detector: Facade wiring decomposition, scoring and aggregation together

pub mod aggregation;
pub mod detector;
pub mod scoring;

pub use aggregation::aggregate_units;
pub use detector::Detector;
pub use scoring::UnitScorer;
