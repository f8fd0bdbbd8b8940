// Deepsift Core Services

pub mod classifier;
pub mod config_store;
pub mod detection;
pub mod media;
pub mod resource_scope;

pub use classifier::{Classifier, ClassifierError, FixedScoreClassifier};
pub use config_store::{AppConfig, ConfigStore};
pub use resource_scope::ResourceScope;

// Re-export detection module types
pub use detection::{aggregate_units, Detector, UnitScorer};
pub use media::{
    AudioDecomposer, GifOpener, ImageDecomposer, MediaDecomposer, VideoDecomposer, VideoOpener,
    VideoSource,
};
