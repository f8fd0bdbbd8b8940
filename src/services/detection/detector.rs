// Detector Facade
// One entry point for a full detection pass: validate the request, acquire a
// scoped temp workspace, decompose the media into units, classify each unit in
// order, aggregate, and release the workspace no matter how the pass ended.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::DetectionError;
use crate::models::{AggregateResult, ClassificationResult, DetectOptions, MediaKind};
use crate::services::classifier::Classifier;
use crate::services::detection::aggregation::aggregate_units;
use crate::services::detection::scoring::UnitScorer;
use crate::services::media::{
    AudioDecomposer, GifOpener, ImageDecomposer, MediaDecomposer, VideoDecomposer, VideoOpener,
};
use crate::services::resource_scope::ResourceScope;

pub struct Detector {
    classifier: Arc<dyn Classifier>,
    video_opener: Arc<dyn VideoOpener>,
    workspace_root: PathBuf,
}

impl Detector {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self {
            classifier,
            video_opener: Arc::new(GifOpener),
            workspace_root: std::env::temp_dir(),
        }
    }

    /// Swap in a different video decode capability.
    pub fn with_video_opener(mut self, opener: Arc<dyn VideoOpener>) -> Self {
        self.video_opener = opener;
        self
    }

    /// Place per-invocation temp workspaces under `root` instead of the
    /// system temp dir.
    pub fn with_workspace_root(mut self, root: PathBuf) -> Self {
        self.workspace_root = root;
        self
    }

    /// Run one full detection pass over a media file.
    pub fn detect(
        &self,
        path: &Path,
        kind: MediaKind,
        options: &DetectOptions,
    ) -> Result<AggregateResult, DetectionError> {
        validate_options(options)?;
        if !path.is_file() {
            return Err(DetectionError::InvalidInput(format!(
                "media file not found: {}",
                path.display()
            )));
        }

        let mut scope = ResourceScope::acquire_in(&self.workspace_root).map_err(|e| {
            DetectionError::InvalidInput(format!("cannot create analysis workspace: {}", e))
        })?;

        info!(path = %path.display(), kind = kind.as_str(), "detection started");
        let result = self.run(path, kind, &mut scope, options);
        scope.release();

        match &result {
            Ok(aggregate) => info!(
                path = %path.display(),
                is_fake = aggregate.is_fake,
                units = aggregate.units_analyzed,
                "detection finished"
            ),
            Err(e) => info!(path = %path.display(), error = %e, "detection failed"),
        }
        result
    }

    fn run(
        &self,
        path: &Path,
        kind: MediaKind,
        scope: &mut ResourceScope,
        options: &DetectOptions,
    ) -> Result<AggregateResult, DetectionError> {
        let units = match kind {
            MediaKind::Image => ImageDecomposer.decompose(path, scope, options)?,
            MediaKind::Video => {
                VideoDecomposer::new(Arc::clone(&self.video_opener)).decompose(path, scope, options)?
            }
            MediaKind::Audio => AudioDecomposer.decompose(path, scope, options)?,
        };
        debug!(units = units.len(), "media decomposed");

        let scorer = UnitScorer::new(self.classifier.as_ref(), options.classification_threshold);
        let mut per_unit: Vec<ClassificationResult> = Vec::with_capacity(units.len());
        for unit in &units {
            per_unit.push(scorer.score(unit)?);
        }

        aggregate_units(per_unit, options.aggregation_threshold)
    }
}

fn validate_options(options: &DetectOptions) -> Result<(), DetectionError> {
    for (name, value) in [
        ("classificationThreshold", options.classification_threshold),
        ("aggregationThreshold", options.aggregation_threshold),
    ] {
        if !value.is_finite() || value <= 0.0 || value >= 1.0 {
            return Err(DetectionError::InvalidInput(format!(
                "{} must lie strictly between 0 and 1, got {}",
                name, value
            )));
        }
    }
    if options.analysis_duration_seconds <= 0.0 || !options.analysis_duration_seconds.is_finite() {
        return Err(DetectionError::InvalidInput(format!(
            "analysisDurationSeconds must be positive, got {}",
            options.analysis_duration_seconds
        )));
    }
    if options.sample_rate_hz == 0 {
        return Err(DetectionError::InvalidInput(
            "sampleRateHz must be positive".to_string(),
        ));
    }
    if options.image_size == 0 {
        return Err(DetectionError::InvalidInput(
            "imageSize must be positive".to_string(),
        ));
    }
    Ok(())
}
