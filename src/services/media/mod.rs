// Media Decomposition
// Turns a source media file into a non-empty ordered sequence of classifiable
// units. One decomposer per media kind so new kinds extend by addition:
// - image: whole file becomes a single frame unit
// - video: sampled frames, persisted as PNG artifacts inside the scope
// - audio: one mel-spectrogram unit from the leading analysis window

pub mod audio;
pub mod image;
pub mod video;

use std::path::Path;

use crate::error::DetectionError;
use crate::models::{DetectOptions, MediaUnit};
use crate::services::resource_scope::ResourceScope;

pub use audio::AudioDecomposer;
pub use image::ImageDecomposer;
pub use video::{GifOpener, VideoDecomposer, VideoOpener, VideoSource};

/// Decomposes one media file into classifiable units.
///
/// Contract: a successful return is never empty; an empty decomposition is an
/// `EmptyMedia` failure. Temp artifacts are materialized inside `scope` and
/// registered there, never elsewhere.
pub trait MediaDecomposer {
    fn decompose(
        &self,
        path: &Path,
        scope: &mut ResourceScope,
        options: &DetectOptions,
    ) -> Result<Vec<MediaUnit>, DetectionError>;
}
