// Deepsift Data Models
// Wire-facing result shapes plus the in-memory unit/tensor types the
// decomposers hand to the classifier.

use serde::{Deserialize, Serialize};

// ============ Media Kinds ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }
}

// ============ Unit Tensors ============

/// Decoded, resized RGB image. Row-major HWC layout, values in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    pub width: u32,
    pub height: u32,
    pub data: Vec<f32>,
}

impl ImageTensor {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Mel power spectrogram, row-major `bands x steps`, min-max normalized to [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrogramTensor {
    pub bands: usize,
    pub steps: usize,
    pub data: Vec<f32>,
}

impl SpectrogramTensor {
    pub fn at(&self, band: usize, step: usize) -> f32 {
        self.data[band * self.steps + step]
    }
}

// ============ Media Units ============

/// One classifiable sample of a media item. The ordinal is zero-based,
/// contiguous, assigned in decomposition order, and used only for reporting.
#[derive(Debug, Clone)]
pub enum MediaUnit {
    Frame { tensor: ImageTensor, ordinal: usize },
    Spectrogram { tensor: SpectrogramTensor, ordinal: usize },
}

impl MediaUnit {
    pub fn ordinal(&self) -> usize {
        match self {
            MediaUnit::Frame { ordinal, .. } => *ordinal,
            MediaUnit::Spectrogram { ordinal, .. } => *ordinal,
        }
    }
}

// ============ Classification Results ============

/// Verdict for a single unit.
/// Invariants: `confidence = max(raw_score, 1 - raw_score)` and
/// `is_fake = raw_score > classification_threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub ordinal: usize,
    pub is_fake: bool,
    pub confidence: f64,
    pub raw_score: f64,
}

/// Combined verdict for a media item.
/// For single-unit media `fake_unit_ratio` is `None` and the verdict passes
/// through from the sole unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    pub is_fake: bool,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fake_unit_ratio: Option<f64>,
    pub units_analyzed: usize,
    pub per_unit: Vec<ClassificationResult>,
}

// ============ Detection Options ============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectOptions {
    /// Video sampling rate: frames analyzed per second of source material.
    #[serde(default = "default_frames_per_second")]
    pub frames_per_second: u32,
    /// Per-unit decision threshold: a unit is fake when raw_score > threshold.
    #[serde(default = "default_threshold")]
    pub classification_threshold: f64,
    /// Multi-unit decision threshold: the item is fake when the fake-unit
    /// ratio reaches this value. Kept separate from the per-unit threshold;
    /// both default to 0.5.
    #[serde(default = "default_threshold")]
    pub aggregation_threshold: f64,
    /// Audio: only this leading window of the file is analyzed.
    #[serde(default = "default_analysis_duration")]
    pub analysis_duration_seconds: f64,
    /// Audio: waveform is resampled to this rate before the spectrogram.
    #[serde(default = "default_sample_rate")]
    pub sample_rate_hz: u32,
    /// Spatial resolution frames/images are resized to for the classifier.
    #[serde(default = "default_image_size")]
    pub image_size: u32,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            frames_per_second: default_frames_per_second(),
            classification_threshold: default_threshold(),
            aggregation_threshold: default_threshold(),
            analysis_duration_seconds: default_analysis_duration(),
            sample_rate_hz: default_sample_rate(),
            image_size: default_image_size(),
        }
    }
}

// ============ Default Value Functions ============

fn default_frames_per_second() -> u32 { 1 }
fn default_threshold() -> f64 { 0.5 }
fn default_analysis_duration() -> f64 { 5.0 }
fn default_sample_rate() -> u32 { 22050 }
fn default_image_size() -> u32 { 224 }
