// Video Decomposition
// Walks source frames in order and keeps every `interval`-th one, where
// `interval = floor(fps / frames_per_second)` clamped to at least 1. Kept
// frames are persisted as PNG artifacts inside the active resource scope and
// preprocessed through the same path as still images.
//
// Frame decoding is a capability: `VideoOpener` turns a path into a
// `VideoSource`. The bundled opener handles animated GIF via the image crate;
// other containers/codecs come from injected openers.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, DynamicImage, Frame, Frames, RgbImage};
use tracing::debug;

use super::image::tensor_from_rgb;
use crate::error::DetectionError;
use crate::models::{DetectOptions, MediaUnit};
use crate::services::media::MediaDecomposer;
use crate::services::resource_scope::ResourceScope;

/// Decoders reporting no frame delay are treated as 10 fps, the common
/// fallback for GIF renderers.
const FALLBACK_GIF_FPS: f64 = 10.0;

/// Ordered frame iteration over one opened video stream.
pub trait VideoSource {
    /// Source frame rate as probed from the stream. Non-positive values make
    /// the decomposer fail with a decode error before any sampling math.
    fn frame_rate(&self) -> f64;

    /// Next frame in stream order, or `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<RgbImage>, DetectionError>;
}

impl std::fmt::Debug for dyn VideoSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("VideoSource")
    }
}

/// Opens a video file by path. Injected into the detector so codec support
/// beyond the bundled GIF path stays outside the pipeline.
pub trait VideoOpener: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn VideoSource>, DetectionError>;
}

// ============ Bundled GIF opener ============

pub struct GifOpener;

impl VideoOpener for GifOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn VideoSource>, DetectionError> {
        let file = File::open(path).map_err(|e| {
            DetectionError::Decode(format!("cannot open video {}: {}", path.display(), e))
        })?;
        let decoder = GifDecoder::new(BufReader::new(file)).map_err(|e| {
            DetectionError::Decode(format!("cannot decode video {}: {}", path.display(), e))
        })?;

        let mut frames = decoder.into_frames();
        // Probe fps from the first frame's delay; hold the frame so it is not
        // lost from the iteration.
        let first = match frames.next() {
            Some(Ok(frame)) => Some(frame),
            Some(Err(e)) => {
                return Err(DetectionError::Decode(format!(
                    "cannot decode first frame of {}: {}",
                    path.display(),
                    e
                )))
            }
            None => None,
        };
        let fps = first
            .as_ref()
            .map(|f| {
                let (numer, denom) = f.delay().numer_denom_ms();
                if numer == 0 || denom == 0 {
                    FALLBACK_GIF_FPS
                } else {
                    1000.0 * denom as f64 / numer as f64
                }
            })
            .unwrap_or(FALLBACK_GIF_FPS);

        Ok(Box::new(GifVideoSource {
            frames,
            pending: first,
            fps,
        }))
    }
}

struct GifVideoSource {
    frames: Frames<'static>,
    pending: Option<Frame>,
    fps: f64,
}

impl VideoSource for GifVideoSource {
    fn frame_rate(&self) -> f64 {
        self.fps
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>, DetectionError> {
        let frame = match self.pending.take() {
            Some(frame) => frame,
            None => match self.frames.next() {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => {
                    return Err(DetectionError::Decode(format!("corrupt video frame: {}", e)))
                }
                None => return Ok(None),
            },
        };
        Ok(Some(DynamicImage::ImageRgba8(frame.into_buffer()).to_rgb8()))
    }
}

// ============ Decomposer ============

pub struct VideoDecomposer {
    opener: Arc<dyn VideoOpener>,
}

impl VideoDecomposer {
    pub fn new(opener: Arc<dyn VideoOpener>) -> Self {
        Self { opener }
    }
}

impl MediaDecomposer for VideoDecomposer {
    fn decompose(
        &self,
        path: &Path,
        scope: &mut ResourceScope,
        options: &DetectOptions,
    ) -> Result<Vec<MediaUnit>, DetectionError> {
        let mut source = self.opener.open(path)?;

        let fps = source.frame_rate();
        if !fps.is_finite() || fps <= 0.0 {
            return Err(DetectionError::Decode(format!(
                "video {} reports unusable frame rate {}",
                path.display(),
                fps
            )));
        }

        let target = options.frames_per_second.max(1) as f64;
        let interval = ((fps / target).floor() as u64).max(1);
        debug!(path = %path.display(), fps, interval, "sampling video frames");

        let mut units: Vec<MediaUnit> = Vec::new();
        let mut frame_index: u64 = 0;
        while let Some(frame) = source.next_frame()? {
            if frame_index % interval == 0 {
                let artifact = scope.dir().join(format!("frame_{:06}.png", frame_index));
                frame.save(&artifact).map_err(|e| {
                    DetectionError::InvalidInput(format!(
                        "cannot persist frame artifact {}: {}",
                        artifact.display(),
                        e
                    ))
                })?;
                scope.register(artifact);

                let tensor = tensor_from_rgb(&frame, options.image_size);
                units.push(MediaUnit::Frame {
                    tensor,
                    ordinal: units.len(),
                });
            }
            frame_index += 1;
        }

        if units.is_empty() {
            return Err(DetectionError::EmptyMedia(format!(
                "no frames could be extracted from {}",
                path.display()
            )));
        }
        debug!(frames_seen = frame_index, units = units.len(), "video decomposed");
        Ok(units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::gif::GifEncoder;
    use image::{Delay, Rgba, RgbaImage};

    struct ScriptedSource {
        fps: f64,
        frames: std::vec::IntoIter<RgbImage>,
    }

    impl VideoSource for ScriptedSource {
        fn frame_rate(&self) -> f64 {
            self.fps
        }

        fn next_frame(&mut self) -> Result<Option<RgbImage>, DetectionError> {
            Ok(self.frames.next())
        }
    }

    struct ScriptedOpener {
        fps: f64,
        frame_count: usize,
    }

    impl VideoOpener for ScriptedOpener {
        fn open(&self, _path: &Path) -> Result<Box<dyn VideoSource>, DetectionError> {
            let frames: Vec<RgbImage> = (0..self.frame_count)
                .map(|i| RgbImage::from_pixel(4, 4, image::Rgb([i as u8, 0, 0])))
                .collect();
            Ok(Box::new(ScriptedSource {
                fps: self.fps,
                frames: frames.into_iter(),
            }))
        }
    }

    fn decompose_with(
        opener: ScriptedOpener,
        options: &DetectOptions,
    ) -> Result<Vec<MediaUnit>, DetectionError> {
        let dir = tempfile::tempdir().unwrap();
        let mut scope = ResourceScope::acquire_in(dir.path()).unwrap();
        VideoDecomposer::new(Arc::new(opener)).decompose(Path::new("scripted.mp4"), &mut scope, options)
    }

    #[test]
    fn test_interval_keeps_every_tenth_frame() {
        // 10 fps source sampled at 1 frame/s: only frame 0 of 10 survives.
        let options = DetectOptions::default();
        let units = decompose_with(ScriptedOpener { fps: 10.0, frame_count: 10 }, &options).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].ordinal(), 0);
    }

    #[test]
    fn test_interval_clamps_to_one() {
        // Source slower than the target rate keeps every frame.
        let mut options = DetectOptions::default();
        options.frames_per_second = 30;
        let units = decompose_with(ScriptedOpener { fps: 10.0, frame_count: 5 }, &options).unwrap();
        assert_eq!(units.len(), 5);
    }

    #[test]
    fn test_ordinals_are_contiguous() {
        let mut options = DetectOptions::default();
        options.frames_per_second = 5;
        // interval = floor(10 / 5) = 2 -> frames 0, 2, 4, 6 kept
        let units = decompose_with(ScriptedOpener { fps: 10.0, frame_count: 8 }, &options).unwrap();
        assert_eq!(units.len(), 4);
        for (i, unit) in units.iter().enumerate() {
            assert_eq!(unit.ordinal(), i);
        }
    }

    #[test]
    fn test_zero_fps_is_decode_error() {
        let options = DetectOptions::default();
        let err = decompose_with(ScriptedOpener { fps: 0.0, frame_count: 3 }, &options).unwrap_err();
        assert_eq!(err.kind(), "decode_error");
    }

    #[test]
    fn test_empty_stream_is_empty_media() {
        let options = DetectOptions::default();
        let err = decompose_with(ScriptedOpener { fps: 10.0, frame_count: 0 }, &options).unwrap_err();
        assert_eq!(err.kind(), "empty_media");
    }

    #[test]
    fn test_frame_artifacts_live_in_scope_until_release() {
        let dir = tempfile::tempdir().unwrap();
        let mut scope = ResourceScope::acquire_in(dir.path()).unwrap();
        let mut options = DetectOptions::default();
        options.frames_per_second = 10;

        let units = VideoDecomposer::new(Arc::new(ScriptedOpener { fps: 10.0, frame_count: 3 }))
            .decompose(Path::new("scripted.mp4"), &mut scope, &options)
            .unwrap();
        assert_eq!(units.len(), 3);
        let artifacts: Vec<_> = std::fs::read_dir(scope.dir()).unwrap().collect();
        assert_eq!(artifacts.len(), 3);

        let workspace = scope.dir().to_path_buf();
        scope.release();
        assert!(!workspace.exists());
    }

    #[test]
    fn test_gif_opener_probes_fps_and_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.gif");
        {
            let file = File::create(&path).unwrap();
            let mut encoder = GifEncoder::new(file);
            let frames = (0..4u8).map(|i| {
                Frame::from_parts(
                    RgbaImage::from_pixel(8, 8, Rgba([i * 60, 0, 0, 255])),
                    0,
                    0,
                    Delay::from_numer_denom_ms(100, 1),
                )
            });
            encoder.encode_frames(frames).unwrap();
        }

        let mut source = GifOpener.open(&path).unwrap();
        assert!((source.frame_rate() - 10.0).abs() < 0.5);
        let mut count = 0;
        while source.next_frame().unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 4);
    }

    #[test]
    fn test_gif_opener_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.gif");
        std::fs::write(&path, b"definitely not a gif").unwrap();
        let err = GifOpener.open(&path).unwrap_err();
        assert_eq!(err.kind(), "decode_error");
    }
}
