// Audio Decomposition
// Decodes the leading analysis window of an audio file to mono PCM, resamples
// it to the analysis rate, and renders one mel spectrogram unit:
// 128 mel bands x 216 time steps, dB-scaled against the peak band, zero-padded
// on the right when the clip is shorter than the window, then min-max
// normalized into [0, 1].

use std::fs::File;
use std::path::Path;

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::FromSample;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use crate::error::DetectionError;
use crate::models::{DetectOptions, MediaUnit, SpectrogramTensor};
use crate::services::media::MediaDecomposer;
use crate::services::resource_scope::ResourceScope;

/// Spectrogram geometry the classifier was trained against.
pub const MEL_BANDS: usize = 128;
pub const SPEC_STEPS: usize = 216;

const FMAX_HZ: f64 = 8000.0;
const N_FFT: usize = 2048;
const HOP: usize = 512;
const POWER_FLOOR: f64 = 1e-10;
const DB_FLOOR: f64 = -80.0;

pub struct AudioDecomposer;

impl MediaDecomposer for AudioDecomposer {
    fn decompose(
        &self,
        path: &Path,
        _scope: &mut ResourceScope,
        options: &DetectOptions,
    ) -> Result<Vec<MediaUnit>, DetectionError> {
        let (native, native_rate) =
            decode_leading_window(path, options.analysis_duration_seconds)?;
        if native.is_empty() {
            return Err(DetectionError::EmptyMedia(format!(
                "no audio samples in {}",
                path.display()
            )));
        }

        let mut samples = resample_mono(native, native_rate, options.sample_rate_hz)?;
        let window_len =
            (options.analysis_duration_seconds * options.sample_rate_hz as f64) as usize;
        samples.truncate(window_len);

        let tensor = mel_spectrogram(&samples, options.sample_rate_hz);
        debug!(
            path = %path.display(),
            samples = samples.len(),
            bands = tensor.bands,
            steps = tensor.steps,
            "audio decomposed"
        );
        Ok(vec![MediaUnit::Spectrogram { tensor, ordinal: 0 }])
    }
}

/// Decode up to `duration_seconds` of mono PCM from the start of the file.
/// Returns the samples together with the stream's native sample rate.
pub fn decode_leading_window(
    path: &Path,
    duration_seconds: f64,
) -> Result<(Vec<f32>, u32), DetectionError> {
    let file = File::open(path).map_err(|e| {
        DetectionError::Decode(format!("cannot open audio {}: {}", path.display(), e))
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| {
            DetectionError::Decode(format!("cannot probe audio {}: {}", path.display(), e))
        })?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| {
            DetectionError::Decode(format!("no audio track in {}", path.display()))
        })?;
    let track_id = track.id;
    let sample_rate = track.codec_params.sample_rate.ok_or_else(|| {
        DetectionError::Decode(format!("unknown sample rate in {}", path.display()))
    })?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| {
            DetectionError::Decode(format!("no decoder for {}: {}", path.display(), e))
        })?;

    let window_len = (duration_seconds * sample_rate as f64) as usize;
    let mut samples: Vec<f32> = Vec::with_capacity(window_len);

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                return Err(DetectionError::Decode(format!(
                    "cannot read packet from {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder.decode(&packet).map_err(|e| {
            DetectionError::Decode(format!("cannot decode packet in {}: {}", path.display(), e))
        })?;
        samples.extend(mono_from_buffer(&decoded));

        if samples.len() >= window_len {
            break;
        }
    }

    samples.truncate(window_len);
    Ok((samples, sample_rate))
}

/// Mix a decoded buffer down to mono f32, averaging channels per frame.
fn mono_from_buffer(decoded: &AudioBufferRef) -> Vec<f32> {
    macro_rules! mixdown {
        ($buf:expr) => {{
            let channels = $buf.spec().channels.count();
            let frames = $buf.frames();
            let mut mono = Vec::with_capacity(frames);
            for frame in 0..frames {
                let mut sum = 0.0f32;
                for ch in 0..channels {
                    sum += f32::from_sample($buf.chan(ch)[frame]);
                }
                mono.push(sum / channels as f32);
            }
            mono
        }};
    }

    match decoded {
        AudioBufferRef::U8(buf) => mixdown!(buf),
        AudioBufferRef::U16(buf) => mixdown!(buf),
        AudioBufferRef::U24(buf) => mixdown!(buf),
        AudioBufferRef::U32(buf) => mixdown!(buf),
        AudioBufferRef::S8(buf) => mixdown!(buf),
        AudioBufferRef::S16(buf) => mixdown!(buf),
        AudioBufferRef::S24(buf) => mixdown!(buf),
        AudioBufferRef::S32(buf) => mixdown!(buf),
        AudioBufferRef::F32(buf) => mixdown!(buf),
        AudioBufferRef::F64(buf) => mixdown!(buf),
    }
}

/// Resample mono PCM to the target rate with sinc interpolation. A no-op when
/// the rates already match.
fn resample_mono(samples: Vec<f32>, from_hz: u32, to_hz: u32) -> Result<Vec<f32>, DetectionError> {
    if from_hz == to_hz || samples.is_empty() {
        return Ok(samples);
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = to_hz as f64 / from_hz as f64;
    let mut resampler = SincFixedIn::<f32>::new(ratio, 16.0, params, samples.len(), 1)
        .map_err(|e| DetectionError::Decode(format!("cannot build resampler: {}", e)))?;

    let mut output = resampler
        .process(&[samples], None)
        .map_err(|e| DetectionError::Decode(format!("resampling failed: {}", e)))?;
    Ok(output.swap_remove(0))
}

/// Render a mono PCM window into a normalized mel spectrogram.
///
/// Frames are centered (the signal is zero-padded by half an FFT on each
/// side), Hann-windowed and transformed; power is pooled into triangular mel
/// filters up to 8 kHz, converted to dB relative to the peak with an -80 dB
/// floor, padded or truncated to the fixed step count, then min-max
/// normalized over the whole matrix.
pub fn mel_spectrogram(samples: &[f32], sample_rate: u32) -> SpectrogramTensor {
    let half = N_FFT / 2;
    let mut padded = vec![0.0f32; samples.len() + N_FFT];
    padded[half..half + samples.len()].copy_from_slice(samples);

    let num_frames = 1 + samples.len() / HOP;
    let window: Vec<f32> = (0..N_FFT)
        .map(|i| {
            let phase = 2.0 * std::f64::consts::PI * i as f64 / N_FFT as f64;
            (0.5 - 0.5 * phase.cos()) as f32
        })
        .collect();

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(N_FFT);
    let filters = mel_filterbank(sample_rate, N_FFT, MEL_BANDS, FMAX_HZ);

    // Mel power per (band, frame)
    let mut power = vec![0.0f64; MEL_BANDS * num_frames];
    let mut buffer = vec![Complex::new(0.0f32, 0.0f32); N_FFT];
    let n_bins = N_FFT / 2 + 1;
    let mut bins = vec![0.0f32; n_bins];

    for t in 0..num_frames {
        let start = t * HOP;
        for i in 0..N_FFT {
            buffer[i] = Complex::new(padded[start + i] * window[i], 0.0);
        }
        fft.process(&mut buffer);
        for (k, bin) in bins.iter_mut().enumerate() {
            *bin = buffer[k].norm_sqr();
        }
        for (b, filter) in filters.iter().enumerate() {
            let mut acc = 0.0f64;
            for (k, &w) in filter.iter().enumerate() {
                if w > 0.0 {
                    acc += (w * bins[k]) as f64;
                }
            }
            power[b * num_frames + t] = acc;
        }
    }

    // dB relative to the loudest cell, floored at -80
    let reference = power.iter().cloned().fold(POWER_FLOOR, f64::max);
    let db: Vec<f64> = power
        .iter()
        .map(|&p| (10.0 * (p.max(POWER_FLOOR) / reference).log10()).max(DB_FLOOR))
        .collect();

    // Fixed-width matrix: pad short clips on the right, drop surplus frames
    let mut data = vec![0.0f32; MEL_BANDS * SPEC_STEPS];
    for b in 0..MEL_BANDS {
        for t in 0..SPEC_STEPS.min(num_frames) {
            data[b * SPEC_STEPS + t] = db[b * num_frames + t] as f32;
        }
    }

    let min = data.iter().cloned().fold(f32::INFINITY, f32::min);
    let max = data.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;
    if range > 1e-8 {
        for v in data.iter_mut() {
            *v = (*v - min) / range;
        }
    } else {
        data.fill(0.0);
    }

    SpectrogramTensor {
        bands: MEL_BANDS,
        steps: SPEC_STEPS,
        data,
    }
}

fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10.0f64.powf(mel / 2595.0) - 1.0)
}

/// Triangular mel filterbank over FFT power bins, 0 Hz up to `fmax` (capped
/// at Nyquist).
fn mel_filterbank(sample_rate: u32, n_fft: usize, bands: usize, fmax: f64) -> Vec<Vec<f32>> {
    let fmax = fmax.min(sample_rate as f64 / 2.0);
    let mel_max = hz_to_mel(fmax);
    let edges: Vec<f64> = (0..bands + 2)
        .map(|i| mel_to_hz(mel_max * i as f64 / (bands + 1) as f64))
        .collect();

    let n_bins = n_fft / 2 + 1;
    let bin_hz = sample_rate as f64 / n_fft as f64;
    let mut filters = vec![vec![0.0f32; n_bins]; bands];
    for b in 0..bands {
        let (lo, mid, hi) = (edges[b], edges[b + 1], edges[b + 2]);
        for k in 0..n_bins {
            let f = k as f64 * bin_hz;
            let rising = if mid > lo { (f - lo) / (mid - lo) } else { 0.0 };
            let falling = if hi > mid { (hi - f) / (hi - mid) } else { 0.0 };
            let weight = rising.min(falling).max(0.0);
            filters[b][k] = weight as f32;
        }
    }
    filters
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(rate: u32, seconds: f64, freq: f32) -> Vec<f32> {
        let len = (rate as f64 * seconds) as usize;
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin() * 0.5)
            .collect()
    }

    fn write_wav(path: &Path, rate: u32, channels: u16, samples: &[f32]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_full_window_fills_every_step() {
        // 5 s at 22050 Hz gives exactly 1 + 110250/512 = 216 frames.
        let tensor = mel_spectrogram(&sine(22050, 5.0, 440.0), 22050);
        assert_eq!(tensor.bands, MEL_BANDS);
        assert_eq!(tensor.steps, SPEC_STEPS);
        assert!(tensor.data.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_short_clip_is_right_padded() {
        let tensor = mel_spectrogram(&sine(22050, 1.0, 440.0), 22050);
        assert_eq!(tensor.bands, MEL_BANDS);
        assert_eq!(tensor.steps, SPEC_STEPS);
        // The signal occupies 1 + 22050/512 = 44 frames; a tonal column near
        // the start must differ from the padded tail.
        let lead = tensor.at(20, 10);
        let tail = tensor.at(20, SPEC_STEPS - 1);
        assert!((lead - tail).abs() > 1e-6);
    }

    #[test]
    fn test_silence_normalizes_to_zero() {
        let tensor = mel_spectrogram(&vec![0.0f32; 22050], 22050);
        assert!(tensor.data.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_decode_leading_window_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path, 44100, 1, &sine(44100, 2.0, 440.0));

        let (samples, rate) = decode_leading_window(&path, 1.0).unwrap();
        assert_eq!(rate, 44100);
        assert_eq!(samples.len(), 44100);
    }

    #[test]
    fn test_stereo_mixes_to_mono() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        // Interleave L/R with opposite signs; the mixdown cancels to silence.
        let mono = sine(22050, 0.5, 440.0);
        let mut interleaved = Vec::with_capacity(mono.len() * 2);
        for &s in &mono {
            interleaved.push(s);
            interleaved.push(-s);
        }
        write_wav(&path, 22050, 2, &interleaved);

        let (samples, _) = decode_leading_window(&path, 1.0).unwrap();
        assert!(samples.iter().all(|&s| s.abs() < 1e-3));
    }

    #[test]
    fn test_decompose_yields_single_spectrogram_unit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        write_wav(&path, 22050, 1, &sine(22050, 1.0, 880.0));

        let mut scope = ResourceScope::acquire_in(dir.path()).unwrap();
        let options = DetectOptions::default();
        let units = AudioDecomposer.decompose(&path, &mut scope, &options).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].ordinal(), 0);
        match &units[0] {
            MediaUnit::Spectrogram { tensor, .. } => {
                assert_eq!(tensor.bands, MEL_BANDS);
                assert_eq!(tensor.steps, SPEC_STEPS);
            }
            other => panic!("expected spectrogram unit, got {:?}", other),
        }
    }

    #[test]
    fn test_resampled_decompose_matches_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hires.wav");
        write_wav(&path, 44100, 1, &sine(44100, 1.0, 440.0));

        let mut scope = ResourceScope::acquire_in(dir.path()).unwrap();
        let options = DetectOptions::default();
        let units = AudioDecomposer.decompose(&path, &mut scope, &options).unwrap();
        match &units[0] {
            MediaUnit::Spectrogram { tensor, .. } => {
                assert_eq!(tensor.bands, MEL_BANDS);
                assert_eq!(tensor.steps, SPEC_STEPS);
            }
            other => panic!("expected spectrogram unit, got {:?}", other),
        }
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.mp3");
        std::fs::write(&path, b"this is not audio").unwrap();
        let err = decode_leading_window(&path, 5.0).unwrap_err();
        assert_eq!(err.kind(), "decode_error");
    }

    #[test]
    fn test_zero_sample_file_is_empty_media() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.wav");
        write_wav(&path, 22050, 1, &[]);

        let mut scope = ResourceScope::acquire_in(dir.path()).unwrap();
        let options = DetectOptions::default();
        let err = AudioDecomposer
            .decompose(&path, &mut scope, &options)
            .unwrap_err();
        assert_eq!(err.kind(), "empty_media");
    }
}
