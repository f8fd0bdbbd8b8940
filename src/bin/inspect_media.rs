// Developer utility: run the detection pipeline over one media file with a
// fixed-score classifier and dump the aggregate verdict. Useful for eyeballing
// decomposition behavior (frame sampling, spectrogram geometry) without a
// real model wired in.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use deepsift::services::classifier::FixedScoreClassifier;
use deepsift::services::config_store::ConfigStore;
use deepsift::{Detector, MediaKind};

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

fn kind_from_extension(path: &Path) -> Option<MediaKind> {
    match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
        "png" | "jpg" | "jpeg" | "bmp" | "webp" => Some(MediaKind::Image),
        "gif" | "mp4" | "avi" | "mov" | "mkv" => Some(MediaKind::Video),
        "wav" | "mp3" | "flac" | "ogg" | "m4a" => Some(MediaKind::Audio),
        _ => None,
    }
}

fn main() -> Result<()> {
    deepsift::init_logging();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 || has_flag(&args, "--help") {
        eprintln!(
            "Usage:\n  cargo run --bin inspect_media -- <media_path> [--kind image|video|audio] [--score <0..1>] [--fps <n>] [--out <json_path>]\n\nNotes:\n  - Media kind is inferred from the file extension unless --kind is given.\n  - --score sets the stub classifier's fake probability (default 0.5)."
        );
        return Ok(());
    }

    let path = PathBuf::from(&args[1]);
    let kind = match parse_arg_value(&args, "--kind") {
        Some(k) => match k.as_str() {
            "image" => MediaKind::Image,
            "video" => MediaKind::Video,
            "audio" => MediaKind::Audio,
            other => bail!("unknown media kind: {}", other),
        },
        None => kind_from_extension(&path)
            .context("cannot infer media kind from extension, pass --kind")?,
    };
    let score: f64 = parse_arg_value(&args, "--score")
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.5);
    let out_path = parse_arg_value(&args, "--out");

    let mut options = ConfigStore::default_config_dir()
        .map(|dir| ConfigStore::new(dir).detection_defaults())
        .unwrap_or_default();
    if let Some(fps) = parse_arg_value(&args, "--fps").and_then(|s| s.parse().ok()) {
        options.frames_per_second = fps;
    }

    let detector = Detector::new(Arc::new(FixedScoreClassifier::new(score)));
    let result = detector
        .detect(&path, kind, &options)
        .with_context(|| format!("detection failed for {}", path.display()))?;

    println!("File: {}", path.display());
    println!("Kind: {}", kind.as_str());
    println!("Verdict: {}", if result.is_fake { "FAKE" } else { "authentic" });
    println!("Confidence: {:.4}", result.confidence);
    if let Some(ratio) = result.fake_unit_ratio {
        println!("Fake unit ratio: {:.4}", ratio);
    }
    println!("Units analyzed: {}", result.units_analyzed);
    for unit in &result.per_unit {
        println!(
            "[U{:04}] raw={:.4} fake={} confidence={:.4}",
            unit.ordinal, unit.raw_score, unit.is_fake, unit.confidence
        );
    }

    if let Some(out_path) = out_path {
        let json = serde_json::to_string_pretty(&result)?;
        std::fs::write(&out_path, json)
            .with_context(|| format!("write out failed: {}", out_path))?;
        println!();
        println!("Wrote JSON: {}", out_path);
    }

    Ok(())
}
