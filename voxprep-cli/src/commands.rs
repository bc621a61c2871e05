//! Subcommand implementations.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{info, warn};

use voxprep_core::{
    aggregate, analyze, diagnose, evaluate_file, segment, AudioSource, BatchRunner, ClipWriter,
    LinguisticReport, SegmentStats, WavSource,
};

use crate::config::AppConfig;
use crate::report;

/// Collect every `.wav` under `dir`, recursively, sorted for determinism.
fn collect_wavs(dir: &Path, out: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            collect_wavs(&path, out)?;
            continue;
        }
        let is_wav = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.eq_ignore_ascii_case("wav"))
            .unwrap_or(false);
        if is_wav {
            out.push(path);
        }
    }
    Ok(())
}

fn inputs_for(input: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if input.is_dir() {
        let mut files = Vec::new();
        collect_wavs(input, &mut files)?;
        files.sort();
        anyhow::ensure!(!files.is_empty(), "no .wav files under {}", input.display());
        Ok(files)
    } else {
        Ok(vec![input.to_path_buf()])
    }
}

fn write_or_print(json: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, json)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// `voxprep segment`: split recordings into training clips.
pub fn segment_cmd(input: &Path, out_dir: &Path, config: &AppConfig) -> anyhow::Result<()> {
    let source = WavSource::native();
    let mut total_clips = 0usize;
    let mut total_dropped = 0usize;
    let mut failed = 0usize;

    for file in inputs_for(input)? {
        let result = (|| -> anyhow::Result<(usize, usize)> {
            let buffer = source.load(&file)?;
            let segmentation = segment(&buffer, &config.segmenter)?;
            let writer = ClipWriter::new(out_dir, &file)?;
            for (index, clip) in segmentation.clips.iter().enumerate() {
                writer.write(&buffer, clip.range(), index)?;
            }
            let stats = SegmentStats::new(&segmentation, &buffer);
            info!(
                file = %file.display(),
                kept_secs = format_args!("{:.1}", stats.kept_secs),
                removed_secs = format_args!("{:.1}", stats.silence_removed_secs),
                "segmented"
            );
            Ok((segmentation.clips.len(), segmentation.dropped))
        })();

        match result {
            Ok((clips, dropped)) => {
                println!(
                    "{}: {} clip(s), {} dropped",
                    file.display(),
                    clips,
                    dropped
                );
                total_clips += clips;
                total_dropped += dropped;
            }
            Err(e) => {
                warn!(file = %file.display(), "segmentation failed: {e:#}");
                failed += 1;
            }
        }
    }

    println!(
        "done: {total_clips} clip(s) in {}, {total_dropped} dropped, {failed} file(s) failed",
        out_dir.display()
    );
    Ok(())
}

/// `voxprep analyze`: feature extraction for one file.
pub fn analyze_cmd(
    input: &Path,
    output: Option<&Path>,
    config: &AppConfig,
) -> anyhow::Result<()> {
    let buffer = WavSource::at_rate(config.analysis_sample_rate).load(input)?;
    let features = analyze(&buffer);
    let json = serde_json::to_string_pretty(&features)?;
    write_or_print(&json, output)
}

/// `voxprep diagnose`: score one synthesized sample.
pub fn diagnose_cmd(
    input: &Path,
    cer: Option<f64>,
    output: Option<&Path>,
    config: &AppConfig,
) -> anyhow::Result<()> {
    let buffer = WavSource::at_rate(config.analysis_sample_rate).load(input)?;
    let features = analyze(&buffer);
    let linguistic = cer.map(|cer| LinguisticReport {
        cer,
        mismatches: Vec::new(),
    });
    let report = diagnose(&features, linguistic.as_ref(), &config.thresholds)?;
    let json = serde_json::to_string_pretty(&report)?;
    write_or_print(&json, output)
}

/// `voxprep batch`: evaluate a directory of synthesized samples.
pub fn batch_cmd(
    dir: &Path,
    jobs: Option<usize>,
    output: Option<&Path>,
    summary_path: Option<&Path>,
    details_path: Option<&Path>,
    config: &AppConfig,
) -> anyhow::Result<()> {
    let files = inputs_for(dir)?;
    let total = files.len();
    info!(total, "starting batch evaluation");

    let source = WavSource::at_rate(config.analysis_sample_rate);
    let thresholds = config.thresholds.clone();
    let runner = BatchRunner::new(jobs.unwrap_or(config.jobs));
    let outcome = runner.run(files, |path| evaluate_file(&source, path, &thresholds));

    let summary = aggregate(&outcome.completed, outcome.failed);

    print!("{}", report::render_summary(&summary));
    if let Some(path) = summary_path {
        std::fs::write(path, report::render_summary(&summary))?;
        println!("wrote {}", path.display());
    }
    if let Some(path) = details_path {
        std::fs::write(path, report::render_details(&summary))?;
        println!("wrote {}", path.display());
    }
    if let Some(path) = output {
        write_or_print(&serde_json::to_string_pretty(&summary)?, Some(path))?;
    }

    println!(
        "processed {}/{} file(s), {} failed, {} skipped",
        summary.evaluated, total, outcome.failed, outcome.skipped
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, samples: &[f32], rate: u32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer
                .write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                .unwrap();
        }
        writer.finalize().unwrap();
    }

    fn tone(rate: u32, secs: f64) -> Vec<f32> {
        let n = (secs * rate as f64) as usize;
        (0..n)
            .map(|i| {
                ((2.0 * std::f64::consts::PI * 220.0 * i as f64 / rate as f64).sin() * 0.4) as f32
            })
            .collect()
    }

    #[test]
    fn segment_cmd_writes_numbered_clips() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("talk.wav");
        let out_dir = dir.path().join("clips");

        // Two utterances around a 2 s pause, 8 s each at 8 kHz.
        let mut samples = tone(8_000, 8.0);
        samples.extend(vec![0.0f32; 16_000]);
        samples.extend(tone(8_000, 8.0));
        write_wav(&input, &samples, 8_000);

        let mut config = AppConfig::default();
        config.segmenter.max_duration_s = 9.0;
        segment_cmd(&input, &out_dir, &config).unwrap();

        let mut names: Vec<String> = std::fs::read_dir(&out_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["talk_00000.wav", "talk_00001.wav"]);
    }

    #[test]
    fn analyze_cmd_writes_feature_json() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("sample.wav");
        let output = dir.path().join("features.json");
        write_wav(&input, &tone(24_000, 1.0), 24_000);

        analyze_cmd(&input, Some(&output), &AppConfig::default()).unwrap();

        let raw = std::fs::read_to_string(&output).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value["quality"]["clipping_rate"].is_number());
        assert!(value["prosody"]["total_duration"].is_number());
    }

    #[test]
    fn batch_cmd_rejects_an_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = batch_cmd(dir.path(), None, None, None, None, &AppConfig::default())
            .unwrap_err();
        assert!(err.to_string().contains("no .wav files"), "{err:#}");
    }
}
