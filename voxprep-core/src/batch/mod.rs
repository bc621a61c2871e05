//! Batch evaluation: per-file pipelines fanned out over a worker pool, then
//! aggregated into a ranked go/no-go summary per model.

pub mod runner;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::audio::AudioSource;
use crate::diagnose::{diagnose, DiagnosisReport, DiagnosisThresholds};
use crate::error::Result;
use crate::features::analyze;

pub use runner::{BatchOutcome, BatchRunner, CancelHandle};

/// One successfully evaluated file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEvaluation {
    pub file: String,
    pub model: String,
    /// Representative physical statistic for the detail table.
    pub rms: f64,
    pub report: DiagnosisReport,
}

/// Go/no-go classification of a model's mean score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    ContinueTraining,
    EvaluateLora,
    ReconsiderStructure,
}

impl Verdict {
    pub fn for_mean(mean: f64) -> Self {
        if mean > 75.0 {
            Verdict::ContinueTraining
        } else if mean > 60.0 {
            Verdict::EvaluateLora
        } else {
            Verdict::ReconsiderStructure
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Verdict::ContinueTraining => "continue training",
            Verdict::EvaluateLora => "evaluate LoRA",
            Verdict::ReconsiderStructure => "reconsider structure",
        };
        f.write_str(label)
    }
}

/// Mean score and verdict for one model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSummary {
    pub model: String,
    pub samples: usize,
    pub mean_score: f64,
    pub verdict: Verdict,
}

/// One row of the per-file detail table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailRow {
    pub file: String,
    pub model: String,
    pub score: f64,
    pub rms: f64,
    pub lora_recommended: bool,
}

/// Ranked batch result: models ordered by descending mean score, detail rows
/// ordered by descending file score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedSummary {
    pub models: Vec<ModelSummary>,
    pub details: Vec<DetailRow>,
    pub evaluated: usize,
    pub failed: usize,
}

/// Derive the model identity from a file name: the stem's prefix before the
/// first `-` (`xtts-epoch3-004.wav` → `xtts`).
pub fn model_for_file(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    stem.split('-').next().unwrap_or_default().to_string()
}

/// Run the evaluation pipeline (load → analyze → diagnose) for one file.
///
/// Batch runs carry no transcription data, so the linguistic report defaults
/// to a clean transcript.
pub fn evaluate_file(
    source: &dyn AudioSource,
    path: &Path,
    thresholds: &DiagnosisThresholds,
) -> Result<FileEvaluation> {
    let buffer = source.load(path)?;
    let features = analyze(&buffer);
    let report = diagnose(&features, None, thresholds)?;

    Ok(FileEvaluation {
        file: path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
        model: model_for_file(path),
        rms: features.physical.rms,
        report,
    })
}

/// Group evaluations by model and rank them.
///
/// Failed files never reach this function; they are excluded upstream and
/// carried through as a count so reports can surface them.
pub fn aggregate(evaluations: &[FileEvaluation], failed: usize) -> RankedSummary {
    let mut grouped: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for eval in evaluations {
        grouped
            .entry(eval.model.as_str())
            .or_default()
            .push(eval.report.overall_score);
    }

    let mut models: Vec<ModelSummary> = grouped
        .into_iter()
        .map(|(model, scores)| {
            let mean_score = scores.iter().sum::<f64>() / scores.len() as f64;
            ModelSummary {
                model: model.to_string(),
                samples: scores.len(),
                mean_score,
                verdict: Verdict::for_mean(mean_score),
            }
        })
        .collect();
    models.sort_by(|a, b| {
        b.mean_score
            .total_cmp(&a.mean_score)
            .then_with(|| a.model.cmp(&b.model))
    });

    let mut details: Vec<DetailRow> = evaluations
        .iter()
        .map(|e| DetailRow {
            file: e.file.clone(),
            model: e.model.clone(),
            score: e.report.overall_score,
            rms: e.rms,
            lora_recommended: e.report.lora_recommended,
        })
        .collect();
    details.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.file.cmp(&b.file)));

    RankedSummary {
        models,
        details,
        evaluated: evaluations.len(),
        failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnose::ScoreBuckets;

    fn eval(file: &str, model: &str, score: f64) -> FileEvaluation {
        FileEvaluation {
            file: file.to_string(),
            model: model.to_string(),
            rms: 0.12,
            report: DiagnosisReport {
                overall_score: score,
                buckets: ScoreBuckets {
                    quality: 100,
                    pronunciation: 100,
                    prosody: 100,
                },
                highlights: Vec::new(),
                suggestions: Vec::new(),
                lora_recommended: false,
            },
        }
    }

    #[test]
    fn verdict_bands() {
        assert_eq!(Verdict::for_mean(80.0), Verdict::ContinueTraining);
        assert_eq!(Verdict::for_mean(75.0), Verdict::EvaluateLora);
        assert_eq!(Verdict::for_mean(60.5), Verdict::EvaluateLora);
        assert_eq!(Verdict::for_mean(60.0), Verdict::ReconsiderStructure);
        assert_eq!(Verdict::for_mean(42.0), Verdict::ReconsiderStructure);
    }

    #[test]
    fn models_are_ranked_by_descending_mean() {
        let evals = vec![
            eval("a-1.wav", "alpha", 50.0),
            eval("a-2.wav", "alpha", 70.0),
            eval("b-1.wav", "beta", 90.0),
            eval("b-2.wav", "beta", 80.0),
        ];
        let summary = aggregate(&evals, 0);

        assert_eq!(summary.models.len(), 2);
        assert_eq!(summary.models[0].model, "beta");
        assert_eq!(summary.models[0].mean_score, 85.0);
        assert_eq!(summary.models[0].verdict, Verdict::ContinueTraining);
        assert_eq!(summary.models[1].model, "alpha");
        assert_eq!(summary.models[1].mean_score, 60.0);
        assert_eq!(summary.models[1].verdict, Verdict::ReconsiderStructure);
    }

    #[test]
    fn details_are_ranked_by_descending_score() {
        let evals = vec![
            eval("a.wav", "m", 50.0),
            eval("b.wav", "m", 90.0),
            eval("c.wav", "m", 70.0),
        ];
        let summary = aggregate(&evals, 0);
        let order: Vec<&str> = summary.details.iter().map(|d| d.file.as_str()).collect();
        assert_eq!(order, vec!["b.wav", "c.wav", "a.wav"]);
    }

    #[test]
    fn failed_files_do_not_skew_statistics() {
        let evals = vec![eval("a-1.wav", "alpha", 80.0)];
        let summary = aggregate(&evals, 3);
        assert_eq!(summary.evaluated, 1);
        assert_eq!(summary.failed, 3);
        assert_eq!(summary.models[0].mean_score, 80.0);
    }

    #[test]
    fn model_name_comes_from_stem_prefix() {
        assert_eq!(model_for_file(Path::new("xtts-epoch3-004.wav")), "xtts");
        assert_eq!(model_for_file(Path::new("/tmp/fish-a.wav")), "fish");
        assert_eq!(model_for_file(Path::new("plain.wav")), "plain");
    }
}
