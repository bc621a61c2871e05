//! Rule-based diagnosis of synthesized speech.
//!
//! A fixed, ordered rule table maps a `FeatureSet` (plus optional linguistic
//! error data) to three category scores, paired highlight/suggestion lists,
//! and a LoRA fine-tuning recommendation. Diagnosis is a pure function of
//! its inputs: the same features always produce a bit-identical report.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VoxprepError};
use crate::features::FeatureSet;

/// Rule thresholds and recommendation gates. Explicit and serde-loadable;
/// `Default` carries the shipped rule table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosisThresholds {
    /// Clipping rate above which quality is penalised.
    pub clipping_threshold: f64,
    /// Spectral flatness above which quality is penalised.
    pub spectral_flatness_threshold: f64,
    /// Character error rate above which pronunciation is penalised.
    pub cer_threshold: f64,
    /// F0 range (Hz) below which intonation counts as flat.
    pub f0_range_threshold: f64,
    /// F0 jump (Hz) above which pitch movement counts as unnatural.
    pub f0_jump_threshold: f64,
    /// Longest tolerated mid-utterance silence, in seconds.
    pub max_silence_gap_threshold: f64,
    /// LoRA is recommended only when overall score falls below this…
    pub lora_score_gate: f64,
    /// …and the quality bucket falls below this.
    pub lora_quality_gate: f64,
}

impl Default for DiagnosisThresholds {
    fn default() -> Self {
        Self {
            clipping_threshold: 0.01,
            spectral_flatness_threshold: 0.1,
            cer_threshold: 0.05,
            f0_range_threshold: 50.0,
            f0_jump_threshold: 150.0,
            max_silence_gap_threshold: 1.0,
            lora_score_gate: 60.0,
            lora_quality_gate: 70.0,
        }
    }
}

/// Externally supplied transcription accuracy data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinguisticReport {
    /// Character error rate in [0, 1].
    pub cer: f64,
    /// Reference/hypothesis mismatches, free-form.
    pub mismatches: Vec<String>,
}

/// Per-category scores in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBuckets {
    pub quality: u32,
    pub pronunciation: u32,
    pub prosody: u32,
}

impl ScoreBuckets {
    fn full() -> Self {
        Self {
            quality: 100,
            pronunciation: 100,
            prosody: 100,
        }
    }
}

/// The diagnosis for one evaluated file. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisReport {
    pub overall_score: f64,
    pub buckets: ScoreBuckets,
    /// One entry per triggered rule, in rule order.
    pub highlights: Vec<String>,
    /// Paired 1:1 with `highlights`.
    pub suggestions: Vec<String>,
    pub lora_recommended: bool,
}

#[derive(Debug, Clone, Copy)]
enum Category {
    Quality,
    Pronunciation,
    Prosody,
}

/// One triggered rule: where the penalty lands and what to tell the user.
struct Trigger {
    category: Category,
    penalty: u32,
    highlight: String,
    suggestion: &'static str,
}

/// Diagnose `features`, optionally informed by transcription accuracy.
///
/// Missing linguistic data defaults to a clean transcript (`cer = 0`).
///
/// # Errors
/// Returns `VoxprepError::MalformedFeatures` when any scalar field is
/// non-finite; that set did not come from `analyze` and must not be scored.
pub fn diagnose(
    features: &FeatureSet,
    linguistic: Option<&LinguisticReport>,
    thresholds: &DiagnosisThresholds,
) -> Result<DiagnosisReport> {
    if !features.is_finite() {
        return Err(VoxprepError::MalformedFeatures(
            "non-finite scalar field".into(),
        ));
    }

    let default_linguistic = LinguisticReport::default();
    let linguistic = linguistic.unwrap_or(&default_linguistic);

    let triggers = evaluate_rules(features, linguistic, thresholds);

    let (buckets, highlights, suggestions) = triggers.into_iter().fold(
        (ScoreBuckets::full(), Vec::new(), Vec::new()),
        |(buckets, mut highlights, mut suggestions), t| {
            // Scores clamp at zero rather than going negative.
            let buckets = match t.category {
                Category::Quality => ScoreBuckets {
                    quality: buckets.quality.saturating_sub(t.penalty),
                    ..buckets
                },
                Category::Pronunciation => ScoreBuckets {
                    pronunciation: buckets.pronunciation.saturating_sub(t.penalty),
                    ..buckets
                },
                Category::Prosody => ScoreBuckets {
                    prosody: buckets.prosody.saturating_sub(t.penalty),
                    ..buckets
                },
            };
            highlights.push(t.highlight);
            suggestions.push(t.suggestion.to_string());
            (buckets, highlights, suggestions)
        },
    );

    let overall_score = round1(
        (buckets.quality + buckets.pronunciation + buckets.prosody) as f64 / 3.0,
    );
    let lora_recommended = overall_score < thresholds.lora_score_gate
        && (buckets.quality as f64) < thresholds.lora_quality_gate;

    Ok(DiagnosisReport {
        overall_score,
        buckets,
        highlights,
        suggestions,
        lora_recommended,
    })
}

/// The fixed rule table, in evaluation order. Order determines the order of
/// highlights and suggestions in the report.
fn evaluate_rules(
    features: &FeatureSet,
    linguistic: &LinguisticReport,
    t: &DiagnosisThresholds,
) -> Vec<Trigger> {
    let q = &features.quality;
    let p = &features.prosody;
    let max_silence = p.silence_durations.iter().copied().fold(0.0, f64::max);

    let rules = [
        (
            q.clipping_rate > t.clipping_threshold,
            Category::Quality,
            30,
            "Clipping detected (audio level too high)".to_string(),
            "Reduce output gain or check vocoder scaling",
        ),
        (
            q.spectral_flatness > t.spectral_flatness_threshold,
            Category::Quality,
            20,
            "High spectral flatness (metallic or noisy sound)".to_string(),
            "Check vocoder compatibility or increase diffusion steps",
        ),
        (
            linguistic.cer > t.cer_threshold,
            Category::Pronunciation,
            40,
            format!("High character error rate ({:.2}%)", linguistic.cer * 100.0),
            "Check G2P/accent dictionary or training data quality",
        ),
        (
            p.f0_range < t.f0_range_threshold,
            Category::Prosody,
            20,
            "Flat intonation (narrow F0 range)".to_string(),
            "Increase F0 scale or check emotion embedding",
        ),
        (
            p.f0_jump_max > t.f0_jump_threshold,
            Category::Prosody,
            25,
            "Unnatural pitch jump detected".to_string(),
            "Decrease temperature or check for alignment instability",
        ),
        (
            max_silence > t.max_silence_gap_threshold,
            Category::Prosody,
            15,
            format!("Long silence detected ({max_silence:.2}s)"),
            "Adjust end-of-sentence silence parameters or trim padding",
        ),
    ];

    rules
        .into_iter()
        .filter(|(hit, ..)| *hit)
        .map(|(_, category, penalty, highlight, suggestion)| Trigger {
            category,
            penalty,
            highlight,
            suggestion,
        })
        .collect()
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
