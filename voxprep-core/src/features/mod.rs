//! Quality and prosody feature extraction.
//!
//! `analyze` is a pure function of the buffer: no side effects, no hidden
//! state, and it never fails: inputs too short for a spectral window or
//! without any voiced frame produce explicit zeros instead of NaN.

mod pitch;
mod spectral;

use serde::{Deserialize, Serialize};

use crate::audio::AudioBuffer;

/// Samples at or above this absolute amplitude count as clipped.
const CLIP_AMPLITUDE: f32 = 0.99;

/// Frames within this many dB of the loudest frame count as voiced when
/// building silence intervals.
const TOP_DB: f64 = 30.0;

/// Signal-quality metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityFeatures {
    /// Fraction of samples at full scale, in [0, 1].
    pub clipping_rate: f64,
    /// Signal-to-noise estimate in dB (10th-percentile noise floor).
    pub snr_db: f64,
    /// Mean spectral flatness in [0, 1]; near 1 is noise-like.
    pub spectral_flatness: f64,
}

/// Pitch and rhythm metrics. F0 statistics cover voiced frames only and are
/// 0 when no voiced frame exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProsodyFeatures {
    pub f0_mean: f64,
    pub f0_std: f64,
    /// Max - min of voiced f0 estimates, in Hz.
    pub f0_range: f64,
    /// Largest |Δf0| between consecutive voiced frames, in Hz.
    pub f0_jump_max: f64,
    /// Gaps before and between voiced intervals, in seconds.
    pub silence_durations: Vec<f64>,
    /// Buffer length in seconds.
    pub total_duration: f64,
}

/// Raw level statistics, reported alongside scores in batch detail tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalStats {
    pub mean_amplitude: f64,
    pub max_amplitude: f64,
    pub rms: f64,
}

/// Everything the diagnostician needs about one buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub quality: QualityFeatures,
    pub prosody: ProsodyFeatures,
    pub physical: PhysicalStats,
}

impl FeatureSet {
    /// True when every scalar field is finite. A non-finite field means the
    /// set was built by hand or corrupted in transit, not by `analyze`.
    pub fn is_finite(&self) -> bool {
        let q = &self.quality;
        let p = &self.prosody;
        let ph = &self.physical;
        [
            q.clipping_rate,
            q.snr_db,
            q.spectral_flatness,
            p.f0_mean,
            p.f0_std,
            p.f0_range,
            p.f0_jump_max,
            p.total_duration,
            ph.mean_amplitude,
            ph.max_amplitude,
            ph.rms,
        ]
        .iter()
        .all(|v| v.is_finite())
            && p.silence_durations.iter().all(|v| v.is_finite())
    }
}

/// Extract quality and prosody features from one buffer.
pub fn analyze(buffer: &AudioBuffer) -> FeatureSet {
    let samples = &buffer.samples;
    let sr = buffer.sample_rate;

    let clipping_rate = if samples.is_empty() {
        0.0
    } else {
        samples.iter().filter(|s| s.abs() >= CLIP_AMPLITUDE).count() as f64
            / samples.len() as f64
    };

    let frames = spectral::magnitude_spectrogram(samples);
    let snr_db = spectral::snr_db(&frames);
    let spectral_flatness = spectral::spectral_flatness(&frames);

    let f0 = pitch::track(samples, sr);
    let (f0_mean, f0_std, f0_range) = if f0.is_empty() {
        (0.0, 0.0, 0.0)
    } else {
        let mean = f0.iter().sum::<f64>() / f0.len() as f64;
        let var = f0.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / f0.len() as f64;
        let min = f0.iter().copied().fold(f64::INFINITY, f64::min);
        let max = f0.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        (mean, var.sqrt(), max - min)
    };
    let f0_jump_max = f0
        .windows(2)
        .map(|w| (w[1] - w[0]).abs())
        .fold(0.0, f64::max);

    let silence_durations = silence_gaps(samples, sr);

    let (mean_amplitude, max_amplitude, rms) = if samples.is_empty() {
        (0.0, 0.0, 0.0)
    } else {
        let mean = samples.iter().map(|s| s.abs() as f64).sum::<f64>() / samples.len() as f64;
        let max = samples.iter().map(|s| s.abs() as f64).fold(0.0, f64::max);
        let rms = (samples.iter().map(|&s| (s as f64) * (s as f64)).sum::<f64>()
            / samples.len() as f64)
            .sqrt();
        (mean, max, rms)
    };

    FeatureSet {
        quality: QualityFeatures {
            clipping_rate,
            snr_db,
            spectral_flatness,
        },
        prosody: ProsodyFeatures {
            f0_mean,
            f0_std,
            f0_range,
            f0_jump_max,
            silence_durations,
            total_duration: buffer.duration_secs(),
        },
        physical: PhysicalStats {
            mean_amplitude,
            max_amplitude,
            rms,
        },
    }
}

/// Gaps before and between voiced intervals, in seconds.
///
/// A frame is voiced when its RMS sits within `TOP_DB` of the loudest frame.
/// The gap after the final voiced interval is not reported; trailing room
/// tone says nothing about pacing.
fn silence_gaps(samples: &[f32], sample_rate: u32) -> Vec<f64> {
    use self::spectral::{HOP, WIN};

    if samples.len() < WIN {
        return Vec::new();
    }

    let frame_count = (samples.len() - WIN) / HOP + 1;
    let rms: Vec<f64> = (0..frame_count)
        .map(|f| {
            let frame = &samples[f * HOP..f * HOP + WIN];
            (frame.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>() / WIN as f64).sqrt()
        })
        .collect();

    let peak = rms.iter().copied().fold(0.0, f64::max);
    if peak <= 0.0 {
        return Vec::new();
    }
    let gate = peak * 10f64.powf(-TOP_DB / 20.0);

    // Collapse consecutive voiced frames into [start, end) sample intervals.
    let mut intervals: Vec<(usize, usize)> = Vec::new();
    let mut open: Option<usize> = None;
    for (f, &level) in rms.iter().enumerate() {
        if level >= gate {
            open.get_or_insert(f);
        } else if let Some(start) = open.take() {
            intervals.push((start * HOP, f * HOP));
        }
    }
    if let Some(start) = open {
        intervals.push((start * HOP, samples.len()));
    }

    let mut gaps = Vec::new();
    let mut last_end = 0usize;
    for &(start, end) in &intervals {
        if start > last_end {
            gaps.push((start - last_end) as f64 / sample_rate as f64);
        }
        last_end = end;
    }

    gaps
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn buffer_of(samples: Vec<f32>, rate: u32) -> AudioBuffer {
        AudioBuffer::new(samples, rate)
    }

    fn sine(freq: f64, secs: f64, rate: u32, amp: f64) -> Vec<f32> {
        let n = (secs * rate as f64) as usize;
        (0..n)
            .map(|i| {
                ((2.0 * std::f64::consts::PI * freq * i as f64 / rate as f64).sin() * amp) as f32
            })
            .collect()
    }

    #[test]
    fn clipping_rate_extremes() {
        let full = buffer_of(vec![1.0; 24_000], 24_000);
        assert_relative_eq!(analyze(&full).quality.clipping_rate, 1.0);

        let silent = buffer_of(vec![0.0; 24_000], 24_000);
        assert_relative_eq!(analyze(&silent).quality.clipping_rate, 0.0);
    }

    #[test]
    fn unvoiced_buffer_zeroes_f0_stats() {
        use rand::{rngs::StdRng, Rng, SeedableRng};
        let mut rng = StdRng::seed_from_u64(99);
        let noise: Vec<f32> = (0..24_000).map(|_| rng.gen_range(-0.3f32..0.3)).collect();
        let features = analyze(&buffer_of(noise, 24_000));

        assert_eq!(features.prosody.f0_mean, 0.0);
        assert_eq!(features.prosody.f0_std, 0.0);
        assert_eq!(features.prosody.f0_range, 0.0);
        assert_eq!(features.prosody.f0_jump_max, 0.0);
    }

    #[test]
    fn steady_tone_has_narrow_f0_spread() {
        let features = analyze(&buffer_of(sine(220.0, 1.0, 24_000, 0.4), 24_000));
        assert_relative_eq!(features.prosody.f0_mean, 220.0, max_relative = 0.02);
        assert!(features.prosody.f0_range < 10.0);
        assert!(features.prosody.f0_jump_max < 10.0);
    }

    #[test]
    fn detects_a_mid_utterance_pause() {
        let rate = 24_000;
        let mut samples = sine(220.0, 1.0, rate, 0.4);
        samples.extend(vec![0.0f32; rate as usize / 2]); // 0.5 s gap
        samples.extend(sine(220.0, 1.0, rate, 0.4));
        let features = analyze(&buffer_of(samples, rate));

        let max_gap = features
            .prosody
            .silence_durations
            .iter()
            .copied()
            .fold(0.0, f64::max);
        assert!(
            (0.3..0.7).contains(&max_gap),
            "expected ≈0.5 s gap, got {max_gap}"
        );
    }

    #[test]
    fn short_input_degrades_to_zeros() {
        let features = analyze(&buffer_of(vec![0.5; 100], 24_000));
        assert_eq!(features.quality.snr_db, 0.0);
        assert_eq!(features.quality.spectral_flatness, 0.0);
        assert_eq!(features.prosody.f0_mean, 0.0);
        assert!(features.prosody.silence_durations.is_empty());
        assert!(features.is_finite());
    }

    #[test]
    fn total_duration_tracks_buffer_length() {
        let features = analyze(&buffer_of(vec![0.1; 36_000], 24_000));
        assert_relative_eq!(features.prosody.total_duration, 1.5);
    }

    #[test]
    fn physical_stats_match_hand_computation() {
        let features = analyze(&buffer_of(vec![0.5, -0.5, 0.5, -0.5], 24_000));
        assert_relative_eq!(features.physical.mean_amplitude, 0.5);
        assert_relative_eq!(features.physical.max_amplitude, 0.5);
        assert_relative_eq!(features.physical.rms, 0.5);
    }

    #[test]
    fn analysis_is_pure() {
        let buf = buffer_of(sine(330.0, 0.7, 24_000, 0.3), 24_000);
        assert_eq!(analyze(&buf), analyze(&buf));
    }
}
