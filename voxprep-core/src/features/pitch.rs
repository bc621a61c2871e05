//! Frame-wise fundamental-frequency estimation via normalized
//! autocorrelation, restricted to a speech-plausible range.

use super::spectral::{HOP, WIN};

/// Lowest pitch considered (C2).
const F_MIN: f64 = 65.41;
/// Highest pitch considered (C7).
const F_MAX: f64 = 2093.0;

/// Minimum normalized autocorrelation peak for a frame to count as voiced.
const CLARITY_THRESHOLD: f64 = 0.30;

/// Frames quieter than this RMS are unvoiced regardless of periodicity.
const RMS_FLOOR: f64 = 1e-4;

/// Track pitch across `samples`, returning one f0 estimate per voiced frame,
/// in frame order. Unvoiced frames (noise, silence) are skipped.
pub(crate) fn track(samples: &[f32], sample_rate: u32) -> Vec<f64> {
    if samples.len() < WIN {
        return Vec::new();
    }

    let sr = sample_rate as f64;
    let lag_min = ((sr / F_MAX).floor() as usize).max(2);
    let lag_max = ((sr / F_MIN).ceil() as usize).min(WIN / 2);
    if lag_min >= lag_max {
        return Vec::new();
    }

    // Reference span: every lag correlates the same number of samples so
    // clarity values are comparable across lags.
    let span = WIN - lag_max;

    let frame_count = (samples.len() - WIN) / HOP + 1;
    let mut estimates = Vec::new();
    let mut corr = vec![0.0f64; lag_max + 1];

    for f in 0..frame_count {
        let frame = &samples[f * HOP..f * HOP + WIN];
        corr.fill(0.0);

        let energy: f64 = frame[..span].iter().map(|&x| (x as f64) * (x as f64)).sum();
        let rms = (energy / span as f64).sqrt();
        if rms < RMS_FLOOR {
            continue;
        }

        // Prefix sums of squares for the lagged-window energies.
        let mut sq_prefix = vec![0.0f64; WIN + 1];
        for (i, &x) in frame.iter().enumerate() {
            sq_prefix[i + 1] = sq_prefix[i] + (x as f64) * (x as f64);
        }

        let mut best_lag = 0usize;
        let mut best_clarity = 0.0f64;
        for lag in lag_min..=lag_max {
            let mut dot = 0.0f64;
            for i in 0..span {
                dot += frame[i] as f64 * frame[i + lag] as f64;
            }
            let lagged_energy = sq_prefix[lag + span] - sq_prefix[lag];
            let denom = (energy * lagged_energy).sqrt();
            if denom <= 0.0 {
                continue;
            }
            let clarity = dot / denom;
            corr[lag] = clarity;
            if clarity > best_clarity {
                best_clarity = clarity;
                best_lag = lag;
            }
        }

        if best_clarity < CLARITY_THRESHOLD || best_lag == 0 {
            continue;
        }

        // Parabolic refinement around the peak for sub-sample lag accuracy.
        let lag = if best_lag > lag_min && best_lag < lag_max {
            let (a, b, c) = (corr[best_lag - 1], corr[best_lag], corr[best_lag + 1]);
            let denom = a - 2.0 * b + c;
            if denom.abs() > f64::EPSILON {
                best_lag as f64 + 0.5 * (a - c) / denom
            } else {
                best_lag as f64
            }
        } else {
            best_lag as f64
        };

        estimates.push(sr / lag);
    }

    estimates
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sine(freq: f64, secs: f64, rate: u32) -> Vec<f32> {
        let n = (secs * rate as f64) as usize;
        (0..n)
            .map(|i| {
                ((2.0 * std::f64::consts::PI * freq * i as f64 / rate as f64).sin() * 0.4) as f32
            })
            .collect()
    }

    #[test]
    fn tracks_a_steady_tone() {
        let estimates = track(&sine(220.0, 0.5, 24_000), 24_000);
        assert!(!estimates.is_empty());
        for &f0 in &estimates {
            assert_relative_eq!(f0, 220.0, max_relative = 0.02);
        }
    }

    #[test]
    fn silence_is_unvoiced() {
        let estimates = track(&vec![0.0f32; 24_000], 24_000);
        assert!(estimates.is_empty());
    }

    #[test]
    fn white_noise_is_unvoiced() {
        use rand::{rngs::StdRng, Rng, SeedableRng};
        let mut rng = StdRng::seed_from_u64(7);
        let noise: Vec<f32> = (0..24_000).map(|_| rng.gen_range(-0.5f32..0.5)).collect();
        let estimates = track(&noise, 24_000);
        assert!(
            estimates.is_empty(),
            "noise produced {} voiced frames",
            estimates.len()
        );
    }

    #[test]
    fn short_signal_yields_nothing() {
        let estimates = track(&sine(220.0, 0.01, 24_000), 24_000);
        assert!(estimates.is_empty());
    }
}
