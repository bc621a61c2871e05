//! Short-time spectral analysis: magnitude spectrogram, SNR estimate,
//! spectral flatness.

use rustfft::{num_complex::Complex, FftPlanner};

/// Analysis window length in samples.
pub(crate) const WIN: usize = 2048;
/// Hop between consecutive frames in samples.
pub(crate) const HOP: usize = 512;

/// Guard against log/division blowups on silent bins.
const EPS: f64 = 1e-10;

/// Compute the magnitude spectrogram of `samples`.
///
/// Hann-windowed frames of `WIN` samples every `HOP` samples; each frame
/// yields `WIN / 2 + 1` magnitude bins. Returns an empty vec when the signal
/// is shorter than one window.
pub(crate) fn magnitude_spectrogram(samples: &[f32]) -> Vec<Vec<f32>> {
    if samples.len() < WIN {
        return Vec::new();
    }

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(WIN);

    let window: Vec<f32> = (0..WIN)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * i as f32 / WIN as f32;
            0.5 * (1.0 - phase.cos())
        })
        .collect();

    let frame_count = (samples.len() - WIN) / HOP + 1;
    let mut frames = Vec::with_capacity(frame_count);
    let mut scratch = vec![Complex::new(0.0f32, 0.0f32); WIN];

    for f in 0..frame_count {
        let offset = f * HOP;
        for (i, slot) in scratch.iter_mut().enumerate() {
            *slot = Complex::new(samples[offset + i] * window[i], 0.0);
        }
        fft.process(&mut scratch);

        let magnitudes: Vec<f32> = scratch[..WIN / 2 + 1].iter().map(|c| c.norm()).collect();
        frames.push(magnitudes);
    }

    frames
}

/// Signal-to-noise estimate in dB.
///
/// The noise floor is the 10th-percentile magnitude across all time-frequency
/// bins; signal power is the mean squared magnitude. Returns 0.0 when there
/// are no frames.
pub(crate) fn snr_db(frames: &[Vec<f32>]) -> f64 {
    if frames.is_empty() {
        return 0.0;
    }

    let mut all: Vec<f32> = frames.iter().flatten().copied().collect();
    all.sort_by(|a, b| a.total_cmp(b));
    let idx = ((all.len() - 1) as f64 * 0.10).round() as usize;
    let noise_floor = all[idx] as f64;

    let signal_power =
        all.iter().map(|&m| (m as f64) * (m as f64)).sum::<f64>() / all.len() as f64;
    if signal_power <= 0.0 {
        // Digital silence: no signal to rate.
        return 0.0;
    }

    10.0 * (signal_power / (noise_floor * noise_floor + EPS)).log10()
}

/// Mean spectral flatness across frames, in [0, 1].
///
/// Per frame: geometric mean over arithmetic mean of the magnitude spectrum.
/// Values near 1 indicate noise-like content; near 0, tonal content. Returns
/// 0.0 when there are no frames.
pub(crate) fn spectral_flatness(frames: &[Vec<f32>]) -> f64 {
    if frames.is_empty() {
        return 0.0;
    }

    let mut total = 0.0f64;
    for frame in frames {
        let n = frame.len() as f64;
        let log_sum: f64 = frame.iter().map(|&m| (m as f64 + EPS).ln()).sum();
        let geometric = (log_sum / n).exp();
        let arithmetic = frame.iter().map(|&m| m as f64).sum::<f64>() / n + EPS;
        total += (geometric / arithmetic).clamp(0.0, 1.0);
    }

    total / frames.len() as f64
}
