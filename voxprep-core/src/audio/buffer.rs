//! Typed audio buffer passed from the decode boundary to the segmenter and
//! feature-extraction stages.

/// A contiguous block of mono PCM samples at a known sample rate.
///
/// Produced once per source file and owned by whichever stage is processing
/// it; never mutated after construction.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Mono f32 samples in [-1.0, 1.0].
    pub samples: Vec<f32>,
    /// Sample rate in Hz (e.g. 16000, 24000, 44100).
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Returns the duration of this buffer in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Returns true if the buffer contains no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of samples covering `secs` seconds at this buffer's rate.
    pub fn samples_for_secs(&self, secs: f64) -> usize {
        (secs * self.sample_rate as f64).round() as usize
    }

    /// Number of samples covering `ms` milliseconds at this buffer's rate.
    pub fn samples_for_ms(&self, ms: u32) -> usize {
        (ms as u64 * self.sample_rate as u64 / 1000) as usize
    }
}

/// Convert a dBFS threshold to a linear amplitude in [0.0, 1.0].
///
/// 0 dBFS is full scale (1.0); -40 dBFS is 0.01.
pub fn dbfs_to_amplitude(dbfs: f64) -> f32 {
    10f64.powf(dbfs / 20.0) as f32
}
