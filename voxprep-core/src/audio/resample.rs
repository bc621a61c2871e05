//! Sample-rate conversion using a rubato `FastFixedIn` resampler.
//!
//! ## Design
//!
//! Source recordings arrive at whatever rate they were mastered at (44.1 kHz
//! CD rips, 48 kHz screen captures); the analysis stages expect one fixed
//! rate. `RateConverter` bridges that gap on whole decoded buffers.
//!
//! When source rate == target rate, `RateConverter` is a zero-copy
//! passthrough and no rubato session is created at all.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};

use crate::error::{Result, VoxprepError};

/// Input frame count per rubato call. Whole-buffer conversion feeds the
/// resampler in fixed blocks and pads the final partial block with zeros.
const CHUNK: usize = 1024;

/// Converts f32 mono audio from one fixed sample rate to another.
pub struct RateConverter {
    /// `None` when source rate == target rate (passthrough mode).
    resampler: Option<FastFixedIn<f32>>,
    ratio: f64,
    /// Pre-allocated output buffer: `[1][output_frames_max]`.
    output_buf: Vec<Vec<f32>>,
}

impl RateConverter {
    /// Create a new converter from `source_rate` Hz to `target_rate` Hz.
    ///
    /// # Errors
    /// Returns `VoxprepError::Resample` if rubato fails to initialise.
    pub fn new(source_rate: u32, target_rate: u32) -> Result<Self> {
        let ratio = target_rate as f64 / source_rate as f64;

        if source_rate == target_rate {
            return Ok(Self {
                resampler: None,
                ratio,
                output_buf: Vec::new(),
            });
        }

        let resampler = FastFixedIn::<f32>::new(
            ratio,
            1.0, // fixed ratio, no dynamic adjustment
            PolynomialDegree::Cubic,
            CHUNK,
            1, // mono
        )
        .map_err(|e| VoxprepError::Resample(format!("resampler init: {e}")))?;

        let max_out = resampler.output_frames_max();
        let output_buf = vec![vec![0f32; max_out]; 1];

        Ok(Self {
            resampler: Some(resampler),
            ratio,
            output_buf,
        })
    }

    /// Convert an entire buffer, returning samples at the target rate.
    ///
    /// The final partial block is zero-padded into the resampler and the
    /// output is trimmed to the expected length, so the returned duration
    /// matches the input duration.
    pub fn convert(&mut self, samples: &[f32]) -> Result<Vec<f32>> {
        let Some(ref mut resampler) = self.resampler else {
            return Ok(samples.to_vec());
        };

        let expected = (samples.len() as f64 * self.ratio).round() as usize;
        let mut result = Vec::with_capacity(expected + CHUNK);

        let mut block = vec![0f32; CHUNK];
        for chunk in samples.chunks(CHUNK) {
            let input: &[f32] = if chunk.len() == CHUNK {
                chunk
            } else {
                block[..chunk.len()].copy_from_slice(chunk);
                block[chunk.len()..].fill(0.0);
                &block
            };

            let (_consumed, produced) = resampler
                .process_into_buffer(&[input], &mut self.output_buf, None)
                .map_err(|e| VoxprepError::Resample(format!("resampler process: {e}")))?;
            result.extend_from_slice(&self.output_buf[0][..produced]);
        }

        result.truncate(expected);
        Ok(result)
    }

    /// Returns `true` when source rate == target rate (no resampling occurs).
    pub fn is_passthrough(&self) -> bool {
        self.resampler.is_none()
    }
}
