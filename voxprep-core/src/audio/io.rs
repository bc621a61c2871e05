//! Decode/encode boundary for audio files.
//!
//! The `AudioSource` trait decouples the processing stages from any specific
//! container or codec. The shipped implementation (`WavSource`) handles WAV
//! via hound and resamples to a caller-chosen analysis rate; anything fancier
//! (mp3, flac, ffmpeg piping) can implement the same trait without touching
//! the segmenter or extractor.

use std::ops::Range;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::audio::{buffer::AudioBuffer, resample::RateConverter};
use crate::error::{Result, VoxprepError};

/// Contract for decoded-audio providers.
///
/// Implementations return mono f32 PCM; channel mixing and resampling are
/// their responsibility, not the core's.
pub trait AudioSource: Send + Sync {
    /// Decode `path` into a mono buffer.
    ///
    /// # Errors
    /// Returns `VoxprepError::Decode` for unreadable or unsupported files.
    fn load(&self, path: &Path) -> Result<AudioBuffer>;
}

/// WAV-file source backed by hound.
///
/// Mixes interleaved channels down to mono by averaging, then optionally
/// resamples to `target_sample_rate`.
#[derive(Debug, Clone, Default)]
pub struct WavSource {
    /// When set, decoded audio is converted to this rate; `None` keeps the
    /// file's native rate (segmentation does not care about the rate, feature
    /// extraction does).
    pub target_sample_rate: Option<u32>,
}

impl WavSource {
    /// Source that keeps each file's native sample rate.
    pub fn native() -> Self {
        Self {
            target_sample_rate: None,
        }
    }

    /// Source that converts every file to `rate` Hz.
    pub fn at_rate(rate: u32) -> Self {
        Self {
            target_sample_rate: Some(rate),
        }
    }
}

impl AudioSource for WavSource {
    fn load(&self, path: &Path) -> Result<AudioBuffer> {
        let mut reader =
            hound::WavReader::open(path).map_err(|e| VoxprepError::Decode(e.to_string()))?;
        let spec = reader.spec();
        let channels = usize::from(spec.channels.max(1));

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .map(|s| s.map_err(|e| VoxprepError::Decode(e.to_string())))
                .collect::<Result<Vec<_>>>()?,
            hound::SampleFormat::Int => {
                if spec.bits_per_sample <= 16 {
                    reader
                        .samples::<i16>()
                        .map(|s| {
                            s.map(|v| (v as f32) / (i16::MAX as f32))
                                .map_err(|e| VoxprepError::Decode(e.to_string()))
                        })
                        .collect::<Result<Vec<_>>>()?
                } else {
                    let max = ((1_i64 << (spec.bits_per_sample - 1)) - 1) as f32;
                    reader
                        .samples::<i32>()
                        .map(|s| {
                            s.map(|v| (v as f32) / max)
                                .map_err(|e| VoxprepError::Decode(e.to_string()))
                        })
                        .collect::<Result<Vec<_>>>()?
                }
            }
        };

        let mono = if channels == 1 {
            interleaved
        } else {
            let mut mono = Vec::with_capacity(interleaved.len() / channels);
            for frame in interleaved.chunks(channels) {
                let sum = frame.iter().copied().sum::<f32>();
                mono.push(sum / channels as f32);
            }
            mono
        };

        let (samples, rate) = match self.target_sample_rate {
            Some(target) if target != spec.sample_rate => {
                let mut rc = RateConverter::new(spec.sample_rate, target)?;
                (rc.convert(&mono)?, target)
            }
            Some(target) => (mono, target),
            None => (mono, spec.sample_rate),
        };

        debug!(
            path = %path.display(),
            rate,
            samples = samples.len(),
            "decoded wav"
        );
        Ok(AudioBuffer::new(samples, rate))
    }
}

/// Writes clip ranges of a source buffer as sequentially numbered WAV files.
///
/// Output names follow `<stem>_<index:05>.wav`; indices are assigned by the
/// caller and stay contiguous regardless of clips dropped upstream.
pub struct ClipWriter {
    out_dir: PathBuf,
    stem: String,
}

impl ClipWriter {
    /// Create a writer for `out_dir`, deriving the name stem from the source
    /// file. The directory is created if missing.
    pub fn new(out_dir: &Path, source: &Path) -> Result<Self> {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "clip".to_string());
        std::fs::create_dir_all(out_dir)?;
        Ok(Self {
            out_dir: out_dir.to_path_buf(),
            stem,
        })
    }

    /// Write `range` of `buffer` as 16-bit PCM, returning the output path.
    pub fn write(&self, buffer: &AudioBuffer, range: Range<usize>, index: usize) -> Result<PathBuf> {
        let path = self.out_dir.join(format!("{}_{:05}.wav", self.stem, index));
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: buffer.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = hound::WavWriter::create(&path, spec)
            .map_err(|e| VoxprepError::ClipWrite(e.to_string()))?;
        for &sample in &buffer.samples[range] {
            let v = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer
                .write_sample(v)
                .map_err(|e| VoxprepError::ClipWrite(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| VoxprepError::ClipWrite(e.to_string()))?;

        Ok(path)
    }
}
