//! Work-list splitter with silence-threshold backoff.
//!
//! ## Algorithm (per work item)
//!
//! ```text
//! 1. Range fits max_duration_s          → emit as candidate
//! 2. Split at silences ≥ silence_ms     → ≥2 pieces (or 1 shorter piece):
//!                                          re-queue each at the initial
//!                                          silence length
//! 3. No progress, silence_ms > floor    → re-queue same range at
//!                                          silence_ms × reduction_factor
//! 4. No progress at the floor, or the
//!    depth/iteration cap tripped        → fixed-width slices at max_s
//! ```
//!
//! The work list is an explicit stack, never native recursion, and items are
//! pushed in reverse so candidates come out in source order. Step 4 succeeds
//! on any content (all-silent and all-voiced buffers included), which is the
//! termination guarantee; the depth and iteration caps bound the walk
//! independently of input pathology.

use std::ops::Range;

use tracing::debug;

use crate::audio::{dbfs_to_amplitude, AudioBuffer};
use crate::segment::{silence, SegmenterConfig};

/// Re-queue limit per range: covers the full threshold backoff ladder plus
/// split fan-out on real recordings with a wide margin.
const MAX_SPLIT_DEPTH: usize = 64;

/// Hard ceiling on processed work items, independent of input length.
const MAX_WORK_ITEMS: usize = 1_000_000;

/// One pending range: where it sits in the source, the silence length to try
/// next, and how many re-queues led here.
struct WorkItem {
    range: Range<usize>,
    silence_ms: u32,
    depth: usize,
}

pub(crate) fn split(buffer: &AudioBuffer, config: &SegmenterConfig) -> Vec<Range<usize>> {
    let max_len = buffer.samples_for_secs(config.max_duration_s).max(1);
    let threshold = dbfs_to_amplitude(config.silence_amplitude_threshold_dbfs);
    let keep = buffer.samples_for_ms(config.keep_silence_ms);

    let mut candidates = Vec::new();
    let mut work = vec![WorkItem {
        range: 0..buffer.samples.len(),
        silence_ms: config.initial_silence_ms,
        depth: 0,
    }];
    let mut processed = 0usize;

    while let Some(item) = work.pop() {
        processed += 1;

        if item.range.len() <= max_len {
            candidates.push(item.range);
            continue;
        }

        if item.depth >= MAX_SPLIT_DEPTH || processed >= MAX_WORK_ITEMS {
            debug!(
                depth = item.depth,
                processed, "split cap reached, slicing fixed-width"
            );
            fixed_width(&item.range, max_len, &mut candidates);
            continue;
        }

        let min_silence = buffer.samples_for_ms(item.silence_ms).max(1);
        let pieces =
            silence::split_at_silences(&buffer.samples, &item.range, threshold, min_silence, keep);

        let progressed = pieces.len() >= 2
            || pieces
                .first()
                .is_some_and(|p| p.len() < item.range.len());

        if progressed {
            // Fresh attempt per sub-chunk: each piece restarts the backoff
            // ladder at the initial silence length.
            for piece in pieces.into_iter().rev() {
                work.push(WorkItem {
                    range: piece,
                    silence_ms: config.initial_silence_ms,
                    depth: item.depth + 1,
                });
            }
        } else if item.silence_ms > config.silence_floor_ms {
            work.push(WorkItem {
                range: item.range,
                silence_ms: reduce(item.silence_ms, config.silence_reduction_factor),
                depth: item.depth + 1,
            });
        } else {
            fixed_width(&item.range, max_len, &mut candidates);
        }
    }

    candidates
}

/// Shrink the silence length by `factor`, always by at least 1 ms so the
/// backoff ladder is strictly decreasing.
fn reduce(silence_ms: u32, factor: f64) -> u32 {
    let factor = factor.clamp(0.05, 0.95);
    let next = (silence_ms as f64 * factor).floor() as u32;
    next.min(silence_ms.saturating_sub(1))
}

/// Last-resort slicing at `max_len` boundaries. Always succeeds.
fn fixed_width(range: &Range<usize>, max_len: usize, out: &mut Vec<Range<usize>>) {
    let mut start = range.start;
    while start < range.end {
        let end = (start + max_len).min(range.end);
        out.push(start..end);
        start = end;
    }
}
