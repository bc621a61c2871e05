//! Amplitude-based silence detection over sample ranges.
//!
//! A silence run is a stretch of consecutive samples whose absolute amplitude
//! stays below a linear threshold for at least a minimum length. Voiced
//! regions are the complement; the splitter cuts between them, keeping a
//! configurable margin of silence on each side of a cut.

use std::ops::Range;

/// Find all silence runs of at least `min_len` samples inside `range`.
///
/// Runs touching the range edges are included; the caller decides whether
/// edge silence matters.
pub(crate) fn silent_runs(
    samples: &[f32],
    range: &Range<usize>,
    threshold: f32,
    min_len: usize,
) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut run_start: Option<usize> = None;

    for i in range.clone() {
        if samples[i].abs() < threshold {
            run_start.get_or_insert(i);
        } else if let Some(start) = run_start.take() {
            if i - start >= min_len {
                runs.push(start..i);
            }
        }
    }
    if let Some(start) = run_start {
        if range.end - start >= min_len {
            runs.push(start..range.end);
        }
    }

    runs
}

/// Split `range` at its qualifying silence runs.
///
/// Returns one piece per voiced region, padded with up to `keep` samples of
/// surrounding silence. Adjacent pieces are clamped at the midpoint of the
/// gap between them so they never overlap. Returns an empty vec when the
/// whole range is silent.
pub(crate) fn split_at_silences(
    samples: &[f32],
    range: &Range<usize>,
    threshold: f32,
    min_len: usize,
    keep: usize,
) -> Vec<Range<usize>> {
    let runs = silent_runs(samples, range, threshold, min_len);
    if runs.is_empty() {
        return vec![range.clone()];
    }

    // Voiced regions: the complement of the silence runs within the range.
    let mut voiced = Vec::new();
    let mut cursor = range.start;
    for run in &runs {
        if run.start > cursor {
            voiced.push(cursor..run.start);
        }
        cursor = run.end;
    }
    if cursor < range.end {
        voiced.push(cursor..range.end);
    }

    if voiced.is_empty() {
        return Vec::new();
    }

    let mut pieces = Vec::with_capacity(voiced.len());
    for (i, region) in voiced.iter().enumerate() {
        let start = if i == 0 {
            region.start.saturating_sub(keep).max(range.start)
        } else {
            let gap_mid = (voiced[i - 1].end + region.start) / 2;
            region.start.saturating_sub(keep).max(gap_mid)
        };
        let end = if i + 1 == voiced.len() {
            (region.end + keep).min(range.end)
        } else {
            let gap_mid = (region.end + voiced[i + 1].start) / 2;
            (region.end + keep).min(gap_mid)
        };
        pieces.push(start..end);
    }

    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(parts: &[(f32, usize)]) -> Vec<f32> {
        let mut out = Vec::new();
        for &(amp, len) in parts {
            out.extend(std::iter::repeat(amp).take(len));
        }
        out
    }

    #[test]
    fn finds_internal_run() {
        let s = signal(&[(0.5, 100), (0.0, 50), (0.5, 100)]);
        let runs = silent_runs(&s, &(0..s.len()), 0.01, 40);
        assert_eq!(runs, vec![100..150]);
    }

    #[test]
    fn short_run_is_ignored() {
        let s = signal(&[(0.5, 100), (0.0, 20), (0.5, 100)]);
        let runs = silent_runs(&s, &(0..s.len()), 0.01, 40);
        assert!(runs.is_empty());
    }

    #[test]
    fn all_silent_yields_no_pieces() {
        let s = vec![0.0f32; 500];
        let pieces = split_at_silences(&s, &(0..500), 0.01, 100, 10);
        assert!(pieces.is_empty());
    }

    #[test]
    fn all_voiced_yields_whole_range() {
        let s = vec![0.5f32; 500];
        let pieces = split_at_silences(&s, &(0..500), 0.01, 100, 10);
        assert_eq!(pieces, vec![0..500]);
    }

    #[test]
    fn split_keeps_margin_and_never_overlaps() {
        let s = signal(&[(0.5, 200), (0.0, 100), (0.5, 200)]);
        let pieces = split_at_silences(&s, &(0..s.len()), 0.01, 60, 30);
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0], 0..230);
        assert_eq!(pieces[1], 270..500);
        assert!(pieces[0].end <= pieces[1].start);
    }

    #[test]
    fn wide_margin_clamps_at_gap_midpoint() {
        let s = signal(&[(0.5, 200), (0.0, 100), (0.5, 200)]);
        // keep is wider than half the gap, so pieces meet at the midpoint
        let pieces = split_at_silences(&s, &(0..s.len()), 0.01, 60, 80);
        assert_eq!(pieces[0].end, 250);
        assert_eq!(pieces[1].start, 250);
    }

    #[test]
    fn leading_silence_is_trimmed_to_margin() {
        let s = signal(&[(0.0, 300), (0.5, 200)]);
        let pieces = split_at_silences(&s, &(0..s.len()), 0.01, 100, 50);
        assert_eq!(pieces, vec![250..500]);
    }
}
