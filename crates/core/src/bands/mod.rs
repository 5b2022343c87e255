//! Perceptual frequency banding.
//!
//! A byte frequency snapshot has one entry per linear FFT bin. Drawing it as
//! is would spend almost every column on the top octaves, so the bins are
//! grouped into bands of equal width in semitone steps instead.

use crate::math::{average, steps, steps_to_frequency, MIN_FREQUENCY};

/// Inclusive bin range covered by a single band. `start > end` marks an
/// empty band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandRange {
    pub start: usize,
    pub end: usize,
}

impl BandRange {
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }
}

/// Computes the bin ranges for `band_count` bands spanning
/// [`MIN_FREQUENCY`, `max_frequency`].
///
/// `max_frequency` is clamped to the Nyquist limit. Ranges never overlap and
/// are ordered low to high.
pub fn band_ranges(
    bin_count: usize,
    sample_rate: f32,
    band_count: usize,
    max_frequency: f32,
) -> Vec<BandRange> {
    if bin_count == 0 || band_count == 0 {
        return vec![BandRange { start: 1, end: 0 }; band_count];
    }

    let nyquist = sample_rate / 2.0;
    let max_frequency = max_frequency.min(nyquist).max(MIN_FREQUENCY);
    let bin_resolution = nyquist / bin_count as f32;
    let total_steps = steps(max_frequency);
    let step_increment = total_steps / band_count as f32;
    let last_bin = bin_count - 1;

    let mut ranges = Vec::with_capacity(band_count);
    let mut start = 0usize;
    for band in 1..=band_count {
        let upper_frequency = steps_to_frequency(band as f32 * step_increment);
        let upper = (upper_frequency / bin_resolution).round();
        let upper = if upper.is_finite() {
            (upper.max(0.0) as usize).min(last_bin)
        } else {
            last_bin
        };

        ranges.push(BandRange { start, end: upper });
        start = start.max(upper + 1);
    }

    ranges
}

/// Averages `data` over each band returned by [`band_ranges`].
///
/// The result always has `band_count` entries, each in `0.0..=255.0`.
pub fn frequency_averages(
    data: &[u8],
    sample_rate: f32,
    band_count: usize,
    max_frequency: f32,
) -> Vec<f32> {
    band_ranges(data.len(), sample_rate, band_count, max_frequency)
        .into_iter()
        .map(|range| {
            if range.is_empty() {
                0.0
            } else {
                average(&data[range.start..=range.end])
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::MAX_FREQUENCY;

    #[test]
    fn returns_one_value_per_band() {
        let data = vec![100u8; 8192];
        for count in [1, 4, 32, 100] {
            let averages = frequency_averages(&data, 44_100.0, count, MAX_FREQUENCY);
            assert_eq!(averages.len(), count);
        }
    }

    #[test]
    fn single_band_spans_whole_range() {
        let ranges = band_ranges(1024, 44_100.0, 1, MAX_FREQUENCY);
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].start, 0);
        let expected = (MAX_FREQUENCY / (22_050.0 / 1024.0)).round() as usize;
        assert_eq!(ranges[0].end, expected);
    }

    #[test]
    fn ranges_never_revisit_a_bin() {
        let ranges = band_ranges(512, 48_000.0, 64, MAX_FREQUENCY);
        let mut next = 0;
        for range in ranges.iter().filter(|r| !r.is_empty()) {
            assert_eq!(range.start, next);
            assert!(range.end >= range.start);
            next = range.end + 1;
        }
    }

    #[test]
    fn dense_low_bands_average_to_zero() {
        // at this resolution several low bands land on the same bin
        let data = vec![255u8; 64];
        let averages = frequency_averages(&data, 44_100.0, 48, MAX_FREQUENCY);
        assert!(averages.iter().any(|&v| v == 0.0));
        assert!(averages.iter().all(|&v| v == 0.0 || v == 255.0));
    }

    #[test]
    fn clamps_to_nyquist() {
        let ranges = band_ranges(256, 8_000.0, 8, MAX_FREQUENCY);
        assert_eq!(ranges.last().unwrap().end, 255);
    }

    #[test]
    fn empty_snapshot_still_yields_bands() {
        assert_eq!(frequency_averages(&[], 44_100.0, 3, MAX_FREQUENCY), vec![0.0; 3]);
    }
}
