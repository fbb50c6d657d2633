//! Histogram binning of non-negative integer values.
//!
//! The value range is split into 8 to 12 contiguous integer bins, depending on
//! the sample size. The last bin always closes exactly at the maximum value.

use serde::{Deserialize, Serialize};

/// Fewest bins produced for a non-degenerate range.
pub const MIN_BIN_COUNT: u64 = 8;

/// Most bins targeted for a non-degenerate range.
pub const MAX_BIN_COUNT: u64 = 12;

/// A contiguous, inclusive range of values and how many samples fell into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bin {
    pub range_start: u64,
    /// Inclusive upper bound
    pub range_end: u64,
    pub label: String,
    pub count: usize,
}

/// Bin counts and labels in chart-ready form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinnedValues {
    pub bins: Vec<usize>,
    pub labels: Vec<String>,
}

impl BinnedValues {
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }
}

impl From<Vec<Bin>> for BinnedValues {
    fn from(bins: Vec<Bin>) -> Self {
        let (bins, labels): (Vec<usize>, Vec<String>) = bins.into_iter().map(|b| (b.count, b.label)).unzip();
        Self { bins, labels }
    }
}

/// Bin `values` and return the counts with their labels.
pub fn compute_bins(values: &[u64]) -> BinnedValues {
    compute_histogram(values).into()
}

/// Bin `values` into contiguous ranges covering `[min, max]`.
pub fn compute_histogram(values: &[u64]) -> Vec<Bin> {
    let (Some(&min), Some(&max)) = (values.iter().min(), values.iter().max()) else {
        return Vec::new();
    };

    // Zero range: a single bin, no width to derive
    if min == max {
        return vec![Bin {
            range_start: min,
            range_end: max,
            label: min.to_string(),
            count: values.len(),
        }];
    }

    let range = max - min;
    let target = target_bin_count(values.len());
    let bin_width = div_ceil(range, target);
    let bin_count = div_ceil(range, bin_width);

    let mut bins: Vec<Bin> = (0..bin_count)
        .map(|i| {
            let range_start = min + i * bin_width;
            let range_end = if i == bin_count - 1 {
                max
            } else {
                range_start + bin_width - 1
            };
            Bin {
                range_start,
                range_end,
                label: bin_label(range_start, range_end),
                count: 0,
            }
        })
        .collect();

    for &value in values {
        let index = ((value - min) / bin_width).min(bin_count - 1);
        bins[index as usize].count += 1;
    }

    tracing::debug!(
        samples = values.len(),
        min,
        max,
        bin_width,
        bin_count,
        "Computed histogram"
    );

    bins
}

/// `clamp(ceil(sqrt(n)), 8, 12)`.
fn target_bin_count(sample_count: usize) -> u64 {
    let root = (sample_count as f64).sqrt().ceil() as u64;
    root.clamp(MIN_BIN_COUNT, MAX_BIN_COUNT)
}

fn div_ceil(numerator: u64, denominator: u64) -> u64 {
    numerator / denominator + u64::from(numerator % denominator != 0)
}

fn bin_label(start: u64, end: u64) -> String {
    if start == end {
        start.to_string()
    } else {
        format!("{start}\u{2013}{end}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_well_formed(values: &[u64], bins: &[Bin]) {
        let total: usize = bins.iter().map(|b| b.count).sum();
        assert_eq!(total, values.len());
        assert_eq!(bins.first().unwrap().range_start, *values.iter().min().unwrap());
        assert_eq!(bins.last().unwrap().range_end, *values.iter().max().unwrap());
        for pair in bins.windows(2) {
            assert_eq!(pair[0].range_end + 1, pair[1].range_start);
        }
        for bin in bins {
            assert!(bin.range_start <= bin.range_end);
        }
    }

    #[test]
    fn test_empty_values() {
        assert_eq!(compute_bins(&[]), BinnedValues::default());
        assert!(compute_histogram(&[]).is_empty());
    }

    #[test]
    fn test_degenerate_range() {
        let binned = compute_bins(&[5, 5, 5]);
        assert_eq!(binned.bins, vec![3]);
        assert_eq!(binned.labels, vec!["5".to_string()]);
    }

    #[test]
    fn test_one_to_hundred() {
        let values: Vec<u64> = (1..=100).collect();
        assert_eq!(target_bin_count(values.len()), 10);

        let bins = compute_histogram(&values);
        assert_eq!(bins.len(), 10);
        assert!(bins.iter().all(|b| b.count == 10));
        assert_eq!(bins[0].label, "1\u{2013}10");
        assert_eq!(bins[9].label, "91\u{2013}100");
        assert_well_formed(&values, &bins);
    }

    #[test]
    fn test_target_bin_count_is_clamped() {
        assert_eq!(target_bin_count(1), 8);
        assert_eq!(target_bin_count(64), 8);
        assert_eq!(target_bin_count(65), 9);
        assert_eq!(target_bin_count(121), 11);
        assert_eq!(target_bin_count(10_000), 12);
    }

    #[test]
    fn test_small_range_uses_single_value_bins() {
        let values = [0, 1, 2, 3, 3];
        // range 3, target 8 -> width 1, 3 bins; last bin absorbs the max
        let bins = compute_histogram(&values);
        let labels: Vec<&str> = bins.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["0", "1", "2\u{2013}3"]);
        let counts: Vec<usize> = bins.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 1, 3]);
        assert_well_formed(&values, &bins);
    }

    #[test]
    fn test_two_values() {
        let values = [0, 1];
        let bins = compute_histogram(&values);
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].label, "0\u{2013}1");
        assert_eq!(bins[0].count, 2);
    }

    #[test]
    fn test_last_bin_absorbs_remainder() {
        // range 25, target 8 -> width 4, 7 bins; last bin is 34..=35
        let values = [10, 11, 20, 35, 35, 17];
        let bins = compute_histogram(&values);
        assert_eq!(bins.len(), 7);
        let last = bins.last().unwrap();
        assert_eq!((last.range_start, last.range_end), (34, 35));
        assert_eq!(last.count, 2);
        assert_well_formed(&values, &bins);
    }

    #[test]
    fn test_unordered_values_are_counted() {
        let values = [900, 3, 450, 3, 17, 899, 120];
        let binned = compute_bins(&values);
        assert_eq!(binned.bins.len(), binned.labels.len());
        assert_eq!(binned.bins.iter().sum::<usize>(), values.len());
        assert_well_formed(&values, &compute_histogram(&values));
    }

    #[test]
    fn test_div_ceil() {
        assert_eq!(div_ceil(99, 10), 10);
        assert_eq!(div_ceil(100, 10), 10);
        assert_eq!(div_ceil(1, 8), 1);
    }
}
