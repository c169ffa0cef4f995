//! Streaming distribution statistics.
//!
//! Iteration results are reduced into a [`DistributionStats`] one sample at a
//! time. Partial aggregates from separate batches merge with the parallel
//! variant of Welford's algorithm, so the reduction order is the only thing
//! that affects the last bits of the result.

use serde::{Deserialize, Serialize};

/// Two-sided z-score for a 95% confidence interval.
pub const Z_95: f64 = 1.96;

/// Running mean, variance and range of a scalar sample.
///
/// Internally stores the sum of squared deviations (`m2`) rather than the
/// variance so that merging stays numerically stable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistributionStats {
    /// Number of samples folded in.
    count: u64,
    /// Arithmetic mean.
    mean: f64,
    /// Sum of squared deviations from the mean.
    m2: f64,
    /// Minimum sample.
    min: f64,
    /// Maximum sample.
    max: f64,
}

impl Default for DistributionStats {
    fn default() -> Self {
        Self::empty()
    }
}

impl DistributionStats {
    /// Create empty stats.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// Create stats from a single value.
    #[must_use]
    pub fn from_value(value: f64) -> Self {
        Self {
            count: 1,
            mean: value,
            m2: 0.0,
            min: value,
            max: value,
        }
    }

    /// Build stats from a sequence of samples, folded in order.
    #[must_use]
    pub fn from_samples<I: IntoIterator<Item = f64>>(samples: I) -> Self {
        let mut stats = Self::empty();
        for sample in samples {
            stats.push(sample);
        }
        stats
    }

    /// Fold one sample in (Welford's online update).
    #[allow(clippy::cast_precision_loss)]
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Merge two stats using the parallel variance algorithm.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn merge(a: &Self, b: &Self) -> Self {
        if a.count == 0 {
            return *b;
        }
        if b.count == 0 {
            return *a;
        }

        let n_a = a.count as f64;
        let n_b = b.count as f64;
        let n_total = n_a + n_b;

        let delta = b.mean - a.mean;
        let mean = a.mean + delta * (n_b / n_total);
        let m2 = a.m2 + b.m2 + delta * delta * n_a * n_b / n_total;

        Self {
            count: a.count + b.count,
            mean,
            m2,
            min: a.min.min(b.min),
            max: a.max.max(b.max),
        }
    }

    /// Merge many stats left to right.
    #[must_use]
    pub fn merge_many(stats: &[Self]) -> Self {
        stats
            .iter()
            .fold(Self::empty(), |acc, s| Self::merge(&acc, s))
    }

    /// Number of samples.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Whether no sample has been folded in yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Arithmetic mean (0 when empty).
    #[must_use]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Smallest sample (`+inf` when empty).
    #[must_use]
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Largest sample (`-inf` when empty).
    #[must_use]
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Population variance (σ²).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.m2 / self.count as f64
        }
    }

    /// Unbiased sample variance (divides by `n - 1`).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn sample_variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// Standard deviation of the samples.
    #[must_use]
    pub fn std_dev(&self) -> f64 {
        self.sample_variance().sqrt()
    }

    /// Standard error of the mean, `s / sqrt(n)`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn std_error(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            (self.sample_variance() / self.count as f64).sqrt()
        }
    }

    /// Half-width of the confidence interval for the mean at score `z`.
    #[must_use]
    pub fn confidence_half_width(&self, z: f64) -> f64 {
        z * self.std_error()
    }

    /// 95% confidence interval for the mean as `(low, high)`.
    #[must_use]
    pub fn confidence_interval_95(&self) -> (f64, f64) {
        let half = self.confidence_half_width(Z_95);
        (self.mean - half, self.mean + half)
    }

    /// Confidence half-width relative to the magnitude of the mean.
    ///
    /// Returns `f64::INFINITY` when the mean is zero and samples vary.
    #[must_use]
    pub fn relative_error(&self) -> f64 {
        let half = self.confidence_half_width(Z_95);
        if half == 0.0 {
            0.0
        } else if self.mean == 0.0 {
            f64::INFINITY
        } else {
            half / self.mean.abs()
        }
    }

    /// Whether the 95% half-width is within `tolerance` of the mean.
    ///
    /// Needs at least two samples; a single sample says nothing about spread.
    #[must_use]
    pub fn is_converged(&self, tolerance: f64) -> bool {
        self.count >= 2 && self.relative_error() <= tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    mod moment_tests {
        use super::*;

        #[test]
        fn merge_two_values() {
            let a = DistributionStats::from_value(10.0);
            let b = DistributionStats::from_value(20.0);
            let merged = DistributionStats::merge(&a, &b);

            assert_eq!(merged.mean(), 15.0);
            assert_eq!(merged.min(), 10.0);
            assert_eq!(merged.max(), 20.0);
            assert_eq!(merged.count(), 2);
            // ((10-15)² + (20-15)²) / 2
            assert!((merged.variance() - 25.0).abs() < 1e-9);
            assert!((merged.sample_variance() - 50.0).abs() < 1e-9);
        }

        #[test]
        fn merge_with_empty_is_identity() {
            let a = DistributionStats::empty();
            let b = DistributionStats::from_value(10.0);

            assert_eq!(DistributionStats::merge(&a, &b), b);
            assert_eq!(DistributionStats::merge(&b, &a), b);
        }

        #[test]
        fn push_matches_textbook_variance() {
            let stats = DistributionStats::from_samples([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
            assert!((stats.mean() - 5.0).abs() < 1e-12);
            assert!((stats.variance() - 4.0).abs() < 1e-12);
            assert!((stats.std_dev() - (32.0_f64 / 7.0).sqrt()).abs() < 1e-12);
        }

        #[test]
        fn empty_stats_report_zero_spread() {
            let stats = DistributionStats::empty();
            assert!(stats.is_empty());
            assert_eq!(stats.variance(), 0.0);
            assert_eq!(stats.std_error(), 0.0);
            assert!(!stats.is_converged(0.5));
        }
    }

    mod convergence_tests {
        use super::*;

        #[test]
        fn std_error_shrinks_with_more_samples() {
            let few = DistributionStats::from_samples((0..10).map(|i| f64::from(i % 2)));
            let many = DistributionStats::from_samples((0..1000).map(|i| f64::from(i % 2)));
            assert!(many.std_error() < few.std_error());
        }

        #[test]
        fn constant_samples_converge_immediately() {
            let stats = DistributionStats::from_samples([50.0, 50.0]);
            assert_eq!(stats.relative_error(), 0.0);
            assert!(stats.is_converged(0.0));
        }

        #[test]
        fn confidence_interval_is_centered_on_mean() {
            let stats = DistributionStats::from_samples([1.0, 2.0, 3.0, 4.0]);
            let (low, high) = stats.confidence_interval_95();
            assert!(((low + high) / 2.0 - stats.mean()).abs() < 1e-12);
            assert!(high > low);
        }
    }

    proptest! {
        #[test]
        fn merged_halves_match_sequential_fold(
            samples in prop::collection::vec(-1.0e4f64..1.0e4, 2..200),
            split in 0usize..200,
        ) {
            let split = split % samples.len();
            let whole = DistributionStats::from_samples(samples.iter().copied());
            let left = DistributionStats::from_samples(samples[..split].iter().copied());
            let right = DistributionStats::from_samples(samples[split..].iter().copied());
            let merged = DistributionStats::merge(&left, &right);

            prop_assert_eq!(merged.count(), whole.count());
            prop_assert!((merged.mean() - whole.mean()).abs() < 1e-6);
            prop_assert!((merged.variance() - whole.variance()).abs() < 1e-3 * (1.0 + whole.variance()));
            prop_assert_eq!(merged.min(), whole.min());
            prop_assert_eq!(merged.max(), whole.max());
        }
    }
}
