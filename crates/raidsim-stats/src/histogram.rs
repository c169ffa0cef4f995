//! Fixed-width histograms of iteration samples.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when constructing a histogram.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum HistogramError {
    /// Bucket width must be finite and strictly positive.
    #[error("histogram bucket width must be positive and finite, got {0}")]
    InvalidBucketWidth(f64),
}

/// Sparse fixed-width histogram.
///
/// Bucket `k` covers `[k * width, (k + 1) * width)`. Buckets are kept in a
/// `BTreeMap` so iteration is ordered and merges are deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    bucket_width: f64,
    buckets: BTreeMap<i64, u64>,
    total: u64,
}

impl Histogram {
    /// Create an empty histogram with the given bucket width.
    ///
    /// # Errors
    ///
    /// Returns [`HistogramError::InvalidBucketWidth`] for a zero, negative or
    /// non-finite width.
    pub fn new(bucket_width: f64) -> Result<Self, HistogramError> {
        if !bucket_width.is_finite() || bucket_width <= 0.0 {
            return Err(HistogramError::InvalidBucketWidth(bucket_width));
        }
        Ok(Self {
            bucket_width,
            buckets: BTreeMap::new(),
            total: 0,
        })
    }

    /// Width of every bucket.
    #[must_use]
    pub fn bucket_width(&self) -> f64 {
        self.bucket_width
    }

    /// Record one sample. Non-finite samples are ignored.
    #[allow(clippy::cast_possible_truncation)]
    pub fn record(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        let bucket = (value / self.bucket_width).floor() as i64;
        *self.buckets.entry(bucket).or_insert(0) += 1;
        self.total += 1;
    }

    /// Total samples recorded.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Iterate `(bucket_start, count)` pairs in ascending order.
    #[allow(clippy::cast_precision_loss)]
    pub fn iter(&self) -> impl Iterator<Item = (f64, u64)> + '_ {
        self.buckets
            .iter()
            .map(move |(k, count)| (*k as f64 * self.bucket_width, *count))
    }

    /// Bucket start holding the most samples (lowest wins ties).
    #[must_use]
    pub fn mode(&self) -> Option<f64> {
        self.iter()
            .fold(None, |best: Option<(f64, u64)>, (start, count)| match best {
                Some((_, best_count)) if best_count >= count => best,
                _ => Some((start, count)),
            })
            .map(|(start, _)| start)
    }

    /// Add another histogram's counts into this one.
    ///
    /// Histograms with different bucket widths are not merged; the call
    /// returns `false` and leaves `self` untouched.
    pub fn merge(&mut self, other: &Self) -> bool {
        if (self.bucket_width - other.bucket_width).abs() > f64::EPSILON {
            return false;
        }
        for (k, count) in &other.buckets {
            *self.buckets.entry(*k).or_insert(0) += count;
        }
        self.total += other.total;
        true
    }
}
