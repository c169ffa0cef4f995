//! # raidsim-stats
//!
//! Numeric aggregation substrate for Monte-Carlo combat simulation.
//!
//! Every iteration of a simulation produces a handful of scalar samples
//! (damage per second, casts, resource spent). This crate folds those
//! samples into convergent estimates:
//!
//! - **Streaming moments**: [`DistributionStats`] tracks mean, variance,
//!   min and max with Welford's algorithm, one sample at a time
//! - **Parallel merge**: partial aggregates from separate workers combine
//!   exactly with [`DistributionStats::merge`]
//! - **Convergence**: standard error and confidence half-widths tell the
//!   caller how far the mean can still move
//! - **Shape**: [`Histogram`] buckets samples for distribution plots
//!
//! ## Quick Start
//!
//! ```
//! use raidsim_stats::DistributionStats;
//!
//! let mut dps = DistributionStats::empty();
//! for sample in [1010.0, 990.0, 1003.0, 997.0] {
//!     dps.push(sample);
//! }
//!
//! assert_eq!(dps.count(), 4);
//! assert!((dps.mean() - 1000.0).abs() < 1e-9);
//! assert!(dps.std_error() > 0.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod distribution;
pub mod histogram;

pub use distribution::{DistributionStats, Z_95};
pub use histogram::{Histogram, HistogramError};
