//! Simulated time.
//!
//! All engine time is integer milliseconds. Integer time keeps event ordering
//! exact: two events scheduled for "1.5 s" land on the same key no matter how
//! the value was computed.

use std::fmt;
use std::ops::{Add, AddAssign, Sub};

use serde::{Deserialize, Serialize};

/// A point in (or span of) simulated time, in milliseconds.
///
/// The same type is used for instants and durations; the engine never needs
/// negative spans, so subtraction saturates at zero.
///
/// # Example
///
/// ```
/// use raidsim_core::time::SimTime;
///
/// let gcd = SimTime::from_millis(1500);
/// let now = SimTime::from_secs(3);
/// assert_eq!((now + gcd).as_millis(), 4500);
/// assert_eq!(gcd - now, SimTime::ZERO);
/// ```
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SimTime(u64);

impl SimTime {
    /// Encounter start.
    pub const ZERO: Self = Self(0);
    /// Sentinel for "never", used by auras that do not expire.
    pub const NEVER: Self = Self(u64::MAX);

    /// Creates a time from milliseconds.
    #[must_use]
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// Creates a time from whole seconds.
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1000))
    }

    /// Creates a time from fractional seconds, rounded to the nearest
    /// millisecond. Negative and NaN inputs map to zero.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_secs_f64(secs: f64) -> Self {
        if secs.is_nan() || secs <= 0.0 {
            Self::ZERO
        } else {
            Self((secs * 1000.0).round() as u64)
        }
    }

    /// Raw milliseconds.
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Fractional seconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Whether this is the [`SimTime::NEVER`] sentinel.
    #[must_use]
    pub const fn is_never(self) -> bool {
        self.0 == u64::MAX
    }

    /// Subtraction clamped at zero.
    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// Divides a span by `1 + haste`, used for cast times, GCDs and swings.
    #[must_use]
    pub fn hasted(self, haste: f64) -> Self {
        if haste <= 0.0 || self.is_never() {
            self
        } else {
            Self::from_secs_f64(self.as_secs_f64() / (1.0 + haste))
        }
    }

    /// Multiplies a span by an integer count.
    #[must_use]
    pub const fn times(self, n: u32) -> Self {
        Self(self.0.saturating_mul(n as u64))
    }
}

impl Add for SimTime {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for SimTime {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for SimTime {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.saturating_sub(rhs)
    }
}

impl fmt::Debug for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SimTime({self})")
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_never() {
            write!(f, "never")
        } else {
            write!(f, "{}.{:03}s", self.0 / 1000, self.0 % 1000)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_secs_f64_rounds_to_millis() {
        assert_eq!(SimTime::from_secs_f64(1.2346).as_millis(), 1235);
        assert_eq!(SimTime::from_secs_f64(-3.0), SimTime::ZERO);
        assert_eq!(SimTime::from_secs_f64(f64::NAN), SimTime::ZERO);
    }

    #[test]
    fn arithmetic_saturates() {
        assert_eq!(SimTime::NEVER + SimTime::from_secs(1), SimTime::NEVER);
        assert_eq!(SimTime::from_secs(1) - SimTime::from_secs(2), SimTime::ZERO);
    }

    #[test]
    fn haste_shortens_spans() {
        let cast = SimTime::from_millis(1500);
        assert_eq!(cast.hasted(0.5), SimTime::from_millis(1000));
        assert_eq!(cast.hasted(0.0), cast);
        assert_eq!(SimTime::NEVER.hasted(1.0), SimTime::NEVER);
    }

    #[test]
    fn display_formats_seconds() {
        assert_eq!(SimTime::from_millis(12_345).to_string(), "12.345s");
        assert_eq!(SimTime::NEVER.to_string(), "never");
    }
}
