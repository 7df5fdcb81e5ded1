use std::fmt;
use std::ops::{Add, Neg, Sub};

use super::NSEC_PER_SEC;

/// Signed span of time in seconds and nanoseconds
///
/// Always normalized so that `0 <= nsec < 1e9`; the sign is carried by `sec`,
/// so half a second in the past is `{ sec: -1, nsec: 500_000_000 }`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Duration {
    sec: i64,
    nsec: u32,
}

impl Duration {
    pub const ZERO: Self = Self { sec: 0, nsec: 0 };

    /// Create a duration, carrying any nanosecond overflow into the seconds
    pub fn new(sec: i64, nsec: i64) -> Self {
        let nsec_per_sec = i64::from(NSEC_PER_SEC);
        Self {
            sec: sec + nsec.div_euclid(nsec_per_sec),
            nsec: nsec.rem_euclid(nsec_per_sec) as u32,
        }
    }

    /// Create a duration from floating point seconds, rounded to the nanosecond
    /// # Failures
    /// - if `t` is not finite or exceeds the representable range
    pub fn from_sec(t: f64) -> anyhow::Result<Self> {
        anyhow::ensure!(t.is_finite(), "Invalid duration {}", t);
        let sec = t.floor();
        anyhow::ensure!(
            sec >= i64::MIN as f64 && sec < i64::MAX as f64,
            "Duration {} is out of range",
            t
        );
        let nsec = ((t - sec) * f64::from(NSEC_PER_SEC)).round() as i64;
        Ok(Self::new(sec as i64, nsec))
    }

    pub fn from_nsec(nsec: i64) -> Self {
        Self::new(0, nsec)
    }

    pub fn sec(&self) -> i64 {
        self.sec
    }

    pub fn nsec(&self) -> u32 {
        self.nsec
    }

    pub fn to_sec(&self) -> f64 {
        self.sec as f64 + f64::from(self.nsec) * 1e-9
    }

    /// Total nanoseconds, saturating at the bounds of `i64`
    pub fn to_nsec(&self) -> i64 {
        self.sec
            .saturating_mul(i64::from(NSEC_PER_SEC))
            .saturating_add(i64::from(self.nsec))
    }

    pub fn is_zero(&self) -> bool {
        self.sec == 0 && self.nsec == 0
    }

    pub fn is_negative(&self) -> bool {
        self.sec < 0
    }

    /// Convert to a standard duration
    /// # Failures
    /// - if the duration is negative
    pub fn to_std(&self) -> anyhow::Result<std::time::Duration> {
        anyhow::ensure!(!self.is_negative(), "Negative duration {}", self);
        Ok(std::time::Duration::new(self.sec as u64, self.nsec))
    }
}

impl From<std::time::Duration> for Duration {
    fn from(value: std::time::Duration) -> Self {
        Self::new(value.as_secs() as i64, i64::from(value.subsec_nanos()))
    }
}

impl Add for Duration {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.sec + rhs.sec, i64::from(self.nsec) + i64::from(rhs.nsec))
    }
}

impl Sub for Duration {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.sec - rhs.sec, i64::from(self.nsec) - i64::from(rhs.nsec))
    }
}

impl Neg for Duration {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self::new(-self.sec, -i64::from(self.nsec))
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sec < 0 && self.nsec > 0 {
            // -1 s + 0.25 s reads as -0.75 s
            let magnitude = -*self;
            write!(f, "-{}.{:09}", magnitude.sec, magnitude.nsec)
        } else {
            write!(f, "{}.{:09}", self.sec, self.nsec)
        }
    }
}
