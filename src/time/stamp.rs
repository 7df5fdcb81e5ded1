use std::fmt;
use std::ops::Sub;

use super::{Duration, NSEC_PER_SEC};

/// Point in time as seconds and nanoseconds since the Unix epoch
///
/// A zero time means "not yet available" for clocks that start unset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Time {
    sec: u32,
    nsec: u32,
}

/// Smallest valid time
pub const TIME_MIN: Time = Time { sec: 0, nsec: 1 };

/// Largest representable time
pub const TIME_MAX: Time = Time {
    sec: u32::MAX,
    nsec: NSEC_PER_SEC - 1,
};

impl Time {
    pub const ZERO: Self = Self { sec: 0, nsec: 0 };

    /// Create a time, carrying any nanosecond overflow into the seconds
    /// # Failures
    /// - if the seconds overflow after the carry
    pub fn new(sec: u32, nsec: u32) -> anyhow::Result<Self> {
        let carry = nsec / NSEC_PER_SEC;
        let sec = sec
            .checked_add(carry)
            .ok_or_else(|| anyhow::anyhow!("Time {}s + {}ns is out of range", sec, nsec))?;
        Ok(Self {
            sec,
            nsec: nsec % NSEC_PER_SEC,
        })
    }

    /// Create a time from floating point seconds, rounded to the nanosecond
    ///
    /// # Example
    /// ```
    /// use pose_spline::prelude::Time;
    ///
    /// let t = Time::from_sec(12.5).unwrap();
    /// assert_eq!((t.sec(), t.nsec()), (12, 500_000_000));
    /// assert_eq!(t.to_string(), "12.500000000");
    /// assert!(Time::from_sec(-1.0).is_err());
    /// ```
    pub fn from_sec(t: f64) -> anyhow::Result<Self> {
        anyhow::ensure!(
            t.is_finite() && t >= 0.0,
            "Time {} is not a finite non-negative number of seconds",
            t
        );
        let sec = t.floor();
        anyhow::ensure!(sec <= f64::from(u32::MAX), "Time {} is out of range", t);
        let nsec = ((t - sec) * f64::from(NSEC_PER_SEC)).round() as u32;
        Self::new(sec as u32, nsec)
    }

    /// # Failures
    /// - if the seconds do not fit the representation
    pub fn from_nsec(nsec: u64) -> anyhow::Result<Self> {
        let per_sec = u64::from(NSEC_PER_SEC);
        let sec = u32::try_from(nsec / per_sec)
            .map_err(|_| anyhow::anyhow!("Time {}ns is out of range", nsec))?;
        Ok(Self {
            sec,
            nsec: (nsec % per_sec) as u32,
        })
    }

    pub fn sec(&self) -> u32 {
        self.sec
    }

    pub fn nsec(&self) -> u32 {
        self.nsec
    }

    pub fn to_sec(&self) -> f64 {
        f64::from(self.sec) + f64::from(self.nsec) * 1e-9
    }

    pub fn to_nsec(&self) -> u64 {
        u64::from(self.sec) * u64::from(NSEC_PER_SEC) + u64::from(self.nsec)
    }

    pub fn is_zero(&self) -> bool {
        self.sec == 0 && self.nsec == 0
    }

    /// Shift the time by `duration`, or `None` if the result is not representable
    pub fn checked_add(&self, duration: Duration) -> Option<Self> {
        let total = i128::from(self.to_nsec()) + i128::from(duration.to_nsec());
        u64::try_from(total)
            .ok()
            .and_then(|nsec| Self::from_nsec(nsec).ok())
    }

    /// Shift the time back by `duration`, or `None` if the result is not representable
    pub fn checked_sub(&self, duration: Duration) -> Option<Self> {
        self.checked_add(-duration)
    }
}

impl Sub for Time {
    type Output = Duration;
    fn sub(self, rhs: Self) -> Self::Output {
        Duration::new(
            i64::from(self.sec) - i64::from(rhs.sec),
            i64::from(self.nsec) - i64::from(rhs.nsec),
        )
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.sec, self.nsec)
    }
}
