use crate::misc::FloatingPoint;

/// An observed value at a timestamp (seconds)
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sample<T, P> {
    time: T,
    value: P,
}

impl<T: Copy, P> Sample<T, P> {
    pub fn new(time: T, value: P) -> Self {
        Self { time, value }
    }

    pub fn time(&self) -> T {
        self.time
    }

    pub fn value(&self) -> &P {
        &self.value
    }
}

/// Key of a timestamp in the sample map, in integer nanoseconds
/// Two timestamps closer than half a nanosecond share a key.
pub(crate) fn sample_key<T: FloatingPoint>(t: T) -> anyhow::Result<i64> {
    let seconds = t
        .to_f64()
        .ok_or_else(|| anyhow::anyhow!("Timestamp {} cannot be expressed in seconds", t))?;
    anyhow::ensure!(
        seconds.is_finite() && seconds.abs() < i64::MAX as f64 * 1e-9,
        "Timestamp {} is out of range",
        t
    );
    Ok((seconds * 1e9).round() as i64)
}
