use std::sync::{Arc, Mutex};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use super::{Duration, Time};

/// Interval at which clocks without a native wait poll their current time
const POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(1);

/// Source of the current time
pub trait Clock {
    fn now(&self) -> anyhow::Result<Time>;

    /// Block until the clock reaches `time`
    fn sleep_until(&self, time: Time) -> anyhow::Result<()>;

    /// Check if the clock reports a usable time
    fn is_valid(&self) -> anyhow::Result<bool> {
        self.now().map(|now| !now.is_zero())
    }
}

/// Clock backed by the operating system's real time
#[derive(Clone, Copy, Debug, Default)]
pub struct WallClock;

impl Clock for WallClock {
    fn now(&self) -> anyhow::Result<Time> {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| anyhow::anyhow!("The system clock is before the Unix epoch: {}", e))?;
        Time::new(
            u32::try_from(elapsed.as_secs())
                .map_err(|_| anyhow::anyhow!("The system clock is out of range"))?,
            elapsed.subsec_nanos(),
        )
    }

    fn sleep_until(&self, time: Time) -> anyhow::Result<()> {
        loop {
            let remaining = time - self.now()?;
            if remaining <= Duration::ZERO {
                return Ok(());
            }
            std::thread::sleep(remaining.to_std()?);
        }
    }
}

/// Manually driven clock for simulation and tests
///
/// Clones share the same time, so one handle can advance the clock while
/// another one sleeps on it.
///
/// # Example
/// ```
/// use pose_spline::prelude::*;
///
/// let clock = SimClock::default();
/// assert!(!clock.is_valid().unwrap());
/// clock.set_now(Time::from_sec(3.5).unwrap()).unwrap();
/// assert_eq!(clock.now().unwrap().to_sec(), 3.5);
/// ```
#[derive(Clone, Debug, Default)]
pub struct SimClock {
    now: Arc<Mutex<Time>>,
}

impl SimClock {
    pub fn new(now: Time) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn set_now(&self, time: Time) -> anyhow::Result<()> {
        *self.lock()? = time;
        Ok(())
    }

    /// Move the clock forward by `duration`
    /// # Failures
    /// - if the duration is negative or the resulting time is out of range
    pub fn advance(&self, duration: Duration) -> anyhow::Result<Time> {
        anyhow::ensure!(
            !duration.is_negative(),
            "Cannot move a clock backwards by {}",
            duration
        );
        let mut now = self.lock()?;
        let next = now
            .checked_add(duration)
            .ok_or_else(|| anyhow::anyhow!("Advancing {} by {} is out of range", *now, duration))?;
        *now = next;
        Ok(next)
    }

    fn lock(&self) -> anyhow::Result<std::sync::MutexGuard<'_, Time>> {
        self.now
            .lock()
            .map_err(|_| anyhow::anyhow!("The simulated clock lock is poisoned"))
    }
}

impl Clock for SimClock {
    fn now(&self) -> anyhow::Result<Time> {
        Ok(*self.lock()?)
    }

    fn sleep_until(&self, time: Time) -> anyhow::Result<()> {
        while self.now()? < time {
            std::thread::sleep(POLL_INTERVAL);
        }
        Ok(())
    }
}

/// Wait until `clock` reports a non-zero time, for at most `timeout` of real time
/// # Failures
/// - if the clock is still invalid once the timeout expires
pub fn wait_for_valid<C: Clock + ?Sized>(
    clock: &C,
    timeout: std::time::Duration,
) -> anyhow::Result<Time> {
    let start = Instant::now();
    loop {
        let now = clock.now()?;
        if !now.is_zero() {
            return Ok(now);
        }
        if start.elapsed() >= timeout {
            log::warn!("clock is still invalid after {:?}", timeout);
            anyhow::bail!("The clock did not become valid within {:?}", timeout);
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}
