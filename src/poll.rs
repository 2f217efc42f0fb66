//! Blocking poll-until helper shared by every readiness wait.

use std::time::{Duration, Instant};

// About thirty years.
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

#[derive(Debug, PartialEq, Eq)]
pub enum PollState<T> {
    Ready(T),
    Pending,
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct Poller {
    interval: Duration,
    deadline: Instant,
}

impl Poller {
    /// A timeout too large for the clock saturates to a deadline that is
    /// never reached in practice.
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        let now = Instant::now();
        let deadline = now
            .checked_add(timeout)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now);

        Self { interval, deadline }
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Runs the probe once without sleeping.
    pub fn poll<T, E, F>(&self, probe: F) -> Result<PollState<T>, E>
    where
        F: FnOnce() -> Result<Option<T>, E>,
    {
        if let Some(value) = probe()? {
            return Ok(PollState::Ready(value));
        }

        match self.expired() {
            true => Ok(PollState::TimedOut),
            false => Ok(PollState::Pending),
        }
    }

    /// Probes until it yields a value or the deadline passes. The probe always
    /// runs at least once. Returns `Ok(None)` on timeout.
    pub fn until<T, E, F>(self, mut probe: F) -> Result<Option<T>, E>
    where
        F: FnMut() -> Result<Option<T>, E>,
    {
        loop {
            match self.poll(&mut probe)? {
                PollState::Ready(value) => return Ok(Some(value)),
                PollState::TimedOut => return Ok(None),
                PollState::Pending => std::thread::sleep(self.interval.min(self.remaining())),
            }
        }
    }
}
